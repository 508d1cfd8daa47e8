//! Version parsing and dependency version ranges.
//!
//! Package versions are semantic versions (`major.minor.patch` plus optional
//! pre-release label and build metadata), parsed leniently so the shorthand
//! forms `"1"` and `"1.2"` authors write in manifests normalize to full
//! three-part versions.
//!
//! Dependency versions are ranges in interval notation:
//!
//! | Notation       | Meaning                        |
//! |----------------|--------------------------------|
//! | `1.0`          | minimum version, inclusive     |
//! | `[1.0]`        | exactly version 1.0            |
//! | `[1.0, 2.0)`   | 1.0 <= x < 2.0                 |
//! | `(, 1.0]`      | x <= 1.0                       |
//! | `(1.0,)`       | x > 1.0                        |
//!
//! Ranges serialize back to the most compact notation that round-trips, so a
//! plain minimum stays a plain minimum through manifest rewrites.

use crate::core::error::CapsuleError;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Parse a version string, padding missing components with zeros.
///
/// Accepts `"1"`, `"1.2"`, and full semantic versions including pre-release
/// and build metadata (`"1.2.3-beta.1+sha"`).
///
/// # Errors
///
/// Returns [`CapsuleError::InvalidVersion`] when the string is not a version.
pub fn parse_version_lenient(input: &str) -> Result<Version, CapsuleError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CapsuleError::InvalidVersion {
            version: input.to_string(),
        });
    }

    // Split the numeric core from any pre-release / build suffix
    let suffix_start = trimmed.find(['-', '+']);
    let (core, suffix) = match suffix_start {
        Some(pos) => trimmed.split_at(pos),
        None => (trimmed, ""),
    };

    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
        return Err(CapsuleError::InvalidVersion {
            version: input.to_string(),
        });
    }
    while parts.len() < 3 {
        parts.push("0");
    }

    let normalized = format!("{}{}", parts.join("."), suffix);
    Version::parse(&normalized).map_err(|_| CapsuleError::InvalidVersion {
        version: input.to_string(),
    })
}

/// A dependency version range with optional inclusive or exclusive bounds.
///
/// The canonical empty range (`VersionRange::default()`) has no bounds and
/// matches every version; it only appears transiently in template mode before
/// a version is inferred from the primary artifact.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionRange {
    /// Lower bound, if any
    pub min: Option<Version>,
    /// Whether the lower bound itself is included
    pub min_inclusive: bool,
    /// Upper bound, if any
    pub max: Option<Version>,
    /// Whether the upper bound itself is included
    pub max_inclusive: bool,
}

impl VersionRange {
    /// Range accepting `version` and anything newer.
    #[must_use]
    pub fn at_least(version: Version) -> Self {
        Self {
            min: Some(version),
            min_inclusive: true,
            max: None,
            max_inclusive: false,
        }
    }

    /// Range accepting exactly `version`.
    #[must_use]
    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(version.clone()),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
        }
    }

    /// True when the range has no bounds at all.
    #[must_use]
    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// True when either bound carries a pre-release label.
    ///
    /// Used by validation: a stable package must not implicitly pull in
    /// pre-release dependencies through either end of a range.
    #[must_use]
    pub fn has_prerelease_bound(&self) -> bool {
        let is_pre = |v: &Option<Version>| v.as_ref().is_some_and(|v| !v.pre.is_empty());
        is_pre(&self.min) || is_pre(&self.max)
    }

    /// Check whether `version` falls inside the range.
    #[must_use]
    pub fn satisfies(&self, version: &Version) -> bool {
        if let Some(min) = &self.min {
            let ok = if self.min_inclusive { version >= min } else { version > min };
            if !ok {
                return false;
            }
        }
        if let Some(max) = &self.max {
            let ok = if self.max_inclusive { version <= max } else { version < max };
            if !ok {
                return false;
            }
        }
        true
    }
}

impl FromStr for VersionRange {
    type Err = CapsuleError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(CapsuleError::InvalidVersionRange {
                range: input.to_string(),
            });
        }

        let starts_bracketed = trimmed.starts_with('[') || trimmed.starts_with('(');
        let ends_bracketed = trimmed.ends_with(']') || trimmed.ends_with(')');

        if !starts_bracketed && !ends_bracketed {
            // Plain version: inclusive minimum
            return Ok(Self::at_least(parse_version_lenient(trimmed)?));
        }
        if !(starts_bracketed && ends_bracketed) {
            return Err(CapsuleError::InvalidVersionRange {
                range: input.to_string(),
            });
        }

        let min_inclusive = trimmed.starts_with('[');
        let max_inclusive = trimmed.ends_with(']');
        let inner = &trimmed[1..trimmed.len() - 1];

        if !inner.contains(',') {
            // [1.0] is an exact match; (1.0) is meaningless
            if !(min_inclusive && max_inclusive) {
                return Err(CapsuleError::InvalidVersionRange {
                    range: input.to_string(),
                });
            }
            return Ok(Self::exact(parse_version_lenient(inner)?));
        }

        let mut bounds = inner.splitn(2, ',');
        let min_text = bounds.next().unwrap_or("").trim();
        let max_text = bounds.next().unwrap_or("").trim();

        let min = if min_text.is_empty() {
            None
        } else {
            Some(parse_version_lenient(min_text)?)
        };
        let max = if max_text.is_empty() {
            None
        } else {
            Some(parse_version_lenient(max_text)?)
        };

        if min.is_none() && max.is_none() {
            return Err(CapsuleError::InvalidVersionRange {
                range: input.to_string(),
            });
        }

        Ok(Self {
            min,
            min_inclusive,
            max,
            max_inclusive,
        })
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            // Exact match
            (Some(min), Some(max)) if min == max && self.min_inclusive && self.max_inclusive => {
                write!(f, "[{min}]")
            }
            // Plain inclusive minimum keeps the shorthand form
            (Some(min), None) if self.min_inclusive => write!(f, "{min}"),
            _ => {
                let open = if self.min_inclusive { '[' } else { '(' };
                let close = if self.max_inclusive { ']' } else { ')' };
                let min = self.min.as_ref().map(ToString::to_string).unwrap_or_default();
                let max = self.max.as_ref().map(ToString::to_string).unwrap_or_default();
                write!(f, "{open}{min}, {max}{close}")
            }
        }
    }
}

impl TryFrom<String> for VersionRange {
    type Error = CapsuleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionRange> for String {
    fn from(range: VersionRange) -> Self {
        range.to_string()
    }
}
