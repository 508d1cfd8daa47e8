//! Package identifier validation.
//!
//! Identifiers name the package inside feeds and inside the archive itself
//! (the manifest part is stored at `<id>.pkgspec`), so the grammar is strict:
//! word characters with single `.`, `-` or `_` separators, at most
//! [`MAX_ID_LENGTH`] characters.
//!
//! The validator is injectable: [`crate::builder::PackageBuilder`] accepts any
//! [`IdValidator`] implementation and invokes it before every save.

use crate::core::error::CapsuleError;
use regex::Regex;
use std::sync::OnceLock;

/// Maximum allowed length of a package identifier.
pub const MAX_ID_LENGTH: usize = 100;

fn id_regex() -> &'static Regex {
    static ID_REGEX: OnceLock<Regex> = OnceLock::new();
    // Word characters separated by single dots, dashes or underscores
    ID_REGEX.get_or_init(|| Regex::new(r"^\w+([.\-_]\w+)*$").unwrap())
}

/// Check whether a string is a well-formed package identifier.
///
/// # Examples
///
/// ```
/// use capsule_cli::core::is_valid_package_id;
///
/// assert!(is_valid_package_id("Sample.Package"));
/// assert!(is_valid_package_id("my-tool_2"));
/// assert!(!is_valid_package_id(""));
/// assert!(!is_valid_package_id("bad id"));
/// assert!(!is_valid_package_id("double..dot"));
/// ```
#[must_use]
pub fn is_valid_package_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LENGTH && id_regex().is_match(id)
}

/// Pluggable package-identifier validator.
///
/// The builder invokes the configured validator before every save so a host
/// application can swap in a stricter (or looser) grammar without touching
/// the emission pipeline.
pub trait IdValidator {
    /// Validate `id`, returning [`CapsuleError::InvalidIdentifier`] when malformed.
    fn validate(&self, id: &str) -> Result<(), CapsuleError>;
}

/// The standard identifier grammar used when no custom validator is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultIdValidator;

impl IdValidator for DefaultIdValidator {
    fn validate(&self, id: &str) -> Result<(), CapsuleError> {
        if id.is_empty() {
            return Err(CapsuleError::InvalidIdentifier {
                id: id.to_string(),
                reason: "Identifier must not be empty".to_string(),
            });
        }
        if id.len() > MAX_ID_LENGTH {
            return Err(CapsuleError::InvalidIdentifier {
                id: id.to_string(),
                reason: format!("Identifier exceeds {MAX_ID_LENGTH} characters"),
            });
        }
        if !id_regex().is_match(id) {
            return Err(CapsuleError::InvalidIdentifier {
                id: id.to_string(),
                reason: "Identifier contains invalid characters".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_identifiers() {
        for id in ["Foo", "Foo.Bar", "foo-bar", "foo_bar", "A1.B2-c3_d4", "x"] {
            assert!(is_valid_package_id(id), "expected '{id}' to be valid");
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for id in ["", " ", "foo bar", ".foo", "foo.", "foo..bar", "foo/bar", "foo!"] {
            assert!(!is_valid_package_id(id), "expected '{id}' to be invalid");
        }
    }

    #[test]
    fn test_length_limit() {
        let at_limit = "a".repeat(MAX_ID_LENGTH);
        let over_limit = "a".repeat(MAX_ID_LENGTH + 1);
        assert!(is_valid_package_id(&at_limit));
        assert!(!is_valid_package_id(&over_limit));
    }

    #[test]
    fn test_default_validator_reasons() {
        let validator = DefaultIdValidator;
        assert!(validator.validate("Sample.Package").is_ok());

        let err = validator.validate("").unwrap_err();
        assert!(matches!(err, CapsuleError::InvalidIdentifier { .. }));

        let err = validator.validate("not valid").unwrap_err();
        assert!(err.to_string().contains("invalid characters"));
    }
}
