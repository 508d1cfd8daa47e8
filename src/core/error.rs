//! Error handling for Capsule.
//!
//! The error system is built around two types:
//! - [`CapsuleError`] - strongly-typed errors for every failure mode in the
//!   packaging pipeline
//! - [`ErrorContext`] - a wrapper that adds user-friendly details and
//!   actionable suggestions for CLI display
//!
//! Every failure in the core is structural: a bad manifest, a missing file, a
//! metadata conflict. There are no transient errors and no retries, so each
//! variant carries enough context to fix the input and run again.
//!
//! Common library errors are converted automatically:
//! - [`std::io::Error`] → [`CapsuleError::IoError`]
//! - [`toml::de::Error`] → [`CapsuleError::TomlError`]
//! - [`semver::Error`] → [`CapsuleError::SemverError`]
//! - [`zip::result::ZipError`] → [`CapsuleError::ZipError`]
//!
//! Use [`user_friendly_error`] to convert any error into a displayable
//! [`ErrorContext`] with contextual suggestions.

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for Capsule operations.
///
/// Each variant represents a specific failure mode with enough context to
/// report it precisely. Validation and template-resolution errors are always
/// fatal and surface to the caller; the only intentionally non-fatal
/// condition in the pipeline (an artifact missing a metadata record) is
/// modeled as an absent value, not an error.
#[derive(Error, Debug, Clone)]
pub enum CapsuleError {
    /// A non-wildcard, non-directory source entry resolved to nothing.
    ///
    /// Wildcard and directory sources may legitimately match zero files;
    /// a literal path that does not exist is an authoring mistake.
    #[error("Source file not found: {path}")]
    FileNotFound {
        /// The literal source path that did not resolve to a file
        path: String,
    },

    /// Package identifier failed format validation.
    #[error("Invalid package identifier: '{id}'. {reason}")]
    InvalidIdentifier {
        /// The offending identifier
        id: String,
        /// Why the identifier was rejected
        reason: String,
    },

    /// The package has no files, no dependencies, and no framework references.
    #[error("Cannot create a package that has no dependencies or content")]
    EmptyPackage,

    /// A stable package declared a dependency on a pre-release version.
    ///
    /// Only applies when the package's own version is stable; pre-release
    /// packages may depend on pre-release versions freely.
    #[error(
        "A stable release of a package must not have a dependency on a pre-release version: {dependency} {range}"
    )]
    PrereleaseDependencyOnStablePackage {
        /// Identifier of the offending dependency
        dependency: String,
        /// The version range carrying a pre-release bound
        range: String,
    },

    /// A reference-set entry names an assembly that is not in the package.
    #[error("Invalid assembly reference '{name}': no matching file under the lib folder")]
    MissingReferenceAssembly {
        /// The reference name that could not be matched
        name: String,
    },

    /// Template placeholders were still unresolved after artifact scanning.
    #[error("Cannot resolve template values for: {placeholders}")]
    UnresolvedTemplatePlaceholder {
        /// Comma-joined list of placeholder tokens left unresolved
        placeholders: String,
    },

    /// Two candidate artifacts disagree on a template-resolved field.
    #[error(
        "Conflicting {field} values: '{first_value}' (from {first_artifact}) vs '{second_value}' (from {second_artifact})"
    )]
    ConflictingArtifactMetadata {
        /// The metadata field the artifacts disagree on
        field: String,
        /// Artifact that resolved the field first
        first_artifact: String,
        /// Value produced by the first artifact
        first_value: String,
        /// Artifact that produced the conflicting value
        second_artifact: String,
        /// The conflicting value
        second_value: String,
    },

    /// A template dependency has no version and no artifact to infer one from.
    #[error("Dependency '{dependency}' has no version and no artifact was found to infer one from")]
    MissingDependencyVersionSource {
        /// Identifier of the versionless dependency
        dependency: String,
    },

    /// Manifest descriptor could not be parsed.
    #[error("Invalid manifest file syntax in {file}")]
    ManifestParseError {
        /// Path to the manifest file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// A version string could not be parsed.
    #[error("Invalid version: {version}")]
    InvalidVersion {
        /// The unparseable version string
        version: String,
    },

    /// A dependency version range could not be parsed.
    #[error("Invalid version range: {range}")]
    InvalidVersionRange {
        /// The unparseable range string
        range: String,
    },

    /// A glob pattern could not be compiled.
    #[error("Invalid file pattern: {pattern}")]
    InvalidPattern {
        /// The invalid glob pattern
        pattern: String,
    },

    /// The archive being opened is not a capsule package.
    #[error("Not a valid package archive: {reason}")]
    InvalidArchive {
        /// Why the archive was rejected
        reason: String,
    },

    /// IO error wrapper
    #[error("IO error: {message}")]
    IoError {
        /// Description of the IO failure
        message: String,
    },

    /// TOML parsing error wrapper
    #[error("TOML parsing error: {message}")]
    TomlError {
        /// Description of the parse failure
        message: String,
    },

    /// TOML serialization error wrapper
    #[error("TOML serialization error: {message}")]
    TomlSerError {
        /// Description of the serialization failure
        message: String,
    },

    /// Semantic version parsing error wrapper
    #[error("Version parsing error: {message}")]
    SemverError {
        /// Description of the version parse failure
        message: String,
    },

    /// Zip archive error wrapper
    #[error("Archive error: {message}")]
    ZipError {
        /// Description of the archive failure
        message: String,
    },

    /// Generic error fallback
    #[error("{message}")]
    Other {
        /// The error message
        message: String,
    },
}

impl From<std::io::Error> for CapsuleError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for CapsuleError {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlError {
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for CapsuleError {
    fn from(err: toml::ser::Error) -> Self {
        Self::TomlSerError {
            message: err.to_string(),
        }
    }
}

impl From<semver::Error> for CapsuleError {
    fn from(err: semver::Error) -> Self {
        Self::SemverError {
            message: err.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for CapsuleError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::ZipError {
            message: err.to_string(),
        }
    }
}

/// User-facing error wrapper combining a [`CapsuleError`] with optional
/// details and an actionable suggestion.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying Capsule error
    pub error: CapsuleError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no additional information.
    #[must_use]
    pub const fn new(error: CapsuleError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    ///
    /// Suggestions should be actionable steps; they are displayed in green.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining why the error occurred. Displayed in yellow.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    ///
    /// Error message in red and bold, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error to a user-friendly [`ErrorContext`] with suggestions.
///
/// Recognizes [`CapsuleError`] variants and common IO errors and attaches
/// guidance appropriate to each; everything else falls through to a generic
/// context preserving the error chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(capsule_error) = error.downcast_ref::<CapsuleError>() {
        return create_error_context(capsule_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(CapsuleError::IoError {
                    message: io_error.to_string(),
                })
                .with_suggestion("Check file ownership or run with elevated permissions")
                .with_details("Capsule could not read or write a file in the package tree");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(CapsuleError::IoError {
                    message: io_error.to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    // Fall back to the full anyhow chain so nested context is not lost
    ErrorContext::new(CapsuleError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: CapsuleError) -> ErrorContext {
    match &error {
        CapsuleError::FileNotFound { path } => {
            let path = path.clone();
            ErrorContext::new(error)
                .with_details(format!("The source entry '{path}' matched no file on disk"))
                .with_suggestion(
                    "Check the manifest's files section; literal paths must exist, \
                     wildcard patterns may match nothing",
                )
        }
        CapsuleError::InvalidIdentifier { .. } => ErrorContext::new(error).with_suggestion(
            "Package identifiers may contain letters, digits, '.', '-' and '_', \
             and must be 100 characters or fewer",
        ),
        CapsuleError::EmptyPackage => ErrorContext::new(error).with_suggestion(
            "Add at least one file, dependency, or framework assembly reference to the manifest",
        ),
        CapsuleError::PrereleaseDependencyOnStablePackage { .. } => {
            ErrorContext::new(error).with_suggestion(
                "Either mark the package version as pre-release or depend on a stable release",
            )
        }
        CapsuleError::MissingReferenceAssembly { .. } => ErrorContext::new(error)
            .with_suggestion("Reference names must match a file packaged under lib/"),
        CapsuleError::UnresolvedTemplatePlaceholder { .. } => ErrorContext::new(error)
            .with_details(
                "Placeholder fields are filled from metadata records embedded in the \
                 package's primary artifact",
            )
            .with_suggestion(
                "Check that the artifact carries the missing records, or replace the \
                 placeholders with literal values",
            ),
        CapsuleError::ConflictingArtifactMetadata { .. } => ErrorContext::new(error)
            .with_suggestion(
                "All artifacts in the package must agree on template-resolved fields; \
                 narrow the file set or align the artifact metadata",
            ),
        CapsuleError::ManifestParseError { file, .. } => {
            let file = file.clone();
            ErrorContext::new(error)
                .with_details(format!("The manifest at '{file}' is not valid TOML"))
                .with_suggestion("Fix the syntax error reported above and re-run")
        }
        _ => ErrorContext::new(error),
    }
}
