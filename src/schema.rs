//! Structural schema version inference.
//!
//! The manifest document embedded in an archive declares a schema version so
//! older clients reject packages with structure they cannot interpret. The
//! version is never authored; it is inferred from the resolved file set as
//! the minimum version able to represent it:
//!
//! 1. **Baseline** - plain file layouts.
//! 2. **Framework-aware** - a `content` or `tools` file sits under a
//!    target-framework folder, or a `lib` empty-folder marker does. Both
//!    encode framework-conditional selection that baseline clients would
//!    misread.
//! 3. **Transform-aware** - a `content` file is an install/uninstall
//!    transform (`.install.xdt` / `.uninstall.xdt`). Checked first: a
//!    transform file forces tier 3 regardless of tier 2 triggers.

use crate::framework::{PackageFolder, TargetFramework, classify_path};
use crate::metadata::ResolvedFile;
use tracing::debug;

/// File suffixes identifying install/uninstall transform files.
pub const TRANSFORM_SUFFIXES: [&str; 2] = [".install.xdt", ".uninstall.xdt"];

/// The structural schema versions, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SchemaVersion {
    /// Baseline layouts
    Baseline,
    /// Framework-conditional content and tools folders
    FrameworkAware,
    /// Install/uninstall transform files
    TransformAware,
}

impl SchemaVersion {
    /// The numeric version written into the manifest part.
    #[must_use]
    pub const fn ordinal(self) -> u32 {
        match self {
            Self::Baseline => 1,
            Self::FrameworkAware => 2,
            Self::TransformAware => 3,
        }
    }
}

/// Infer the minimum schema version able to represent `files`.
#[must_use]
pub fn infer_minimum_version(files: &[ResolvedFile]) -> SchemaVersion {
    // Transforms take precedence over every framework-awareness trigger
    if files.iter().any(is_transform_file) {
        debug!("Transform file present, schema version {}", SchemaVersion::TransformAware.ordinal());
        return SchemaVersion::TransformAware;
    }
    if files.iter().any(needs_framework_awareness) {
        return SchemaVersion::FrameworkAware;
    }
    SchemaVersion::Baseline
}

fn is_transform_file(file: &ResolvedFile) -> bool {
    if !file.is_physical() {
        return false;
    }
    let classified = classify_path(file.target());
    if classified.folder != Some(PackageFolder::Content) {
        return false;
    }
    let target = file.target().to_ascii_lowercase();
    TRANSFORM_SUFFIXES.iter().any(|suffix| target.ends_with(suffix))
}

fn needs_framework_awareness(file: &ResolvedFile) -> bool {
    match file {
        ResolvedFile::Physical { target, .. } => {
            let classified = classify_path(target);
            matches!(
                classified.folder,
                Some(PackageFolder::Content | PackageFolder::Tools)
            ) && classified.framework.is_some()
        }
        // An empty-folder marker under lib/<framework> exists purely to pin
        // a framework slot, which baseline clients cannot represent
        ResolvedFile::EmptyFolder { target } => {
            let segments: Vec<&str> = target.split('/').filter(|s| !s.is_empty()).collect();
            segments.len() == 2
                && PackageFolder::from_segment(segments[0]) == Some(PackageFolder::Lib)
                && TargetFramework::parse(segments[1]).is_some()
        }
    }
}
