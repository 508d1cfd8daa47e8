//! Pre-save package validation.
//!
//! Every rule here is enforced immediately before emission, on the fully
//! resolved metadata and file set. All failures are fatal; none are
//! warnings.

use crate::core::error::CapsuleError;
use crate::core::id::IdValidator;
use crate::framework::{PackageFolder, classify_path};
use crate::metadata::{PackageMetadata, ResolvedFile};

/// Extensions tried when matching a bare reference name against lib files.
const REFERENCE_EXTENSIONS: [&str; 3] = [".dll", ".exe", ".winmd"];

/// Validate a package immediately before emission.
///
/// Checks, in order: identifier format (through the injected validator),
/// non-empty content, pre-release dependency consistency, and
/// reference-assembly presence.
///
/// # Errors
///
/// - [`CapsuleError::InvalidIdentifier`] from the id validator
/// - [`CapsuleError::EmptyPackage`] when files, dependencies, and framework
///   assemblies are all empty
/// - [`CapsuleError::PrereleaseDependencyOnStablePackage`] when a stable
///   package depends on a pre-release bound
/// - [`CapsuleError::MissingReferenceAssembly`] for unmatched reference names
pub fn validate_package(
    metadata: &PackageMetadata,
    files: &[ResolvedFile],
    id_validator: &dyn IdValidator,
) -> Result<(), CapsuleError> {
    id_validator.validate(&metadata.id)?;

    if files.is_empty()
        && metadata.all_dependencies().next().is_none()
        && metadata.framework_assemblies.is_empty()
    {
        return Err(CapsuleError::EmptyPackage);
    }

    validate_prerelease_dependencies(metadata)?;
    validate_references(metadata, files)?;
    Ok(())
}

/// A stable package must not depend on pre-release versions through either
/// bound of a range.
fn validate_prerelease_dependencies(metadata: &PackageMetadata) -> Result<(), CapsuleError> {
    if !metadata.is_stable() {
        return Ok(());
    }
    for dependency in metadata.all_dependencies() {
        if let Some(range) = &dependency.version_range
            && range.has_prerelease_bound()
        {
            return Err(CapsuleError::PrereleaseDependencyOnStablePackage {
                dependency: dependency.id.clone(),
                range: range.to_string(),
            });
        }
    }
    Ok(())
}

/// Every reference-set name must match a packaged lib file, by bare name or
/// with a known assembly extension appended, case-insensitively.
fn validate_references(
    metadata: &PackageMetadata,
    files: &[ResolvedFile],
) -> Result<(), CapsuleError> {
    if metadata.reference_sets.is_empty() {
        return Ok(());
    }

    let lib_files: Vec<String> = files
        .iter()
        .filter(|file| file.is_physical())
        .filter_map(|file| {
            let classified = classify_path(file.target());
            (classified.folder == Some(PackageFolder::Lib))
                .then(|| classified.file_name().map(str::to_ascii_lowercase))
                .flatten()
        })
        .collect();

    for set in &metadata.reference_sets {
        for reference in &set.references {
            let name = reference.to_ascii_lowercase();
            let matched = lib_files.iter().any(|file| {
                file == &name
                    || REFERENCE_EXTENSIONS.iter().any(|ext| *file == format!("{name}{ext}"))
            });
            if !matched {
                return Err(CapsuleError::MissingReferenceAssembly {
                    name: reference.clone(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::id::DefaultIdValidator;
    use crate::metadata::{Dependency, DependencySet, FrameworkAssembly, ReferenceSet};
    use crate::version::VersionRange;
    use semver::Version;
    use std::path::PathBuf;

    fn metadata(version: &str) -> PackageMetadata {
        PackageMetadata {
            id: "Sample".to_string(),
            version: Version::parse(version).unwrap(),
            title: None,
            description: None,
            summary: None,
            release_notes: None,
            copyright: None,
            language: None,
            icon_url: None,
            license_url: None,
            project_url: None,
            require_license_acceptance: false,
            development_dependency: false,
            min_client_version: None,
            authors: vec!["Alice".to_string()],
            owners: vec![],
            tags: vec![],
            dependency_sets: vec![],
            framework_assemblies: vec![],
            reference_sets: vec![],
        }
    }

    fn lib_file(name: &str) -> ResolvedFile {
        ResolvedFile::Physical {
            source: PathBuf::from("/src").join(name),
            target: format!("lib/{name}"),
        }
    }

    fn dependency_on(id: &str, range: &str) -> DependencySet {
        DependencySet {
            target_framework: None,
            dependencies: vec![Dependency {
                id: id.to_string(),
                version_range: Some(range.parse::<VersionRange>().unwrap()),
            }],
        }
    }

    #[test]
    fn test_valid_package_passes() {
        let metadata = metadata("1.0.0");
        let files = vec![lib_file("Sample.dll")];
        assert!(validate_package(&metadata, &files, &DefaultIdValidator).is_ok());
    }

    #[test]
    fn test_invalid_id_rejected_before_anything_else() {
        let mut metadata = metadata("1.0.0");
        metadata.id = "not a valid id".to_string();
        let err =
            validate_package(&metadata, &[lib_file("Sample.dll")], &DefaultIdValidator).unwrap_err();
        assert!(matches!(err, CapsuleError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_empty_package_rejected() {
        let metadata = metadata("1.0.0");
        let err = validate_package(&metadata, &[], &DefaultIdValidator).unwrap_err();
        assert!(matches!(err, CapsuleError::EmptyPackage));
    }

    #[test]
    fn test_dependencies_alone_satisfy_non_empty_rule() {
        let mut metadata = metadata("1.0.0");
        metadata.dependency_sets = vec![dependency_on("Helper", "1.0.0")];
        assert!(validate_package(&metadata, &[], &DefaultIdValidator).is_ok());
    }

    #[test]
    fn test_framework_assemblies_alone_satisfy_non_empty_rule() {
        let mut metadata = metadata("1.0.0");
        metadata.framework_assemblies = vec![FrameworkAssembly {
            assembly_name: "System.Net".to_string(),
            target_frameworks: vec![],
        }];
        assert!(validate_package(&metadata, &[], &DefaultIdValidator).is_ok());
    }

    #[test]
    fn test_empty_dependency_sets_do_not_count() {
        let mut metadata = metadata("1.0.0");
        metadata.dependency_sets = vec![DependencySet {
            target_framework: Some("net45".to_string()),
            dependencies: vec![],
        }];
        let err = validate_package(&metadata, &[], &DefaultIdValidator).unwrap_err();
        assert!(matches!(err, CapsuleError::EmptyPackage));
    }

    #[test]
    fn test_stable_package_rejects_prerelease_minimum() {
        let mut metadata = metadata("2.0.0");
        metadata.dependency_sets = vec![dependency_on("Helper", "1.0.0-beta")];
        let err =
            validate_package(&metadata, &[lib_file("Sample.dll")], &DefaultIdValidator).unwrap_err();
        match err {
            CapsuleError::PrereleaseDependencyOnStablePackage { dependency, .. } => {
                assert_eq!(dependency, "Helper");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stable_package_rejects_prerelease_maximum() {
        let mut metadata = metadata("2.0.0");
        metadata.dependency_sets = vec![dependency_on("Helper", "[1.0, 2.0.0-rc.1)")];
        let err =
            validate_package(&metadata, &[lib_file("Sample.dll")], &DefaultIdValidator).unwrap_err();
        assert!(matches!(err, CapsuleError::PrereleaseDependencyOnStablePackage { .. }));
    }

    #[test]
    fn test_prerelease_package_may_use_prerelease_dependencies() {
        let mut metadata = metadata("2.0.0-alpha");
        metadata.dependency_sets = vec![dependency_on("Helper", "1.0.0-beta")];
        assert!(
            validate_package(&metadata, &[lib_file("Sample.dll")], &DefaultIdValidator).is_ok()
        );
    }

    #[test]
    fn test_reference_matched_exactly_and_with_extension() {
        let mut metadata = metadata("1.0.0");
        metadata.reference_sets = vec![ReferenceSet {
            target_framework: None,
            references: vec!["Sample.dll".to_string(), "Sample".to_string()],
        }];
        let files = vec![lib_file("Sample.dll")];
        assert!(validate_package(&metadata, &files, &DefaultIdValidator).is_ok());
    }

    #[test]
    fn test_reference_matching_is_case_insensitive() {
        let mut metadata = metadata("1.0.0");
        metadata.reference_sets = vec![ReferenceSet {
            target_framework: None,
            references: vec!["SAMPLE.DLL".to_string()],
        }];
        let files = vec![lib_file("Sample.dll")];
        assert!(validate_package(&metadata, &files, &DefaultIdValidator).is_ok());
    }

    #[test]
    fn test_unmatched_reference_is_fatal() {
        let mut metadata = metadata("1.0.0");
        metadata.reference_sets = vec![ReferenceSet {
            target_framework: None,
            references: vec!["Bar.dll".to_string()],
        }];
        let files = vec![lib_file("Foo.dll"), ResolvedFile::Physical {
            source: PathBuf::from("/src/Foo.xml"),
            target: "lib/Foo.xml".to_string(),
        }];
        let err = validate_package(&metadata, &files, &DefaultIdValidator).unwrap_err();
        match err {
            CapsuleError::MissingReferenceAssembly { name } => assert_eq!(name, "Bar.dll"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_references_only_match_lib_files() {
        let mut metadata = metadata("1.0.0");
        metadata.reference_sets = vec![ReferenceSet {
            target_framework: None,
            references: vec!["Tool.dll".to_string()],
        }];
        let files = vec![ResolvedFile::Physical {
            source: PathBuf::from("/src/Tool.dll"),
            target: "tools/Tool.dll".to_string(),
        }];
        let err = validate_package(&metadata, &files, &DefaultIdValidator).unwrap_err();
        assert!(matches!(err, CapsuleError::MissingReferenceAssembly { .. }));
    }
}
