//! Selecting one asset from a catalog.

use super::{Architecture, Asset, Catalog};
use crate::error::{SysextError, SysextResult};

/// Whether a version query means "newest".
pub fn is_latest_query(query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || query.eq_ignore_ascii_case("latest")
}

/// Resolve `(extension, arch, version query)` to one asset.
///
/// * Empty or `latest` (any case): the newest release that publishes `arch`.
///   Releases without `arch` are skipped.
/// * Anything else: the release whose version equals the query, if one
///   exists, otherwise the newest release whose version starts with the
///   query, ignoring case and a leading `v` on either side. If the chosen
///   release lacks `arch`, resolution fails rather than looking further.
///
/// # Arguments
///
/// * `catalog` - Catalog to search
/// * `extension` - Extension name
/// * `arch` - Architecture the asset must be built for
/// * `version_query` - `latest`, an exact version, or a version prefix
///
/// # Errors
///
/// * `UnknownExtension` - the catalog has no such extension
/// * `VersionNotFound` - no release matches the query
/// * `ArchitectureNotFound` - the matched release does not publish `arch`
pub fn resolve(
    catalog: &Catalog,
    extension: &str,
    arch: Architecture,
    version_query: &str,
) -> SysextResult<Asset> {
    let releases = catalog.releases_for(extension)?;

    let missing_arch = |version: &str| SysextError::ArchitectureNotFound {
        extension: extension.to_string(),
        version: version.to_string(),
        arch: arch.to_string(),
    };

    if is_latest_query(version_query) {
        return catalog
            .latest(extension, arch)
            .cloned()
            .ok_or_else(|| missing_arch("latest"));
    }

    let query = version_query.trim();
    let wanted = normalize_version(query);
    let release = releases
        .iter()
        .find(|release| release.version == query)
        .or_else(|| {
            releases
                .iter()
                .find(|release| normalize_version(&release.version).starts_with(&wanted))
        })
        .ok_or_else(|| SysextError::VersionNotFound {
            extension: extension.to_string(),
            version: query.to_string(),
            arch: arch.to_string(),
        })?;

    release
        .asset(arch)
        .cloned()
        .ok_or_else(|| missing_arch(&release.version))
}

fn normalize_version(version: &str) -> String {
    let lower = version.to_lowercase();
    match lower.strip_prefix('v') {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::catalog;

    fn kubernetes() -> Catalog {
        catalog(&[
            ("kubernetes", "v1.32.2", &[Architecture::X86_64]),
            ("kubernetes", "v1.31.5", &[Architecture::Arm64, Architecture::X86_64]),
        ])
    }

    #[test]
    fn test_latest() {
        let cat = kubernetes();
        for query in ["", "latest", "LATEST", "Latest"] {
            let asset = resolve(&cat, "kubernetes", Architecture::X86_64, query).unwrap();
            assert_eq!(asset.version, "v1.32.2");
        }
    }

    #[test]
    fn test_latest_skips_release_without_arch() {
        let asset = resolve(&kubernetes(), "kubernetes", Architecture::Arm64, "latest").unwrap();
        assert_eq!(asset.version, "v1.31.5");
    }

    #[test]
    fn test_latest_no_release_with_arch() {
        let cat = catalog(&[("demo", "v1", &[Architecture::X86_64])]);
        let err = resolve(&cat, "demo", Architecture::Arm64, "latest").unwrap_err();
        assert!(matches!(err, SysextError::ArchitectureNotFound { .. }));
    }

    #[test]
    fn test_exact_match() {
        let asset = resolve(&kubernetes(), "kubernetes", Architecture::X86_64, "v1.31.5").unwrap();
        assert_eq!(asset.version, "v1.31.5");
    }

    #[test]
    fn test_prefix_match() {
        let cat = kubernetes();
        let asset = resolve(&cat, "kubernetes", Architecture::X86_64, "1.32").unwrap();
        assert_eq!(asset.version, "v1.32.2");

        let asset = resolve(&cat, "kubernetes", Architecture::X86_64, "V1.31").unwrap();
        assert_eq!(asset.version, "v1.31.5");

        let asset = resolve(&cat, "kubernetes", Architecture::X86_64, "1").unwrap();
        assert_eq!(asset.version, "v1.32.2");
    }

    #[test]
    fn test_prefix_match_without_v_in_catalog() {
        let cat = catalog(&[("docker", "28.0.4", &[Architecture::X86_64])]);
        let asset = resolve(&cat, "docker", Architecture::X86_64, "v28").unwrap();
        assert_eq!(asset.version, "28.0.4");
    }

    #[test]
    fn test_prefix_match_missing_arch() {
        let err = resolve(&kubernetes(), "kubernetes", Architecture::Arm64, "1.32").unwrap_err();
        match err {
            SysextError::ArchitectureNotFound { version, arch, .. } => {
                assert_eq!(version, "v1.32.2");
                assert_eq!(arch, "arm64");
            }
            other => panic!("Expected ArchitectureNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_version_missing_arch_does_not_fall_back_to_prefix() {
        let cat = catalog(&[
            ("demo", "1.30", &[Architecture::Arm64, Architecture::X86_64]),
            ("demo", "1.3", &[Architecture::X86_64]),
        ]);
        let err = resolve(&cat, "demo", Architecture::Arm64, "1.3").unwrap_err();
        match err {
            SysextError::ArchitectureNotFound { version, arch, .. } => {
                assert_eq!(version, "1.3");
                assert_eq!(arch, "arm64");
            }
            other => panic!("Expected ArchitectureNotFound, got {:?}", other),
        }

        let asset = resolve(&cat, "demo", Architecture::X86_64, "1.3").unwrap();
        assert_eq!(asset.version, "1.3");
    }

    #[test]
    fn test_version_not_found() {
        let err = resolve(&kubernetes(), "kubernetes", Architecture::X86_64, "9.99").unwrap_err();
        assert!(matches!(err, SysextError::VersionNotFound { .. }));
    }

    #[test]
    fn test_unknown_extension() {
        let err = resolve(&kubernetes(), "nomad", Architecture::X86_64, "latest").unwrap_err();
        assert!(matches!(err, SysextError::UnknownExtension { .. }));
    }
}
