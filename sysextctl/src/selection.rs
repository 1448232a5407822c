//! Extension selections from command-line style arguments.

use std::collections::HashSet;
use std::fmt;

use crate::catalog::{is_latest_query, resolve, Architecture, Asset, CatalogCache};
use crate::context::OpContext;
use crate::error::{SysextError, SysextResult};

/// One requested extension, optionally pinned to a version query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub name: String,

    /// Version query; `None` means latest.
    pub version: Option<String>,
}

impl Selection {
    pub fn latest(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    /// Version query handed to the resolver.
    pub fn version_query(&self) -> &str {
        self.version.as_deref().unwrap_or("latest")
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => f.write_str(&self.name),
        }
    }
}

/// Parse `name` / `name@version` arguments.
///
/// `global_version` applies to a single selection that has no version of its
/// own. It is rejected when more than one extension is named or when the
/// selection already pins a version. Empty and duplicate names are rejected.
pub fn parse_selections<S: AsRef<str>>(
    args: &[S],
    global_version: Option<&str>,
) -> SysextResult<Vec<Selection>> {
    if args.is_empty() {
        return Err(SysextError::InvalidSelection(
            "missing extension name".to_string(),
        ));
    }

    let global_version = global_version.map(str::trim).filter(|v| !v.is_empty());
    if global_version.is_some() && args.len() > 1 {
        return Err(SysextError::InvalidSelection(
            "--version can only be used with a single extension; use name@version instead"
                .to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut selections = Vec::with_capacity(args.len());

    for arg in args {
        let arg = arg.as_ref().trim();
        let (name, version) = match arg.split_once('@') {
            Some((name, version)) => (name.trim(), Some(version.trim())),
            None => (arg, None),
        };

        if name.is_empty() {
            return Err(SysextError::InvalidSelection(format!(
                "empty extension name in {:?}",
                arg
            )));
        }
        if !seen.insert(name.to_string()) {
            return Err(SysextError::InvalidSelection(format!(
                "extension {} requested more than once",
                name
            )));
        }

        let version = match (version, global_version) {
            (Some(_), Some(_)) => {
                return Err(SysextError::InvalidSelection(format!(
                    "{} pins a version and --version is also set",
                    arg
                )))
            }
            (Some(v), None) | (None, Some(v)) => Some(v),
            (None, None) => None,
        };

        selections.push(Selection {
            name: name.to_string(),
            version: version.filter(|v| !is_latest_query(v)).map(str::to_string),
        });
    }

    Ok(selections)
}

/// Resolve every selection for `arch`, one at a time.
///
/// Each selection gets its own result so one failure does not hide the
/// others. Manifests are fetched through `cache`, once per distinct
/// `(extension, tag)`. Cancellation stops resolving further selections.
pub fn resolve_selections(
    cache: &mut CatalogCache<'_>,
    selections: &[Selection],
    arch: Architecture,
    ctx: &OpContext,
) -> Vec<(Selection, SysextResult<Asset>)> {
    let mut results = Vec::with_capacity(selections.len());
    for selection in selections {
        if let Err(e) = ctx.check() {
            results.push((selection.clone(), Err(e)));
            continue;
        }
        let resolved = cache
            .get(&selection.name, selection.version.as_deref(), ctx)
            .and_then(|catalog| {
                resolve(catalog, &selection.name, arch, selection.version_query())
            });
        results.push((selection.clone(), resolved));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SysextConfig;
    use crate::http::mock::MockHttpClient;

    #[test]
    fn test_parse_name_and_version() {
        let selections = parse_selections(&["kubernetes@1.32", "ollama@latest"], None).unwrap();
        assert_eq!(
            selections,
            vec![
                Selection {
                    name: "kubernetes".to_string(),
                    version: Some("1.32".to_string()),
                },
                Selection::latest("ollama"),
            ]
        );
        assert_eq!(selections[0].to_string(), "kubernetes@1.32");
        assert_eq!(selections[1].version_query(), "latest");
    }

    #[test]
    fn test_global_version_single_extension() {
        let selections = parse_selections(&["demo"], Some("1.0.0")).unwrap();
        assert_eq!(selections[0].version.as_deref(), Some("1.0.0"));
    }

    #[test]
    fn test_global_version_with_many_extensions() {
        let err = parse_selections(&["one", "two"], Some("1.0.0")).unwrap_err();
        assert!(matches!(err, SysextError::InvalidSelection(_)));
    }

    #[test]
    fn test_global_version_and_pinned_version() {
        assert!(parse_selections(&["demo@2"], Some("1")).is_err());
    }

    #[test]
    fn test_duplicates_rejected() {
        assert!(parse_selections(&["demo", "demo@1.0.0"], None).is_err());
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(parse_selections::<&str>(&[], None).is_err());
        assert!(parse_selections(&["@1.0"], None).is_err());
    }

    #[test]
    fn test_empty_pinned_version_is_latest() {
        let selections = parse_selections(&["demo@"], None).unwrap();
        assert_eq!(selections[0], Selection::latest("demo"));
    }

    #[test]
    fn test_resolve_each_independently() {
        let config = SysextConfig::default();
        let mock = MockHttpClient::new().with_response(
            &config.release_manifest_url("demo"),
            200,
            format!(
                "{}  demo-v1.2.0-x86-64.raw\n{}  demo-v1.1.0-x86-64.raw\n",
                "a".repeat(64),
                "b".repeat(64)
            ),
        );
        let mut cache = CatalogCache::new(&mock, &config);
        let selections = vec![Selection::latest("demo"), Selection::latest("missing")];

        let results = resolve_selections(
            &mut cache,
            &selections,
            Architecture::X86_64,
            &OpContext::new(),
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].1.as_ref().unwrap().version, "v1.2.0");
        assert!(results[1].1.is_err());
    }

    #[test]
    fn test_resolve_after_cancel() {
        let config = SysextConfig::default();
        let mock = MockHttpClient::new();
        let mut cache = CatalogCache::new(&mock, &config);
        let ctx = OpContext::new();
        ctx.cancel();

        let results = resolve_selections(
            &mut cache,
            &[Selection::latest("demo")],
            Architecture::X86_64,
            &ctx,
        );
        assert!(matches!(results[0].1, Err(SysextError::Cancelled)));
        assert!(mock.requests().is_empty());
    }
}
