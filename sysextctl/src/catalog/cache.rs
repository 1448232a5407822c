//! Per-invocation catalog cache.

use std::collections::HashMap;

use super::fetch::{release_tag_for, CatalogFetcher};
use super::{Catalog, CatalogOptions};
use crate::config::SysextConfig;
use crate::context::OpContext;
use crate::error::SysextResult;
use crate::http::HttpClient;

/// Catalogs already built in this invocation, keyed by `(extension, tag)`.
///
/// Lives only as long as the caller holds it; nothing is persisted.
pub struct CatalogCache<'a> {
    fetcher: CatalogFetcher<'a>,
    entries: HashMap<(String, String), Catalog>,
}

impl<'a> CatalogCache<'a> {
    pub fn new(client: &'a dyn HttpClient, config: &'a SysextConfig) -> Self {
        Self {
            fetcher: CatalogFetcher::new(client, config),
            entries: HashMap::new(),
        }
    }

    /// Catalog for one extension, fetching it on first use.
    ///
    /// Failed builds are not cached.
    pub fn get(
        &mut self,
        extension: &str,
        version: Option<&str>,
        ctx: &OpContext,
    ) -> SysextResult<&Catalog> {
        let tag = release_tag_for(extension, version);
        let key = (extension.to_string(), tag);

        if !self.entries.contains_key(&key) {
            let options = CatalogOptions {
                extension_filter: Some(key.0.clone()),
                release_tag: Some(key.1.clone()),
            };
            let catalog = self.fetcher.build(&options, ctx)?;
            self.entries.insert(key.clone(), catalog);
        } else {
            tracing::debug!(extension, tag = %key.1, "catalog cache hit");
        }

        Ok(&self.entries[&key])
    }

    /// Number of cached catalogs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::mock::MockHttpClient;

    #[test]
    fn test_second_lookup_hits_cache() {
        let config = SysextConfig::default();
        let url = config.release_manifest_url("demo");
        let mock = MockHttpClient::new().with_response(
            &url,
            200,
            format!("{}  demo-v1-x86-64.raw\n", "a".repeat(64)),
        );
        let ctx = OpContext::new();
        let mut cache = CatalogCache::new(&mock, &config);

        cache.get("demo", None, &ctx).unwrap();
        cache.get("demo", Some("latest"), &ctx).unwrap();
        assert_eq!(mock.request_count(&url), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_different_tags_are_separate_entries() {
        let config = SysextConfig::default();
        let body = format!("{}  demo-v1-x86-64.raw\n", "a".repeat(64));
        let mock = MockHttpClient::new()
            .with_response(&config.release_manifest_url("demo"), 200, body.clone())
            .with_response(&config.release_manifest_url("demo-v1"), 200, body);
        let ctx = OpContext::new();
        let mut cache = CatalogCache::new(&mock, &config);

        cache.get("demo", None, &ctx).unwrap();
        cache.get("demo", Some("v1"), &ctx).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let config = SysextConfig::default();
        let mock = MockHttpClient::new();
        let ctx = OpContext::new();
        let mut cache = CatalogCache::new(&mock, &config);

        assert!(cache.get("demo", None, &ctx).is_err());
        assert!(cache.is_empty());
    }
}
