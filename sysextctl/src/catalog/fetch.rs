//! Manifest retrieval with release → extension → global fallback.

use super::assemble::assemble;
use super::manifest::parse_manifest;
use super::resolve::is_latest_query;
use super::{Catalog, CatalogOptions};
use crate::config::SysextConfig;
use crate::context::OpContext;
use crate::error::{SysextError, SysextResult};
use crate::http::{HttpClient, HttpRequest, ERROR_BODY_LIMIT};

/// Release tag to try first for an extension.
///
/// `<extension>-<version>` when a concrete version is requested, otherwise
/// the extension name (the bakery publishes a rolling release per extension).
pub fn release_tag_for(extension: &str, version: Option<&str>) -> String {
    match version {
        Some(v) if !is_latest_query(v) => format!("{}-{}", extension, v),
        _ => extension.to_string(),
    }
}

/// Manifest URLs to try, in order. The global manifest is always last.
pub fn manifest_candidates(config: &SysextConfig, options: &CatalogOptions) -> Vec<String> {
    let tag = options.release_tag.as_deref().filter(|t| !t.is_empty());
    let filter = options.extension_filter.as_deref().filter(|e| !e.is_empty());

    let mut urls = Vec::with_capacity(3);
    if let Some(tag) = tag {
        urls.push(config.release_manifest_url(tag));
    }
    if let Some(extension) = filter {
        if Some(extension) != tag {
            urls.push(config.release_manifest_url(extension));
        }
    }
    urls.push(config.global_manifest_url());
    urls
}

/// Fetches and parses manifests into a [`Catalog`].
pub struct CatalogFetcher<'a> {
    client: &'a dyn HttpClient,
    config: &'a SysextConfig,
}

impl<'a> CatalogFetcher<'a> {
    pub fn new(client: &'a dyn HttpClient, config: &'a SysextConfig) -> Self {
        Self { client, config }
    }

    /// Fetch the first manifest candidate that answers 200.
    ///
    /// Later candidates are not attempted once one succeeds. If every
    /// candidate fails, the last failure is returned as-is.
    pub fn fetch_manifest(&self, options: &CatalogOptions, ctx: &OpContext) -> SysextResult<Vec<u8>> {
        let candidates = manifest_candidates(self.config, options);
        let last = candidates.len() - 1;

        for (index, url) in candidates.iter().enumerate() {
            ctx.check()?;
            match self.fetch_one(url, ctx) {
                Ok(body) => {
                    tracing::debug!(url = %url, bytes = body.len(), "fetched manifest");
                    return Ok(body);
                }
                Err(e @ (SysextError::Cancelled | SysextError::DeadlineExceeded)) => {
                    return Err(e)
                }
                Err(e) if index == last => return Err(e),
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "manifest candidate failed, trying next");
                }
            }
        }

        unreachable!("the global manifest is always a candidate")
    }

    fn fetch_one(&self, url: &str, ctx: &OpContext) -> SysextResult<Vec<u8>> {
        let request = HttpRequest::get(url, self.config);
        let response = self.client.send(&request).map_err(|e| SysextError::FetchFailed {
            url: url.to_string(),
            status: None,
            body: e.to_string(),
        })?;

        if !response.is_ok() {
            let status = response.status;
            return Err(SysextError::FetchFailed {
                url: url.to_string(),
                status: Some(status),
                body: response.excerpt(ERROR_BODY_LIMIT),
            });
        }

        response.read_all(url, ctx)
    }

    /// Fetch, parse and assemble a catalog, narrowed to the extension filter.
    pub fn build(&self, options: &CatalogOptions, ctx: &OpContext) -> SysextResult<Catalog> {
        let data = self.fetch_manifest(options, ctx)?;
        let mut records = parse_manifest(&data)?;

        let filter = options.extension_filter.as_deref().unwrap_or_default();
        if !filter.is_empty() {
            records.retain(|r| r.extension == filter);
        }

        let mut catalog = assemble(&records, self.config);
        catalog.filter_extension(filter);
        Ok(catalog)
    }
}

/// Build a catalog in one call.
///
/// # Arguments
///
/// * `client` - HTTP capability used for every manifest request
/// * `config` - Base URLs and user agent
/// * `options` - Extension filter and release tag to try first
/// * `ctx` - Cancellation and deadline, checked before each request and
///   between body chunks
///
/// # Errors
///
/// * `FetchFailed` - every manifest candidate failed; carries the last one
/// * Parser errors from [`parse_manifest`] for the manifest that answered
/// * `Cancelled` / `DeadlineExceeded` - the context stopped the build
pub fn build_catalog(
    client: &dyn HttpClient,
    config: &SysextConfig,
    options: &CatalogOptions,
    ctx: &OpContext,
) -> SysextResult<Catalog> {
    CatalogFetcher::new(client, config).build(options, ctx)
}
