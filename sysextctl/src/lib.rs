//! sysextctl - discover, download and provision Flatcar system extensions
//!
//! This library resolves extension images published by the sysext bakery
//! and stages them on a host filesystem:
//!
//! 1. [`catalog`] fetches a `SHA256SUMS` manifest, parses it and assembles a
//!    [`Catalog`] of extensions, releases and per-architecture assets.
//! 2. [`catalog::resolve`] picks one [`Asset`] for an extension, architecture
//!    and version query (`latest`, exact, or prefix).
//! 3. [`download::Downloader`] fetches and verifies the image, then places it
//!    together with its activation symlink and sysupdate config.
//!
//! [`ignition::render_butane`] describes the same placement as a Butane
//! snippet for first-boot provisioning.
//!
//! All network access goes through the [`http::HttpClient`] trait, and every
//! operation takes an explicit [`SysextConfig`] and [`OpContext`].

pub mod catalog;
pub mod config;
pub mod context;
pub mod download;
pub mod error;
pub mod http;
pub mod ignition;
pub mod logging;
pub mod selection;

pub use catalog::{Architecture, Asset, Catalog, CatalogCache, CatalogOptions, Release};
pub use config::{ConfigFile, SysextConfig};
pub use context::OpContext;
pub use download::{DownloadOptions, DownloadOutcome, Downloader};
pub use error::{SysextError, SysextResult};
pub use http::{HttpClient, LoggingHttpClient, ReqwestClient};
pub use ignition::{render_butane, RenderOptions};
pub use selection::{parse_selections, resolve_selections, Selection};

/// Version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
