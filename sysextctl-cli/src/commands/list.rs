//! `sysextctl list`: enumerate published extensions.

use clap::Args;
use serde::Serialize;
use sysextctl::catalog::build_catalog;
use sysextctl::{Architecture, Catalog, CatalogOptions};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::common::{ArchArg, Session};
use super::output::{ConsoleOutput, Output};
use crate::error::CliError;

/// Arguments for `list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only show this extension
    #[arg(long)]
    pub extension: Option<String>,

    /// Only show this architecture
    #[arg(long, value_enum)]
    pub arch: Option<ArchArg>,

    /// Show every published version instead of only the newest
    #[arg(long)]
    pub all: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// One listed asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub extension: String,
    pub version: String,
    pub arch: String,
    pub checksum: String,
    pub download_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
}

#[derive(Tabled)]
struct Row<'a> {
    #[tabled(rename = "EXTENSION")]
    extension: &'a str,
    #[tabled(rename = "VERSION")]
    version: &'a str,
    #[tabled(rename = "ARCH")]
    arch: &'a str,
    #[tabled(rename = "URL")]
    url: &'a str,
}

#[derive(Tabled)]
struct PublishedRow<'a> {
    #[tabled(rename = "EXTENSION")]
    extension: &'a str,
    #[tabled(rename = "VERSION")]
    version: &'a str,
    #[tabled(rename = "ARCH")]
    arch: &'a str,
    #[tabled(rename = "PUBLISHED")]
    published: &'a str,
    #[tabled(rename = "URL")]
    url: &'a str,
}

/// Run `list`.
pub fn run(session: &Session, args: ListArgs) -> Result<(), CliError> {
    let extension = args.extension.as_deref().filter(|e| !e.is_empty());
    let options = CatalogOptions {
        extension_filter: extension.map(str::to_string),
        release_tag: extension.map(str::to_string),
    };
    let catalog = build_catalog(&session.client, &session.config, &options, &session.ctx)?;

    let items = collect_items(&catalog, args.arch.map(Architecture::from), args.all);
    let out = ConsoleOutput::new();
    if args.json {
        out.println(&serde_json::to_string_pretty(&items)?);
    } else {
        out.println(&render_table(&items, catalog.has_publish_info()));
    }
    Ok(())
}

/// Flatten the catalog into rows: extensions ascending, newest release
/// first, architectures ascending.
pub fn collect_items(catalog: &Catalog, arch: Option<Architecture>, all: bool) -> Vec<ListItem> {
    let mut items = Vec::new();
    for (name, releases) in &catalog.extensions {
        let shown = if all {
            &releases[..]
        } else {
            &releases[..releases.len().min(1)]
        };
        for release in shown {
            for (release_arch, asset) in &release.assets {
                if arch.is_some_and(|wanted| wanted != *release_arch) {
                    continue;
                }
                items.push(ListItem {
                    extension: name.clone(),
                    version: release.version.clone(),
                    arch: release_arch.to_string(),
                    checksum: asset.checksum.clone(),
                    download_url: asset.download_url.clone(),
                    published_at: asset.published_at.map(|t| t.to_rfc3339()),
                });
            }
        }
    }
    items
}

/// Render items as a borderless table. The PUBLISHED column is only shown
/// when the catalog carries publication times.
pub fn render_table(items: &[ListItem], with_published: bool) -> String {
    let mut table = if with_published {
        Table::new(items.iter().map(|it| PublishedRow {
            extension: &it.extension,
            version: &it.version,
            arch: &it.arch,
            published: it.published_at.as_deref().unwrap_or("-"),
            url: &it.download_url,
        }))
    } else {
        Table::new(items.iter().map(|it| Row {
            extension: &it.extension,
            version: &it.version,
            arch: &it.arch,
            url: &it.download_url,
        }))
    };
    table.with(Style::blank()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysextctl::{Asset, Release};

    fn asset(extension: &str, version: &str, arch: Architecture) -> Asset {
        let name = format!("{}-{}-{}.raw", extension, version, arch);
        Asset {
            download_url: format!("https://extensions.flatcar.org/extensions/{}", name),
            name,
            extension: extension.to_string(),
            version: version.to_string(),
            arch,
            checksum: "a".repeat(64),
            published_at: None,
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::default();
        for (ext, versions) in [("docker", vec!["28.0.4", "27.1.0"]), ("cilium", vec!["v0.18.9"])] {
            let releases = versions
                .into_iter()
                .map(|version| {
                    let mut release = Release::new(ext, version);
                    for arch in Architecture::ALL {
                        release.assets.insert(arch, asset(ext, version, arch));
                    }
                    release
                })
                .collect();
            catalog.extensions.insert(ext.to_string(), releases);
        }
        catalog
    }

    #[test]
    fn test_latest_only_by_default() {
        let items = collect_items(&catalog(), None, false);
        let summary: Vec<_> = items
            .iter()
            .map(|i| (i.extension.as_str(), i.version.as_str(), i.arch.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("cilium", "v0.18.9", "arm64"),
                ("cilium", "v0.18.9", "x86-64"),
                ("docker", "28.0.4", "arm64"),
                ("docker", "28.0.4", "x86-64"),
            ]
        );
    }

    #[test]
    fn test_all_versions_with_arch_filter() {
        let items = collect_items(&catalog(), Some(Architecture::X86_64), true);
        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.arch == "x86-64"));
        assert_eq!(items[1].version, "28.0.4");
        assert_eq!(items[2].version, "27.1.0");
    }

    #[test]
    fn test_table_columns() {
        let items = collect_items(&catalog(), None, false);
        let plain = render_table(&items, false);
        assert!(plain.contains("EXTENSION"));
        assert!(!plain.contains("PUBLISHED"));
        assert!(render_table(&items, true).contains("PUBLISHED"));
    }

    #[test]
    fn test_json_fields() {
        let items = collect_items(&catalog(), Some(Architecture::Arm64), false);
        let json = serde_json::to_value(&items).unwrap();
        let first = &json[0];
        assert_eq!(first["extension"], "cilium");
        assert_eq!(first["arch"], "arm64");
        assert!(first.get("download_url").is_some());
        assert!(first.get("published_at").is_none());
    }
}
