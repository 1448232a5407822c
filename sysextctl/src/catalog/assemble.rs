//! Grouping manifest records into a [`Catalog`].

use std::collections::BTreeMap;

use super::manifest::ManifestRecord;
use super::{Asset, Catalog, Release};
use crate::config::SysextConfig;

/// Build a catalog from validated records.
///
/// Records with the same `(extension, version, arch)` overwrite each other,
/// last one wins. Releases end up newest first (descending version string)
/// and assets ordered by architecture name, whatever order the records
/// arrived in.
pub fn assemble(records: &[ManifestRecord], config: &SysextConfig) -> Catalog {
    let mut grouped: BTreeMap<String, BTreeMap<String, Release>> = BTreeMap::new();

    for record in records {
        let release = grouped
            .entry(record.extension.clone())
            .or_default()
            .entry(record.version.clone())
            .or_insert_with(|| Release::new(&record.extension, &record.version));

        release.assets.insert(
            record.arch,
            Asset {
                name: record.filename.clone(),
                extension: record.extension.clone(),
                version: record.version.clone(),
                arch: record.arch,
                checksum: record.checksum.clone(),
                download_url: config.asset_url(&record.filename),
                published_at: None,
            },
        );
    }

    let extensions = grouped
        .into_iter()
        .map(|(extension, versions)| {
            // BTreeMap iterates ascending; reverse for newest first.
            let releases: Vec<Release> = versions.into_values().rev().collect();
            (extension, releases)
        })
        .collect();

    Catalog { extensions }
}
