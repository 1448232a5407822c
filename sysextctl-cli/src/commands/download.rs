//! `sysextctl download`: fetch and place extension images.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use sysextctl::download::image_path;
use sysextctl::{
    parse_selections, resolve_selections, Asset, CatalogCache, DownloadOptions, DownloadOutcome,
    Downloader,
};

use super::common::{resolve_arch, ArchArg, Session};
use super::output::{ConsoleOutput, Output};
use crate::error::CliError;

/// Arguments for `download`.
#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Extensions to download, as `name` or `name@version`
    #[arg(required = true)]
    pub extensions: Vec<String>,

    /// Architecture to download (default: host architecture)
    #[arg(long, value_enum)]
    pub arch: Option<ArchArg>,

    /// Version to download when a single extension is named (default: latest)
    #[arg(long)]
    pub version: Option<String>,

    /// Download even if a verified image is already present
    #[arg(long)]
    pub force: bool,

    /// Skip the sysupdate config
    #[arg(long)]
    pub no_config: bool,

    /// Skip the /etc/extensions symlink
    #[arg(long)]
    pub no_symlink: bool,

    /// Print what would be downloaded without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,
}

/// Run `download`.
///
/// Extensions are handled one after another. A failure is reported and the
/// remaining extensions are still attempted; the command fails at the end
/// if any of them did.
pub fn run(session: &Session, args: DownloadArgs) -> Result<(), CliError> {
    let selections = parse_selections(&args.extensions, args.version.as_deref())?;
    let arch = resolve_arch(args.arch);
    let options = DownloadOptions::from_config(&session.config)
        .with_force(args.force)
        .with_config(!args.no_config)
        .with_symlink(!args.no_symlink);

    tracing::debug!(
        %arch,
        count = selections.len(),
        root = %options.root.display(),
        "download requested"
    );

    let mut cache = CatalogCache::new(&session.client, &session.config);
    let resolved = resolve_selections(&mut cache, &selections, arch, &session.ctx);

    let out = ConsoleOutput::new();
    let total = resolved.len();
    let mut failed = 0;

    for (selection, result) in resolved {
        let asset = match result {
            Ok(asset) => asset,
            Err(e) => {
                out.failure(&format!("{}: {}", selection, e));
                failed += 1;
                continue;
            }
        };

        if args.dry_run {
            print_plan(&out, &asset, &options);
            continue;
        }

        let progress = progress_bar(&asset);
        let bar = progress.clone();
        let downloader = Downloader::new(&session.client, &session.config).with_progress(
            Box::new(move |done, len| {
                if len > 0 && bar.length() != Some(len) {
                    bar.set_length(len);
                }
                bar.set_position(done);
            }),
        );

        match downloader.download(&asset, &options, &session.ctx) {
            Ok(outcome) => {
                progress.finish_and_clear();
                print_outcome(&out, &asset, &outcome);
            }
            Err(e) => {
                progress.abandon();
                out.failure(&format!("{}: {}", selection, e));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(CliError::Partial { failed, total });
    }
    Ok(())
}

fn progress_bar(asset: &Asset) -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        bar.set_style(style.progress_chars("#>-"));
    }
    bar.set_message(format!("Downloading {}", asset.name));
    bar
}

/// Describe what `download` would do for `asset`.
pub fn print_plan(out: &dyn Output, asset: &Asset, options: &DownloadOptions) {
    out.println(&format!(
        "[dry-run] would download {} ({}) to {}",
        asset.name,
        asset.download_url,
        image_path(&options.root, asset).display()
    ));
    if options.with_symlink {
        out.indented(&format!(
            "symlink /etc/extensions/{}.raw within root {}",
            asset.extension,
            options.root.display()
        ));
    }
    if options.with_config {
        out.indented(&format!(
            "sysupdate config /etc/sysupdate.{0}.d/{0}.conf within root {1}",
            asset.extension,
            options.root.display()
        ));
    }
}

/// Report what a download placed.
pub fn print_outcome(out: &dyn Output, asset: &Asset, outcome: &DownloadOutcome) {
    let verb = if outcome.fetched {
        "Downloaded"
    } else {
        "Already present"
    };
    out.success(&format!("{} {} -> {}", verb, asset.name, outcome.target.display()));
    if let Some(link) = &outcome.symlink {
        out.indented(&format!("Symlinked {}", link.display()));
    }
    if let Some(config) = &outcome.config {
        out.indented(&format!("Installed sysupdate config {}", config.display()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::output::BufferOutput;
    use std::path::PathBuf;
    use sysextctl::Architecture;

    fn docker() -> Asset {
        Asset {
            name: "docker-28.0.4-x86-64.raw".to_string(),
            extension: "docker".to_string(),
            version: "28.0.4".to_string(),
            arch: Architecture::X86_64,
            checksum: "a".repeat(64),
            download_url: "https://extensions.flatcar.org/extensions/docker-28.0.4-x86-64.raw"
                .to_string(),
            published_at: None,
        }
    }

    #[test]
    fn test_dry_run_plan() {
        let out = BufferOutput::new();
        let options = DownloadOptions::default().with_root("/mnt/root");
        print_plan(&out, &docker(), &options);

        let text = out.text();
        assert!(text.starts_with(
            "[dry-run] would download docker-28.0.4-x86-64.raw (https://extensions.flatcar.org/extensions/docker-28.0.4-x86-64.raw) to /mnt/root/opt/extensions/docker/docker-28.0.4-x86-64.raw"
        ));
        assert!(text.contains("/etc/extensions/docker.raw"));
        assert!(text.contains("/etc/sysupdate.docker.d/docker.conf"));
    }

    #[test]
    fn test_dry_run_plan_without_extras() {
        let out = BufferOutput::new();
        let options = DownloadOptions::default()
            .with_symlink(false)
            .with_config(false);
        print_plan(&out, &docker(), &options);
        assert_eq!(out.lines().len(), 1);
    }

    #[test]
    fn test_outcome_reports_skip() {
        let out = BufferOutput::new();
        let outcome = DownloadOutcome {
            target: PathBuf::from("/opt/extensions/docker/docker-28.0.4-x86-64.raw"),
            fetched: false,
            symlink: Some(PathBuf::from("/etc/extensions/docker.raw")),
            config: None,
        };
        print_outcome(&out, &docker(), &outcome);

        let lines = out.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Already present"));
        assert!(lines[1].contains("Symlinked /etc/extensions/docker.raw"));
    }
}
