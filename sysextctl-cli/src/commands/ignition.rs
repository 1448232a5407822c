//! `sysextctl ignition`: print a Butane snippet.

use clap::Args;
use sysextctl::{
    parse_selections, render_butane, resolve_selections, CatalogCache, RenderOptions, SysextError,
};

use super::common::{resolve_arch, ArchArg, Session};
use super::output::{ConsoleOutput, Output};
use crate::error::CliError;

/// Arguments for `ignition`.
#[derive(Debug, Args)]
pub struct IgnitionArgs {
    /// Extensions to provision, as `name` or `name@version`
    #[arg(required = true)]
    pub extensions: Vec<String>,

    /// Architecture to target (default: host architecture)
    #[arg(long, value_enum)]
    pub arch: Option<ArchArg>,

    /// Version when a single extension is named (default: latest)
    #[arg(long)]
    pub version: Option<String>,

    /// Leave out the sysupdate config entries
    #[arg(long)]
    pub no_config: bool,
}

/// Run `ignition`. Every selection must resolve; the first failure aborts.
pub fn run(session: &Session, args: IgnitionArgs) -> Result<(), CliError> {
    let selections = parse_selections(&args.extensions, args.version.as_deref())?;
    let arch = resolve_arch(args.arch);

    tracing::debug!(%arch, count = selections.len(), "rendering snippet");

    let mut cache = CatalogCache::new(&session.client, &session.config);
    let assets = resolve_selections(&mut cache, &selections, arch, &session.ctx)
        .into_iter()
        .map(|(_, result)| result)
        .collect::<Result<Vec<_>, SysextError>>()?;

    let options = RenderOptions {
        include_sysupdate_config: !args.no_config,
    };
    let snippet = render_butane(&assets, options, &session.config)?;
    ConsoleOutput::new().println(snippet.trim_end());
    Ok(())
}
