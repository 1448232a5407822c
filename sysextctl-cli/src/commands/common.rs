//! Common types and utilities shared across CLI commands.

use std::time::Duration;

use clap::ValueEnum;
use sysextctl::http::{LoggingHttpClient, ReqwestClient};
use sysextctl::{Architecture, ConfigFile, OpContext, SysextConfig};

use crate::error::CliError;
use crate::GlobalArgs;

/// Architecture selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ArchArg {
    /// 64-bit x86
    #[value(name = "x86-64")]
    X86_64,
    /// 64-bit ARM
    Arm64,
}

impl From<ArchArg> for Architecture {
    fn from(arch: ArchArg) -> Self {
        match arch {
            ArchArg::X86_64 => Architecture::X86_64,
            ArchArg::Arm64 => Architecture::Arm64,
        }
    }
}

/// Architecture from the flag, or the host's.
pub fn resolve_arch(cli_arch: Option<ArchArg>) -> Architecture {
    cli_arch.map(Architecture::from).unwrap_or_else(Architecture::host)
}

/// Build the effective configuration.
///
/// Precedence: CLI flags, then the config file, then built-in defaults.
pub fn build_config(global: &GlobalArgs) -> Result<SysextConfig, CliError> {
    let file = match &global.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };
    let mut config = file.apply(SysextConfig::default())?;

    if let Some(ref root) = global.root {
        config = config.with_root(root.clone());
    }
    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Config("--timeout must be at least 1".to_string()));
        }
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

/// Everything a command needs: configuration, HTTP client and context.
pub struct Session {
    pub config: SysextConfig,
    pub client: LoggingHttpClient<ReqwestClient>,
    pub ctx: OpContext,
}

impl Session {
    pub fn new(global: &GlobalArgs) -> Result<Self, CliError> {
        let config = build_config(global)?;
        let client = LoggingHttpClient::new(ReqwestClient::new(&config)?);
        let ctx = OpContext::new();
        install_interrupt_handler(&ctx)?;

        Ok(Self {
            config,
            client,
            ctx,
        })
    }
}

/// Cancel `ctx` on Ctrl-C. In-flight writes are abandoned before their
/// final rename, so nothing half-written becomes visible.
fn install_interrupt_handler(ctx: &OpContext) -> Result<(), CliError> {
    let token = ctx.token().clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Interrupted, cancelling...");
        token.cancel();
    })
    .map_err(|e| CliError::SignalHandler(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn global(config: PathBuf) -> GlobalArgs {
        GlobalArgs {
            root: None,
            debug: false,
            config: Some(config),
            timeout: None,
        }
    }

    #[test]
    fn test_arch_arg_conversion() {
        assert_eq!(Architecture::from(ArchArg::X86_64), Architecture::X86_64);
        assert_eq!(resolve_arch(Some(ArchArg::Arm64)), Architecture::Arm64);
        assert_eq!(resolve_arch(None), Architecture::host());
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "[download]\nroot = /from-file\n[http]\ntimeout_secs = 5\n").unwrap();

        let config = build_config(&global(path.clone())).unwrap();
        assert_eq!(config.root, PathBuf::from("/from-file"));
        assert_eq!(config.timeout, Duration::from_secs(5));

        let mut args = global(path);
        args.root = Some(PathBuf::from("/from-flag"));
        args.timeout = Some(60);
        let config = build_config(&args).unwrap();
        assert_eq!(config.root, PathBuf::from("/from-flag"));
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(&path, "").unwrap();
        let mut args = global(path);
        args.timeout = Some(0);
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(build_config(&global(temp.path().join("absent.ini"))).is_err());
    }
}
