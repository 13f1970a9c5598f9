use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use kritikos_core::config::Config;
use kritikos_core::config::ConfigOverrides;
use kritikos_core::config::find_kritikos_home;
use kritikos_core::config::load_config;
use kritikos_gateway::GeminiGateway;
use kritikos_gateway::ModelGateway;
use supports_color::Stream;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;
mod shell;

pub use commands::AuditArgs;
pub use commands::RefineArgs;
pub use shell::Shell;

/// Security audits and tone-controlled rewriting backed by a hosted model.
#[derive(Debug, Parser)]
#[command(name = "kritikos", version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub options: SharedOptions,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Audit a source file, PDF, screenshot or pasted text.
    Audit(AuditArgs),

    /// Rewrite a draft in the requested tone.
    Refine(RefineArgs),

    /// Interactive session holding the last audit and rewrite.
    Shell,
}

#[derive(Debug, Args)]
pub struct SharedOptions {
    /// Model used for audits (and rewrites unless --rewrite-model is set).
    #[arg(long, short = 'm', value_name = "MODEL", global = true)]
    pub model: Option<String>,

    /// Model used for rewrites.
    #[arg(long = "rewrite-model", value_name = "MODEL", global = true)]
    pub rewrite_model: Option<String>,

    /// Fail a model call that takes longer than this many seconds.
    #[arg(long = "timeout-secs", value_name = "SECS", global = true)]
    pub timeout_secs: Option<u64>,

    /// API key to use when the provider's environment variable is unset.
    #[arg(long = "api-key", value_name = "KEY", global = true)]
    pub api_key: Option<String>,

    /// Log progress to stderr. Ignored when RUST_LOG is set.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl SharedOptions {
    fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model: self.model.clone(),
            rewrite_model: self.rewrite_model.clone(),
            request_timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    let Cli { options, command } = cli;
    init_tracing(options.verbose);

    // Variables already present in the environment win over `.env`.
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        tracing::warn!("ignoring unreadable .env file: {err}");
    }

    let kritikos_home = find_kritikos_home().context("failed to resolve KRITIKOS_HOME")?;
    let config = load_config(&kritikos_home, options.config_overrides())?;
    tracing::debug!(
        home = %kritikos_home.display(),
        audit_model = %config.models.audit,
        rewrite_model = %config.models.rewrite,
        "loaded configuration"
    );

    match command {
        Command::Audit(args) => {
            let gateway = connect(&config, options.api_key.as_deref())?;
            commands::run_audit_command(args, &gateway).await
        }
        Command::Refine(args) => {
            let gateway = connect(&config, options.api_key.as_deref())?;
            commands::run_refine_command(args, &gateway).await
        }
        Command::Shell => {
            let mut shell = Shell::new(config, options.api_key);
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            shell.run(stdin.lock(), &mut stdout).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "error" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_ansi(supports_color::on_cached(Stream::Stderr).is_some())
        .with_writer(std::io::stderr)
        .with_filter(env_filter);
    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

/// Resolve the credential and build the live gateway. A missing key is
/// reported before any request is attempted.
pub(crate) fn connect(
    config: &Config,
    manual_key: Option<&str>,
) -> anyhow::Result<Arc<dyn ModelGateway>> {
    let api_key = config
        .provider
        .resolve_api_key(manual_key)
        .map_err(|err| anyhow::anyhow!(credential_message(&err)))?;
    let gateway = GeminiGateway::new(config.provider.clone(), api_key, config.models.clone())?;
    Ok(Arc::new(gateway))
}

pub(crate) fn credential_message(err: &kritikos_provider_config::Error) -> String {
    match err {
        kritikos_provider_config::Error::MissingCredential {
            instructions: Some(instructions),
            ..
        } => format!("{err}\n{instructions}"),
        kritikos_provider_config::Error::MissingCredential { .. } => err.to_string(),
    }
}

pub(crate) fn export_dir(dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| PathBuf::from("."))
}
