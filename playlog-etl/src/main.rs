//! playlog - append recently played tracks to a local SQLite store
//!
//! `run` executes the ETL pipeline once, `authorize` performs the one-time
//! OAuth grant, `recent` prints what is already stored.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use playlog_common::config::{load_or_default, resolve_config_path, ConfigSource, TomlConfig};
use playlog_etl::config::{CliOverrides, Settings};
use playlog_etl::db::{fetch_recent, InsertPolicy, LoadError};
use playlog_etl::error::exit_code;
use playlog_etl::services::{Authenticator, FileSource, PlaySource, SpotifyClient};
use playlog_etl::{run_pipeline, EtlContext, EtlError, RunOutcome};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "playlog", version, about = "Recently played tracks ETL")]
struct Cli {
    /// Config file (default: $PLAYLOG_CONFIG, then the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch recently played tracks and append them to the store
    Run(RunArgs),
    /// Grant access to the account's play history (one-time, interactive)
    Authorize(CredentialArgs),
    /// Print the most recently stored plays
    Recent(RecentArgs),
}

#[derive(Debug, Args)]
struct CredentialArgs {
    #[arg(long)]
    client_id: Option<String>,
    #[arg(long)]
    client_secret: Option<String>,
    #[arg(long)]
    redirect_uri: Option<String>,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Number of plays to request
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u32).range(1..=50))]
    limit: u32,

    /// What to do when a play is already stored
    #[arg(long, value_enum, default_value_t = PolicyArg::Row)]
    policy: PolicyArg,

    #[arg(long)]
    database: Option<PathBuf>,

    /// Replay a saved recently-played JSON page instead of calling the API
    #[arg(long)]
    from_file: Option<PathBuf>,

    #[command(flatten)]
    credentials: CredentialArgs,
}

#[derive(Debug, Args)]
struct RecentArgs {
    #[arg(long, default_value_t = 20, value_parser = clap::value_parser!(u32).range(1..))]
    limit: u32,

    #[arg(long)]
    database: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Skip plays already stored, insert the rest
    Row,
    /// Reject the whole batch if any play is already stored
    Batch,
}

impl From<PolicyArg> for InsertPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Row => InsertPolicy::Row,
            PolicyArg::Batch => InsertPolicy::Batch,
        }
    }
}

impl CredentialArgs {
    fn overrides(&self, database: Option<PathBuf>) -> CliOverrides {
        CliOverrides {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            redirect_uri: self.redirect_uri.clone(),
            database,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Loaded before tracing so the file can set the log level
    let loaded = load_or_default(resolve_config_path(cli.config.as_deref()));

    let level = loaded
        .as_ref()
        .ok()
        .and_then(|l| l.config.logging.level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    info!(
        "Starting playlog v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let loaded = match loaded {
        Ok(loaded) => loaded,
        Err(e) => return ExitCode::from(report(e.into())),
    };

    match &loaded.source {
        ConfigSource::File(path) => info!("Config file: {}", path.display()),
        ConfigSource::Missing(path) => {
            warn!("Config file {} not found, using defaults", path.display())
        }
        ConfigSource::NoPath => warn!("No config directory for this platform, using defaults"),
    }

    let code = match cli.command {
        Command::Run(args) => run(args, &loaded.config).await,
        Command::Authorize(args) => match authorize(args, &loaded.config).await {
            Ok(()) => exit_code::SUCCESS,
            Err(e) => {
                error!("Authorization failed: {:#}", e);
                exit_code::GENERAL
            }
        },
        Command::Recent(args) => match recent(args, &loaded.config).await {
            Ok(()) => exit_code::SUCCESS,
            Err(e) => report(e),
        },
    };

    ExitCode::from(code)
}

async fn run(args: RunArgs, toml: &TomlConfig) -> u8 {
    let settings = Settings::resolve(&args.credentials.overrides(args.database.clone()), toml);
    info!("Database path: {}", settings.database.display());

    let source = match build_source(&args, &settings).await {
        Ok(source) => source,
        Err(e) => return report(e),
    };

    let ctx = EtlContext {
        source,
        database: settings.database,
        limit: args.limit,
        policy: args.policy.into(),
    };

    match run_pipeline(&ctx).await {
        Ok(RunOutcome::NothingDownloaded) => exit_code::NO_DATA,
        Ok(RunOutcome::Loaded(summary)) => {
            info!(
                "Run complete: {} new plays stored, {} already present",
                summary.inserted, summary.skipped
            );
            exit_code::SUCCESS
        }
        Err(EtlError::Load(LoadError::ConstraintViolation { played_at, .. })) => {
            warn!(played_at = %played_at, "These tracks already exist in the database. Nothing new to update");
            exit_code::SUCCESS
        }
        Err(e) => report(e),
    }
}

async fn build_source(args: &RunArgs, settings: &Settings) -> Result<Box<dyn PlaySource>, EtlError> {
    if let Some(path) = &args.from_file {
        info!("Replaying saved page from {}", path.display());
        return Ok(Box::new(FileSource::new(path)));
    }

    let authenticator = Authenticator::new(
        &settings.accounts_base_url,
        settings.oauth_credentials()?,
        &settings.token_cache,
        settings.request_timeout,
    )?;
    let access_token = authenticator.access_token().await?;

    let client = SpotifyClient::new(&settings.api_base_url, access_token, settings.request_timeout)?;
    Ok(Box::new(client))
}

async fn authorize(args: CredentialArgs, toml: &TomlConfig) -> anyhow::Result<()> {
    let settings = Settings::resolve(&args.overrides(None), toml);
    let authenticator = Authenticator::new(
        &settings.accounts_base_url,
        settings.oauth_credentials()?,
        &settings.token_cache,
        settings.request_timeout,
    )?;

    let url = authenticator.authorize_url()?;
    println!("Open this URL in a browser and grant access:\n\n    {}\n", url);
    println!("Then paste the URL you were redirected to:");

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read redirect URL from stdin")?;

    let code = Authenticator::extract_code(&line)?;
    let token = authenticator.exchange_code(&code).await?;

    println!(
        "Authorized; token cached at {} (expires {})",
        authenticator.cache_path().display(),
        token.expires_at
    );
    Ok(())
}

async fn recent(args: RecentArgs, toml: &TomlConfig) -> Result<(), EtlError> {
    let overrides = CliOverrides {
        database: args.database,
        ..Default::default()
    };
    let settings = Settings::resolve(&overrides, toml);

    let plays = fetch_recent(&settings.database, args.limit).await?;
    if plays.is_empty() {
        println!("No plays stored in {}", settings.database.display());
        return Ok(());
    }

    for play in plays {
        println!(
            "{}  {} - {} [{}]",
            play.played_at,
            play.track_artists.as_deref().unwrap_or("?"),
            play.track_name.as_deref().unwrap_or("?"),
            play.track_album_name.as_deref().unwrap_or("?"),
        );
    }
    Ok(())
}

fn report(err: EtlError) -> u8 {
    error!("{}", err);
    err.exit_code()
}
