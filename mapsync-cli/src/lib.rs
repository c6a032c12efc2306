//! Command-line interface running the contribution sync service.
#![forbid(unsafe_code)]

use std::time::Duration;

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, Subcommand};
use log::{error, info};
use mapsync_core::{
    ElementPass, NoteAckPolicy, NotePass, Scheduler, SchedulerConfig, SinglePass,
};
use mapsync_data::{
    Credentials, HttpMappingService, HttpMappingServiceConfig, SqliteContributionStore,
    load_locale_catalog,
};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

mod error;

pub use error::CliError;

const ARG_API_URL: &str = "api-url";
const ARG_API_PASSWORD: &str = "api-password";
const ENV_API_URL: &str = "MAPSYNC_CMDS_RUN_API_URL";
const ENV_API_PASSWORD: &str = "MAPSYNC_CMDS_RUN_API_PASSWORD";

const DEFAULT_LANGUAGE: &str = "fr";
const DEFAULT_CHANGESET_LANGUAGE: &str = "en";
const DEFAULT_INTERVAL_SECS: u64 = 300;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_DATABASE: &str = "contributions.db";
const DEFAULT_LOCALES_DIR: &str = "locales";

/// Run the mapsync CLI with the current process arguments and environment.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Run(args) => {
            let config = args.into_config()?;
            serve(&config)
        }
    }
}

fn serve(config: &RunConfig) -> Result<(), CliError> {
    let scheduler = build_scheduler(config)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(async {
        if config.once {
            let pass = scheduler.run_once().await;
            log_single_pass(&pass.elements, &pass.notes);
            settle(pass)
        } else {
            scheduler.run_until(shutdown_signal()).await;
            Ok(())
        }
    })
}

fn settle(pass: SinglePass) -> Result<(), CliError> {
    if pass.is_settled() {
        Ok(())
    } else {
        Err(CliError::Unacknowledged {
            ids: pass.unacknowledged,
        })
    }
}

fn build_scheduler(
    config: &RunConfig,
) -> Result<
    Scheduler<SqliteContributionStore, HttpMappingService, mapsync_core::LocaleCatalog>,
    CliError,
> {
    let store =
        SqliteContributionStore::open(&config.database).map_err(|source| CliError::OpenStore {
            path: config.database.clone(),
            source,
        })?;
    let locales = load_locale_catalog(&config.locales_dir, &config.language).map_err(|source| {
        CliError::LoadLocales {
            path: config.locales_dir.clone(),
            source,
        }
    })?;
    let service = HttpMappingService::new(
        HttpMappingServiceConfig::new(&config.api_url, config.credentials.clone())
            .with_timeout(config.timeout),
    )
    .map_err(|source| CliError::BuildClient {
        base_url: config.api_url.clone(),
        source,
    })?;
    info!(
        "Loaded locales {:?}; syncing against {} every {}s",
        locales.languages(),
        config.api_url,
        config.interval.as_secs()
    );
    Ok(Scheduler::new(store, service, locales, config.scheduler()))
}

fn log_single_pass(elements: &ElementPass, notes: &NotePass) {
    match elements {
        ElementPass::Completed(report) => info!(
            "Element pass: {} applied, {} skipped",
            report.applied.len(),
            report.skipped.len()
        ),
        other => info!("Element pass did not run: {other:?}"),
    }
    match notes {
        NotePass::Completed(report) => info!(
            "Note pass: {} created, {} skipped",
            report.created.len(),
            report.skipped.len()
        ),
        other => info!("Note pass did not run: {other:?}"),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Cannot listen for Ctrl-C, running until killed: {err}");
        std::future::pending::<()>().await;
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "mapsync",
    about = "Synchronise locally collected map contributions with OpenStreetMap",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the element and note sync loops.
    Run(RunArgs),
}

/// CLI arguments for the `run` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Poll the contribution database and push pending edits and \
                 notes to the mapping service. Options can come from CLI \
                 flags, configuration files, or environment variables.",
    about = "Run the contribution sync service"
)]
#[ortho_config(prefix = "MAPSYNC")]
struct RunArgs {
    /// Base URL of the OSM API host.
    #[arg(long = ARG_API_URL, value_name = "url")]
    #[serde(default)]
    api_url: Option<String>,
    /// Account name for basic authentication.
    #[arg(long, value_name = "user")]
    #[serde(default)]
    api_user: Option<String>,
    /// Account password for basic authentication.
    #[arg(long = ARG_API_PASSWORD, value_name = "password")]
    #[serde(default)]
    api_password: Option<String>,
    /// OAuth 2 bearer token; takes precedence over user and password.
    #[arg(long, value_name = "token")]
    #[serde(default)]
    api_token: Option<String>,
    /// Default language for note templates.
    #[arg(long, value_name = "code")]
    #[serde(default)]
    language: Option<String>,
    /// Language of changeset metadata.
    #[arg(long, value_name = "code")]
    #[serde(default)]
    changeset_language: Option<String>,
    /// Seconds between element passes.
    #[arg(long, value_name = "seconds")]
    #[serde(default)]
    interval_secs: Option<u64>,
    /// Request timeout for API calls.
    #[arg(long, value_name = "seconds")]
    #[serde(default)]
    timeout_secs: Option<u64>,
    /// SQLite database holding the contributions.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    database: Option<Utf8PathBuf>,
    /// Directory of `<language>.json` template dictionaries.
    #[arg(long, value_name = "path")]
    #[serde(default)]
    locales_dir: Option<Utf8PathBuf>,
    /// Base URL of element links in notes; defaults to the API URL.
    #[arg(long, value_name = "url")]
    #[serde(default)]
    element_url_base: Option<String>,
    /// Retry failed note acknowledgements instead of dropping them.
    #[arg(long, action = ArgAction::SetTrue)]
    #[serde(default)]
    requeue_note_acks: bool,
    /// Run one pass of each loop and exit.
    #[arg(long, action = ArgAction::SetTrue)]
    #[serde(default)]
    once: bool,
}

impl RunArgs {
    fn into_config(self) -> Result<RunConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RunConfig::try_from(merged)
    }
}

/// Validated settings for the `run` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RunConfig {
    api_url: String,
    credentials: Credentials,
    language: String,
    changeset_language: String,
    interval: Duration,
    timeout: Duration,
    database: Utf8PathBuf,
    locales_dir: Utf8PathBuf,
    element_url_base: String,
    note_ack_policy: NoteAckPolicy,
    once: bool,
}

impl RunConfig {
    fn scheduler(&self) -> SchedulerConfig {
        SchedulerConfig::from_interval(self.interval)
            .with_changeset_language(self.changeset_language.clone())
            .with_element_url_base(self.element_url_base.clone())
            .with_note_ack_policy(self.note_ack_policy)
    }
}

impl TryFrom<RunArgs> for RunConfig {
    type Error = CliError;

    fn try_from(args: RunArgs) -> Result<Self, Self::Error> {
        let api_url = args
            .api_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_API_URL,
                env: ENV_API_URL,
            })?;
        let credentials = match (args.api_token, args.api_user, args.api_password) {
            (Some(token), _, _) => Credentials::Bearer(token),
            (None, Some(user), Some(password)) => Credentials::Basic { user, password },
            (None, Some(_), None) => {
                return Err(CliError::MissingArgument {
                    field: ARG_API_PASSWORD,
                    env: ENV_API_PASSWORD,
                });
            }
            (None, None, _) => return Err(CliError::MissingCredentials),
        };
        let interval_secs = args.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(CliError::ZeroInterval);
        }
        let element_url_base = args.element_url_base.unwrap_or_else(|| api_url.clone());
        Ok(Self {
            credentials,
            language: args.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_owned()),
            changeset_language: args
                .changeset_language
                .unwrap_or_else(|| DEFAULT_CHANGESET_LANGUAGE.to_owned()),
            interval: Duration::from_secs(interval_secs),
            timeout: Duration::from_secs(args.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            database: args
                .database
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            locales_dir: args
                .locales_dir
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_LOCALES_DIR)),
            element_url_base,
            note_ack_policy: if args.requeue_note_acks {
                NoteAckPolicy::Requeue
            } else {
                NoteAckPolicy::Drop
            },
            once: args.once,
            api_url,
        })
    }
}

#[cfg(test)]
mod tests;
