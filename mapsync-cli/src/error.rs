//! Error types emitted by the mapsync CLI.
//!
//! Startup failures reach this type, as do acknowledgements a `--once` pass
//! could not write. Once the scheduler loops, every error is logged and
//! retried on the next pass.

use std::sync::Arc;

use camino::Utf8PathBuf;
use mapsync_core::ContributionId;
use mapsync_data::{ClientBuildError, LocaleLoadError, SqliteStoreError};
use thiserror::Error;

/// Errors emitted by the mapsync CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// Neither a token nor a user/password pair was configured.
    #[error("missing API credentials (set --api-token, or --api-user and --api-password)")]
    MissingCredentials,
    /// The polling interval must be at least one second.
    #[error("interval-secs must be greater than zero")]
    ZeroInterval,
    /// The contribution database could not be opened.
    #[error("failed to open contribution database at {path}: {source}")]
    OpenStore {
        path: Utf8PathBuf,
        #[source]
        source: SqliteStoreError,
    },
    /// The locale dictionaries could not be loaded.
    #[error("failed to load locales from {path}: {source}")]
    LoadLocales {
        path: Utf8PathBuf,
        #[source]
        source: LocaleLoadError,
    },
    /// The mapping service client could not be built.
    #[error("failed to build API client for {base_url:?}: {source}")]
    BuildClient {
        base_url: String,
        #[source]
        source: ClientBuildError,
    },
    /// A single pass applied contributions it could not acknowledge.
    #[error("{} applied contributions could not be marked as sent: {ids:?}", ids.len())]
    Unacknowledged { ids: Vec<ContributionId> },
    /// The async runtime could not be started.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}
