//! Adapters connecting the sync engine to the outside world.
//!
//! Responsibilities:
//! - Talk to the OpenStreetMap API v0.6 over HTTP.
//! - Persist pending contributions in SQLite.
//! - Load localised template dictionaries from disk.
//!
//! Boundaries:
//! - Do not encode sync rules (live in `mapsync-core`).
//! - Surface failures as typed errors; the engine decides what to log and
//!   when to retry.
//!
//! Invariants:
//! - No global mutable state.
//! - Acknowledgements are written in a single transaction.

pub mod locale;
pub mod osm_api;
pub mod store;

pub use locale::{LocaleLoadError, load_locale_catalog};
pub use osm_api::{
    ClientBuildError, Credentials, DEFAULT_USER_AGENT, HttpMappingService, HttpMappingServiceConfig,
};
pub use store::{ContributionKind, SqliteContributionStore, SqliteStoreError};
