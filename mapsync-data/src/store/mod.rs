//! Persistence of pending contributions.
#![forbid(unsafe_code)]

mod sqlite;

pub use sqlite::{ContributionKind, SqliteContributionStore, SqliteStoreError};
