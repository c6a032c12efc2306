//! SQLite-backed contribution store.

use std::fmt;

use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use log::{debug, warn};
use rusqlite::{Connection, Row};
use thiserror::Error;

use mapsync_core::{
    Contribution, ContributionId, ContributionStore, OsmId, OsmIdError, StoreError, Tags,
};

const SELECT_PENDING: &str = "SELECT id, osmid, tags, details, status, opening_hours, name, \
     lat, lon, language, country \
     FROM contributions WHERE kind = ?1 AND sent_at IS NULL ORDER BY id";

/// Which loop a stored contribution belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContributionKind {
    /// Element tag edit, consumed by the element loop.
    Edit,
    /// Map note, consumed by the note loop.
    Note,
}

impl ContributionKind {
    /// Value stored in the `kind` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Edit => "edit",
            Self::Note => "note",
        }
    }
}

/// Errors raised by [`SqliteContributionStore`].
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Opening the SQLite database failed.
    #[error("failed to open SQLite database at {path}: {source}")]
    Open {
        /// Location of the database on disk.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The database's parent directory could not be created.
    #[error("failed to create directory for {path}: {source}")]
    Directory {
        /// Location of the database on disk.
        path: Utf8PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// A statement failed.
    #[error("failed to {operation}: {source}")]
    Sqlite {
        /// What the store was doing.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The stored tag payload was not a JSON object of strings.
    #[error("failed to parse tags for contribution {id}: {source}")]
    Tags {
        /// Row identifier.
        id: ContributionId,
        /// JSON decoding failure.
        #[source]
        source: serde_json::Error,
    },
    /// The stored `osmid` could not be parsed.
    #[error("contribution {id} has an invalid osmid: {source}")]
    OsmId {
        /// Row identifier.
        id: ContributionId,
        /// Parse failure.
        #[source]
        source: OsmIdError,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Tags { id, .. } | SqliteStoreError::OsmId { id, .. } => {
                Self::Malformed {
                    id,
                    message: error.to_string(),
                }
            }
            other => Self::Unavailable {
                message: other.to_string(),
            },
        }
    }
}

/// Contribution store persisted in a single `contributions` table.
///
/// A contribution is pending while its `sent_at` column is `NULL`.
/// Rows that cannot be decoded are logged and left pending so they can be
/// repaired in place.
pub struct SqliteContributionStore {
    connection: Connection,
}

impl fmt::Debug for SqliteContributionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteContributionStore")
            .field("path", &self.connection.path())
            .finish_non_exhaustive()
    }
}

impl SqliteContributionStore {
    /// Open or create the database at `path`, creating parent directories
    /// and the schema as needed.
    pub fn open(path: &Utf8Path) -> Result<Self, SqliteStoreError> {
        mapsync_fs::ensure_parent_dir(path).map_err(|source| SqliteStoreError::Directory {
            path: path.to_owned(),
            source,
        })?;
        let connection = Connection::open(path).map_err(|source| SqliteStoreError::Open {
            path: path.to_owned(),
            source,
        })?;
        Self::with_connection(connection)
    }

    /// In-memory database, mostly useful in tests.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let connection = Connection::open_in_memory().map_err(|source| SqliteStoreError::Open {
            path: Utf8PathBuf::from(":memory:"),
            source,
        })?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self, SqliteStoreError> {
        initialise_schema(&connection)?;
        Ok(Self { connection })
    }

    /// Insert `contribution` under its own id.
    pub fn insert(
        &self,
        kind: ContributionKind,
        contribution: &Contribution,
    ) -> Result<(), SqliteStoreError> {
        let tags = contribution
            .tags
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|source| SqliteStoreError::Tags {
                id: contribution.id,
                source,
            })?;
        self.connection
            .execute(
                "INSERT INTO contributions (
                    id, kind, osmid, tags, details, status, opening_hours,
                    name, lat, lon, language, country
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    contribution.id.0,
                    kind.as_str(),
                    contribution.osmid.to_string(),
                    tags,
                    contribution.details,
                    contribution.status,
                    contribution.opening_hours,
                    contribution.name,
                    contribution.lat,
                    contribution.lon,
                    contribution.language,
                    contribution.country,
                ],
            )
            .map_err(|source| SqliteStoreError::Sqlite {
                operation: "insert contribution",
                source,
            })?;
        Ok(())
    }

    /// Pending contributions of `kind`, ordered by id.
    ///
    /// Malformed rows are skipped with a warning.
    pub fn pending(&self, kind: ContributionKind) -> Result<Vec<Contribution>, SqliteStoreError> {
        let mut statement = self
            .connection
            .prepare_cached(SELECT_PENDING)
            .map_err(|source| SqliteStoreError::Sqlite {
                operation: "prepare pending query",
                source,
            })?;
        let rows = statement
            .query_map([kind.as_str()], StoredRow::from_row)
            .map_err(|source| SqliteStoreError::Sqlite {
                operation: "query pending contributions",
                source,
            })?;

        let mut contributions = Vec::new();
        for row in rows {
            let row = row.map_err(|source| SqliteStoreError::Sqlite {
                operation: "read contribution row",
                source,
            })?;
            match row.into_contribution() {
                Ok(contribution) => contributions.push(contribution),
                Err(err) => warn!("Skipping stored contribution: {err}"),
            }
        }
        debug!("{} pending {} contributions", contributions.len(), kind.as_str());
        Ok(contributions)
    }

    /// Stamp `ids` as sent in one transaction.
    pub fn mark_sent(&self, ids: &[ContributionId]) -> Result<(), SqliteStoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        let sent_at = Utc::now().timestamp();
        let transaction =
            self.connection
                .unchecked_transaction()
                .map_err(|source| SqliteStoreError::Sqlite {
                    operation: "begin acknowledgement transaction",
                    source,
                })?;
        {
            let mut update = transaction
                .prepare_cached("UPDATE contributions SET sent_at = ?1 WHERE id = ?2")
                .map_err(|source| SqliteStoreError::Sqlite {
                    operation: "prepare acknowledgement",
                    source,
                })?;
            for id in ids {
                update
                    .execute((sent_at, id.0))
                    .map_err(|source| SqliteStoreError::Sqlite {
                        operation: "mark contribution sent",
                        source,
                    })?;
            }
        }
        transaction
            .commit()
            .map_err(|source| SqliteStoreError::Sqlite {
                operation: "commit acknowledgement transaction",
                source,
            })
    }
}

#[async_trait(?Send)]
impl ContributionStore for SqliteContributionStore {
    async fn contributions_for_upload(&self) -> Result<Vec<Contribution>, StoreError> {
        Ok(self.pending(ContributionKind::Edit)?)
    }

    async fn contributions_for_notes(&self) -> Result<Vec<Contribution>, StoreError> {
        Ok(self.pending(ContributionKind::Note)?)
    }

    async fn set_contributions_sent(&self, ids: &[ContributionId]) -> Result<(), StoreError> {
        Ok(self.mark_sent(ids)?)
    }
}

fn initialise_schema(connection: &Connection) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch(
            "CREATE TABLE IF NOT EXISTS contributions (
                id INTEGER PRIMARY KEY,
                kind TEXT NOT NULL CHECK (kind IN ('edit', 'note')),
                osmid TEXT NOT NULL,
                tags TEXT,
                details TEXT,
                status TEXT,
                opening_hours TEXT,
                name TEXT,
                lat REAL,
                lon REAL,
                language TEXT,
                country TEXT,
                sent_at INTEGER
            );
            CREATE INDEX IF NOT EXISTS contributions_pending
                ON contributions (kind, sent_at);",
        )
        .map_err(|source| SqliteStoreError::Sqlite {
            operation: "create contributions schema",
            source,
        })
}

/// Raw column values of one row, decoded lazily so bad rows can be skipped.
struct StoredRow {
    id: ContributionId,
    osmid: String,
    tags: Option<String>,
    details: Option<String>,
    status: Option<String>,
    opening_hours: Option<String>,
    name: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    language: Option<String>,
    country: Option<String>,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: ContributionId(row.get(0)?),
            osmid: row.get(1)?,
            tags: row.get(2)?,
            details: row.get(3)?,
            status: row.get(4)?,
            opening_hours: row.get(5)?,
            name: row.get(6)?,
            lat: row.get(7)?,
            lon: row.get(8)?,
            language: row.get(9)?,
            country: row.get(10)?,
        })
    }

    fn into_contribution(self) -> Result<Contribution, SqliteStoreError> {
        let id = self.id;
        let osmid: OsmId = self
            .osmid
            .parse()
            .map_err(|source| SqliteStoreError::OsmId { id, source })?;
        let tags = self
            .tags
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| serde_json::from_str::<Tags>(&raw))
            .transpose()
            .map_err(|source| SqliteStoreError::Tags { id, source })?;
        Ok(Contribution {
            id,
            osmid,
            tags,
            details: self.details,
            status: self.status,
            opening_hours: self.opening_hours,
            name: self.name,
            lat: self.lat,
            lon: self.lon,
            language: self.language,
            country: self.country,
        })
    }
}
