//! Local persistence of pending contributions.

use async_trait::async_trait;
use thiserror::Error;

use crate::{Contribution, ContributionId};

/// Errors surfaced by a [`ContributionStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store could not be reached or the query failed.
    #[error("contribution store unavailable: {message}")]
    Unavailable {
        /// Underlying failure description.
        message: String,
    },
    /// A stored row could not be decoded into a [`Contribution`].
    #[error("contribution {id} is malformed: {message}")]
    Malformed {
        /// Row identifier.
        id: ContributionId,
        /// Decoding failure description.
        message: String,
    },
}

/// Source of pending contributions and sink for acknowledgements.
#[async_trait(?Send)]
pub trait ContributionStore {
    /// Pending element-edit contributions.
    async fn contributions_for_upload(&self) -> Result<Vec<Contribution>, StoreError>;

    /// Pending note contributions.
    async fn contributions_for_notes(&self) -> Result<Vec<Contribution>, StoreError>;

    /// Mark `ids` as sent so they are no longer returned as pending.
    ///
    /// Implementations must treat the whole slice as one write.
    async fn set_contributions_sent(&self, ids: &[ContributionId]) -> Result<(), StoreError>;
}
