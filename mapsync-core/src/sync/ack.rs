//! Buffer of contribution IDs whose acknowledgement write failed.

use log::{error, info};

use crate::{ContributionId, ContributionStore};

/// Result of [`AckRetryQueue::drain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// Nothing was buffered; no store call was made.
    Empty,
    /// The buffered IDs were acknowledged and the queue cleared.
    Acknowledged(usize),
    /// The store rejected the write; the queue is unchanged.
    Failed,
}

impl DrainOutcome {
    /// Whether the owning loop may fetch new work in this pass.
    #[must_use]
    pub const fn may_proceed(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Ordered, de-duplicated set of IDs awaiting acknowledgement.
///
/// Each sync loop owns its queue outright; nothing else mutates it.
///
/// # Examples
///
/// ```
/// use mapsync_core::{AckRetryQueue, ContributionId};
///
/// let mut queue = AckRetryQueue::new();
/// queue.extend([ContributionId(2), ContributionId(1), ContributionId(2)]);
/// assert_eq!(queue.ids(), &[ContributionId(2), ContributionId(1)]);
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AckRetryQueue {
    ids: Vec<ContributionId>,
}

impl AckRetryQueue {
    /// Create an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self { ids: Vec::new() }
    }

    /// Append IDs not already buffered, preserving first-seen order.
    pub fn extend<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = ContributionId>,
    {
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    /// Number of buffered IDs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the queue holds no IDs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Buffered IDs in order.
    #[must_use]
    pub fn ids(&self) -> &[ContributionId] {
        &self.ids
    }

    /// Acknowledge every buffered ID with a single store call.
    pub async fn drain<S>(&mut self, store: &S) -> DrainOutcome
    where
        S: ContributionStore + ?Sized,
    {
        if self.ids.is_empty() {
            return DrainOutcome::Empty;
        }
        match store.set_contributions_sent(&self.ids).await {
            Ok(()) => {
                let count = self.ids.len();
                self.ids.clear();
                info!("Acknowledged {count} previously applied contributions");
                DrainOutcome::Acknowledged(count)
            }
            Err(err) => {
                error!(
                    "Retrying acknowledgement of {} contributions failed: {err}",
                    self.ids.len()
                );
                DrainOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryStore, StoreCall, block_on};
    use rstest::rstest;

    #[rstest]
    fn empty_queue_skips_store() {
        let store = MemoryStore::default();
        let mut queue = AckRetryQueue::new();
        assert_eq!(block_on(queue.drain(&store)), DrainOutcome::Empty);
        assert!(store.calls().is_empty());
    }

    #[rstest]
    fn successful_drain_clears_queue() {
        let store = MemoryStore::default();
        let mut queue = AckRetryQueue::new();
        queue.extend([ContributionId(4), ContributionId(5)]);

        assert_eq!(block_on(queue.drain(&store)), DrainOutcome::Acknowledged(2));
        assert!(queue.is_empty());
        assert_eq!(
            store.calls(),
            vec![StoreCall::Acknowledge(vec![ContributionId(4), ContributionId(5)])]
        );
    }

    #[rstest]
    fn failed_drain_keeps_ids() {
        let store = MemoryStore::default();
        store.fail_acknowledgements(1);
        let mut queue = AckRetryQueue::new();
        queue.extend([ContributionId(9)]);

        let outcome = block_on(queue.drain(&store));

        assert_eq!(outcome, DrainOutcome::Failed);
        assert!(!outcome.may_proceed());
        assert_eq!(queue.ids(), &[ContributionId(9)]);
    }

    #[rstest]
    fn extend_ignores_duplicates() {
        let mut queue = AckRetryQueue::new();
        queue.extend([ContributionId(1)]);
        queue.extend([ContributionId(1), ContributionId(3)]);
        assert_eq!(queue.len(), 2);
    }
}
