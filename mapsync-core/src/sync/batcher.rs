//! One element-sync pass: reconcile, upload under a shared changeset,
//! acknowledge.

use chrono::Utc;
use log::{debug, error, info, warn};

use crate::{
    AckRetryQueue, ChangesetId, ChangesetMetadata, Contribution, ContributionId, ContributionStore,
    DrainOutcome, MappingService, OsmId, ServiceError, StoreError, reconcile,
};

/// Why a pass stopped before draining its work list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// No changeset could be opened, so no edit could be attached.
    ChangesetCreation(ServiceError),
}

/// Summary of one [`ChangesetBatcher::sync_pass`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Contributions applied, unchanged, or already resolved remotely.
    pub applied: Vec<ContributionId>,
    /// Contributions left pending for a later pass.
    pub skipped: Vec<ContributionId>,
    /// Set when the pass stopped early.
    pub aborted: Option<AbortReason>,
    /// Changeset opened during the pass, if any.
    pub changeset: Option<ChangesetId>,
    /// Whether the applied IDs were acknowledged in the store.
    pub acknowledged: bool,
}

/// Outcome of [`run_element_pass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementPass {
    /// Buffered acknowledgements could not be written; no new work fetched.
    AckBacklog,
    /// Pending contributions could not be listed.
    StoreUnavailable(StoreError),
    /// A pass ran over the pending contributions.
    Completed(PassReport),
}

enum Step {
    Applied,
    Skipped,
    Abort(ServiceError),
}

/// Drives element uploads for a pass under a lazily opened changeset.
#[derive(Debug)]
pub struct ChangesetBatcher<'a, M: ?Sized> {
    service: &'a M,
    metadata: ChangesetMetadata,
}

impl<'a, M> ChangesetBatcher<'a, M>
where
    M: MappingService + ?Sized,
{
    /// Create a batcher opening changesets with `metadata`.
    pub const fn new(service: &'a M, metadata: ChangesetMetadata) -> Self {
        Self { service, metadata }
    }

    /// Metadata attached to every changeset this batcher opens.
    #[must_use]
    pub const fn metadata(&self) -> &ChangesetMetadata {
        &self.metadata
    }

    /// Process `contributions` and acknowledge those applied.
    ///
    /// Contributions are taken from the back of the list. No ordering between
    /// contributions is guaranteed; none depends on another.
    ///
    /// A changeset is opened only once some contribution changes a remote
    /// element, and closed once at the end of the pass. If opening it fails the
    /// remaining contributions stay pending, while those already resolved are
    /// still acknowledged. IDs whose acknowledgement fails join `queue`.
    pub async fn sync_pass<S>(
        &self,
        contributions: Vec<Contribution>,
        store: &S,
        queue: &mut AckRetryQueue,
    ) -> PassReport
    where
        S: ContributionStore + ?Sized,
    {
        let mut work = contributions;
        let mut report = PassReport::default();

        while let Some(contribution) = work.pop() {
            match self.apply(&contribution, &mut report.changeset).await {
                Step::Applied => report.applied.push(contribution.id),
                Step::Skipped => report.skipped.push(contribution.id),
                Step::Abort(err) => {
                    error!("Failed to create changeset, aborting pass: {err}");
                    report.skipped.push(contribution.id);
                    report.skipped.extend(work.drain(..).rev().map(|c| c.id));
                    report.aborted = Some(AbortReason::ChangesetCreation(err));
                }
            }
        }

        if let Some(changeset) = report.changeset
            && let Err(err) = self.service.close_changeset(changeset).await
        {
            error!("Failed to close changeset {changeset}: {err}");
        }

        info!("Updated {} elements on OSM", report.applied.len());

        if !report.applied.is_empty() {
            match store.set_contributions_sent(&report.applied).await {
                Ok(()) => report.acknowledged = true,
                Err(err) => {
                    error!(
                        "Failed to acknowledge {} applied contributions, queued for retry: {err}",
                        report.applied.len()
                    );
                    queue.extend(report.applied.iter().copied());
                }
            }
        }
        report
    }

    async fn apply(&self, contribution: &Contribution, open: &mut Option<ChangesetId>) -> Step {
        let OsmId::Existing(reference) = contribution.osmid else {
            warn!(
                "Contribution {} targets a new element and cannot be uploaded",
                contribution.id
            );
            return Step::Skipped;
        };

        let element = match self.service.fetch_element(reference).await {
            Ok(element) => element,
            Err(err) if err.is_resolved() => {
                debug!("Contribution {} resolved: {err}", contribution.id);
                return Step::Applied;
            }
            Err(err) => {
                warn!(
                    "Skipping contribution {} after fetch failure: {err}",
                    contribution.id
                );
                return Step::Skipped;
            }
        };

        let outcome = reconcile(element.tags(), contribution.tags.as_ref());
        if !outcome.changed {
            debug!("Contribution {} leaves {reference} unchanged", contribution.id);
            return Step::Applied;
        }

        let changeset = match *open {
            Some(changeset) => changeset,
            None => match self.service.create_changeset(&self.metadata).await {
                Ok(changeset) => {
                    info!("Opened changeset {changeset}");
                    *open = Some(changeset);
                    changeset
                }
                Err(err) => return Step::Abort(err),
            },
        };

        debug!(
            "Updating {reference}: writing {:?}, deleting {:?}",
            outcome.written, outcome.deleted
        );
        let element = outcome.apply_to(element).touched(Utc::now());
        match self.service.send_element(&element, changeset).await {
            Ok(()) => Step::Applied,
            Err(err) => {
                error!(
                    "Failed to upload {reference} for contribution {}: {err}",
                    contribution.id
                );
                Step::Skipped
            }
        }
    }
}

/// Drain buffered acknowledgements, then sync every pending upload.
///
/// New work is only fetched when the drain succeeded or had nothing to do.
pub async fn run_element_pass<S, M>(
    store: &S,
    batcher: &ChangesetBatcher<'_, M>,
    queue: &mut AckRetryQueue,
) -> ElementPass
where
    S: ContributionStore + ?Sized,
    M: MappingService + ?Sized,
{
    if queue.drain(store).await == DrainOutcome::Failed {
        return ElementPass::AckBacklog;
    }
    match store.contributions_for_upload().await {
        Ok(contributions) => {
            ElementPass::Completed(batcher.sync_pass(contributions, store, queue).await)
        }
        Err(err) => {
            error!("Failed to list contributions for upload: {err}");
            ElementPass::StoreUnavailable(err)
        }
    }
}
