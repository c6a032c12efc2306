//! One note-sync pass: render, submit, acknowledge.

use log::{error, info, warn};

use crate::{
    AckRetryQueue, Contribution, ContributionId, ContributionStore, DrainOutcome, LocaleResolver,
    MappingService, NoteDraft, StoreError, render_note,
};

/// What to do with created notes whose acknowledgement write failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NoteAckPolicy {
    /// Log and forget; the notes may be created again by a later pass.
    #[default]
    Drop,
    /// Buffer the IDs in the note loop's own [`AckRetryQueue`].
    Requeue,
}

/// Summary of one [`NoteSubmitter::sync_notes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteReport {
    /// Contributions whose note was created.
    pub created: Vec<ContributionId>,
    /// Contributions left pending: no coordinates or submission failed.
    pub skipped: Vec<ContributionId>,
    /// Whether the created IDs were acknowledged in the store.
    pub acknowledged: bool,
}

/// Outcome of [`run_note_pass`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotePass {
    /// Requeued acknowledgements could not be written; no new work fetched.
    AckBacklog,
    /// Pending notes could not be listed.
    StoreUnavailable(StoreError),
    /// A pass ran over the pending notes.
    Completed(NoteReport),
}

/// Renders and submits map notes one at a time.
#[derive(Debug)]
pub struct NoteSubmitter<'a, M: ?Sized, L: ?Sized> {
    service: &'a M,
    locales: &'a L,
    element_url_base: String,
    policy: NoteAckPolicy,
}

impl<'a, M, L> NoteSubmitter<'a, M, L>
where
    M: MappingService + ?Sized,
    L: LocaleResolver + ?Sized,
{
    /// Create a submitter linking existing elements under `element_url_base`.
    pub fn new(service: &'a M, locales: &'a L, element_url_base: impl Into<String>) -> Self {
        Self {
            service,
            locales,
            element_url_base: element_url_base.into(),
            policy: NoteAckPolicy::default(),
        }
    }

    /// Select the acknowledgement failure policy.
    #[must_use]
    pub const fn with_ack_policy(mut self, policy: NoteAckPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active acknowledgement failure policy.
    #[must_use]
    pub const fn ack_policy(&self) -> NoteAckPolicy {
        self.policy
    }

    /// Submit a note per contribution, then acknowledge the created ones.
    ///
    /// Each note is independent: a failure is logged and the pass moves on.
    /// Notes are not retried individually.
    pub async fn sync_notes<S>(
        &self,
        contributions: Vec<Contribution>,
        store: &S,
        queue: &mut AckRetryQueue,
    ) -> NoteReport
    where
        S: ContributionStore + ?Sized,
    {
        let mut work = contributions;
        let mut report = NoteReport::default();

        while let Some(contribution) = work.pop() {
            if self.submit(&contribution).await {
                report.created.push(contribution.id);
            } else {
                report.skipped.push(contribution.id);
            }
        }

        info!("Created {} notes on OSM", report.created.len());

        if report.created.is_empty() {
            return report;
        }
        match store.set_contributions_sent(&report.created).await {
            Ok(()) => report.acknowledged = true,
            Err(err) => match self.policy {
                NoteAckPolicy::Drop => {
                    error!(
                        "Failed to acknowledge {} created notes: {err}",
                        report.created.len()
                    );
                }
                NoteAckPolicy::Requeue => {
                    error!(
                        "Failed to acknowledge {} created notes, queued for retry: {err}",
                        report.created.len()
                    );
                    queue.extend(report.created.iter().copied());
                }
            },
        }
        report
    }

    async fn submit(&self, contribution: &Contribution) -> bool {
        let Some((lat, lon)) = contribution.location() else {
            warn!("Note contribution {} has no coordinates", contribution.id);
            return false;
        };
        let templates = &self
            .locales
            .resolve(contribution.language.as_deref())
            .note;
        let draft = NoteDraft {
            lat,
            lon,
            text: render_note(templates, contribution, &self.element_url_base),
        };
        match self.service.create_note(&draft).await {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "Failed to create note for contribution {}: {err}",
                    contribution.id
                );
                false
            }
        }
    }
}

/// Drain requeued acknowledgements, then submit every pending note.
pub async fn run_note_pass<S, M, L>(
    store: &S,
    submitter: &NoteSubmitter<'_, M, L>,
    queue: &mut AckRetryQueue,
) -> NotePass
where
    S: ContributionStore + ?Sized,
    M: MappingService + ?Sized,
    L: LocaleResolver + ?Sized,
{
    if queue.drain(store).await == DrainOutcome::Failed {
        return NotePass::AckBacklog;
    }
    match store.contributions_for_notes().await {
        Ok(contributions) => {
            NotePass::Completed(submitter.sync_notes(contributions, store, queue).await)
        }
        Err(err) => {
            error!("Failed to list contributions for notes: {err}");
            NotePass::StoreUnavailable(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryStore, RecordingService, block_on, catalog};
    use crate::{LocaleCatalog, OsmId};
    use rstest::{fixture, rstest};

    const BASE: &str = "https://www.openstreetmap.org";

    #[fixture]
    fn locales() -> LocaleCatalog {
        catalog()
    }

    fn note(id: i64, name: &str) -> Contribution {
        Contribution::new(ContributionId(id), OsmId::New)
            .with_name(name)
            .with_location(48.85, 2.35)
    }

    #[rstest]
    fn creates_one_note_per_contribution(locales: LocaleCatalog) {
        let service = RecordingService::default();
        let store = MemoryStore::default();
        let submitter = NoteSubmitter::new(&service, &locales, BASE);
        let mut queue = AckRetryQueue::new();

        let report = block_on(submitter.sync_notes(
            vec![note(1, "Bakery"), note(2, "Library")],
            &store,
            &mut queue,
        ));

        assert_eq!(report.created, vec![ContributionId(2), ContributionId(1)]);
        assert!(report.acknowledged);
        let notes = service.notes();
        assert_eq!(notes.len(), 2);
        assert!(notes.iter().all(|draft| !draft.text.contains(BASE)));
    }

    #[rstest]
    fn uses_contribution_language(locales: LocaleCatalog) {
        let service = RecordingService::default();
        let store = MemoryStore::default();
        let submitter = NoteSubmitter::new(&service, &locales, BASE);
        let mut queue = AckRetryQueue::new();
        let mut english = note(1, "Bakery");
        english.language = Some("en-GB".into());

        block_on(submitter.sync_notes(vec![english], &store, &mut queue));

        assert!(service.notes()[0].text.starts_with("New note"));
    }

    #[rstest]
    fn failure_does_not_stop_the_pass(locales: LocaleCatalog) {
        let service = RecordingService::default();
        service.fail_notes_containing("Library");
        let store = MemoryStore::default();
        let submitter = NoteSubmitter::new(&service, &locales, BASE);
        let mut queue = AckRetryQueue::new();

        let report = block_on(submitter.sync_notes(
            vec![note(1, "Bakery"), note(2, "Library")],
            &store,
            &mut queue,
        ));

        assert_eq!(report.created, vec![ContributionId(1)]);
        assert_eq!(report.skipped, vec![ContributionId(2)]);
    }

    #[rstest]
    fn missing_coordinates_are_skipped(locales: LocaleCatalog) {
        let service = RecordingService::default();
        let store = MemoryStore::default();
        let submitter = NoteSubmitter::new(&service, &locales, BASE);
        let mut queue = AckRetryQueue::new();
        let unplaced = Contribution::new(ContributionId(4), OsmId::New);

        let report = block_on(submitter.sync_notes(vec![unplaced], &store, &mut queue));

        assert_eq!(report.skipped, vec![ContributionId(4)]);
        assert!(service.notes().is_empty());
        assert!(store.calls().is_empty());
    }

    #[rstest]
    #[case(NoteAckPolicy::Drop, 0)]
    #[case(NoteAckPolicy::Requeue, 1)]
    fn acknowledgement_failure_follows_policy(
        locales: LocaleCatalog,
        #[case] policy: NoteAckPolicy,
        #[case] queued: usize,
    ) {
        let service = RecordingService::default();
        let store = MemoryStore::default();
        store.fail_acknowledgements(1);
        let submitter = NoteSubmitter::new(&service, &locales, BASE).with_ack_policy(policy);
        let mut queue = AckRetryQueue::new();

        let report = block_on(submitter.sync_notes(vec![note(1, "Bakery")], &store, &mut queue));

        assert!(!report.acknowledged);
        assert_eq!(queue.len(), queued);
    }
}
