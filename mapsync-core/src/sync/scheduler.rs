//! Periodic element and note loops.
//!
//! Each loop sleeps for the configured interval only after its pass has
//! completed, so a slow pass delays the next one and passes never overlap.
//! Both loops run on the current task; neither needs to be `Send`.

use std::future::Future;
use std::time::Duration;

use log::{error, info};
use tokio::time::sleep;

use crate::{
    AckRetryQueue, ChangesetBatcher, ContributionId, ContributionStore, ElementPass,
    LocaleResolver, MappingService, NoteAckPolicy, NotePass, NoteSubmitter, run_element_pass,
    run_note_pass,
};

/// Upper bound on the note loop's start delay.
pub const MAX_NOTE_OFFSET: Duration = Duration::from_secs(30);

/// Default link target for notes about existing elements.
pub const DEFAULT_ELEMENT_URL_BASE: &str = "https://www.openstreetmap.org";

/// Timing and policy for a [`Scheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Pause between the end of one pass and the start of the next.
    pub interval: Duration,
    /// Delay before the first note pass.
    pub note_offset: Duration,
    /// Dictionary used for changeset metadata; `None` selects the default.
    pub changeset_language: Option<String>,
    /// Base URL of element links rendered into notes.
    pub element_url_base: String,
    /// Note acknowledgement failure policy.
    pub note_ack_policy: NoteAckPolicy,
}

impl SchedulerConfig {
    /// Configuration with the note loop staggered by `min(interval / 2, 30s)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use mapsync_core::SchedulerConfig;
    ///
    /// let config = SchedulerConfig::from_interval(Duration::from_secs(20));
    /// assert_eq!(config.note_offset, Duration::from_secs(10));
    /// let config = SchedulerConfig::from_interval(Duration::from_secs(300));
    /// assert_eq!(config.note_offset, Duration::from_secs(30));
    /// ```
    #[must_use]
    pub fn from_interval(interval: Duration) -> Self {
        Self {
            interval,
            note_offset: (interval / 2).min(MAX_NOTE_OFFSET),
            changeset_language: None,
            element_url_base: DEFAULT_ELEMENT_URL_BASE.to_owned(),
            note_ack_policy: NoteAckPolicy::default(),
        }
    }

    /// Resolve changeset metadata from `language`'s dictionary.
    #[must_use]
    pub fn with_changeset_language(mut self, language: impl Into<String>) -> Self {
        self.changeset_language = Some(language.into());
        self
    }

    /// Link existing elements under `base`.
    #[must_use]
    pub fn with_element_url_base(mut self, base: impl Into<String>) -> Self {
        self.element_url_base = base.into();
        self
    }

    /// Select the note acknowledgement failure policy.
    #[must_use]
    pub const fn with_note_ack_policy(mut self, policy: NoteAckPolicy) -> Self {
        self.note_ack_policy = policy;
        self
    }
}

/// Outcome of [`Scheduler::run_once`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinglePass {
    /// The element pass.
    pub elements: ElementPass,
    /// The note pass.
    pub notes: NotePass,
    /// Applied contributions whose acknowledgement still failed after a
    /// final retry. Nothing retries them once `run_once` returns.
    pub unacknowledged: Vec<ContributionId>,
}

impl SinglePass {
    /// Whether every applied contribution was acknowledged.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.unacknowledged.is_empty()
    }
}

/// Owns the collaborators and runs both sync loops.
#[derive(Debug)]
pub struct Scheduler<S, M, L> {
    store: S,
    service: M,
    locales: L,
    config: SchedulerConfig,
}

impl<S, M, L> Scheduler<S, M, L>
where
    S: ContributionStore,
    M: MappingService,
    L: LocaleResolver,
{
    /// Assemble a scheduler.
    pub const fn new(store: S, service: M, locales: L, config: SchedulerConfig) -> Self {
        Self {
            store,
            service,
            locales,
            config,
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Contribution store shared by both loops.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Mapping service shared by both loops.
    #[must_use]
    pub const fn service(&self) -> &M {
        &self.service
    }

    /// Run both loops until `shutdown` resolves.
    ///
    /// The element loop starts at once; the note loop after
    /// [`SchedulerConfig::note_offset`].
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("OSM data sending process started");
        tokio::select! {
            _ = async { tokio::join!(self.element_loop(), self.note_loop()) } => {}
            () = shutdown => info!("OSM data sending process stopped"),
        }
    }

    /// Run one element pass followed by one note pass.
    ///
    /// Failed acknowledgements get one more attempt before returning; IDs
    /// still unacknowledged are reported in [`SinglePass::unacknowledged`].
    pub async fn run_once(&self) -> SinglePass {
        info!("OSM data sending process started");
        let mut element_queue = AckRetryQueue::new();
        let elements = self.element_pass(&mut element_queue).await;
        let mut note_queue = AckRetryQueue::new();
        let notes = self.note_pass(&mut note_queue).await;

        let mut unacknowledged = Vec::new();
        for queue in [&mut element_queue, &mut note_queue] {
            queue.drain(&self.store).await;
            unacknowledged.extend_from_slice(queue.ids());
        }
        if !unacknowledged.is_empty() {
            error!(
                "{} applied contributions remain unacknowledged: {unacknowledged:?}",
                unacknowledged.len()
            );
        }
        SinglePass {
            elements,
            notes,
            unacknowledged,
        }
    }

    async fn element_loop(&self) {
        let mut queue = AckRetryQueue::new();
        loop {
            self.element_pass(&mut queue).await;
            sleep(self.config.interval).await;
        }
    }

    async fn note_loop(&self) {
        sleep(self.config.note_offset).await;
        let mut queue = AckRetryQueue::new();
        loop {
            self.note_pass(&mut queue).await;
            sleep(self.config.interval).await;
        }
    }

    async fn element_pass(&self, queue: &mut AckRetryQueue) -> ElementPass {
        let metadata = self
            .locales
            .resolve(self.config.changeset_language.as_deref())
            .changeset
            .metadata();
        let batcher = ChangesetBatcher::new(&self.service, metadata);
        run_element_pass(&self.store, &batcher, queue).await
    }

    async fn note_pass(&self, queue: &mut AckRetryQueue) -> NotePass {
        let submitter = NoteSubmitter::new(
            &self.service,
            &self.locales,
            self.config.element_url_base.as_str(),
        )
        .with_ack_policy(self.config.note_ack_policy);
        run_note_pass(&self.store, &submitter, queue).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Duration::from_secs(300), Duration::from_secs(30))]
    #[case(Duration::from_secs(60), Duration::from_secs(30))]
    #[case(Duration::from_secs(40), Duration::from_secs(20))]
    #[case(Duration::ZERO, Duration::ZERO)]
    fn staggers_note_loop(#[case] interval: Duration, #[case] offset: Duration) {
        assert_eq!(SchedulerConfig::from_interval(interval).note_offset, offset);
    }

    #[rstest]
    fn builder_overrides_defaults() {
        let config = SchedulerConfig::from_interval(Duration::from_secs(60))
            .with_changeset_language("en")
            .with_element_url_base("https://osm.example")
            .with_note_ack_policy(NoteAckPolicy::Requeue);
        assert_eq!(config.changeset_language.as_deref(), Some("en"));
        assert_eq!(config.element_url_base, "https://osm.example");
        assert_eq!(config.note_ack_policy, NoteAckPolicy::Requeue);
    }
}
