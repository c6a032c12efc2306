//! Scheduler timing on a paused tokio clock.

use std::cell::RefCell;
use std::time::Duration;

use async_trait::async_trait;
use mapsync_core::test_support::{MemoryStore, RecordingService, StoreCall, catalog, node, tags};
use mapsync_core::{
    Contribution, ContributionId, ContributionStore, ElementKind, ElementPass, ElementRef,
    LocaleCatalog, NotePass, OsmId, Scheduler, SchedulerConfig, StoreError,
};
use tokio::time::{Instant, sleep};

const CAFE: ElementRef = ElementRef::new(ElementKind::Node, 1);

/// Records, in whole seconds since creation, when each listing call happened.
struct TimedStore {
    inner: MemoryStore,
    start: Instant,
    first_upload_delay: Duration,
    uploads: RefCell<Vec<u64>>,
    notes: RefCell<Vec<u64>>,
}

impl TimedStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            start: Instant::now(),
            first_upload_delay: Duration::ZERO,
            uploads: RefCell::new(Vec::new()),
            notes: RefCell::new(Vec::new()),
        }
    }

    fn with_slow_first_upload(mut self, delay: Duration) -> Self {
        self.first_upload_delay = delay;
        self
    }
}

#[async_trait(?Send)]
impl ContributionStore for TimedStore {
    async fn contributions_for_upload(&self) -> Result<Vec<Contribution>, StoreError> {
        let first = {
            let mut uploads = self.uploads.borrow_mut();
            uploads.push(self.start.elapsed().as_secs());
            uploads.len() == 1
        };
        if first {
            sleep(self.first_upload_delay).await;
        }
        self.inner.contributions_for_upload().await
    }

    async fn contributions_for_notes(&self) -> Result<Vec<Contribution>, StoreError> {
        self.notes.borrow_mut().push(self.start.elapsed().as_secs());
        self.inner.contributions_for_notes().await
    }

    async fn set_contributions_sent(&self, ids: &[ContributionId]) -> Result<(), StoreError> {
        self.inner.set_contributions_sent(ids).await
    }
}

#[tokio::test(start_paused = true)]
async fn loops_reschedule_after_each_pass() {
    let store = TimedStore::new(MemoryStore::default());
    let scheduler = Scheduler::new(
        store,
        RecordingService::default(),
        catalog(),
        SchedulerConfig::from_interval(Duration::from_secs(300)),
    );

    scheduler.run_until(sleep(Duration::from_secs(650))).await;

    assert_eq!(*scheduler.store().uploads.borrow(), vec![0, 300, 600]);
    assert_eq!(*scheduler.store().notes.borrow(), vec![30, 330, 630]);
}

#[tokio::test(start_paused = true)]
async fn short_interval_staggers_notes_by_half() {
    let store = TimedStore::new(MemoryStore::default());
    let scheduler = Scheduler::new(
        store,
        RecordingService::default(),
        catalog(),
        SchedulerConfig::from_interval(Duration::from_secs(20)),
    );

    scheduler.run_until(sleep(Duration::from_secs(45))).await;

    assert_eq!(*scheduler.store().uploads.borrow(), vec![0, 20, 40]);
    assert_eq!(*scheduler.store().notes.borrow(), vec![10, 30]);
}

#[tokio::test(start_paused = true)]
async fn slow_pass_delays_the_next_one() {
    let store = TimedStore::new(MemoryStore::default())
        .with_slow_first_upload(Duration::from_secs(100));
    let scheduler = Scheduler::new(
        store,
        RecordingService::default(),
        catalog(),
        SchedulerConfig::from_interval(Duration::from_secs(300)),
    );

    scheduler.run_until(sleep(Duration::from_secs(750))).await;

    assert_eq!(*scheduler.store().uploads.borrow(), vec![0, 400, 700]);
    assert_eq!(*scheduler.store().notes.borrow(), vec![30, 330, 630]);
}

fn wheelchair_edit() -> Contribution {
    Contribution::new(ContributionId(1), OsmId::Existing(CAFE))
        .with_tags(tags(&[("wheelchair", "yes")]))
}

type EditScheduler = Scheduler<MemoryStore, RecordingService, LocaleCatalog>;

fn edit_scheduler(store: MemoryStore) -> EditScheduler {
    Scheduler::new(
        store,
        RecordingService::with_elements([node(1, &[("amenity", "cafe")])]),
        catalog(),
        SchedulerConfig::from_interval(Duration::from_secs(300)),
    )
}

fn element_calls(store: &MemoryStore) -> Vec<StoreCall> {
    store
        .calls()
        .into_iter()
        .filter(|call| !matches!(call, StoreCall::ListNotes))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn element_loop_retries_failed_acknowledgement_next_pass() {
    let store = MemoryStore::with_uploads(vec![wheelchair_edit()]);
    store.fail_acknowledgements(1);
    let scheduler = edit_scheduler(store);

    scheduler.run_until(sleep(Duration::from_secs(350))).await;

    assert_eq!(
        element_calls(scheduler.store()),
        vec![
            StoreCall::ListUploads,
            StoreCall::Acknowledge(vec![ContributionId(1)]),
            StoreCall::Acknowledge(vec![ContributionId(1)]),
            StoreCall::ListUploads,
        ]
    );
    assert!(scheduler.store().is_sent(ContributionId(1)));
    let uploaded = scheduler.service().element(CAFE).expect("cafe stored");
    assert_eq!(uploaded.version, 2);
}

#[tokio::test]
async fn run_once_retries_failed_acknowledgement_before_returning() {
    let store = MemoryStore::with_uploads(vec![wheelchair_edit()]);
    store.fail_acknowledgements(1);
    let scheduler = edit_scheduler(store);

    let pass = scheduler.run_once().await;

    let ElementPass::Completed(report) = &pass.elements else {
        panic!("element pass did not complete");
    };
    assert!(!report.acknowledged);
    assert!(pass.is_settled());
    assert!(scheduler.store().is_sent(ContributionId(1)));
    assert_eq!(
        scheduler.store().calls(),
        vec![
            StoreCall::ListUploads,
            StoreCall::Acknowledge(vec![ContributionId(1)]),
            StoreCall::ListNotes,
            StoreCall::Acknowledge(vec![ContributionId(1)]),
        ]
    );
}

#[tokio::test]
async fn run_once_reports_ids_it_could_not_acknowledge() {
    let store = MemoryStore::with_uploads(vec![wheelchair_edit()]);
    store.fail_acknowledgements(2);
    let scheduler = edit_scheduler(store);

    let pass = scheduler.run_once().await;

    assert!(!pass.is_settled());
    assert_eq!(pass.unacknowledged, vec![ContributionId(1)]);
    assert!(!scheduler.store().is_sent(ContributionId(1)));
}

#[tokio::test]
async fn run_once_performs_both_passes() {
    let edit = Contribution::new(ContributionId(1), OsmId::Existing(CAFE))
        .with_tags(tags(&[("wheelchair", "yes")]));
    let note = Contribution::new(ContributionId(2), OsmId::New)
        .with_name("Bakery")
        .with_location(43.6, 1.44);
    let scheduler = Scheduler::new(
        MemoryStore::new(vec![edit], vec![note]),
        RecordingService::with_elements([node(1, &[("amenity", "cafe")])]),
        catalog(),
        SchedulerConfig::from_interval(Duration::from_secs(300)).with_changeset_language("en"),
    );

    let pass = scheduler.run_once().await;

    assert!(pass.is_settled());
    let ElementPass::Completed(report) = pass.elements else {
        panic!("element pass did not complete");
    };
    assert_eq!(report.applied, vec![ContributionId(1)]);
    let NotePass::Completed(notes) = pass.notes else {
        panic!("note pass did not complete");
    };
    assert_eq!(notes.created, vec![ContributionId(2)]);
    let uploaded = scheduler.service().element(CAFE).expect("cafe stored");
    assert_eq!(uploaded.version, 2);
    assert_eq!(uploaded.tags.get("wheelchair").map(String::as_str), Some("yes"));
}
