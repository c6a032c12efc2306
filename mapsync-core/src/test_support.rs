//! In-memory collaborators shared by unit and behaviour tests.
//!
//! Both doubles record every call so tests can assert on ordering, and both
//! can be told to fail specific operations.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;

use async_trait::async_trait;

use crate::{
    ChangesetId, ChangesetMetadata, ChangesetTemplates, Contribution, ContributionId,
    ContributionStore, Element, ElementBody, ElementKind, ElementRef, FetchError, LocaleCatalog,
    MappingService, NoteDraft, NoteTemplates, ServiceError, StoreError, Tags, TemplateDictionary,
};

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be built.
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("tokio runtime")
        .block_on(future)
}

/// A node carrying `tags` at version 1.
#[must_use]
pub fn node(id: u64, tags: &[(&str, &str)]) -> Element {
    Element {
        reference: ElementRef::new(ElementKind::Node, id),
        version: 1,
        tags: tags
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect(),
        timestamp: None,
        changeset: None,
        body: ElementBody::Node {
            lat: 48.8566,
            lon: 2.3522,
        },
    }
}

/// A catalogue with a French default and an English dictionary.
///
/// # Panics
///
/// Never in practice: the default dictionary is always present.
#[must_use]
pub fn catalog() -> LocaleCatalog {
    LocaleCatalog::new(
        "fr",
        [
            (
                "fr".to_owned(),
                dictionary("Nouvelle note {HASHTAG_COUNTRY}", "Nom :", "Mise à jour"),
            ),
            (
                "en".to_owned(),
                dictionary("New note {HASHTAG_COUNTRY}", "Name:", "Update"),
            ),
        ],
    )
    .expect("default dictionary present")
}

fn dictionary(header: &str, name: &str, comment: &str) -> TemplateDictionary {
    TemplateDictionary {
        note: NoteTemplates {
            header: header.to_owned(),
            name: name.to_owned(),
            unknown: "?".to_owned(),
            url: "URL:".to_owned(),
            details: "Details:".to_owned(),
            footer: "mapsync".to_owned(),
            country_hashtag: Some("#mapsync{COUNTRY}".to_owned()),
            status: None,
            opening_hours: None,
            statuses: BTreeMap::new(),
        },
        changeset: ChangesetTemplates {
            editor: "mapsync".to_owned(),
            comment: comment.to_owned(),
            description: None,
        },
    }
}

/// Store operation observed by [`MemoryStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `contributions_for_upload`.
    ListUploads,
    /// `contributions_for_notes`.
    ListNotes,
    /// `set_contributions_sent` with the given IDs.
    Acknowledge(Vec<ContributionId>),
}

/// Contribution store backed by vectors.
#[derive(Debug, Default)]
pub struct MemoryStore {
    uploads: Vec<Contribution>,
    notes: Vec<Contribution>,
    sent: RefCell<HashSet<ContributionId>>,
    calls: RefCell<Vec<StoreCall>>,
    failing_acks: Cell<usize>,
    unavailable: Cell<bool>,
}

impl MemoryStore {
    /// Store holding `uploads` and `notes` as pending.
    #[must_use]
    pub fn new(uploads: Vec<Contribution>, notes: Vec<Contribution>) -> Self {
        Self {
            uploads,
            notes,
            ..Self::default()
        }
    }

    /// Store holding only element edits.
    #[must_use]
    pub fn with_uploads(uploads: Vec<Contribution>) -> Self {
        Self::new(uploads, Vec::new())
    }

    /// Fail the next `count` acknowledgement writes.
    pub fn fail_acknowledgements(&self, count: usize) {
        self.failing_acks.set(count);
    }

    /// Make listing operations fail until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.set(unavailable);
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    /// Number of `contributions_for_upload` calls.
    #[must_use]
    pub fn upload_listings(&self) -> usize {
        self.count(|call| matches!(call, StoreCall::ListUploads))
    }

    /// Number of `contributions_for_notes` calls.
    #[must_use]
    pub fn note_listings(&self) -> usize {
        self.count(|call| matches!(call, StoreCall::ListNotes))
    }

    /// Whether `id` has been acknowledged.
    #[must_use]
    pub fn is_sent(&self, id: ContributionId) -> bool {
        self.sent.borrow().contains(&id)
    }

    fn count(&self, predicate: impl Fn(&StoreCall) -> bool) -> usize {
        self.calls.borrow().iter().filter(|call| predicate(call)).count()
    }

    fn pending(&self, contributions: &[Contribution]) -> Result<Vec<Contribution>, StoreError> {
        if self.unavailable.get() {
            return Err(StoreError::Unavailable {
                message: "store offline".to_owned(),
            });
        }
        let sent = self.sent.borrow();
        Ok(contributions
            .iter()
            .filter(|contribution| !sent.contains(&contribution.id))
            .cloned()
            .collect())
    }
}

#[async_trait(?Send)]
impl ContributionStore for MemoryStore {
    async fn contributions_for_upload(&self) -> Result<Vec<Contribution>, StoreError> {
        self.calls.borrow_mut().push(StoreCall::ListUploads);
        self.pending(&self.uploads)
    }

    async fn contributions_for_notes(&self) -> Result<Vec<Contribution>, StoreError> {
        self.calls.borrow_mut().push(StoreCall::ListNotes);
        self.pending(&self.notes)
    }

    async fn set_contributions_sent(&self, ids: &[ContributionId]) -> Result<(), StoreError> {
        self.calls
            .borrow_mut()
            .push(StoreCall::Acknowledge(ids.to_vec()));
        let failing = self.failing_acks.get();
        if failing > 0 {
            self.failing_acks.set(failing - 1);
            return Err(StoreError::Unavailable {
                message: "database is locked".to_owned(),
            });
        }
        self.sent.borrow_mut().extend(ids.iter().copied());
        Ok(())
    }
}

/// Mapping service operation observed by [`RecordingService`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    /// `fetch_element`.
    Fetch(ElementRef),
    /// `create_changeset`.
    CreateChangeset(ChangesetMetadata),
    /// `send_element` with the uploaded element.
    SendElement(Element, ChangesetId),
    /// `close_changeset`.
    CloseChangeset(ChangesetId),
    /// `create_note`.
    CreateNote(NoteDraft),
}

/// Mapping service holding elements in memory and recording every call.
///
/// Uploaded elements replace the stored copy with a bumped version, so a
/// second pass over the same contributions sees the new state.
#[derive(Debug, Default)]
pub struct RecordingService {
    elements: RefCell<HashMap<ElementRef, Element>>,
    fetch_failures: RefCell<HashMap<ElementRef, FetchError>>,
    upload_failures: RefCell<HashSet<ElementRef>>,
    note_failures: RefCell<Vec<String>>,
    changeset_failure: Cell<bool>,
    next_changeset: Cell<u64>,
    calls: RefCell<Vec<ServiceCall>>,
}

impl RecordingService {
    /// Service serving `elements`.
    #[must_use]
    pub fn with_elements<I>(elements: I) -> Self
    where
        I: IntoIterator<Item = Element>,
    {
        let service = Self::default();
        service.elements.borrow_mut().extend(
            elements
                .into_iter()
                .map(|element| (element.reference, element)),
        );
        service
    }

    /// Fail every fetch of `element` with `error`.
    pub fn fail_fetch(&self, element: ElementRef, error: FetchError) {
        self.fetch_failures.borrow_mut().insert(element, error);
    }

    /// Reject every changeset creation.
    pub fn fail_changeset_creation(&self) {
        self.changeset_failure.set(true);
    }

    /// Reject every upload of `element`.
    pub fn fail_upload(&self, element: ElementRef) {
        self.upload_failures.borrow_mut().insert(element);
    }

    /// Reject notes whose text contains `needle`.
    pub fn fail_notes_containing(&self, needle: &str) {
        self.note_failures.borrow_mut().push(needle.to_owned());
    }

    /// Current remote state of `element`.
    #[must_use]
    pub fn element(&self, element: ElementRef) -> Option<Element> {
        self.elements.borrow().get(&element).cloned()
    }

    /// Every call so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.borrow().clone()
    }

    /// Number of successful or attempted changeset creations.
    #[must_use]
    pub fn changesets_created(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, ServiceCall::CreateChangeset(_)))
            .count()
    }

    /// Attempted uploads with their changesets, in order.
    #[must_use]
    pub fn uploads(&self) -> Vec<(Element, ChangesetId)> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ServiceCall::SendElement(element, changeset) => {
                    Some((element.clone(), *changeset))
                }
                _ => None,
            })
            .collect()
    }

    /// Attempted notes, in order.
    #[must_use]
    pub fn notes(&self) -> Vec<NoteDraft> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                ServiceCall::CreateNote(note) => Some(note.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ServiceCall) {
        self.calls.borrow_mut().push(call);
    }
}

#[async_trait(?Send)]
impl MappingService for RecordingService {
    async fn fetch_element(&self, element: ElementRef) -> Result<Element, FetchError> {
        self.record(ServiceCall::Fetch(element));
        if let Some(error) = self.fetch_failures.borrow().get(&element) {
            return Err(error.clone());
        }
        self.elements
            .borrow()
            .get(&element)
            .cloned()
            .ok_or(FetchError::NotFound { element })
    }

    async fn create_changeset(
        &self,
        metadata: &ChangesetMetadata,
    ) -> Result<ChangesetId, ServiceError> {
        self.record(ServiceCall::CreateChangeset(metadata.clone()));
        if self.changeset_failure.get() {
            return Err(ServiceError::Rejected {
                operation: "create changeset",
                message: "no changeset id returned".to_owned(),
            });
        }
        let id = self.next_changeset.get() + 1;
        self.next_changeset.set(id);
        Ok(ChangesetId(id))
    }

    async fn send_element(
        &self,
        element: &Element,
        changeset: ChangesetId,
    ) -> Result<(), ServiceError> {
        self.record(ServiceCall::SendElement(element.clone(), changeset));
        if self.upload_failures.borrow().contains(&element.reference) {
            return Err(ServiceError::Http {
                url: format!("memory://{}", element.reference),
                status: 409,
                message: "version conflict".to_owned(),
            });
        }
        let mut stored = element.clone();
        stored.version += 1;
        stored.changeset = Some(changeset.0);
        self.elements.borrow_mut().insert(stored.reference, stored);
        Ok(())
    }

    async fn close_changeset(&self, changeset: ChangesetId) -> Result<(), ServiceError> {
        self.record(ServiceCall::CloseChangeset(changeset));
        Ok(())
    }

    async fn create_note(&self, note: &NoteDraft) -> Result<(), ServiceError> {
        self.record(ServiceCall::CreateNote(note.clone()));
        if self
            .note_failures
            .borrow()
            .iter()
            .any(|needle| note.text.contains(needle.as_str()))
        {
            return Err(ServiceError::Http {
                url: "memory://notes".to_owned(),
                status: 500,
                message: "note rejected".to_owned(),
            });
        }
        Ok(())
    }
}

/// Tags from string pairs.
#[must_use]
pub fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
        .collect()
}
