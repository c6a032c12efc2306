//! Core of the mapsync contribution synchronisation engine.
//!
//! Pending contributions are read from a [`ContributionStore`], reconciled
//! against the remote [`MappingService`] and acknowledged once applied. Edits
//! to existing elements are grouped into one changeset per pass; notes are
//! submitted one by one. Every runtime failure is absorbed into a log line and
//! a scheduling decision; nothing is raised to the caller of a pass.
//!
//! The engine runs on a single logical thread. Collaborator traits are
//! declared with `async_trait(?Send)` and the [`Scheduler`] joins its two
//! loops on the current task.

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod contribution;
pub mod element;
pub mod locale;
pub mod note;
pub mod reconcile;
pub mod service;
pub mod store;
pub mod sync;
#[doc(hidden)]
pub mod test_support;

pub use contribution::{
    Contribution, ContributionId, DELETE_SENTINEL, ElementKind, ElementRef, NEW_ELEMENT_SENTINEL,
    OsmId, OsmIdError, Tags,
};
pub use element::{Element, ElementBody, RelationMember};
pub use locale::{
    ChangesetTemplates, LocaleCatalog, LocaleError, LocaleResolver, NoteTemplates,
    TemplateDictionary,
};
pub use note::render_note;
pub use reconcile::{Reconciliation, reconcile};
pub use service::{
    ChangesetId, ChangesetMetadata, FetchError, MappingService, NoteDraft, ServiceError,
};
pub use store::{ContributionStore, StoreError};
pub use sync::{
    AbortReason, AckRetryQueue, ChangesetBatcher, DEFAULT_ELEMENT_URL_BASE, DrainOutcome,
    ElementPass, MAX_NOTE_OFFSET, NoteAckPolicy, NotePass, NoteReport, NoteSubmitter, PassReport,
    Scheduler, SchedulerConfig, SinglePass, run_element_pass, run_note_pass,
};
