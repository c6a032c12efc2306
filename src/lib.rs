//! Facade crate for the mapsync contribution synchronisation engine.
//!
//! This crate re-exports the core sync types and exposes the HTTP, SQLite and
//! locale adapters behind the `adapters` feature.

#![forbid(unsafe_code)]

pub use mapsync_core::{
    AckRetryQueue, ChangesetBatcher, ChangesetId, ChangesetMetadata, Contribution,
    ContributionId, ContributionStore, Element, ElementKind, ElementPass, ElementRef, FetchError,
    LocaleCatalog, LocaleResolver, MappingService, NoteAckPolicy, NoteDraft, NotePass,
    NoteSubmitter, OsmId, PassReport, Scheduler, SchedulerConfig, ServiceError, SinglePass,
    StoreError, Tags, TemplateDictionary, reconcile, render_note, run_element_pass, run_note_pass,
};

#[cfg(feature = "adapters")]
pub use mapsync_data::{
    Credentials, HttpMappingService, HttpMappingServiceConfig, SqliteContributionStore,
    load_locale_catalog,
};
