//! The synchronisation engine: passes, acknowledgement retry and scheduling.

mod ack;
mod batcher;
mod notes;
mod scheduler;

pub use ack::{AckRetryQueue, DrainOutcome};
pub use batcher::{AbortReason, ChangesetBatcher, ElementPass, PassReport, run_element_pass};
pub use notes::{NoteAckPolicy, NotePass, NoteReport, NoteSubmitter, run_note_pass};
pub use scheduler::{
    DEFAULT_ELEMENT_URL_BASE, MAX_NOTE_OFFSET, Scheduler, SchedulerConfig, SinglePass,
};
