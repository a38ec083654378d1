//! Job dispatch
//!
//! The [`Coordinator`] drives a [`Job`](crate::enumerate::Job) through the
//! pipeline:
//!
//! ```text
//! tile ──► exists? ──yes──► AlreadyExists
//!            │ no
//!            ▼
//!      fetch (1x) or compose (2x) into a temp file
//!            │ success
//!            ▼
//!      add_tile under the backend lock ──► Success / Failed(Storage)
//! ```
//!
//! Each tile yields exactly one [`TileReport`] to the injected
//! [`ProgressReporter`]; the job as a whole yields a [`JobSummary`].

mod coordinator;
mod error;
mod report;


pub use crate::fetch::CANCELLED;
pub use coordinator::Coordinator;
pub use error::DispatchError;
pub use report::{JobSummary, NullReporter, ProgressReporter, TileReport, TracingReporter};
