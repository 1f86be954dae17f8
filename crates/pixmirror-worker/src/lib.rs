//! Pixmirror Worker – bounded-concurrency batch queue for upload tasks.
//!
//! The queue caps simultaneous tasks, spaces out dispatches to stay under
//! the secondary service's rate limit, and isolates per-task failures so
//! one bad image never stops the rest of a batch.

mod queue;

pub use queue::{BatchUploader, UploadQueue};
