//! Worker coordination
//!
//! - **coordinator**: the worker pool, per-worker state machine and checkpoints
//! - **progress**: progress reporting abstraction (indicatif or no-op)

mod coordinator;
mod progress;

pub use coordinator::{Coordinator, CrawlConfig, CrawlSummary, WorkerState};
pub use progress::{IndicatifProgress, NoopProgress, ProgressHandle, ProgressReporter};
