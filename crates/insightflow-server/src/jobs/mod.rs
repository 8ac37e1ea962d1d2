//! In-process analysis job queue
//!
//! Creating an analysis submits an [`AnalysisJob`] to a bounded [`AnalysisQueue`]; an
//! [`AnalysisWorker`] drains it in the background and runs each job exactly once. Terminal
//! transitions are broadcast as [`AnalysisEvent`]s so completion can be observed without polling.
//!
//! Dropping every queue handle closes the channel: the worker finishes the jobs it holds and exits.

pub mod events;
pub mod queue;
pub mod worker;

pub use events::{AnalysisEvent, AnalysisEvents};
pub use queue::{AnalysisJob, AnalysisQueue, QueueError};
pub use worker::AnalysisWorker;
