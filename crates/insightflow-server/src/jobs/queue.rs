//! Bounded analysis job queue

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::models::Dataset;

/// One analysis waiting to be processed, with the dataset it runs over
#[derive(Debug, Clone)]
pub struct AnalysisJob {
    pub analysis_id: Uuid,
    pub dataset: Dataset,
    pub submitted_at: DateTime<Utc>,
}

impl AnalysisJob {
    pub fn new(analysis_id: Uuid, dataset: Dataset) -> Self {
        Self {
            analysis_id,
            dataset,
            submitted_at: Utc::now(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Analysis queue is full, job for analysis '{0}' rejected")]
    Full(Uuid),

    #[error("Analysis queue is closed, job for analysis '{0}' rejected")]
    Closed(Uuid),
}

/// Submission side of the queue; cheap to clone
#[derive(Debug, Clone)]
pub struct AnalysisQueue {
    sender: mpsc::Sender<AnalysisJob>,
}

impl AnalysisQueue {
    /// Create a queue holding at most `capacity` waiting jobs
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<AnalysisJob>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Submit a job without waiting; a full or closed queue is reported immediately
    pub fn submit(&self, job: AnalysisJob) -> Result<(), QueueError> {
        let analysis_id = job.analysis_id;

        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full(analysis_id),
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed(analysis_id),
        })?;

        tracing::debug!(analysis_id = %analysis_id, "Analysis job queued");
        Ok(())
    }
}
