use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// One step of one run, as submitted to the job queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepJob {
    pub run_id: Uuid,
    pub node_id: String,
    pub layer: usize,
}

/// How a job settled
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded { artefact_hash: String },
    Skipped { reason: String },
    Failed { error: String },
    /// Nothing to do: the step was gone, already settled, or the run stopped
    Discarded,
}

/// A failed attempt. `retryable` tells the queue whether another attempt
/// is allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct JobError {
    pub message: String,
    pub retryable: bool,
}

impl JobError {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for JobError {}

#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run one attempt of the job.
    async fn handle(&self, job: &StepJob) -> Result<JobOutcome, JobError>;

    /// Called once when the queue gives up on a job.
    async fn on_exhausted(&self, job: &StepJob, error: &JobError);
}

/// Asynchronous work queue with a retry policy
#[async_trait]
pub trait JobQueue: Send + Sync {
    fn submit(&self, job: StepJob, handler: Arc<dyn JobHandler>) -> JoinHandle<JobOutcome>;

    /// Wait for every submitted job to settle.
    async fn wait_idle(&self);
}
