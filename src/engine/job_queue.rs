// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

use crate::config::ExecutorOptions;
use crate::observability::messages::engine::JobRetryScheduled;
use crate::observability::messages::StructuredLog;
use crate::traits::{JobError, JobHandler, JobOutcome, JobQueue, StepJob};

/// Fixed-delay retry policy. `max_attempts` counts the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_options(options: &ExecutorOptions) -> Self {
        Self {
            max_attempts: options.get_retry_attempts().max(1),
            delay: options.get_retry_delay(),
        }
    }
}

/// Job queue on tokio tasks with a semaphore-bounded worker pool.
///
/// Each job runs as its own task. A permit is held only while an attempt
/// runs, not during the retry delay, so waiting retries never block other
/// jobs.
pub struct TokioJobQueue {
    semaphore: Arc<Semaphore>,
    tracker: TaskTracker,
    policy: RetryPolicy,
}

impl TokioJobQueue {
    pub fn new(max_concurrency: usize, policy: RetryPolicy) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency.max(1))),
            tracker: TaskTracker::new(),
            policy,
        }
    }

    pub fn from_options(options: &ExecutorOptions) -> Self {
        Self::new(
            options.get_max_concurrency(),
            RetryPolicy::from_options(options),
        )
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Jobs submitted and not yet settled
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }
}

async fn run_job(
    job: StepJob,
    handler: Arc<dyn JobHandler>,
    semaphore: Arc<Semaphore>,
    policy: RetryPolicy,
) -> JobOutcome {
    let mut attempt = 1;
    loop {
        let result = match semaphore.acquire().await {
            Ok(_permit) => handler.handle(&job).await,
            Err(e) => Err(JobError::fatal(format!("Worker pool closed: {}", e))),
        };

        let error = match result {
            Ok(outcome) => return outcome,
            Err(error) => error,
        };

        if error.retryable && attempt < policy.max_attempts {
            attempt += 1;
            JobRetryScheduled {
                run_id: job.run_id,
                node_id: &job.node_id,
                next_attempt: attempt,
                delay: policy.delay,
                error: &error.message,
            }
            .log();
            tokio::time::sleep(policy.delay).await;
            continue;
        }

        handler.on_exhausted(&job, &error).await;
        return JobOutcome::Failed {
            error: error.message,
        };
    }
}

#[async_trait]
impl JobQueue for TokioJobQueue {
    fn submit(&self, job: StepJob, handler: Arc<dyn JobHandler>) -> JoinHandle<JobOutcome> {
        self.tracker.spawn(run_job(
            job,
            handler,
            Arc::clone(&self.semaphore),
            self.policy,
        ))
    }

    async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}
