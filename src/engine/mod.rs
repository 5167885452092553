pub mod job_queue;
pub mod orchestrator;
#[cfg(test)]
mod integration_tests;

pub use job_queue::{RetryPolicy, TokioJobQueue};
pub use orchestrator::{OrchestratorOptions, RunOrchestrator};
