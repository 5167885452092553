pub mod catalog;
pub mod executor;
pub mod feature;
pub mod queue;

pub use catalog::FeatureCatalog;
pub use executor::StepExecutor;
pub use feature::Feature;
pub use queue::{JobError, JobHandler, JobOutcome, JobQueue, StepJob};
