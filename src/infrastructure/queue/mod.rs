use thiserror::Error;
use uuid::Uuid;

pub mod job_queue;

pub use job_queue::{JobHandler, JobQueue};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("job queue is closed")]
    Closed,

    #[error("job {0} is already queued or running")]
    Duplicate(Uuid),

    #[error("worker dropped the job without reporting an outcome")]
    WorkerLost,
}
