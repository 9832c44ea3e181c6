use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_channel::{Receiver, Sender};
use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::QueueError;
use crate::modules::conversion::events::{ConversionJob, JobOutcome};

#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, job: &ConversionJob) -> JobOutcome;
}

struct QueuedJob {
    job: ConversionJob,
    reply: oneshot::Sender<JobOutcome>,
}

type InFlight = Arc<Mutex<HashSet<Uuid>>>;

pub struct JobQueue {
    sender: Sender<QueuedJob>,
    in_flight: InFlight,
    active: Arc<AtomicUsize>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl JobQueue {
    pub fn start(handler: Arc<dyn JobHandler>, worker_count: usize, capacity: usize) -> Self {
        let (sender, receiver) = async_channel::bounded(capacity.max(1));
        let in_flight: InFlight = Arc::new(Mutex::new(HashSet::new()));
        let active = Arc::new(AtomicUsize::new(0));
        let worker_count = worker_count.max(1);

        let workers = (0..worker_count)
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    receiver.clone(),
                    handler.clone(),
                    in_flight.clone(),
                    active.clone(),
                ))
            })
            .collect();

        info!(workers = worker_count, capacity, "🧾 Conversion queue started");

        Self {
            sender,
            in_flight,
            active,
            workers: tokio::sync::Mutex::new(workers),
            worker_count,
        }
    }

    /// Enqueues `job`, waiting for buffer space. The returned receiver
    /// resolves once a worker has finished with it.
    pub async fn submit(&self, job: ConversionJob) -> Result<oneshot::Receiver<JobOutcome>, QueueError> {
        let job_id = job.job_id;
        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if !in_flight.insert(job_id) {
                return Err(QueueError::Duplicate(job_id));
            }
        }

        let (reply, outcome) = oneshot::channel();
        if self.sender.send(QueuedJob { job, reply }).await.is_err() {
            self.release(job_id);
            return Err(QueueError::Closed);
        }

        debug!(job_id = %job_id, depth = self.sender.len(), "Job queued");
        Ok(outcome)
    }

    pub async fn execute(&self, job: ConversionJob) -> Result<JobOutcome, QueueError> {
        let outcome = self.submit(job).await?;
        outcome.await.map_err(|_| QueueError::WorkerLost)
    }

    pub fn depth(&self) -> usize {
        self.sender.len()
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Stops accepting jobs, lets workers drain what is already queued,
    /// then waits for them to exit.
    pub async fn shutdown(&self) {
        self.sender.close();
        let workers = std::mem::take(&mut *self.workers.lock().await);
        for worker in workers {
            if let Err(e) = worker.await {
                error!("Conversion worker exited abnormally: {}", e);
            }
        }
        info!("Conversion queue stopped");
    }

    fn release(&self, job_id: Uuid) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id);
    }
}

async fn worker_loop(
    id: usize,
    receiver: Receiver<QueuedJob>,
    handler: Arc<dyn JobHandler>,
    in_flight: InFlight,
    active: Arc<AtomicUsize>,
) {
    debug!(worker = id, "Conversion worker ready");

    while let Ok(QueuedJob { job, reply }) = receiver.recv().await {
        let job_id = job.job_id;
        active.fetch_add(1, Ordering::SeqCst);

        let outcome = AssertUnwindSafe(handler.handle(&job)).catch_unwind().await;

        active.fetch_sub(1, Ordering::SeqCst);
        in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id);

        match outcome {
            Ok(outcome) => {
                if reply.send(outcome).is_err() {
                    warn!(worker = id, job_id = %job_id, "Submitter stopped waiting; outcome already recorded");
                }
            }
            Err(_) => {
                // Dropping `reply` tells the submitter the outcome is lost.
                error!(worker = id, job_id = %job_id, "❌ Conversion worker panicked while processing job");
            }
        }
    }

    debug!(worker = id, "Conversion worker stopped");
}
