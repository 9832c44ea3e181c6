use std::sync::Arc;

use crate::config::settings::AppConfig;
use crate::infrastructure::engine::ConversionEngine;
use crate::infrastructure::queue::JobQueue;
use crate::infrastructure::storage::{ObjectStore, StorageError};
use crate::modules::documents::repository::DocumentRepository;
use crate::modules::documents::tracker::LifecycleTracker;
use crate::modules::storage::service::StorageHandoff;
use crate::workers::ConversionWorker;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub tracker: LifecycleTracker,
    pub storage: StorageHandoff,
    pub queue: Arc<JobQueue>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        repo: Arc<dyn DocumentRepository>,
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn ConversionEngine>,
    ) -> Result<Self, StorageError> {
        let tracker = LifecycleTracker::new(repo.clone());
        let storage = StorageHandoff::new(store, repo, &config)?;
        let worker = ConversionWorker::new(engine, storage.clone(), tracker.clone(), config.engine_timeout());
        let queue = Arc::new(JobQueue::start(
            Arc::new(worker),
            config.worker_concurrency,
            config.queue_capacity,
        ));

        Ok(Self {
            config,
            tracker,
            storage,
            queue,
        })
    }
}
