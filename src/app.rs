//! Process wiring: builds the store, clients, workers, and coordinator from a
//! resolved [`Config`].

use anyhow::Result;
use std::sync::Arc;

use crate::analysis::{AnalysisClient, GeminiClient};
use crate::config::Config;
use crate::pipeline::{
    Coordinator, CoordinatorSettings, DebtWorker, Dispatcher, QueueDispatcher, ResultReader,
    ReviewWorker, WorkerPool, WorkerPoolHandle,
};
use crate::source::{GitHubClient, SourceHost};
use crate::store::{BlobStore, FsStore};

pub struct App {
    pub config: Config,
    pub store: Arc<dyn BlobStore>,
    pub source: Arc<dyn SourceHost>,
    pub analysis: AnalysisClient,
}

impl App {
    /// Directory-backed store under `store.root/store.bucket`, GitHub source, Gemini analysis.
    pub fn from_config(config: Config) -> Result<Self> {
        let store: Arc<dyn BlobStore> =
            Arc::new(FsStore::new(&config.store.root, &config.store.bucket));
        let source: Arc<dyn SourceHost> = Arc::new(GitHubClient::new(&config.source)?);
        let analysis = AnalysisClient::new(Arc::new(GeminiClient::new(&config.analysis)?));
        Ok(Self::with_parts(config, store, source, analysis))
    }

    pub fn with_parts(
        config: Config,
        store: Arc<dyn BlobStore>,
        source: Arc<dyn SourceHost>,
        analysis: AnalysisClient,
    ) -> Self {
        Self {
            config,
            store,
            source,
            analysis,
        }
    }

    pub fn review_worker(&self) -> ReviewWorker {
        ReviewWorker::new(self.store.clone(), self.source.clone(), self.analysis.clone())
    }

    pub fn debt_worker(&self) -> DebtWorker {
        DebtWorker::new(self.store.clone(), self.analysis.clone())
    }

    /// Start an in-process pool with each enabled worker registered under its target.
    pub fn start_pool(&self) -> (QueueDispatcher, WorkerPoolHandle) {
        let workers = &self.config.workers;
        let mut pool = WorkerPool::new();
        if let Some(target) = workers.review_target() {
            pool = pool.register(target, Arc::new(self.review_worker()));
        }
        if let Some(target) = workers.debt_target() {
            pool = pool.register(target, Arc::new(self.debt_worker()));
        }
        pool.start(workers.queue_capacity, workers.accept_timeout())
    }

    pub fn coordinator(&self, dispatcher: Arc<dyn Dispatcher>) -> Coordinator {
        Coordinator::new(
            self.store.clone(),
            self.source.clone(),
            dispatcher,
            CoordinatorSettings::from_config(&self.config),
        )
    }

    pub fn reader(&self) -> ResultReader {
        ResultReader::new(self.store.clone())
    }
}
