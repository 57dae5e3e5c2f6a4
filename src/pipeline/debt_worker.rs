//! Technical debt worker.
//!
//! Reads the commit artifact the coordinator stored for this run and publishes
//! a debt report derived from it. A missing artifact fails the job and leaves
//! the placeholder in place.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Job, Worker, publish_report};
use crate::analysis::{AnalysisClient, TechDebt};
use crate::errors::WorkerError;
use crate::store::BlobStore;
use crate::store::keys::{CommitArtifact, commits_key};

pub struct DebtWorker {
    store: Arc<dyn BlobStore>,
    analysis: AnalysisClient,
}

impl DebtWorker {
    pub fn new(store: Arc<dyn BlobStore>, analysis: AnalysisClient) -> Self {
        Self { store, analysis }
    }

    async fn load_artifact(&self, run_id: &str) -> Result<CommitArtifact, WorkerError> {
        let key = commits_key(run_id);
        let raw = self.store.get(&key).await.map_err(|e| {
            if e.is_not_found() {
                WorkerError::MissingArtifact {
                    run_id: run_id.to_string(),
                    key: key.clone(),
                }
            } else {
                WorkerError::UnreadableArtifact {
                    key: key.clone(),
                    message: e.to_string(),
                }
            }
        })?;
        serde_json::from_slice(&raw).map_err(|e| WorkerError::UnreadableArtifact {
            key,
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl Worker for DebtWorker {
    fn name(&self) -> &'static str {
        "technical_debt"
    }

    async fn run(&self, job: &Job) -> Result<(), WorkerError> {
        let artifact = self.load_artifact(&job.run_id).await?;
        let debt: TechDebt = self.analysis.review(&artifact.commit_text).await;
        tracing::info!(
            score = debt.tech_debt_score,
            modules = debt.modules.len(),
            "technical debt report ready"
        );
        publish_report(self.store.as_ref(), &job.run_id, &debt).await
    }
}
