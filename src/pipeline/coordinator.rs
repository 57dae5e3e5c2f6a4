//! Run coordinator: the synchronous half of the pipeline.
//!
//! `start_run` validates the URL, snapshots recent commits into the store,
//! seeds "processing" placeholders for both reports, and hands one job to each
//! worker. It returns as soon as both dispatches have been attempted.
//!
//! A worker is only dispatched once its inputs are in the store: the review
//! worker needs its placeholders, the debt worker additionally needs the
//! commit artifact. Anything that fails after URL validation is logged and the
//! run still returns a receipt; the affected report just stays "processing".

use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use super::{Dispatcher, Job};
use crate::config::Config;
use crate::errors::RunError;
use crate::observability::run_span;
use crate::source::{
    COMMIT_LIMIT, SourceHost, encode_commit_text, fallback_commit_text, parse_repo_url,
};
use crate::step::{self, Boundary};
use crate::store::keys::{
    CommitArtifact, PROCESSING_PLACEHOLDER, ReportKind, commits_key, latest_key, report_key,
};
use crate::store::{BlobStore, CachePolicy, PutOptions};

/// Where results land and which workers to dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub bucket: String,
    pub region: String,
    /// `None` disables dispatch to that worker.
    pub review_target: Option<String>,
    pub debt_target: Option<String>,
}

impl CoordinatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            bucket: config.store.bucket.clone(),
            region: config.store.region.clone(),
            review_target: config.workers.review_target().map(str::to_string),
            debt_target: config.workers.debt_target().map(str::to_string),
        }
    }
}

/// Returned to the caller of `start_run`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReceipt {
    pub run_id: String,
    pub bucket: String,
    pub region: String,
}

pub struct Coordinator {
    store: Arc<dyn BlobStore>,
    source: Arc<dyn SourceHost>,
    dispatcher: Arc<dyn Dispatcher>,
    settings: CoordinatorSettings,
}

impl Coordinator {
    pub fn new(
        store: Arc<dyn BlobStore>,
        source: Arc<dyn SourceHost>,
        dispatcher: Arc<dyn Dispatcher>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            store,
            source,
            dispatcher,
            settings,
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Start an analysis run for `repo_url`.
    ///
    /// Fails only on an invalid URL (nothing is written) or on an internal
    /// error before anything was dispatched.
    pub async fn start_run(&self, repo_url: &str) -> Result<RunReceipt, RunError> {
        let repo_path = parse_repo_url(repo_url).ok_or_else(|| RunError::InvalidInput {
            url: repo_url.to_string(),
        })?;
        let run_id = Uuid::new_v4().to_string();

        self.coordinate(repo_path, run_id.clone())
            .instrument(run_span("start_run", &run_id))
            .await?;

        Ok(RunReceipt {
            run_id,
            bucket: self.settings.bucket.clone(),
            region: self.settings.region.clone(),
        })
    }

    async fn coordinate(&self, repo_path: String, run_id: String) -> Result<(), RunError> {
        let commit_text = match step::attempt(
            Boundary::RemoteFetch,
            "list_commits",
            self.source.list_commits(&repo_path, COMMIT_LIMIT),
        )
        .await
        {
            Ok(commits) => encode_commit_text(&commits),
            Err(failure) => fallback_commit_text(&failure.message),
        };

        let artifact = serde_json::to_vec(&CommitArtifact { commit_text })
            .map_err(|e| RunError::Internal(format!("Failed to encode commit artifact: {}", e)))?;
        let artifact_stored = self
            .write(&commits_key(&run_id), Bytes::from(artifact), CachePolicy::Default)
            .await;

        let review_ready = self.seed_placeholders(ReportKind::CodeReview, &run_id).await;
        let debt_ready = self.seed_placeholders(ReportKind::TechnicalDebt, &run_id).await;

        let job = Job {
            run_id,
            repo_path,
            bucket: self.settings.bucket.clone(),
        };

        if review_ready {
            self.dispatch(
                ReportKind::CodeReview,
                self.settings.review_target.as_deref(),
                job.clone(),
            )
            .await;
        } else {
            tracing::warn!("review worker not dispatched: placeholders missing");
        }

        if artifact_stored && debt_ready {
            self.dispatch(
                ReportKind::TechnicalDebt,
                self.settings.debt_target.as_deref(),
                job,
            )
            .await;
        } else {
            tracing::warn!(
                artifact_stored,
                debt_ready,
                "debt worker not dispatched: inputs missing"
            );
        }

        tracing::info!("run started");
        Ok(())
    }

    async fn write(&self, key: &str, body: Bytes, cache: CachePolicy) -> bool {
        step::attempt(
            Boundary::StoreWrite,
            key,
            self.store.put(key, body, PutOptions::json(cache)),
        )
        .await
        .is_ok()
    }

    /// Seed the run-scoped and latest placeholders for `kind`.
    async fn seed_placeholders(&self, kind: ReportKind, run_id: &str) -> bool {
        let body = Bytes::from_static(PROCESSING_PLACEHOLDER.as_bytes());
        let run_scoped = self
            .write(&report_key(kind, run_id), body.clone(), CachePolicy::NoCache)
            .await;
        let latest = self.write(&latest_key(kind), body, CachePolicy::NoCache).await;
        run_scoped && latest
    }

    async fn dispatch(&self, kind: ReportKind, target: Option<&str>, job: Job) {
        let Some(target) = target else {
            tracing::info!(%kind, "no worker configured, skipping dispatch");
            return;
        };
        match self.dispatcher.dispatch(target, job).await {
            Ok(()) => tracing::debug!(%kind, target, "job dispatched"),
            Err(e) => tracing::error!(%kind, target, error = %e, "dispatch failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{FakeSource, FlakyStore, RecordingDispatcher, commit};
    use crate::store::MemoryStore;

    fn settings() -> CoordinatorSettings {
        CoordinatorSettings {
            bucket: "reports-bucket".to_string(),
            region: "eu-west-1".to_string(),
            review_target: Some("code-review".to_string()),
            debt_target: Some("technical-debt".to_string()),
        }
    }

    fn coordinator(
        store: Arc<dyn BlobStore>,
        source: FakeSource,
        dispatcher: Arc<RecordingDispatcher>,
    ) -> Coordinator {
        Coordinator::new(store, Arc::new(source), dispatcher, settings())
    }

    async fn artifact_text(store: &MemoryStore, run_id: &str) -> String {
        let raw = store.get(&commits_key(run_id)).await.unwrap();
        serde_json::from_slice::<CommitArtifact>(&raw).unwrap().commit_text
    }

    // ── validation ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_invalid_url_writes_nothing() {
        let store = MemoryStore::new();
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let coordinator = coordinator(
            Arc::new(store.clone()),
            FakeSource::default(),
            dispatcher.clone(),
        );

        for url in ["", "https://gitlab.com/octo/demo", "https://github.com/octo"] {
            let err = coordinator.start_run(url).await.unwrap_err();
            assert!(matches!(err, RunError::InvalidInput { .. }), "{}", url);
        }
        assert!(store.keys().is_empty());
        assert!(dispatcher.targets().is_empty());
    }

    // ── happy path ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_start_run_writes_artifact_placeholders_and_dispatches() {
        let store = MemoryStore::new();
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let source = FakeSource {
            commits: Some(vec![commit("a1", "fix auth"), commit("b2", "add\ntests")]),
            ..Default::default()
        };
        let coordinator = coordinator(Arc::new(store.clone()), source, dispatcher.clone());

        let receipt = coordinator.start_run("https://github.com/octo/demo.git").await.unwrap();
        assert_eq!(receipt.bucket, "reports-bucket");
        assert_eq!(receipt.region, "eu-west-1");
        assert_eq!(receipt.run_id.len(), 36);

        assert_eq!(
            artifact_text(&store, &receipt.run_id).await,
            "a1|Ada|2024-01-02T03:04:05Z|fix auth\nb2|Ada|2024-01-02T03:04:05Z|add tests\n"
        );
        for kind in ReportKind::ALL {
            for key in [report_key(kind, &receipt.run_id), latest_key(kind)] {
                assert_eq!(store.get(&key).await.unwrap(), PROCESSING_PLACEHOLDER.as_bytes());
                let meta = store.head(&key).await.unwrap().unwrap();
                assert_eq!(meta.cache, CachePolicy::NoCache);
            }
        }

        let jobs = dispatcher.jobs.lock().unwrap().clone();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].0, "code-review");
        assert_eq!(jobs[1].0, "technical-debt");
        for (_, job) in jobs {
            assert_eq!(job.run_id, receipt.run_id);
            assert_eq!(job.repo_path, "octo/demo");
            assert_eq!(job.bucket, "reports-bucket");
        }
    }

    #[tokio::test]
    async fn test_run_ids_are_unique() {
        let store = MemoryStore::new();
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let coordinator = coordinator(Arc::new(store), FakeSource::default(), dispatcher);
        let a = coordinator.start_run("https://github.com/octo/demo").await.unwrap();
        let b = coordinator.start_run("https://github.com/octo/demo").await.unwrap();
        assert_ne!(a.run_id, b.run_id);
    }

    // ── degradation ───────────────────────────────────────────────────

    #[tokio::test]
    async fn test_commit_fetch_failure_writes_fallback_line() {
        let store = MemoryStore::new();
        let dispatcher = Arc::new(RecordingDispatcher::default());
        // commits: None makes the fake return a 503
        let coordinator = coordinator(
            Arc::new(store.clone()),
            FakeSource::default(),
            dispatcher.clone(),
        );

        let receipt = coordinator.start_run("https://github.com/octo/demo").await.unwrap();
        let text = artifact_text(&store, &receipt.run_id).await;
        assert!(text.starts_with("dummy|author|date|Fallback commit due to error: "), "{}", text);
        assert!(text.contains("503"));
        assert_eq!(dispatcher.targets(), vec!["code-review", "technical-debt"]);
    }

    #[tokio::test]
    async fn test_artifact_write_failure_skips_debt_dispatch_only() {
        let store = FlakyStore::failing(&["data/"]);
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let coordinator = coordinator(
            Arc::new(store.clone()),
            FakeSource::default(),
            dispatcher.clone(),
        );

        let receipt = coordinator.start_run("https://github.com/octo/demo").await.unwrap();
        assert_eq!(dispatcher.targets(), vec!["code-review"]);
        assert!(
            store
                .inner
                .get(&report_key(ReportKind::TechnicalDebt, &receipt.run_id))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_placeholder_write_failure_skips_that_worker() {
        let store = FlakyStore::failing(&["reports/code_review_"]);
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let coordinator = coordinator(Arc::new(store), FakeSource::default(), dispatcher.clone());

        coordinator.start_run("https://github.com/octo/demo").await.unwrap();
        assert_eq!(dispatcher.targets(), vec!["technical-debt"]);
    }

    #[tokio::test]
    async fn test_dispatch_failure_still_returns_receipt() {
        let store = MemoryStore::new();
        let dispatcher = Arc::new(RecordingDispatcher {
            refuse: true,
            ..Default::default()
        });
        let coordinator = coordinator(Arc::new(store.clone()), FakeSource::default(), dispatcher);

        let receipt = coordinator.start_run("https://github.com/octo/demo").await.unwrap();
        assert!(store.get(&commits_key(&receipt.run_id)).await.is_ok());
    }

    #[tokio::test]
    async fn test_disabled_target_is_skipped() {
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let coordinator = Coordinator::new(
            Arc::new(MemoryStore::new()),
            Arc::new(FakeSource::default()),
            dispatcher.clone(),
            CoordinatorSettings {
                review_target: None,
                ..settings()
            },
        );
        coordinator.start_run("https://github.com/octo/demo").await.unwrap();
        assert_eq!(dispatcher.targets(), vec!["technical-debt"]);
    }
}
