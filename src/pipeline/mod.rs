//! Run coordination pipeline.
//!
//! ## Module Map
//!
//! ```text
//!   start_run(url)
//!        │
//!        v
//!  coordinator.rs ──── commit artifact + placeholders ───> BlobStore
//!        │                                                   ^   ^
//!        │ Dispatcher::dispatch(target, Job)                 │   │
//!        v                                                   │   │
//!  dispatch.rs  (QueueDispatcher → WorkerPool)               │   │
//!        │                                                   │   │
//!        ├──> review_worker.rs  (sample code → CodeReview) ──┘   │
//!        └──> debt_worker.rs    (commit artifact → TechDebt) ────┘
//!
//!  reader.rs  (ResultReader: snapshot / poll over the same keys)
//! ```
//!
//! The coordinator never waits on a worker. Workers never talk to each other;
//! the store is the only channel between stages.

pub mod coordinator;
pub mod debt_worker;
pub mod dispatch;
pub mod reader;
pub mod review_worker;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::analysis::Report;
use crate::errors::WorkerError;
use crate::step::{self, Boundary};
use crate::store::keys::{latest_key, report_key};
use crate::store::{BlobStore, CachePolicy, PutOptions};

pub use coordinator::{Coordinator, CoordinatorSettings, RunReceipt};
pub use debt_worker::DebtWorker;
pub use dispatch::{Dispatcher, QueueDispatcher, WorkerPool, WorkerPoolHandle};
pub use reader::{PollPolicy, ReportState, ResultReader, RunSnapshot, Scope};
pub use review_worker::ReviewWorker;

/// Payload handed from the coordinator to a worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub run_id: String,
    pub repo_path: String,
    pub bucket: String,
}

/// A unit of background work addressed by a dispatch target.
#[async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, job: &Job) -> Result<(), WorkerError>;
}

/// Write `report` to its run-scoped key, then to its latest key.
///
/// Both writes carry identical bytes. The run-scoped copy is immutable from
/// here on; the latest copy is always revalidated by readers. A failed
/// run-scoped write does not skip the latest write.
pub(crate) async fn publish_report<R: Report>(
    store: &dyn BlobStore,
    run_id: &str,
    report: &R,
) -> Result<(), WorkerError> {
    let run_key = report_key(R::KIND, run_id);
    let body = serde_json::to_vec(report).map_err(|e| WorkerError::Persistence {
        key: run_key.clone(),
        message: e.to_string(),
    })?;
    let body = Bytes::from(body);

    let run_write = step::attempt(
        Boundary::StoreWrite,
        &run_key,
        store.put(&run_key, body.clone(), PutOptions::json(CachePolicy::Immutable)),
    )
    .await;

    let latest = latest_key(R::KIND);
    let latest_write = step::attempt(
        Boundary::StoreWrite,
        &latest,
        store.put(&latest, body, PutOptions::json(CachePolicy::NoCache)),
    )
    .await;

    run_write
        .and(latest_write)
        .map_err(|failure| WorkerError::Persistence {
            key: failure.step,
            message: failure.message,
        })
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fakes shared by the pipeline tests.

    use super::*;
    use crate::errors::{DispatchError, SourceError, StoreError};
    use crate::source::{Commit, SourceHost, TreeEntry};
    use crate::store::{MemoryStore, ObjectMeta};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory source host. `None` fields fail with a 503.
    #[derive(Default)]
    pub struct FakeSource {
        pub commits: Option<Vec<Commit>>,
        pub branch: Option<String>,
        pub tree: Option<Vec<TreeEntry>>,
        pub files: HashMap<String, String>,
        pub reads: Mutex<Vec<String>>,
    }

    impl FakeSource {
        pub fn with_files(files: &[(&str, &str)]) -> Self {
            Self {
                commits: Some(Vec::new()),
                branch: Some("main".to_string()),
                tree: Some(
                    files
                        .iter()
                        .map(|(path, _)| blob(path))
                        .collect(),
                ),
                files: files
                    .iter()
                    .map(|(path, body)| (path.to_string(), body.to_string()))
                    .collect(),
                reads: Mutex::new(Vec::new()),
            }
        }
    }

    pub fn blob(path: &str) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind: "blob".to_string(),
        }
    }

    pub fn commit(sha: &str, message: &str) -> Commit {
        Commit {
            sha: sha.to_string(),
            author: "Ada".to_string(),
            date: "2024-01-02T03:04:05Z".to_string(),
            message: message.to_string(),
        }
    }

    fn unavailable(what: &str) -> SourceError {
        SourceError::Status {
            url: format!("fake://{}", what),
            status: 503,
        }
    }

    #[async_trait]
    impl SourceHost for FakeSource {
        async fn list_commits(
            &self,
            _repo: &str,
            limit: usize,
        ) -> crate::source::Result<Vec<Commit>> {
            let commits = self.commits.clone().ok_or_else(|| unavailable("commits"))?;
            Ok(commits.into_iter().take(limit).collect())
        }

        async fn default_branch(&self, _repo: &str) -> crate::source::Result<String> {
            self.branch.clone().ok_or_else(|| unavailable("repo"))
        }

        async fn list_tree(
            &self,
            _repo: &str,
            _reference: &str,
        ) -> crate::source::Result<Vec<TreeEntry>> {
            self.tree.clone().ok_or_else(|| unavailable("tree"))
        }

        async fn read_file(
            &self,
            _repo: &str,
            reference: &str,
            path: &str,
        ) -> crate::source::Result<String> {
            self.reads.lock().unwrap().push(format!("{}:{}", reference, path));
            self.files.get(path).cloned().ok_or_else(|| unavailable(path))
        }
    }

    /// Dispatcher that records every job it is handed.
    #[derive(Default)]
    pub struct RecordingDispatcher {
        pub jobs: Mutex<Vec<(String, Job)>>,
        pub refuse: bool,
    }

    impl RecordingDispatcher {
        pub fn targets(&self) -> Vec<String> {
            self.jobs.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
        }
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn dispatch(&self, target: &str, job: Job) -> Result<(), DispatchError> {
            if self.refuse {
                return Err(DispatchError::Unreachable {
                    target: target.to_string(),
                });
            }
            self.jobs.lock().unwrap().push((target.to_string(), job));
            Ok(())
        }
    }

    /// Memory store that rejects writes to keys starting with any listed prefix.
    #[derive(Clone, Default)]
    pub struct FlakyStore {
        pub inner: MemoryStore,
        pub fail_prefixes: Vec<String>,
    }

    impl FlakyStore {
        pub fn failing(prefixes: &[&str]) -> Self {
            Self {
                inner: MemoryStore::new(),
                fail_prefixes: prefixes.iter().map(|p| p.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl BlobStore for FlakyStore {
        async fn put(
            &self,
            key: &str,
            data: Bytes,
            options: PutOptions,
        ) -> crate::store::Result<()> {
            if self.fail_prefixes.iter().any(|p| key.starts_with(p.as_str())) {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source: std::io::Error::other("write refused"),
                });
            }
            self.inner.put(key, data, options).await
        }

        async fn get(&self, key: &str) -> crate::store::Result<Bytes> {
            self.inner.get(key).await
        }

        async fn head(&self, key: &str) -> crate::store::Result<Option<ObjectMeta>> {
            self.inner.head(key).await
        }
    }
}
