//! Remote source client.
//!
//! The source host is a read-only, rate-limited remote. Callers treat every
//! failure here as recoverable: the coordinator substitutes a fallback commit
//! line, the review worker analyzes whatever sample it managed to collect.

pub mod github;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::errors::SourceError;

pub use github::GitHubClient;

pub type Result<T> = std::result::Result<T, SourceError>;

/// Number of most-recent commits the coordinator hands to the debt worker.
pub const COMMIT_LIMIT: usize = 100;

/// Branch used when the repository's default branch can't be resolved.
pub const FALLBACK_BRANCH: &str = "main";

static REPO_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://github\.com/([A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)/([A-Za-z0-9._-]+?)(?:\.git)?/?$")
        .expect("repository URL pattern is valid")
});

/// One commit, flattened to the fields the debt analysis needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub author: String,
    pub date: String,
    pub message: String,
}

/// Entry in a recursive repository tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TreeEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "blob"
    }
}

/// Read access to a source-hosting service.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// Most recent commits, newest first, at most `limit`.
    async fn list_commits(&self, repo: &str, limit: usize) -> Result<Vec<Commit>>;

    /// The repository's default branch name.
    async fn default_branch(&self, repo: &str) -> Result<String>;

    /// Recursive file tree at `reference`.
    async fn list_tree(&self, repo: &str, reference: &str) -> Result<Vec<TreeEntry>>;

    /// Raw content of one file at `reference`.
    async fn read_file(&self, repo: &str, reference: &str, path: &str) -> Result<String>;
}

/// Parse the normalized `owner/name` slug from a repository URL.
///
/// Only `https://github.com/<owner>/<name>` is accepted, with an optional
/// trailing `/` or `.git`. Deeper paths (`/tree/main`, `/issues`) are rejected.
pub fn parse_repo_url(url: &str) -> Option<String> {
    let caps = REPO_URL_RE.captures(url.trim())?;
    let owner = caps.get(1)?.as_str();
    let name = caps.get(2)?.as_str();
    if name.chars().all(|c| c == '.') {
        return None;
    }
    Some(format!("{}/{}", owner, name))
}

/// Encode commits as `sha|author|date|message` lines, newline-terminated.
/// Newlines inside a message collapse to spaces so each commit is one line.
pub fn encode_commit_text(commits: &[Commit]) -> String {
    let mut out = String::new();
    for c in commits {
        let message = c.message.replace("\r\n", "\n").replace(['\n', '\r'], " ");
        out.push_str(&format!("{}|{}|{}|{}\n", c.sha, c.author, c.date, message));
    }
    out
}

/// Single-line stand-in used when the commit history can't be fetched, so the
/// debt worker still has input to analyze.
pub fn fallback_commit_text(error: &str) -> String {
    format!("dummy|author|date|Fallback commit due to error: {}", error)
}
