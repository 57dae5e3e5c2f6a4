//! Typed error hierarchy for reposcope.
//!
//! One enum per subsystem:
//! - `StoreError` — blob store reads and writes
//! - `SourceError` — source-hosting API calls
//! - `AnalysisError` — generative analysis service calls and output decoding
//! - `DispatchError` — handing a job to a worker
//! - `WorkerError` — job-level worker failures
//! - `ReaderError` — polling and decoding published reports
//! - `RunError` — the synchronous `start_run` contract

use thiserror::Error;

/// Errors from the blob store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Object not found: {key}")]
    NotFound { key: String },

    #[error("Invalid object key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Store I/O error on {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Store metadata error on {key}: {message}")]
    Metadata { key: String, message: String },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Errors from the source-hosting API.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Source host returned {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

/// Errors from the generative analysis service.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("GenAI API key is missing.")]
    MissingApiKey,

    #[error("Analysis request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("Analysis service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Analysis service returned no candidate text")]
    EmptyResponse,

    #[error("Malformed analysis output: {0}")]
    MalformedOutput(String),
}

/// Errors from dispatching a job to a worker.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("No worker registered under '{target}'")]
    UnknownTarget { target: String },

    #[error("Worker queue for '{target}' is closed")]
    Unreachable { target: String },

    #[error("Worker queue for '{target}' did not accept the job within {timeout_ms}ms")]
    NotAccepted { target: String, timeout_ms: u64 },
}

/// Job-level worker failures. Logged by the worker pool, never surfaced to clients.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Commit artifact {key} is missing for run {run_id}")]
    MissingArtifact { run_id: String, key: String },

    #[error("Commit artifact {key} is unreadable: {message}")]
    UnreadableArtifact { key: String, message: String },

    #[error("Failed to publish {key}: {message}")]
    Persistence { key: String, message: String },
}

/// Errors from the status/result reader.
#[derive(Debug, Error)]
pub enum ReaderError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Report {key} is not valid JSON: {message}")]
    Undecodable { key: String, message: String },

    #[error("Run still processing after {attempts} polls")]
    TimedOut { attempts: u32 },
}

/// Errors from `Coordinator::start_run`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid repository URL '{url}'. Must start with https://github.com/ and name owner/repo")]
    InvalidInput { url: String },

    #[error("Internal error: {0}")]
    Internal(String),
}
