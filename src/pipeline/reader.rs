//! Status/result reader.
//!
//! Reads report keys and classifies each as missing, still processing, or
//! ready. Readers never write. A ready report may still be an error report;
//! that is the worker's final answer and ends polling like any other.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ReaderError;
use crate::store::BlobStore;
use crate::store::keys::{ReportKind, latest_key, report_key};

/// Which copy of the reports to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Latest,
    Run(String),
}

impl Scope {
    pub fn key(&self, kind: ReportKind) -> String {
        match self {
            Scope::Latest => latest_key(kind),
            Scope::Run(run_id) => report_key(kind, run_id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "report", rename_all = "snake_case")]
pub enum ReportState {
    Missing,
    Processing,
    Ready(Value),
}

impl ReportState {
    /// Classify a stored report body.
    pub fn from_value(value: Value) -> Self {
        if value.get("status").and_then(Value::as_str) == Some("processing") {
            ReportState::Processing
        } else {
            ReportState::Ready(value)
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ReportState::Ready(_))
    }

    /// The `error` field of a ready report, if the worker published one.
    pub fn error(&self) -> Option<&str> {
        match self {
            ReportState::Ready(value) => value.get("error").and_then(Value::as_str),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSnapshot {
    pub complete: bool,
    pub code_review: ReportState,
    pub technical_debt: ReportState,
}

impl RunSnapshot {
    pub fn new(code_review: ReportState, technical_debt: ReportState) -> Self {
        Self {
            complete: code_review.is_ready() && technical_debt.is_ready(),
            code_review,
            technical_debt,
        }
    }

    pub fn get(&self, kind: ReportKind) -> &ReportState {
        match kind {
            ReportKind::CodeReview => &self.code_review,
            ReportKind::TechnicalDebt => &self.technical_debt,
        }
    }
}

/// Fixed-interval polling schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 30,
        }
    }
}

#[derive(Clone)]
pub struct ResultReader {
    store: Arc<dyn BlobStore>,
}

impl ResultReader {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    pub async fn report(
        &self,
        kind: ReportKind,
        scope: &Scope,
    ) -> Result<ReportState, ReaderError> {
        let key = scope.key(kind);
        let raw = match self.store.get(&key).await {
            Ok(raw) => raw,
            Err(e) if e.is_not_found() => return Ok(ReportState::Missing),
            Err(e) => return Err(e.into()),
        };
        let value: Value = serde_json::from_slice(&raw).map_err(|e| ReaderError::Undecodable {
            key,
            message: e.to_string(),
        })?;
        Ok(ReportState::from_value(value))
    }

    pub async fn snapshot(&self, scope: &Scope) -> Result<RunSnapshot, ReaderError> {
        let (code_review, technical_debt) = tokio::try_join!(
            self.report(ReportKind::CodeReview, scope),
            self.report(ReportKind::TechnicalDebt, scope),
        )?;
        Ok(RunSnapshot::new(code_review, technical_debt))
    }

    /// Poll until both reports are ready.
    ///
    /// Read errors count as a not-yet-complete attempt. Gives up with
    /// `ReaderError::TimedOut` after `policy.max_attempts` reads.
    pub async fn poll(
        &self,
        scope: &Scope,
        policy: PollPolicy,
    ) -> Result<RunSnapshot, ReaderError> {
        for attempt in 1..=policy.max_attempts {
            match self.snapshot(scope).await {
                Ok(snapshot) if snapshot.complete => return Ok(snapshot),
                Ok(_) => tracing::debug!(attempt, "reports still processing"),
                Err(e) => tracing::warn!(attempt, error = %e, "poll read failed"),
            }
            if attempt < policy.max_attempts {
                tokio::time::sleep(policy.interval).await;
            }
        }
        Err(ReaderError::TimedOut {
            attempts: policy.max_attempts,
        })
    }
}
