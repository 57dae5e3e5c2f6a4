//! Fallible-step wrapper.
//!
//! The pipeline has three failure-prone boundaries: remote fetches, analysis
//! calls, and store writes. Every call across one of them goes through
//! [`attempt`], which logs the failure once with its boundary and turns it into
//! a [`StepFailure`]. Callers then decide locally how to degrade (fallback
//! input, error report, or a logged stall).

use std::fmt;
use std::future::Future;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    RemoteFetch,
    Analysis,
    StoreWrite,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Boundary::RemoteFetch => "remote_fetch",
            Boundary::Analysis => "analysis",
            Boundary::StoreWrite => "store_write",
        })
    }
}

/// A failed step: which boundary, which step, and the error text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{boundary} step '{step}' failed: {message}")]
pub struct StepFailure {
    pub boundary: Boundary,
    pub step: String,
    pub message: String,
}

/// Run one step across `boundary`, logging and typing any failure.
pub async fn attempt<T, E, F>(boundary: Boundary, step: &str, fut: F) -> Result<T, StepFailure>
where
    F: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    match fut.await {
        Ok(value) => Ok(value),
        Err(e) => {
            let message = e.to_string();
            tracing::warn!(%boundary, step, error = %message, "step failed");
            Err(StepFailure {
                boundary,
                step: step.to_string(),
                message,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attempt_passes_success_through() {
        let out = attempt(Boundary::RemoteFetch, "list_commits", async {
            Ok::<_, std::io::Error>(7)
        })
        .await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn test_attempt_preserves_error_message() {
        let out: Result<(), _> = attempt(Boundary::Analysis, "code_review", async {
            Err::<(), _>("Malformed analysis output: expected value at line 1 column 1")
        })
        .await;
        let failure = out.unwrap_err();
        assert_eq!(failure.boundary, Boundary::Analysis);
        assert_eq!(failure.step, "code_review");
        assert_eq!(
            failure.message,
            "Malformed analysis output: expected value at line 1 column 1"
        );
    }

    #[test]
    fn test_step_failure_display_names_boundary() {
        let failure = StepFailure {
            boundary: Boundary::StoreWrite,
            step: "reports/x.json".into(),
            message: "disk full".into(),
        };
        assert_eq!(
            failure.to_string(),
            "store_write step 'reports/x.json' failed: disk full"
        );
    }
}
