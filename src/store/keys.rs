//! Store key layout.
//!
//! ```text
//! data/commits_<run_id>.json            commit artifact (coordinator → debt worker)
//! reports/code_review_<run_id>.json     run-scoped, write-once once complete
//! reports/code_review_latest.json       last completed review, no-cache
//! reports/technical_debt_<run_id>.json
//! reports/technical_debt_latest.json
//! ```

use serde::{Deserialize, Serialize};

/// Body of a provisional report, overwritten when the owning worker completes.
pub const PROCESSING_PLACEHOLDER: &str = r#"{"status":"processing"}"#;

pub const LATEST_SUFFIX: &str = "latest";

/// The two report kinds the pipeline produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    CodeReview,
    TechnicalDebt,
}

impl ReportKind {
    pub const ALL: [ReportKind; 2] = [ReportKind::CodeReview, ReportKind::TechnicalDebt];

    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::CodeReview => "code_review",
            ReportKind::TechnicalDebt => "technical_debt",
        }
    }
}

impl std::fmt::Display for ReportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code_review" | "code-review" => Ok(ReportKind::CodeReview),
            "technical_debt" | "technical-debt" => Ok(ReportKind::TechnicalDebt),
            _ => Err(format!(
                "Invalid report kind '{}'. Valid values: code_review, technical_debt",
                s
            )),
        }
    }
}

pub fn commits_key(run_id: &str) -> String {
    format!("data/commits_{}.json", run_id)
}

pub fn report_key(kind: ReportKind, run_id: &str) -> String {
    format!("reports/{}_{}.json", kind.as_str(), run_id)
}

pub fn latest_key(kind: ReportKind) -> String {
    report_key(kind, LATEST_SUFFIX)
}

/// Commit artifact body: `{"commit_text": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitArtifact {
    #[serde(default)]
    pub commit_text: String,
}
