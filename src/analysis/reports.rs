//! Typed report schemas.
//!
//! Both report kinds deserialize leniently: every field has a default, so a
//! model answer that omits a field still yields a schema-conforming report. An
//! error report is the same schema with `error` set and zeroed content.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::store::keys::ReportKind;

/// Score used for a code review that could not be produced.
pub const ERROR_REVIEW_SCORE: i64 = 80;

/// A report the analysis service can produce.
pub trait Report: Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: ReportKind;

    /// Schema-conforming report signalling an upstream failure.
    fn error_report(message: impl Into<String>) -> Self;

    /// Clamp bounded fields into range.
    fn normalized(self) -> Self;

    fn error(&self) -> Option<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewFinding {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub improved_code: String,
    #[serde(rename = "isDanger", default)]
    pub is_danger: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CodeReview {
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub reviews: Vec<ReviewFinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Report for CodeReview {
    const KIND: ReportKind = ReportKind::CodeReview;

    fn error_report(message: impl Into<String>) -> Self {
        Self {
            score: ERROR_REVIEW_SCORE,
            reviews: Vec::new(),
            error: Some(message.into()),
        }
    }

    fn normalized(mut self) -> Self {
        self.score = self.score.clamp(0, 100);
        self
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebtModule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub urgency: i64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TechDebt {
    #[serde(rename = "techDebtScore", default)]
    pub tech_debt_score: i64,
    #[serde(default)]
    pub modules: Vec<DebtModule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Report for TechDebt {
    const KIND: ReportKind = ReportKind::TechnicalDebt;

    fn error_report(message: impl Into<String>) -> Self {
        Self {
            tech_debt_score: 0,
            modules: Vec::new(),
            error: Some(message.into()),
        }
    }

    // The aggregate score is unbounded; only per-module urgency is a 0-100 scale
    fn normalized(mut self) -> Self {
        for module in &mut self.modules {
            module.urgency = module.urgency.clamp(0, 100);
        }
        self
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}
