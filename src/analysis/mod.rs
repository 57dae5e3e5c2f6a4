//! Analysis service client.
//!
//! [`AnalysisClient::review`] is total: it always returns a schema-conforming
//! report. Network failures, missing credentials, and unparsable model output
//! all come back as an error report carrying the failure message.

pub mod gemini;
pub mod prompts;
pub mod reports;

use async_trait::async_trait;
use std::sync::Arc;

use crate::errors::AnalysisError;
use crate::step::{self, Boundary};
use crate::util::{extract_json_object, strip_code_fence, truncate_chars};

pub use gemini::GeminiClient;
pub use reports::{CodeReview, DebtModule, Report, ReviewFinding, TechDebt};

/// Character budget for the input embedded in a prompt.
pub const INPUT_CHAR_BUDGET: usize = 10_000;

/// Text in, text out. The remote generative service behind the analysis client.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AnalysisError>;
}

/// Decode a model answer into a report.
///
/// Strips an optional markdown fence, then decodes; if the text has prose
/// around the object, the first balanced JSON object is tried instead.
pub fn decode_report<R: Report>(text: &str) -> Result<R, AnalysisError> {
    let body = strip_code_fence(text);
    match decode_object::<R>(body) {
        Ok(report) => Ok(report),
        Err(first) => extract_json_object(body)
            .and_then(|candidate| decode_object::<R>(&candidate).ok())
            .ok_or(first),
    }
}

fn decode_object<R: Report>(text: &str) -> Result<R, AnalysisError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| AnalysisError::MalformedOutput(e.to_string()))?;
    if !value.is_object() {
        return Err(AnalysisError::MalformedOutput(
            "expected a JSON object at top level".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|e| AnalysisError::MalformedOutput(e.to_string()))
}

#[derive(Clone)]
pub struct AnalysisClient {
    generator: Arc<dyn TextGenerator>,
    input_budget: usize,
}

impl AnalysisClient {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            input_budget: INPUT_CHAR_BUDGET,
        }
    }

    pub fn with_input_budget(mut self, chars: usize) -> Self {
        self.input_budget = chars;
        self
    }

    /// Analyze `input` with the instruction for `R`, never failing.
    pub async fn review<R: Report>(&self, input: &str) -> R {
        let prompt = prompts::build_prompt(R::KIND, truncate_chars(input, self.input_budget));
        let outcome = step::attempt(Boundary::Analysis, R::KIND.as_str(), async {
            let text = self.generator.generate(&prompt).await?;
            decode_report::<R>(&text)
        })
        .await;

        match outcome {
            Ok(report) => report.normalized(),
            Err(failure) => R::error_report(failure.message),
        }
    }
}
