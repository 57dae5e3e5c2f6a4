//! Fixed instruction templates, one per report kind.

use crate::store::keys::ReportKind;

const CODE_REVIEW_INSTRUCTION: &str = "You are an expert technical code reviewer. \
Provide a performance and logic review of the following repository code. \
Give suggestions to improve, and provide the 'improved_code'. \
Return ONLY a raw JSON string like this:\n\
{\"score\": 85, \"reviews\": [{\"type\": \"Performance Bottleneck\", \"message\": \"Use generators instead of lists.\", \"snippet\": \"bad_code()\", \"improved_code\": \"good_code()\", \"isDanger\": true}]}";

const TECH_DEBT_INSTRUCTION: &str = "You are an AI architect analyzing repository history. \
Review the following commit data (representing the last 100 commits). \
Identify modules that have high churn, bug fixes, or complex changes, \
and estimate their 'Refactoring Urgency' (0-100 score). \
Return ONLY a raw JSON format like this:\n\
{\"techDebtScore\": 110, \"modules\": [{\"name\": \"backend/auth.py\", \"urgency\": 85, \"reason\": \"High churn\"}]}";

pub fn instruction(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::CodeReview => CODE_REVIEW_INSTRUCTION,
        ReportKind::TechnicalDebt => TECH_DEBT_INSTRUCTION,
    }
}

fn input_heading(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::CodeReview => "Code to review:",
        ReportKind::TechnicalDebt => "Commit Data:",
    }
}

/// Combine the instruction for `kind` with already-truncated input.
pub fn build_prompt(kind: ReportKind, input: &str) -> String {
    format!("{}\n\n{}\n{}", instruction(kind), input_heading(kind), input)
}
