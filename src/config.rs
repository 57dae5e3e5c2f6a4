//! Layered configuration for reposcope.
//!
//! Values are resolved file → environment → CLI flags. The file is
//! `reposcope.toml` in the working directory unless `--config` names another.
//!
//! ```toml
//! [store]
//! bucket = "reposcope-reports"
//! root = ".reposcope/store"
//! region = "us-east-1"
//!
//! [source]
//! api_base = "https://api.github.com"
//! raw_base = "https://raw.githubusercontent.com"
//! timeout_secs = 30
//!
//! [analysis]
//! endpoint = "https://generativelanguage.googleapis.com/v1beta"
//! model = "gemini-2.0-flash"
//! timeout_secs = 60
//!
//! [workers]
//! review = "code-review"
//! debt = "technical-debt"
//! queue_capacity = 64
//! accept_timeout_ms = 2000
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "reposcope.toml";

/// A credential that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSection {
    /// Target store identifier (bucket name).
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// Root directory of the local object store.
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
    /// Region echoed back to clients alongside the bucket.
    #[serde(default = "default_region")]
    pub region: String,
}

fn default_bucket() -> String {
    "reposcope-reports".to_string()
}

fn default_store_root() -> PathBuf {
    PathBuf::from(".reposcope/store")
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            bucket: default_bucket(),
            root: default_store_root(),
            region: default_region(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
    /// Optional bearer token; raises the source host's rate limit.
    #[serde(default)]
    pub token: Option<Secret>,
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}

fn default_source_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Automated-Code-Review-Assistant".to_string()
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            raw_base: default_raw_base(),
            token: None,
            timeout_secs: default_source_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSection {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Without a key every analysis degrades to an explicit error report.
    #[serde(default)]
    pub api_key: Option<Secret>,
    #[serde(default = "default_analysis_timeout")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_analysis_timeout() -> u64 {
    60
}

impl Default for AnalysisSection {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: None,
            timeout_secs: default_analysis_timeout(),
        }
    }
}

/// Downstream worker identifiers. An empty identifier disables dispatch to that worker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersSection {
    #[serde(default = "default_review_worker")]
    pub review: String,
    #[serde(default = "default_debt_worker")]
    pub debt: String,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_accept_timeout_ms")]
    pub accept_timeout_ms: u64,
}

fn default_review_worker() -> String {
    "code-review".to_string()
}

fn default_debt_worker() -> String {
    "technical-debt".to_string()
}

fn default_queue_capacity() -> usize {
    64
}

fn default_accept_timeout_ms() -> u64 {
    2000
}

impl Default for WorkersSection {
    fn default() -> Self {
        Self {
            review: default_review_worker(),
            debt: default_debt_worker(),
            queue_capacity: default_queue_capacity(),
            accept_timeout_ms: default_accept_timeout_ms(),
        }
    }
}

impl WorkersSection {
    pub fn review_target(&self) -> Option<&str> {
        Some(self.review.trim()).filter(|s| !s.is_empty())
    }

    pub fn debt_target(&self) -> Option<&str> {
        Some(self.debt.trim()).filter(|s| !s.is_empty())
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Resolved runtime configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub analysis: AnalysisSection,
    #[serde(default)]
    pub workers: WorkersSection,
    #[serde(default)]
    pub server: ServerSection,
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse reposcope.toml")
    }

    /// Load configuration from a TOML file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    /// Resolve configuration: an explicit path must exist; otherwise
    /// `reposcope.toml` is used when present. Environment overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        // A missing .env is the common case
        let _ = dotenvy::dotenv();

        let mut config = match explicit {
            Some(path) => Self::load_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`. Empty values are ignored
    /// except for worker identifiers, where empty disables dispatch.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty("GITHUB_TOKEN") {
            self.source.token = Some(Secret::new(token));
        }
        if let Some(key) = non_empty("GENAI_API_KEY") {
            self.analysis.api_key = Some(Secret::new(key));
        }
        if let Some(bucket) = non_empty("REPORTS_BUCKET") {
            self.store.bucket = bucket;
        }
        if let Some(region) = non_empty("REPORTS_REGION").or_else(|| non_empty("AWS_REGION")) {
            self.store.region = region;
        }
        if let Some(root) = non_empty("REPOSCOPE_STORE_ROOT") {
            self.store.root = PathBuf::from(root);
        }
        if let Some(review) = lookup("REVIEW_WORKER") {
            self.workers.review = review;
        }
        if let Some(debt) = lookup("DEBT_WORKER") {
            self.workers.debt = debt;
        }
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.analysis.api_key.is_none() {
            warnings.push(
                "No analysis API key configured (GENAI_API_KEY); reports will carry an error instead of results"
                    .to_string(),
            );
        }
        if self.source.token.is_none() {
            warnings.push(
                "No GITHUB_TOKEN configured; source host requests are subject to anonymous rate limits"
                    .to_string(),
            );
        }
        if self.workers.review_target().is_none() {
            warnings.push(
                "Review worker identifier is empty; code reviews will not be dispatched"
                    .to_string(),
            );
        }
        if self.workers.debt_target().is_none() {
            warnings.push(
                "Debt worker identifier is empty; technical-debt reports will not be dispatched"
                    .to_string(),
            );
        }
        if self.workers.queue_capacity == 0 {
            warnings.push("workers.queue_capacity is 0; using 1".to_string());
        }
        if self.store.bucket.trim().is_empty() {
            warnings.push("store.bucket is empty".to_string());
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.store.bucket, "reposcope-reports");
        assert_eq!(config.store.region, "us-east-1");
        assert_eq!(config.source.api_base, "https://api.github.com");
        assert_eq!(config.analysis.model, "gemini-2.0-flash");
        assert_eq!(config.workers.review_target(), Some("code-review"));
        assert_eq!(config.workers.debt_target(), Some("technical-debt"));
        assert_eq!(config.server.port, 8080);
        assert!(config.analysis.api_key.is_none());
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
            [store]
            bucket = "team-reports"

            [workers]
            queue_capacity = 8
            "#,
        )
        .unwrap();
        assert_eq!(config.store.bucket, "team-reports");
        assert_eq!(config.store.region, "us-east-1");
        assert_eq!(config.workers.queue_capacity, 8);
        assert_eq!(config.workers.review, "code-review");
    }

    #[test]
    fn test_parse_invalid_toml_fails() {
        assert!(Config::parse("[store\nbucket=").is_err());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::parse("[store]\nbucket = \"from-file\"").unwrap();
        config.apply_env(env(&[
            ("REPORTS_BUCKET", "from-env"),
            ("GENAI_API_KEY", "k-123"),
            ("GITHUB_TOKEN", "ghp_abc"),
            ("AWS_REGION", "eu-west-1"),
        ]));
        assert_eq!(config.store.bucket, "from-env");
        assert_eq!(config.store.region, "eu-west-1");
        assert_eq!(config.analysis.api_key.as_ref().map(Secret::expose), Some("k-123"));
        assert_eq!(config.source.token.as_ref().map(Secret::expose), Some("ghp_abc"));
    }

    #[test]
    fn test_reports_region_beats_aws_region() {
        let mut config = Config::default();
        config.apply_env(env(&[("AWS_REGION", "eu-west-1"), ("REPORTS_REGION", "ap-south-1")]));
        assert_eq!(config.store.region, "ap-south-1");
    }

    #[test]
    fn test_empty_worker_env_disables_dispatch() {
        let mut config = Config::default();
        config.apply_env(env(&[("REVIEW_WORKER", "")]));
        assert_eq!(config.workers.review_target(), None);
        assert_eq!(config.workers.debt_target(), Some("technical-debt"));
    }

    #[test]
    fn test_empty_secret_env_is_ignored() {
        let mut config = Config::default();
        config.apply_env(env(&[("GENAI_API_KEY", "  ")]));
        assert!(config.analysis.api_key.is_none());
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let mut config = Config::default();
        config.apply_env(env(&[("GENAI_API_KEY", "super-secret-key")]));
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret-key"));
        assert!(rendered.contains("Secret(***)"));
    }

    #[test]
    fn test_validate_warns_on_missing_key_and_zero_capacity() {
        let mut config = Config::default();
        config.workers.queue_capacity = 0;
        let warnings = config.validate();
        assert!(warnings.iter().any(|w| w.contains("GENAI_API_KEY")));
        assert!(warnings.iter().any(|w| w.contains("queue_capacity")));
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_load_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reposcope.toml");
        std::fs::write(&path, "[server]\nport = 9191\n").unwrap();
        let config = Config::load_file(&path).unwrap();
        assert_eq!(config.server.port, 9191);
        assert_eq!(config.server.host, "127.0.0.1");
    }
}
