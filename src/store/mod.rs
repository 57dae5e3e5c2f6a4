//! Blob store client.
//!
//! The store is the only shared mutable resource in the pipeline. It is a
//! plain key/value blob store with read-after-write consistency per key; no
//! component ever read-modify-writes a key, so there is no locking protocol
//! beyond what a backend needs internally.
//!
//! Backends:
//! - [`MemoryStore`] — in-process map, used by tests and single-process runs
//! - [`FsStore`] — directory-backed store, one file per key plus a metadata sidecar

pub mod fs;
pub mod keys;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::errors::StoreError;

pub use fs::FsStore;
pub use memory::MemoryStore;

pub type Result<T> = std::result::Result<T, StoreError>;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Cache directive attached to an object at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// No explicit directive.
    #[default]
    Default,
    /// Clients must revalidate on every read ("latest" pointers, placeholders).
    NoCache,
    /// Content never changes once written (completed run-scoped reports).
    Immutable,
}

impl CachePolicy {
    /// The `Cache-Control` header value for this policy, if any.
    pub fn header_value(self) -> Option<&'static str> {
        match self {
            CachePolicy::Default => None,
            CachePolicy::NoCache => Some("no-cache"),
            CachePolicy::Immutable => Some("public, max-age=31536000, immutable"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: String,
    pub cache: CachePolicy,
}

impl PutOptions {
    pub fn json(cache: CachePolicy) -> Self {
        Self {
            content_type: JSON_CONTENT_TYPE.to_string(),
            cache,
        }
    }
}

/// Metadata recorded alongside each object.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub content_type: String,
    pub cache: CachePolicy,
    pub last_modified: DateTime<Utc>,
}

/// Key/value blob store.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    /// Write (or overwrite) an object.
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()>;

    /// Read an object. Returns `StoreError::NotFound` if it doesn't exist.
    async fn get(&self, key: &str) -> Result<Bytes>;

    /// Metadata without content. `None` if the object doesn't exist.
    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>>;
}

/// Reject keys that could escape a backend's namespace.
pub(crate) fn validate_key(key: &str) -> Result<()> {
    let invalid = |reason: &str| {
        Err(StoreError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        })
    };
    if key.is_empty() {
        return invalid("empty key");
    }
    if key.starts_with('/') || key.contains('\\') {
        return invalid("keys must be relative with '/' separators");
    }
    if key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
        return invalid("empty or relative path segment");
    }
    if key.split('/').next() == Some(fs::META_DIR) {
        return invalid("reserved prefix");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_policy_header_values() {
        assert_eq!(CachePolicy::Default.header_value(), None);
        assert_eq!(CachePolicy::NoCache.header_value(), Some("no-cache"));
        assert!(CachePolicy::Immutable.header_value().unwrap().contains("immutable"));
    }

    #[test]
    fn test_validate_key_accepts_layout_keys() {
        assert!(validate_key("data/commits_r1.json").is_ok());
        assert!(validate_key("reports/code_review_latest.json").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("reports/../../x").is_err());
        assert!(validate_key("/abs/path").is_err());
        assert!(validate_key("reports//x.json").is_err());
        assert!(validate_key("").is_err());
    }

    #[test]
    fn test_validate_key_rejects_meta_prefix() {
        assert!(validate_key(".meta/reports/x.json").is_err());
    }
}
