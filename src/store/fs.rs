use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{
    BlobStore, CachePolicy, JSON_CONTENT_TYPE, ObjectMeta, PutOptions, Result, validate_key,
};
use crate::errors::StoreError;

/// Directory holding metadata sidecars, relative to the bucket root.
pub(crate) const META_DIR: &str = ".meta";

/// Directory-backed store rooted at `<root>/<bucket>/`.
///
/// Each object lives at its key path; content type and cache policy live in a
/// JSON sidecar under `.meta/`. Writes go through a temp file and a rename so
/// a reader sees either the old or the new object, never a torn one.
#[derive(Debug, Clone)]
pub struct FsStore {
    base: PathBuf,
}

impl FsStore {
    pub fn new(root: impl AsRef<Path>, bucket: &str) -> Self {
        Self {
            base: root.as_ref().join(bucket),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.base.join(key)
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.base.join(META_DIR).join(format!("{}.json", key))
    }

    async fn write_atomic(&self, key: &str, path: &Path, data: &[u8]) -> Result<()> {
        let io_err = |source| StoreError::Io {
            key: key.to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, data).await.map_err(io_err)?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsStore {
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        validate_key(key)?;
        let meta = ObjectMeta {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: options.content_type,
            cache: options.cache,
            last_modified: Utc::now(),
        };
        let meta_bytes = serde_json::to_vec(&meta).map_err(|e| StoreError::Metadata {
            key: key.to_string(),
            message: e.to_string(),
        })?;

        // Sidecar first: a reader that finds the object always finds its directives
        self.write_atomic(key, &self.meta_path(key), &meta_bytes).await?;
        self.write_atomic(key, &self.object_path(key), &data).await
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        validate_key(key)?;
        match tokio::fs::read(self.object_path(key)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                key: key.to_string(),
            }),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        validate_key(key)?;
        let file_meta = match tokio::fs::metadata(self.object_path(key)).await {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Io {
                    key: key.to_string(),
                    source,
                });
            }
        };

        match tokio::fs::read(self.meta_path(key)).await {
            Ok(raw) => {
                let mut meta: ObjectMeta =
                    serde_json::from_slice(&raw).map_err(|e| StoreError::Metadata {
                        key: key.to_string(),
                        message: e.to_string(),
                    })?;
                meta.size = file_meta.len();
                Ok(Some(meta))
            }
            // Objects placed by hand have no sidecar
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Some(ObjectMeta {
                key: key.to_string(),
                size: file_meta.len(),
                content_type: JSON_CONTENT_TYPE.to_string(),
                cache: CachePolicy::Default,
                last_modified: file_meta
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now()),
            })),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, FsStore) {
        let dir = TempDir::new().unwrap();
        let store = FsStore::new(dir.path(), "bucket");
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_writes_file_under_bucket() {
        let (dir, store) = store();
        store
            .put(
                "reports/code_review_r1.json",
                Bytes::from_static(b"{\"score\":1}"),
                PutOptions::json(CachePolicy::Immutable),
            )
            .await
            .unwrap();
        let on_disk =
            std::fs::read(dir.path().join("bucket/reports/code_review_r1.json")).unwrap();
        assert_eq!(on_disk, b"{\"score\":1}");
    }

    #[tokio::test]
    async fn test_get_roundtrip_and_missing() {
        let (_dir, store) = store();
        store
            .put(
                "data/commits_r1.json",
                Bytes::from_static(b"{}"),
                PutOptions::json(CachePolicy::Default),
            )
            .await
            .unwrap();
        assert_eq!(store.get("data/commits_r1.json").await.unwrap(), Bytes::from_static(b"{}"));
        assert!(store.get("data/commits_r2.json").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_head_reports_cache_policy() {
        let (_dir, store) = store();
        store
            .put(
                "reports/x_latest.json",
                Bytes::from_static(b"[]"),
                PutOptions::json(CachePolicy::NoCache),
            )
            .await
            .unwrap();
        let meta = store.head("reports/x_latest.json").await.unwrap().unwrap();
        assert_eq!(meta.cache, CachePolicy::NoCache);
        assert_eq!(meta.size, 2);
        assert!(store.head("reports/other.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_head_without_sidecar_uses_defaults() {
        let (dir, store) = store();
        std::fs::create_dir_all(dir.path().join("bucket/reports")).unwrap();
        std::fs::write(dir.path().join("bucket/reports/manual.json"), b"{}").unwrap();
        let meta = store.head("reports/manual.json").await.unwrap().unwrap();
        assert_eq!(meta.cache, CachePolicy::Default);
        assert_eq!(meta.content_type, "application/json");
    }

    #[tokio::test]
    async fn test_overwrite_leaves_no_temp_files() {
        let (dir, store) = store();
        for body in [&b"one"[..], &b"two"[..]] {
            store
                .put(
                    "reports/k.json",
                    Bytes::copy_from_slice(body),
                    PutOptions::json(CachePolicy::NoCache),
                )
                .await
                .unwrap();
        }
        assert_eq!(store.get("reports/k.json").await.unwrap(), Bytes::from_static(b"two"));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("bucket/reports"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_traversal_key_rejected() {
        let (_dir, store) = store();
        let err = store.get("../outside.json").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey { .. }));
    }
}
