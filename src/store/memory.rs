use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{BlobStore, ObjectMeta, PutOptions, Result, validate_key};
use crate::errors::StoreError;

/// In-memory store. Thread-safe via `RwLock`; contents die with the process.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    objects: Arc<RwLock<HashMap<String, (Bytes, ObjectMeta)>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All keys currently stored, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = match self.objects.read() {
            Ok(objects) => objects.keys().cloned().collect(),
            Err(_) => Vec::new(),
        };
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn put(&self, key: &str, data: Bytes, options: PutOptions) -> Result<()> {
        validate_key(key)?;
        let meta = ObjectMeta {
            key: key.to_string(),
            size: data.len() as u64,
            content_type: options.content_type,
            cache: options.cache,
            last_modified: Utc::now(),
        };
        self.objects
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(key.to_string(), (data, meta));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        validate_key(key)?;
        let objects = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
        objects
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StoreError::NotFound {
                key: key.to_string(),
            })
    }

    async fn head(&self, key: &str) -> Result<Option<ObjectMeta>> {
        validate_key(key)?;
        let objects = self.objects.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(objects.get(key).map(|(_, meta)| meta.clone()))
    }
}
