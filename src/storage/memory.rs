//! In-memory object store.
//!
//! Documents are held in a `tokio::sync::RwLock<HashMap<...>>`. Used by
//! tests and for throwaway local runs; nothing survives a restart.

use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use super::store::{BlobMetadata, ObjectStore};

/// In-memory backend: key -> (data, metadata).
#[derive(Default)]
pub struct MemoryStore {
    objects: tokio::sync::RwLock<HashMap<String, (Bytes, BlobMetadata)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for MemoryStore {
    fn put(
        &self,
        key: &str,
        data: Bytes,
        metadata: BlobMetadata,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            self.objects.write().await.insert(key, (data, metadata));
            Ok(())
        })
    }

    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            Ok(self
                .objects
                .read()
                .await
                .get(&key)
                .map(|(data, _)| data.clone()))
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            self.objects.write().await.remove(&key);
            Ok(())
        })
    }

    fn list(
        &self,
        prefix: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>> {
        let prefix = prefix.to_string();
        Box::pin(async move {
            let mut keys: Vec<String> = self
                .objects
                .read()
                .await
                .keys()
                .filter(|k| k.starts_with(&prefix))
                .cloned()
                .collect();
            keys.sort();
            Ok(keys)
        })
    }
}

// -- Tests --------------------------------------------------------------------
