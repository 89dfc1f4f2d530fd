//! Local filesystem object store.
//!
//! Keys map directly to relative paths under a configurable root
//! directory. Writes follow the temp-file + fsync + rename pattern so a
//! crash never leaves a half-written document at its final key. Blob
//! metadata is written to a `<key>.meta` sidecar file.

use bytes::Bytes;
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::pin::Pin;

use super::store::{BlobMetadata, ObjectStore};

/// Stores documents as flat files under a root directory.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Create a new `LocalStore` rooted at `root`, creating the
    /// directory (and the `.tmp` staging area) if needed.
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        std::fs::create_dir_all(root.join(".tmp"))?;
        Ok(Self { root })
    }

    /// Resolve a key to an absolute path, rejecting traversal components.
    fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        for component in std::path::Path::new(key).components() {
            if let std::path::Component::ParentDir = component {
                anyhow::bail!("Path traversal detected in storage key: {}", key);
            }
        }
        Ok(self.root.join(key))
    }

    /// Temp file path under `.tmp/` for atomic writes.
    fn temp_path(&self) -> PathBuf {
        let id = uuid::Uuid::new_v4();
        self.root.join(".tmp").join(format!("tmp-{}", id))
    }

    fn write_atomic(&self, final_path: &PathBuf, data: &[u8]) -> anyhow::Result<()> {
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.temp_path();
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, final_path)?;
        Ok(())
    }
}

impl ObjectStore for LocalStore {
    fn put(
        &self,
        key: &str,
        data: Bytes,
        metadata: BlobMetadata,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let final_path = self.resolve(&key)?;
            self.write_atomic(&final_path, &data)?;

            if !metadata.is_empty() {
                let meta_path = self.resolve(&format!("{key}.meta"))?;
                let meta_json = serde_json::to_vec_pretty(&metadata)?;
                self.write_atomic(&meta_path, &meta_json)?;
            }
            Ok(())
        })
    }

    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.resolve(&key)?;
            match std::fs::read(&path) {
                Ok(data) => Ok(Some(Bytes::from(data))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let key = key.to_string();
        Box::pin(async move {
            let path = self.resolve(&key)?;
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            // Sidecar metadata goes with the document.
            let meta_path = self.resolve(&format!("{key}.meta"))?;
            let _ = std::fs::remove_file(meta_path);
            Ok(())
        })
    }

    fn list(
        &self,
        prefix: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>> {
        let prefix = prefix.to_string();
        Box::pin(async move {
            let mut keys = Vec::new();
            collect_keys(&self.root, &self.root, &mut keys)?;
            keys.retain(|k| k.starts_with(&prefix) && !k.ends_with(".meta"));
            keys.sort();
            Ok(keys)
        })
    }
}

/// Walk `dir` recursively, pushing root-relative keys. The `.tmp`
/// staging directory is skipped.
fn collect_keys(
    root: &std::path::Path,
    dir: &std::path::Path,
    keys: &mut Vec<String>,
) -> anyhow::Result<()> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.file_name().is_some_and(|n| n == ".tmp") {
            continue;
        }
        if path.is_dir() {
            collect_keys(root, &path, keys)?;
        } else if let Ok(rel) = path.strip_prefix(root) {
            keys.push(rel.to_string_lossy().replace('\\', "/"));
        }
    }
    Ok(())
}

// -- Tests --------------------------------------------------------------------
