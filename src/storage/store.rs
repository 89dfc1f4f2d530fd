//! Abstract object store trait.
//!
//! Every backend implements [`ObjectStore`]: a flat key namespace with
//! unconditional put, get, idempotent delete, and full prefix scan. No
//! multi-key atomicity is offered -- callers sequencing several writes
//! (e.g. a moderation approval) must order them for recoverability, not
//! rely on transactions.

use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

/// Free-form string metadata attached to a stored document.
pub type BlobMetadata = HashMap<String, String>;

/// Async object store contract.
pub trait ObjectStore: Send + Sync + 'static {
    /// Write `data` to `key`, unconditionally overwriting any existing
    /// document. No optimistic concurrency token is returned.
    fn put(
        &self,
        key: &str,
        data: Bytes,
        metadata: BlobMetadata,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Read the full document at `key`, or `None` if absent.
    fn get(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<Bytes>>> + Send + '_>>;

    /// Delete the document at `key`. Absent keys are not an error.
    fn delete(&self, key: &str) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// List every key under `prefix`. Full scan; callers must tolerate
    /// large result sets.
    fn list(
        &self,
        prefix: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<String>>> + Send + '_>>;
}
