//! Derived listing indexes.
//!
//! An index document is a sorted, metadata-only snapshot of a set of
//! articles, stored as a single pretty-printed JSON array. Updates
//! always rewrite the whole document; there is no partial write. The
//! index is derived and reconstructible (the live listing rebuilds it
//! from a namespace scan), so callers treat maintenance failures as
//! best-effort: logged, never propagated past the triggering operation.

use bytes::Bytes;

use crate::model::{parse_article_date, Article, ArticleMetadata};
use crate::storage::store::{BlobMetadata, ObjectStore};

/// Index of live articles only, refreshed on every public listing.
pub const LIVE_INDEX_KEY: &str = "index/live-articles.json";

/// Unfiltered index, patched on every approval.
pub const FULL_INDEX_KEY: &str = "index/articles.json";

/// Sort index entries by article date, newest first.
///
/// The sort is stable, so entries with equal (or equally unparseable)
/// dates keep their relative order.
pub fn sort_by_date_desc(entries: &mut [ArticleMetadata]) {
    entries.sort_by(|a, b| parse_article_date(&b.date).cmp(&parse_article_date(&a.date)));
}

/// Read an index document, treating an absent key as an empty list.
pub async fn read_index(
    store: &dyn ObjectStore,
    index_key: &str,
) -> anyhow::Result<Vec<ArticleMetadata>> {
    match store.get(index_key).await? {
        Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
        None => Ok(Vec::new()),
    }
}

/// Replace an index document wholly with `entries`.
pub async fn write_index(
    store: &dyn ObjectStore,
    index_key: &str,
    entries: &[ArticleMetadata],
) -> anyhow::Result<()> {
    let body = serde_json::to_vec_pretty(entries)?;
    store
        .put(index_key, Bytes::from(body), BlobMetadata::new())
        .await
}

/// Insert-or-replace `article`'s metadata in the index at `index_key`,
/// keyed by slug, then re-sort and rewrite the whole document.
///
/// Idempotent: applying the same article twice leaves exactly one entry
/// for its slug.
pub async fn upsert(
    store: &dyn ObjectStore,
    index_key: &str,
    article: &Article,
) -> anyhow::Result<()> {
    let mut entries = read_index(store, index_key).await?;
    let metadata = article.metadata();

    match entries.iter_mut().find(|e| e.slug == metadata.slug) {
        Some(existing) => *existing = metadata,
        None => entries.push(metadata),
    }

    sort_by_date_desc(&mut entries);
    write_index(store, index_key, &entries).await
}

// -- Tests --------------------------------------------------------------------
