//! Article record manager.
//!
//! Owns the article lifecycle: validation, slug assignment, persistence
//! keyed by moderation status, and status transitions. Primary-record
//! writes must succeed or the operation fails; index maintenance after
//! an approval is best-effort and never fails the approval (the index
//! is derived and the public listing rebuilds it on read).

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};

use crate::errors::ApiError;
use crate::index;
use crate::model::{
    parse_article_date, rfc3339_millis, storage_key, Article, ArticleDraft, ArticleMetadata,
    ArticleStatus, LIVE_PREFIX, PENDING_PREFIX,
};
use crate::storage::store::ObjectStore;

/// Article store wired to an object storage backend.
#[derive(Clone)]
pub struct ArticleStore {
    store: Arc<dyn ObjectStore>,
    max_article_size: u64,
}

impl ArticleStore {
    pub fn new(store: Arc<dyn ObjectStore>, max_article_size: u64) -> Self {
        Self {
            store,
            max_article_size,
        }
    }

    /// Accept a submission: validate, slugify, persist as pending.
    ///
    /// `declared_len` is the Content-Length header, used as a fast
    /// rejection; the actual body size is the authoritative check. The
    /// pending write is a primary write -- its failure fails the whole
    /// submission.
    pub async fn submit(
        &self,
        body: &[u8],
        declared_len: Option<u64>,
    ) -> Result<Article, ApiError> {
        if declared_len.is_some_and(|len| len > self.max_article_size) {
            return Err(ApiError::PayloadTooLarge {
                max_bytes: self.max_article_size,
            });
        }
        if body.len() as u64 > self.max_article_size {
            return Err(ApiError::PayloadTooLarge {
                max_bytes: self.max_article_size,
            });
        }

        let draft: ArticleDraft =
            serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody {
                message: e.to_string(),
            })?;

        if let Some(field) = draft.first_missing_field() {
            return Err(ApiError::MissingField { field });
        }

        let article = Article::from_draft(draft, Utc::now());
        let key = storage_key(ArticleStatus::Pending, &article.slug)
            .expect("pending status always has a namespace");

        let record = serialize_record(&article)
            .map_err(|e| ApiError::internal("Failed to submit article", e))?;
        self.store
            .put(&key, record, article.blob_metadata())
            .await
            .map_err(|e| ApiError::internal("Failed to submit article", e))?;

        info!(slug = %article.slug, "Article submitted, pending review");
        Ok(article)
    }

    /// Full scan of the pending namespace for the moderation queue.
    ///
    /// Returns complete records (content included), newest first by
    /// creation time.
    pub async fn list_pending(&self) -> Result<Vec<Article>, ApiError> {
        let mut articles = self
            .scan_namespace(PENDING_PREFIX)
            .await
            .map_err(|e| ApiError::internal("Failed to list pending articles", e))?;
        articles.sort_by(|a, b| {
            parse_article_date(&b.created_at).cmp(&parse_article_date(&a.created_at))
        });
        Ok(articles)
    }

    /// Promote a pending article to live.
    ///
    /// Ordered for recoverability without transactions: the live copy is
    /// written before the pending copy is deleted, so a crash between
    /// the two leaves the article duplicated but never lost. Index
    /// patching runs last and is best-effort.
    pub async fn approve(&self, slug: &str) -> Result<(), ApiError> {
        let pending_key = storage_key(ArticleStatus::Pending, slug)
            .expect("pending status always has a namespace");
        let bytes = self
            .store
            .get(&pending_key)
            .await
            .map_err(|e| ApiError::internal("Failed to approve article", e))?
            .ok_or(ApiError::NotFound {
                what: "Pending article",
            })?;

        let mut article: Article = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::internal("Failed to approve article", e.into()))?;

        if !article.status.can_transition(ArticleStatus::Live) {
            return Err(ApiError::internal(
                "Failed to approve article",
                anyhow::anyhow!("article {} is not pending", slug),
            ));
        }
        article.status = ArticleStatus::Live;
        article.approved_at = Some(rfc3339_millis(Utc::now()));

        let live_key = storage_key(ArticleStatus::Live, slug)
            .expect("live status always has a namespace");
        let record = serialize_record(&article)
            .map_err(|e| ApiError::internal("Failed to approve article", e))?;
        self.store
            .put(&live_key, record, article.blob_metadata())
            .await
            .map_err(|e| ApiError::internal("Failed to approve article", e))?;

        self.store
            .delete(&pending_key)
            .await
            .map_err(|e| ApiError::internal("Failed to approve article", e))?;

        // Best-effort: the approval already succeeded.
        for index_key in [index::LIVE_INDEX_KEY, index::FULL_INDEX_KEY] {
            if let Err(e) = index::upsert(self.store.as_ref(), index_key, &article).await {
                metrics::counter!(crate::metrics::INDEX_UPDATE_FAILURES_TOTAL).increment(1);
                warn!(slug, index_key, error = %e, "Index update failed after approval");
            }
        }

        info!(slug, "Article approved");
        Ok(())
    }

    /// Reject a pending article: delete it outright, leaving no record.
    ///
    /// No index update -- rejected articles never entered any index.
    pub async fn reject(&self, slug: &str) -> Result<(), ApiError> {
        let pending_key = storage_key(ArticleStatus::Pending, slug)
            .expect("pending status always has a namespace");
        let existing = self
            .store
            .get(&pending_key)
            .await
            .map_err(|e| ApiError::internal("Failed to reject article", e))?;
        if existing.is_none() {
            return Err(ApiError::NotFound {
                what: "Pending article",
            });
        }

        self.store
            .delete(&pending_key)
            .await
            .map_err(|e| ApiError::internal("Failed to reject article", e))?;

        info!(slug, "Article rejected and removed");
        Ok(())
    }

    /// Public listing: rebuild-on-read from the live namespace.
    ///
    /// Scans every live record, strips content, sorts by article date
    /// descending, and overwrites the live index with the fresh list.
    /// The index write is best-effort; the computed list is returned
    /// either way.
    pub async fn list_live(&self) -> Result<Vec<ArticleMetadata>, ApiError> {
        let articles = self
            .scan_namespace(LIVE_PREFIX)
            .await
            .map_err(|e| ApiError::internal("Failed to list articles", e))?;

        let mut entries: Vec<ArticleMetadata> = articles.iter().map(Article::metadata).collect();
        index::sort_by_date_desc(&mut entries);

        if let Err(e) = index::write_index(self.store.as_ref(), index::LIVE_INDEX_KEY, &entries).await
        {
            warn!(error = %e, "Failed to refresh live index");
        }

        Ok(entries)
    }

    /// Fetch a single live article. Pending and rejected articles are
    /// never retrievable by this path.
    pub async fn get_live(&self, slug: &str) -> Result<Article, ApiError> {
        let live_key = storage_key(ArticleStatus::Live, slug)
            .expect("live status always has a namespace");
        let bytes = self
            .store
            .get(&live_key)
            .await
            .map_err(|e| ApiError::internal("Failed to get article", e))?
            .ok_or(ApiError::NotFound { what: "Article" })?;

        serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::internal("Failed to get article", e.into()))
    }

    /// Read and parse every `.json` record under `prefix`.
    async fn scan_namespace(&self, prefix: &str) -> anyhow::Result<Vec<Article>> {
        let keys = self.store.list(prefix).await?;
        let mut articles = Vec::with_capacity(keys.len());
        for key in keys.iter().filter(|k| k.ends_with(".json")) {
            if let Some(bytes) = self.store.get(key).await? {
                let article: Article = serde_json::from_slice(&bytes)
                    .map_err(|e| anyhow::anyhow!("malformed record at {key}: {e}"))?;
                articles.push(article);
            }
        }
        Ok(articles)
    }
}

/// Pretty-printed JSON encoding shared by all record writes.
fn serialize_record(article: &Article) -> anyhow::Result<Bytes> {
    Ok(Bytes::from(serde_json::to_vec_pretty(article)?))
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use crate::storage::store::BlobMetadata;

    const MAX_SIZE: u64 = 1024 * 1024;

    fn test_store() -> ArticleStore {
        ArticleStore::new(Arc::new(MemoryStore::new()), MAX_SIZE)
    }

    fn body(title: &str, date: &str) -> Vec<u8> {
        serde_json::json!({
            "title": title,
            "subtitle": "Sub",
            "content": "Full body text",
            "author": "Jane",
            "category": "eng",
            "date": date,
        })
        .to_string()
        .into_bytes()
    }

    #[tokio::test]
    async fn test_submit_creates_pending_record() {
        let store = test_store();
        let article = store.submit(&body("Hello World", "2026-01-01"), None).await.unwrap();
        assert_eq!(article.slug, "hello-world");
        assert_eq!(article.status, ArticleStatus::Pending);

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].slug, "hello-world");
        // Not yet retrievable via the public path.
        assert!(matches!(
            store.get_live("hello-world").await,
            Err(ApiError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_submit_missing_field() {
        let store = test_store();
        let body = serde_json::json!({
            "title": "T", "subtitle": "S", "content": "C",
            "author": "A", "date": "2026-01-01",
        })
        .to_string()
        .into_bytes();
        let err = store.submit(&body, None).await.unwrap_err();
        match err {
            ApiError::MissingField { field } => assert_eq!(field, "category"),
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_rejects_declared_oversize() {
        let store = test_store();
        let err = store
            .submit(&body("Big", "2026-01-01"), Some(MAX_SIZE + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_submit_rejects_actual_oversize() {
        let store = ArticleStore::new(Arc::new(MemoryStore::new()), 64);
        let err = store.submit(&body("Big", "2026-01-01"), None).await.unwrap_err();
        assert!(matches!(err, ApiError::PayloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_submit_invalid_json() {
        let store = test_store();
        let err = store.submit(b"not json", None).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidBody { .. }));
    }

    #[tokio::test]
    async fn test_same_title_overwrites_pending() {
        // Accepted behavior: identical slugs silently overwrite.
        let store = test_store();
        store.submit(&body("Same Title", "2026-01-01"), None).await.unwrap();
        store.submit(&body("Same Title!", "2026-02-01"), None).await.unwrap();

        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].date, "2026-02-01");
    }

    #[tokio::test]
    async fn test_system_keys_in_body_cannot_poison_queue() {
        let store = test_store();
        let body = serde_json::json!({
            "title": "Sneaky", "subtitle": "Sub", "content": "Body",
            "author": "Jane", "category": "eng", "date": "2026-01-01",
            "status": "live", "slug": "evil", "id": "evil",
        })
        .to_string()
        .into_bytes();

        let article = store.submit(&body, None).await.unwrap();
        assert_eq!(article.slug, "sneaky");
        assert_eq!(article.status, ArticleStatus::Pending);

        // The stored record stays parseable: the queue and the
        // moderation path keep working after the submission.
        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        store.approve("sneaky").await.unwrap();
        assert_eq!(
            store.get_live("sneaky").await.unwrap().status,
            ArticleStatus::Live
        );
    }

    #[tokio::test]
    async fn test_approve_moves_pending_to_live() {
        let store = test_store();
        store.submit(&body("Go Live", "2026-01-01"), None).await.unwrap();
        store.approve("go-live").await.unwrap();

        // Live copy exists with approval stamps.
        let live = store.get_live("go-live").await.unwrap();
        assert_eq!(live.status, ArticleStatus::Live);
        assert!(live.approved_at.is_some());

        // Pending copy is gone -- a move, not a copy-retain.
        assert!(store.list_pending().await.unwrap().is_empty());

        // Metadata appears exactly once in the listing.
        let listed = store.list_live().await.unwrap();
        assert_eq!(listed.iter().filter(|e| e.slug == "go-live").count(), 1);
    }

    #[tokio::test]
    async fn test_approve_patches_both_indexes() {
        let store = test_store();
        store.submit(&body("Indexed", "2026-01-01"), None).await.unwrap();
        store.approve("indexed").await.unwrap();

        let backing = Arc::clone(&store.store);
        for key in [index::LIVE_INDEX_KEY, index::FULL_INDEX_KEY] {
            let entries = index::read_index(backing.as_ref(), key).await.unwrap();
            assert_eq!(entries.len(), 1, "index {key} should hold one entry");
            assert_eq!(entries[0].slug, "indexed");
        }
    }

    #[tokio::test]
    async fn test_approve_unknown_slug() {
        let store = test_store();
        assert!(matches!(
            store.approve("nope").await,
            Err(ApiError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reject_removes_entirely() {
        let store = test_store();
        store.submit(&body("Bad Post", "2026-01-01"), None).await.unwrap();
        store.reject("bad-post").await.unwrap();

        assert!(store.list_pending().await.unwrap().is_empty());
        // Subsequent approve or reject both fail not-found.
        assert!(matches!(
            store.approve("bad-post").await,
            Err(ApiError::NotFound { .. })
        ));
        assert!(matches!(
            store.reject("bad-post").await,
            Err(ApiError::NotFound { .. })
        ));
        // Never appears in any index.
        let backing = Arc::clone(&store.store);
        for key in [index::LIVE_INDEX_KEY, index::FULL_INDEX_KEY] {
            assert!(index::read_index(backing.as_ref(), key).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_list_live_sorted_and_content_free() {
        let store = test_store();
        for (title, date) in [
            ("Middle", "2026-02-01"),
            ("Newest", "2026-03-01"),
            ("Oldest", "2026-01-01"),
        ] {
            store.submit(&body(title, date), None).await.unwrap();
            store.approve(&crate::slug::slugify(title)).await.unwrap();
        }

        let listed = store.list_live().await.unwrap();
        let slugs: Vec<&str> = listed.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, vec!["newest", "middle", "oldest"]);

        let json = serde_json::to_value(&listed).unwrap();
        for entry in json.as_array().unwrap() {
            assert!(entry.get("content").is_none());
        }
    }

    #[tokio::test]
    async fn test_list_live_refreshes_index() {
        let store = test_store();
        store.submit(&body("Cached", "2026-01-01"), None).await.unwrap();
        store.approve("cached").await.unwrap();

        // Clobber the index, then confirm the listing rewrites it.
        let backing = Arc::clone(&store.store);
        backing
            .put(index::LIVE_INDEX_KEY, Bytes::from("[]"), BlobMetadata::new())
            .await
            .unwrap();
        store.list_live().await.unwrap();

        let entries = index::read_index(backing.as_ref(), index::LIVE_INDEX_KEY)
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_slug_never_in_both_namespaces() {
        let store = test_store();
        store.submit(&body("Single Copy", "2026-01-01"), None).await.unwrap();
        store.approve("single-copy").await.unwrap();

        let backing = Arc::clone(&store.store);
        let pending = backing.list(PENDING_PREFIX).await.unwrap();
        let live = backing.list(LIVE_PREFIX).await.unwrap();
        assert!(pending.is_empty());
        assert_eq!(live, vec!["articles/live/single-copy.json"]);
    }
}
