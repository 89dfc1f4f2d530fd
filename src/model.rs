//! Article entity, metadata projection, and moderation status.
//!
//! Status is the source of truth for where a record lives: the storage
//! key is derived from the status, never the other way round. The
//! moderation state machine is tiny -- pending articles may be promoted
//! to live or deleted outright; live articles are terminal.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::slug::slugify;

/// Key prefix for articles awaiting moderation.
pub const PENDING_PREFIX: &str = "articles/pending/";

/// Key prefix for approved, publicly servable articles.
pub const LIVE_PREFIX: &str = "articles/live/";

/// Wire names of system-assigned fields. A submission may not set
/// these; any that arrive are dropped from the flattened extras so the
/// stored record never serializes the same key twice.
const SYSTEM_FIELD_NAMES: &[&str] = &[
    "slug",
    "id",
    "status",
    "createdAt",
    "updatedAt",
    "approvedAt",
];

/// Moderation status of an article.
///
/// `Rejected` never appears in a stored record: rejection deletes the
/// pending copy, so the variant only exists to express the transition
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Pending,
    Live,
    Rejected,
}

impl ArticleStatus {
    /// Moderation transition table: {pending -> live, pending -> rejected}.
    pub fn can_transition(self, next: ArticleStatus) -> bool {
        matches!(
            (self, next),
            (ArticleStatus::Pending, ArticleStatus::Live)
                | (ArticleStatus::Pending, ArticleStatus::Rejected)
        )
    }

    /// Storage namespace prefix for records in this status.
    ///
    /// Rejected articles have no namespace; rejection is a deletion.
    pub fn key_prefix(self) -> Option<&'static str> {
        match self {
            ArticleStatus::Pending => Some(PENDING_PREFIX),
            ArticleStatus::Live => Some(LIVE_PREFIX),
            ArticleStatus::Rejected => None,
        }
    }
}

/// Derived storage key for an article record in the given status.
pub fn storage_key(status: ArticleStatus, slug: &str) -> Option<String> {
    status
        .key_prefix()
        .map(|prefix| format!("{prefix}{slug}.json"))
}

/// The fields a caller must supply when submitting an article.
///
/// Everything is optional at the serde level so validation can report
/// the first missing field by name instead of a generic decode error.
/// Unknown fields are preserved through `extra` and written back out,
/// matching the original submission contract where the stored record is
/// the submitted document plus system fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleDraft {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub category: Option<String>,
    /// Free text, not required to be ISO formatted.
    pub date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<serde_json::Value>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ArticleDraft {
    /// Return the name of the first missing or empty required field,
    /// checked in the documented order.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        let required: [(&'static str, &Option<String>); 6] = [
            ("title", &self.title),
            ("subtitle", &self.subtitle),
            ("content", &self.content),
            ("author", &self.author),
            ("category", &self.category),
            ("date", &self.date),
        ];
        required
            .iter()
            .find(|(_, value)| value.as_deref().map_or(true, |v| v.is_empty()))
            .map(|(name, _)| *name)
    }
}

/// A full article record as persisted in the object store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Primary key, derived once from the title at submission.
    pub slug: String,
    /// Mirror of `slug`, kept for front-end compatibility.
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub content: String,
    pub author: String,
    pub category: String,
    pub date: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<serde_json::Value>,

    pub status: ArticleStatus,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Article {
    /// Build a pending article from a validated draft.
    ///
    /// Callers must have checked [`ArticleDraft::first_missing_field`]
    /// first; missing required fields become empty strings here rather
    /// than panicking.
    pub fn from_draft(draft: ArticleDraft, now: DateTime<Utc>) -> Self {
        let title = draft.title.unwrap_or_default();
        let slug = slugify(&title);
        let stamp = rfc3339_millis(now);
        // System fields are assigned here, never taken from the caller.
        // Leaving them in `extra` would serialize duplicate JSON keys,
        // making the stored record unparseable.
        let mut extra = draft.extra;
        for name in SYSTEM_FIELD_NAMES {
            extra.remove(*name);
        }
        Self {
            id: slug.clone(),
            slug,
            title,
            subtitle: draft.subtitle.unwrap_or_default(),
            content: draft.content.unwrap_or_default(),
            author: draft.author.unwrap_or_default(),
            category: draft.category.unwrap_or_default(),
            date: draft.date.unwrap_or_default(),
            tags: draft.tags,
            cover_image: draft.cover_image,
            author_avatar: draft.author_avatar,
            author_bio: draft.author_bio,
            author_linkedin: draft.author_linkedin,
            author_website: draft.author_website,
            reading_time: draft.reading_time,
            chart_data: draft.chart_data,
            status: ArticleStatus::Pending,
            created_at: stamp.clone(),
            updated_at: stamp,
            approved_at: None,
            extra,
        }
    }

    /// Metadata-only projection: the full record minus `content`.
    pub fn metadata(&self) -> ArticleMetadata {
        ArticleMetadata {
            slug: self.slug.clone(),
            id: self.id.clone(),
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            author: self.author.clone(),
            category: self.category.clone(),
            date: self.date.clone(),
            tags: self.tags.clone(),
            cover_image: self.cover_image.clone(),
            author_avatar: self.author_avatar.clone(),
            author_bio: self.author_bio.clone(),
            author_linkedin: self.author_linkedin.clone(),
            author_website: self.author_website.clone(),
            reading_time: self.reading_time.clone(),
            chart_data: self.chart_data.clone(),
            status: self.status,
            created_at: self.created_at.clone(),
            updated_at: self.updated_at.clone(),
            approved_at: self.approved_at.clone(),
            extra: self.extra.clone(),
        }
    }

    /// Custom metadata map attached to the stored blob.
    pub fn blob_metadata(&self) -> HashMap<String, String> {
        let mut meta = HashMap::new();
        meta.insert("title".to_string(), self.title.clone());
        meta.insert("author".to_string(), self.author.clone());
        meta.insert("category".to_string(), self.category.clone());
        meta.insert("date".to_string(), self.date.clone());
        let status = match self.status {
            ArticleStatus::Pending => "pending",
            ArticleStatus::Live => "live",
            ArticleStatus::Rejected => "rejected",
        };
        meta.insert("status".to_string(), status.to_string());
        match &self.approved_at {
            Some(at) => meta.insert("approvedAt".to_string(), at.clone()),
            None => meta.insert("createdAt".to_string(), self.created_at.clone()),
        };
        meta
    }
}

/// Index entry: an article with the content field stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    pub slug: String,
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub category: String,
    pub date: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author_website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<serde_json::Value>,

    pub status: ArticleStatus,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// -- Timestamps and date ordering ---------------------------------------------

/// Format a timestamp the way `Date.prototype.toISOString` does
/// (millisecond precision, trailing `Z`).
pub fn rfc3339_millis(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a free-text article date leniently for ordering purposes.
///
/// Tries RFC 3339, then `YYYY-MM-DD`, then RFC 2822; anything else
/// sorts to the epoch (oldest).
pub fn parse_article_date(raw: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = d.and_hms_opt(0, 0, 0) {
            return DateTime::from_naive_utc_and_offset(dt, Utc);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return dt.with_timezone(&Utc);
    }
    DateTime::<Utc>::UNIX_EPOCH
}

// -- Tests --------------------------------------------------------------------
