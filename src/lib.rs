//! Article store library -- submission and moderation API over object
//! storage.
//!
//! This crate provides the components for running the article API
//! server: request routing, rate limiting, API key authorization, the
//! article record manager and its derived listing indexes, and pluggable
//! object storage backends.

pub mod articles;
pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod index;
pub mod metrics;
pub mod model;
pub mod ratelimit;
pub mod server;
pub mod slug;
pub mod storage;

use crate::articles::ArticleStore;
use crate::config::Config;
use crate::ratelimit::RateLimiter;

/// Shared application state passed to all handlers via `axum::extract::State`.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    /// Article record manager over the object storage backend.
    pub articles: ArticleStore,
    /// Process-wide sliding-window rate limiter.
    pub rate_limiter: RateLimiter,
}
