//! Sliding-window rate limiter.
//!
//! Process-local: each server instance enforces its own independent
//! budget. State is a table of request timestamps per client key plus a
//! sweep cursor; the periodic global sweep bounds memory growth from
//! distinct client keys without a per-key expiry timer. The table lives
//! for the process lifetime and is never persisted.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How often the global sweep of stale entries may run.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Per-process sliding-window counter, keyed by client identifier.
///
/// Constructed once and handed to the request path by reference; never
/// accessed as ambient global state, so it can be swapped for a
/// distributed limiter without touching callers.
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    inner: Mutex<Inner>,
}

struct Inner {
    /// Client key -> ordered request timestamps inside the window.
    hits: HashMap<String, Vec<Instant>>,
    /// When the last global sweep ran.
    last_sweep: Instant,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `window` per client key.
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            inner: Mutex::new(Inner {
                hits: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Window length, exposed for the `Retry-After` hint.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a request for `client_key` if it fits the budget.
    ///
    /// Returns `false` without recording a timestamp when the client is
    /// at or over the limit.
    pub fn allow(&self, client_key: &str) -> bool {
        self.allow_at(client_key, Instant::now())
    }

    /// Clock-injectable variant of [`allow`], used by tests.
    fn allow_at(&self, client_key: &str, now: Instant) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());

        if now.duration_since(inner.last_sweep) > SWEEP_INTERVAL {
            let window = self.window;
            inner.hits.retain(|_, timestamps| {
                timestamps.retain(|t| now.duration_since(*t) < window);
                !timestamps.is_empty()
            });
            inner.last_sweep = now;
        }

        let timestamps = inner.hits.entry(client_key.to_string()).or_default();
        timestamps.retain(|t| now.duration_since(*t) < self.window);

        if timestamps.len() >= self.max_requests {
            return false;
        }

        timestamps.push(now);
        true
    }
}

// -- Tests --------------------------------------------------------------------
