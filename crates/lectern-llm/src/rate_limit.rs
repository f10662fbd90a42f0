//! Rolling-window token budget shared across all outbound calls.
//!
//! One [`RateLimiter`] instance is created per process and handed to every
//! session task behind an `Arc`. [`RateLimiter::reserve`] is the only
//! suspension point: the check-and-decrement runs as a single critical
//! section, and the lock is never held across an await.

use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Rolling-window state. Rollover is checked on every reserve call, never
/// on a separate timer, so the window cannot drift.
struct Window {
    started_at: Instant,
    consumed: u64,
}

/// Enforces that no rolling window ever has more than the configured
/// token budget attributed to calls that started in it.
pub struct RateLimiter {
    window: Mutex<Window>,
    max_tokens_per_window: u64,
    window_length: Duration,
}

impl RateLimiter {
    /// Create a limiter with the given budget and window length.
    ///
    /// `max_tokens_per_window` should sit well below the provider's
    /// documented ceiling (~75%) to absorb estimation error.
    pub fn new(max_tokens_per_window: u64, window_length: Duration) -> Self {
        Self {
            window: Mutex::new(Window {
                started_at: Instant::now(),
                consumed: 0,
            }),
            max_tokens_per_window,
            window_length,
        }
    }

    /// Reserve `estimated_tokens` from the current window, suspending the
    /// calling task until enough budget frees up.
    ///
    /// An estimate larger than the entire window budget is granted against
    /// a fresh, empty window so a pathological estimate cannot deadlock;
    /// the provider's own rejection stays authoritative for oversize.
    pub async fn reserve(&self, estimated_tokens: u64) {
        loop {
            let wait = {
                let mut window = self.window.lock();
                let now = Instant::now();
                if now.duration_since(window.started_at) >= self.window_length {
                    window.started_at = now;
                    window.consumed = 0;
                }

                let fits = window.consumed + estimated_tokens <= self.max_tokens_per_window;
                let oversized_on_fresh =
                    estimated_tokens > self.max_tokens_per_window && window.consumed == 0;
                if fits || oversized_on_fresh {
                    if oversized_on_fresh {
                        warn!(
                            estimated_tokens,
                            budget = self.max_tokens_per_window,
                            "reservation exceeds entire window budget, granting against empty window"
                        );
                    }
                    window.consumed += estimated_tokens;
                    debug!(
                        estimated_tokens,
                        consumed = window.consumed,
                        budget = self.max_tokens_per_window,
                        "rate budget granted"
                    );
                    return;
                }

                // Not enough budget: wait out the rest of the window.
                self.window_length - now.duration_since(window.started_at)
            };

            debug!(estimated_tokens, wait_ms = wait.as_millis() as u64, "rate budget exhausted, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Tokens consumed in the current window (diagnostics only).
    pub fn consumed_in_window(&self) -> u64 {
        self.window.lock().consumed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests (paused tokio clock, no real sleeping)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test(start_paused = true)]
    async fn grants_within_budget_immediately() {
        let limiter = RateLimiter::new(30_000, Duration::from_secs(60));
        limiter.reserve(12_000).await;
        limiter.reserve(12_000).await;
        assert_eq!(limiter.consumed_in_window(), 24_000);
    }

    #[tokio::test(start_paused = true)]
    async fn third_reservation_waits_for_rollover() {
        let limiter = Arc::new(RateLimiter::new(30_000, Duration::from_secs(60)));
        limiter.reserve(12_000).await;
        limiter.reserve(12_000).await;

        let l = Arc::clone(&limiter);
        let third = tokio::spawn(async move {
            l.reserve(12_000).await;
            tokio::time::Instant::now()
        });

        let before = tokio::time::Instant::now();
        let granted_at = third.await.unwrap();
        // Granted only after the 60s window rolled over.
        assert!(granted_at.duration_since(before) >= Duration::from_secs(60));
        assert_eq!(limiter.consumed_in_window(), 12_000);
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_length_elapsed() {
        let limiter = RateLimiter::new(10_000, Duration::from_secs(60));
        limiter.reserve(10_000).await;
        tokio::time::advance(Duration::from_secs(61)).await;
        // Fits immediately in the new window.
        limiter.reserve(10_000).await;
        assert_eq!(limiter.consumed_in_window(), 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_reservations_never_overshoot() {
        let limiter = Arc::new(RateLimiter::new(10_000, Duration::from_secs(60)));
        let granted_first_window = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let l = Arc::clone(&limiter);
            let g = Arc::clone(&granted_first_window);
            handles.push(tokio::spawn(async move {
                let start = tokio::time::Instant::now();
                l.reserve(3_000).await;
                if start.elapsed() < Duration::from_secs(60) {
                    let _ = g.fetch_add(3_000, Ordering::SeqCst);
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        // 8 × 3000 = 24000 total, but no single window may exceed 10000:
        // only three tasks fit the first window.
        assert_eq!(granted_first_window.load(Ordering::SeqCst), 9_000);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_estimate_granted_on_fresh_window() {
        let limiter = RateLimiter::new(1_000, Duration::from_secs(60));
        // Must not deadlock.
        limiter.reserve(5_000).await;
        assert_eq!(limiter.consumed_in_window(), 5_000);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_estimate_waits_for_empty_window() {
        let limiter = Arc::new(RateLimiter::new(1_000, Duration::from_secs(60)));
        limiter.reserve(500).await;

        let l = Arc::clone(&limiter);
        let start = tokio::time::Instant::now();
        let big = tokio::spawn(async move { l.reserve(5_000).await });
        big.await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(60));
    }
}
