// ABOUTME: Token-bucket admission control for outbound carrier traffic
// ABOUTME: Lazy refill on each check, multi-window limiters and a name-keyed shared registry

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Shape of one token bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Tokens added per whole elapsed interval.
    pub tokens_per_interval: u64,
    pub interval: Duration,
    /// Bucket capacity; a new bucket starts full.
    pub max_tokens: u64,
}

impl RateLimitConfig {
    /// 100 messages per second with a burst of 1000.
    pub const DEFAULT: RateLimitConfig = RateLimitConfig::new(100, Duration::from_secs(1), 1000);

    /// 10 messages per second with a burst of 100.
    pub const STRICT: RateLimitConfig = RateLimitConfig::new(10, Duration::from_secs(1), 100);

    /// 1000 messages per second with a burst of 10000.
    pub const BURST: RateLimitConfig = RateLimitConfig::new(1000, Duration::from_secs(1), 10_000);

    /// 50 messages per second with a burst of 500.
    pub const PER_CONNECTION: RateLimitConfig =
        RateLimitConfig::new(50, Duration::from_secs(1), 500);

    pub const fn new(tokens_per_interval: u64, interval: Duration, max_tokens: u64) -> Self {
        Self {
            tokens_per_interval,
            interval,
            max_tokens,
        }
    }

    /// `limit` tokens per `interval`, with a capacity of `limit`.
    pub const fn per(limit: u64, interval: Duration) -> Self {
        Self::new(limit, interval, limit)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A single token bucket. Not synchronized; see [`RateLimiter`].
///
/// Refill is computed from elapsed time whenever the bucket is consulted.
/// `last_refill` advances by whole intervals only, so time spent inside a
/// partial interval still counts toward the next refill.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    config: RateLimitConfig,
    tokens: u64,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::starting_at(config, Instant::now())
    }

    pub fn starting_at(config: RateLimitConfig, now: Instant) -> Self {
        Self {
            config,
            tokens: config.max_tokens,
            last_refill: now,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_nanos();
        let interval = self.config.interval.as_nanos().max(1);
        let intervals = elapsed / interval;
        if intervals == 0 {
            return;
        }

        let added = intervals.saturating_mul(u128::from(self.config.tokens_per_interval));
        let total = u128::from(self.tokens).saturating_add(added);
        self.tokens = total.min(u128::from(self.config.max_tokens)) as u64;

        // elapsed % interval < interval, which came from a Duration
        let remainder = (elapsed % interval) as u64;
        self.last_refill = now - Duration::from_nanos(remainder);
    }

    /// Tokens available at `now`.
    pub fn available_at(&mut self, now: Instant) -> u64 {
        self.refill(now);
        self.tokens
    }

    /// Takes `n` tokens if that many are available at `now`.
    pub fn try_consume_at(&mut self, n: u64, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= n {
            self.tokens -= n;
            true
        } else {
            false
        }
    }

    pub fn try_consume(&mut self, n: u64) -> bool {
        self.try_consume_at(n, Instant::now())
    }

    fn take(&mut self, n: u64) {
        self.tokens = self.tokens.saturating_sub(n);
    }

    fn reset_at(&mut self, now: Instant) {
        self.tokens = self.config.max_tokens;
        self.last_refill = now;
    }
}

/// Point-in-time view of a limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterStats {
    /// Tokens left in the tightest window.
    pub tokens: u64,
    pub accepted: u64,
    pub rejected: u64,
}

/// Thread-safe limiter over one or more windows.
///
/// An admission needs a token from every window. Either all windows are
/// charged or none is, so a rejection never drains the looser windows.
#[derive(Debug)]
pub struct RateLimiter {
    name: String,
    windows: Mutex<Vec<TokenBucket>>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, config: RateLimitConfig) -> Self {
        Self::with_windows(name, &[config])
    }

    pub fn with_windows(name: impl Into<String>, windows: &[RateLimitConfig]) -> Self {
        let now = Instant::now();
        Self {
            name: name.into(),
            windows: Mutex::new(
                windows
                    .iter()
                    .map(|config| TokenBucket::starting_at(*config, now))
                    .collect(),
            ),
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn try_consume(&self, n: u64) -> bool {
        self.try_consume_at(n, Instant::now())
    }

    pub fn try_consume_at(&self, n: u64, now: Instant) -> bool {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let admitted = windows
            .iter_mut()
            .all(|bucket| bucket.available_at(now) >= n);

        if admitted {
            windows.iter_mut().for_each(|bucket| bucket.take(n));
            self.accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            let rejected = self.rejected.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(limiter = %self.name, requested = n, rejected, "rate limit exceeded");
        }
        admitted
    }

    pub fn stats(&self) -> RateLimiterStats {
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        let tokens = windows
            .iter_mut()
            .map(|bucket| bucket.available_at(now))
            .min()
            .unwrap_or(0);
        RateLimiterStats {
            tokens,
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Refills every window and clears the counters.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        windows.iter_mut().for_each(|bucket| bucket.reset_at(now));
        self.accepted.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
    }
}

/// One shared limiter per name.
///
/// Owned by whoever wires the process together and passed to the parts that
/// need it; the first caller for a name decides its windows.
#[derive(Debug, Default)]
pub struct RateLimiterRegistry {
    limiters: Mutex<HashMap<String, Arc<RateLimiter>>>,
}

impl RateLimiterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&self, name: &str, config: RateLimitConfig) -> Arc<RateLimiter> {
        self.get_or_create_windows(name, &[config])
    }

    pub fn get_or_create_windows(&self, name: &str, windows: &[RateLimitConfig]) -> Arc<RateLimiter> {
        let mut limiters = self.limiters.lock().unwrap_or_else(PoisonError::into_inner);
        limiters
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(limiter = name, windows = windows.len(), "created rate limiter");
                Arc::new(RateLimiter::with_windows(name, windows))
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<RateLimiter>> {
        let limiters = self.limiters.lock().unwrap_or_else(PoisonError::into_inner);
        limiters.get(name).cloned()
    }

    pub fn reset_all(&self) {
        let limiters = self.limiters.lock().unwrap_or_else(PoisonError::into_inner);
        limiters.values().for_each(|limiter| limiter.reset());
        debug!(count = limiters.len(), "all rate limiters reset");
    }
}
