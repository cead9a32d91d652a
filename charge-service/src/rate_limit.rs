//! Fixed-window throttling of charge triggers.
//!
//! Each caller IP gets a counter and a reset deadline. The map lives in
//! process memory only; separate instances do not share counts.
//!
//! # Thread Safety
//!
//! Records sit behind a `Mutex`. A poisoned lock fails open (the request is
//! allowed) rather than panicking.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Triggers allowed per caller within one window.
    pub max_requests: u32,
    pub window: Duration,
    /// Sweep eagerly once this many callers are tracked.
    pub max_tracked_callers: usize,
    /// Period of the background sweep started by [`TriggerRateLimiter::spawn_sweeper`].
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 3,
            window: Duration::from_secs(60),
            max_tracked_callers: 10_000,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            ..Self::default()
        }
    }
}

/// Verdict for one trigger attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// Whole seconds until the caller's window resets; set only when rejected.
    pub retry_after_secs: Option<u64>,
}

impl RateLimitDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after_secs: None,
        }
    }

    fn reject(retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            retry_after_secs: Some(retry_after_secs),
        }
    }
}

#[derive(Debug)]
struct CallerRecord {
    count: u32,
    reset_at: Instant,
}

#[derive(Debug)]
pub struct TriggerRateLimiter {
    config: RateLimitConfig,
    records: Mutex<HashMap<IpAddr, CallerRecord>>,
}

impl TriggerRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            records: Mutex::new(HashMap::new()),
        }
    }

    pub fn new_shared(config: RateLimitConfig) -> Arc<Self> {
        Arc::new(Self::new(config))
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record a trigger from `caller` and decide whether it may proceed.
    pub fn check(&self, caller: IpAddr) -> RateLimitDecision {
        self.check_at(caller, Instant::now())
    }

    pub fn check_at(&self, caller: IpAddr, now: Instant) -> RateLimitDecision {
        let mut records = match self.records.lock() {
            Ok(r) => r,
            Err(_) => return RateLimitDecision::allow(),
        };

        if records.len() >= self.config.max_tracked_callers {
            Self::retain_live(&mut records, now);
        }

        match records.get_mut(&caller) {
            Some(record) if now < record.reset_at => {
                if record.count >= self.config.max_requests {
                    RateLimitDecision::reject(retry_after(record.reset_at, now))
                } else {
                    record.count += 1;
                    RateLimitDecision::allow()
                }
            },
            // Unknown caller or a lapsed window: start over.
            _ => {
                let Some(reset_at) = now.checked_add(self.config.window) else {
                    tracing::warn!(
                        window = ?self.config.window,
                        %caller,
                        "rate-limit window overflows the clock; rejecting"
                    );
                    return RateLimitDecision::reject(self.config.window.as_secs().max(1));
                };
                records.insert(caller, CallerRecord { count: 1, reset_at });
                RateLimitDecision::allow()
            },
        }
    }

    /// Triggers counted for `caller` in its current window.
    ///
    /// Returns 0 if the lock is poisoned.
    pub fn request_count(&self, caller: IpAddr) -> u32 {
        self.request_count_at(caller, Instant::now())
    }

    pub fn request_count_at(&self, caller: IpAddr, now: Instant) -> u32 {
        self.records
            .lock()
            .ok()
            .and_then(|records| {
                records
                    .get(&caller)
                    .filter(|record| now < record.reset_at)
                    .map(|record| record.count)
            })
            .unwrap_or(0)
    }

    /// Number of callers currently held in memory.
    pub fn tracked_count(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Drop every record whose window has lapsed; returns how many went.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        match self.records.lock() {
            Ok(mut records) => Self::retain_live(&mut records, now),
            Err(_) => 0,
        }
    }

    /// Sweep on `sweep_interval` until the limiter is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        let period = self.config.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(limiter) = weak.upgrade() else {
                    break;
                };
                let removed = limiter.sweep_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired rate-limit windows");
                }
            }
        })
    }

    fn retain_live(records: &mut HashMap<IpAddr, CallerRecord>, now: Instant) -> usize {
        let before = records.len();
        records.retain(|_, record| now < record.reset_at);
        before - records.len()
    }
}

impl Default for TriggerRateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

fn retry_after(reset_at: Instant, now: Instant) -> u64 {
    let remaining = reset_at.saturating_duration_since(now);
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    secs.max(1)
}
