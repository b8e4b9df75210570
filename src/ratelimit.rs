// src/ratelimit.rs
//! # Rate Limiter
//! Per-provider request budget over a rolling fixed window, plus a minimum
//! inter-request spacing of `window / budget`.
//!
//! Exceeding the budget never errors; `acquire` suspends the caller until a
//! slot is available, so the caller only ever experiences added latency.

use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;

use crate::types::ProviderStats;

/// Thread-safe rolling-window limiter. One instance per provider adapter;
/// the lock is never held across an await point.
#[derive(Debug)]
pub struct RateLimiter {
    budget: u32,
    window: Duration,
    spacing: Duration,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    count: u32,
    window_resets: Option<Instant>,
    last_request: Option<Instant>,
    stats: ProviderStats,
}

impl RateLimiter {
    pub fn new(budget: u32, window: Duration) -> Self {
        let budget = budget.max(1);
        Self {
            budget,
            window,
            spacing: window / budget,
            state: Mutex::new(State {
                count: 0,
                window_resets: None,
                last_request: None,
                stats: ProviderStats::default(),
            }),
        }
    }

    /// Wait until a request slot is available, then claim it. Must be called
    /// immediately before the network call it guards.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut s = self.state.lock().expect("rate limiter mutex poisoned");
                let now = Instant::now();

                // Window rollover: reset the counter and advance the reset
                // point one full window from now.
                match s.window_resets {
                    Some(resets) if now >= resets => {
                        s.count = 0;
                        s.window_resets = Some(now + self.window);
                        s.stats.window_resets_at = chrono_deadline(self.window);
                    }
                    None => {
                        s.window_resets = Some(now + self.window);
                        s.stats.window_resets_at = chrono_deadline(self.window);
                    }
                    _ => {}
                }

                if s.count >= self.budget {
                    // Budget exhausted: park until the window resets.
                    let resets = s.window_resets.expect("window reset set above");
                    Some(resets.saturating_duration_since(now))
                } else if let Some(last) = s.last_request {
                    let since = now.saturating_duration_since(last);
                    if since < self.spacing {
                        Some(self.spacing - since)
                    } else {
                        s.take_slot(now);
                        None
                    }
                } else {
                    s.take_slot(now);
                    None
                }
            };

            match wait {
                None => return,
                Some(d) => tokio::time::sleep(d.max(Duration::from_millis(1))).await,
            }
        }
    }

    /// Counter snapshot for observability. Read-only, no side effects.
    pub fn stats(&self) -> ProviderStats {
        self.state
            .lock()
            .expect("rate limiter mutex poisoned")
            .stats
            .clone()
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }
}

impl State {
    fn take_slot(&mut self, now: Instant) {
        self.count += 1;
        self.last_request = Some(now);
        self.stats.requests_total += 1;
        self.stats.last_request_at = Some(Utc::now());
    }
}

fn chrono_deadline(from_now: Duration) -> Option<chrono::DateTime<Utc>> {
    chrono::Duration::from_std(from_now)
        .ok()
        .map(|d| Utc::now() + d)
}
