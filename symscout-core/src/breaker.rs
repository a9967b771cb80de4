//! Circuit breaker guarding the vendor host during bulk collection.
//!
//! HTTP 403 trips the breaker immediately (IP ban); a streak of rate limits
//! or server errors trips it after a threshold. While open, lookup runs fail
//! fast until the cooldown expires.

use crate::error::ScoutError;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct BreakerInner {
    opened_at: Option<Instant>,
    streak: u32,
}

/// Cooldown breaker shared by all runs against one provider.
#[derive(Debug)]
pub struct RequestBreaker {
    inner: Mutex<BreakerInner>,
    cooldown: Duration,
    trip_threshold: u32,
}

impl Default for RequestBreaker {
    /// 30-minute cooldown, trips after 5 consecutive throttle responses.
    fn default() -> Self {
        Self::new(Duration::from_secs(30 * 60), 5)
    }
}

impl RequestBreaker {
    pub fn new(cooldown: Duration, trip_threshold: u32) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                opened_at: None,
                streak: 0,
            }),
            cooldown,
            trip_threshold,
        }
    }

    /// Fail fast while the breaker is open; closes it once the cooldown has
    /// expired.
    pub fn check(&self) -> Result<(), ScoutError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(opened_at) = inner.opened_at {
            if opened_at.elapsed() < self.cooldown {
                let remaining = self.cooldown - opened_at.elapsed();
                return Err(ScoutError::BreakerOpen {
                    remaining_secs: remaining.as_secs(),
                });
            }
            inner.opened_at = None;
            inner.streak = 0;
        }
        Ok(())
    }

    /// Record one settled request. A success resets the streak; a 403 trips
    /// immediately; throttle and server statuses grow the streak toward the
    /// threshold.
    pub fn observe(&self, status: Option<u16>, ok: bool) {
        let mut inner = self.inner.lock().unwrap();
        if ok {
            inner.streak = 0;
            return;
        }
        match status {
            Some(403) => inner.opened_at = Some(Instant::now()),
            Some(status) if status == 429 || status >= 500 => {
                inner.streak += 1;
                if inner.streak >= self.trip_threshold {
                    inner.opened_at = Some(Instant::now());
                }
            }
            _ => {}
        }
    }

    /// Remaining cooldown, zero when closed.
    pub fn remaining(&self) -> Duration {
        let inner = self.inner.lock().unwrap();
        match inner.opened_at {
            Some(opened_at) => self.cooldown.saturating_sub(opened_at.elapsed()),
            None => Duration::ZERO,
        }
    }
}
