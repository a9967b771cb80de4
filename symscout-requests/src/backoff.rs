//! Exponential retry backoff with a delay cap and random jitter.
//!
//! Jitter spreads out retries so a batch that hit the same transient failure
//! does not hammer the host again in lockstep.

use rand::Rng;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Backoff {
    current: Duration,
    max: Duration,
    factor: f64,
    jitter_ms: u64,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration, factor: f64, jitter_ms: u64) -> Self {
        Self {
            current: initial,
            max,
            factor,
            jitter_ms,
        }
    }

    /// The delay to sleep before the upcoming retry. Advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        };
        let delay = self.current + Duration::from_millis(jitter);

        let grown = Duration::from_secs_f64(self.current.as_secs_f64() * self.factor);
        self.current = grown.min(self.max);

        delay
    }

    /// The base delay the next call would start from, before jitter.
    pub fn current(&self) -> Duration {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_exponentially_without_jitter() {
        let mut backoff = Backoff::new(
            Duration::from_millis(100),
            Duration::from_millis(1600),
            2.0,
            0,
        );
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.next_delay(), Duration::from_millis(800));
    }

    #[test]
    fn caps_at_the_maximum_delay() {
        let mut backoff = Backoff::new(
            Duration::from_millis(500),
            Duration::from_millis(1000),
            3.0,
            0,
        );
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
        assert_eq!(backoff.next_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        for _ in 0..20 {
            let mut backoff = Backoff::new(
                Duration::from_millis(100),
                Duration::from_secs(1),
                2.0,
                50,
            );
            let base = backoff.current();
            let delay = backoff.next_delay();
            assert!(delay >= base);
            assert!(delay <= base + Duration::from_millis(50));
        }
    }
}
