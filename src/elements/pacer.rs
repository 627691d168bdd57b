//! Frame pacing for presentation.
//!
//! A [`Pacer`] spaces calls to [`Pacer::wait`] a fixed interval apart,
//! scheduling against absolute deadlines so sleep overshoot does not
//! accumulate into drift.

use std::time::{Duration, Instant};

/// Spaces events a fixed interval apart.
///
/// # Example
///
/// ```rust
/// use litepipe::elements::Pacer;
/// use std::time::Duration;
///
/// // ~25 frames per second
/// let mut pacer = Pacer::new(Duration::from_millis(40));
///
/// let lag = pacer.wait(); // first call never sleeps
/// assert_eq!(lag, Duration::ZERO);
/// ```
#[derive(Debug, Clone)]
pub struct Pacer {
    interval: Duration,
    next_deadline: Option<Instant>,
    ticks: u64,
    total_delay: Duration,
    late_ticks: u64,
}

impl Pacer {
    /// Create a pacer with a fixed interval. A zero interval never sleeps.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_deadline: None,
            ticks: 0,
            total_delay: Duration::ZERO,
            late_ticks: 0,
        }
    }

    /// Create a pacer for a rate in events per second.
    pub fn from_rate(per_second: f64) -> Self {
        if per_second <= 0.0 || !per_second.is_finite() {
            return Self::new(Duration::ZERO);
        }
        Self::new(Duration::from_secs_f64(1.0 / per_second))
    }

    /// Get the interval between events.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of completed waits.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Total time spent sleeping.
    pub fn total_delay(&self) -> Duration {
        self.total_delay
    }

    /// Number of waits that were already past their deadline.
    pub fn late_ticks(&self) -> u64 {
        self.late_ticks
    }

    /// Forget the schedule; the next wait returns immediately.
    pub fn reset(&mut self) {
        self.next_deadline = None;
    }

    /// Sleep until the next slot and return how late this slot is.
    ///
    /// When more than a full interval behind, the schedule restarts from now
    /// instead of bursting to catch up.
    pub fn wait(&mut self) -> Duration {
        self.ticks += 1;
        if self.interval.is_zero() {
            return Duration::ZERO;
        }

        let now = Instant::now();
        let Some(deadline) = self.next_deadline else {
            self.next_deadline = Some(now + self.interval);
            return Duration::ZERO;
        };

        if now < deadline {
            let sleep_time = deadline - now;
            std::thread::sleep(sleep_time);
            self.total_delay += sleep_time;
            self.next_deadline = Some(deadline + self.interval);
            return Duration::ZERO;
        }

        let lag = now - deadline;
        self.late_ticks += 1;
        self.next_deadline = if lag > self.interval {
            Some(now + self.interval)
        } else {
            Some(deadline + self.interval)
        };
        lag
    }
}

impl Default for Pacer {
    /// 40 ms, about 25 frames per second.
    fn default() -> Self {
        Self::new(Duration::from_millis(40))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacer_spaces_events() {
        let mut pacer = Pacer::new(Duration::from_millis(10));

        let start = Instant::now();
        for _ in 0..4 {
            pacer.wait();
        }
        let elapsed = start.elapsed();

        // First wait is free, the other three each wait one interval.
        assert!(elapsed >= Duration::from_millis(30));
        assert_eq!(pacer.ticks(), 4);
    }

    #[test]
    fn test_pacer_zero_interval_never_sleeps() {
        let mut pacer = Pacer::new(Duration::ZERO);
        for _ in 0..100 {
            assert_eq!(pacer.wait(), Duration::ZERO);
        }
        assert_eq!(pacer.total_delay(), Duration::ZERO);
    }

    #[test]
    fn test_pacer_reports_lag() {
        let mut pacer = Pacer::new(Duration::from_millis(5));
        pacer.wait();
        std::thread::sleep(Duration::from_millis(20));

        let lag = pacer.wait();
        assert!(lag >= Duration::from_millis(10));
        assert_eq!(pacer.late_ticks(), 1);

        // The schedule restarted, so the next slot is on time again.
        assert_eq!(pacer.wait(), Duration::ZERO);
    }

    #[test]
    fn test_pacer_from_rate() {
        assert_eq!(Pacer::from_rate(25.0).interval(), Duration::from_millis(40));
        assert_eq!(Pacer::from_rate(0.0).interval(), Duration::ZERO);
        assert_eq!(Pacer::default().interval(), Duration::from_millis(40));
    }
}
