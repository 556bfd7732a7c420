// THEORY:
// The `SprintTimer` is a monotonic stopwatch driven by caller-supplied instants.
//
// Key architectural principles:
// 1.  **No clock of its own**: Every operation takes the instant it applies to, so the
//     session can start it at a detection's capture time and the presentation layer
//     can sample it at whatever rate it refreshes.
// 2.  **Frozen on stop**: Once stopped, `sample` returns the final result no matter
//     what instant it is asked about.

use crate::error::{EngineError, Result};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SprintTimer {
    start: Option<Duration>,
    frozen: Duration,
    running: bool,
}

impl SprintTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, at: Duration) {
        self.start = Some(at);
        self.frozen = Duration::ZERO;
        self.running = true;
    }

    /// Elapsed time at `now` while running; the frozen result once stopped.
    pub fn sample(&self, now: Duration) -> Duration {
        match (self.running, self.start) {
            (true, Some(start)) => now.saturating_sub(start),
            _ => self.frozen,
        }
    }

    /// Freezes and returns `at - start`.
    pub fn stop(&mut self, at: Duration) -> Result<Duration> {
        let start = match (self.running, self.start) {
            (true, Some(start)) => start,
            _ => return Err(EngineError::NotRunning),
        };
        self.frozen = at.saturating_sub(start);
        self.running = false;
        Ok(self.frozen)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Renders a duration as `seconds.milliseconds` with a three digit fraction, e.g.
/// `1.050s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    format!("{}.{:03}s", millis / 1000, millis % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn samples_while_running_and_freezes_on_stop() {
        let mut timer = SprintTimer::new();
        timer.start(ms(200));
        assert!(timer.is_running());
        assert_eq!(timer.sample(ms(250)), ms(50));

        assert_eq!(timer.stop(ms(3_450)), Ok(ms(3_250)));
        assert!(!timer.is_running());
        assert_eq!(timer.sample(ms(9_999)), ms(3_250));
    }

    #[test]
    fn stop_when_not_running_fails() {
        let mut timer = SprintTimer::new();
        assert_eq!(timer.stop(ms(10)), Err(EngineError::NotRunning));

        timer.start(ms(0));
        timer.stop(ms(10)).unwrap();
        assert_eq!(timer.stop(ms(20)), Err(EngineError::NotRunning));
        assert_eq!(timer.sample(ms(30)), ms(10));
    }

    #[test]
    fn reset_returns_to_zero() {
        let mut timer = SprintTimer::new();
        timer.start(ms(5));
        timer.stop(ms(1_005)).unwrap();
        timer.reset();
        assert_eq!(timer, SprintTimer::new());
        assert_eq!(timer.sample(ms(2_000)), Duration::ZERO);
    }

    #[test]
    fn sample_before_start_instant_saturates() {
        let mut timer = SprintTimer::new();
        timer.start(ms(500));
        assert_eq!(timer.sample(ms(400)), Duration::ZERO);
    }

    #[test]
    fn formats_with_padded_milliseconds() {
        assert_eq!(format_elapsed(Duration::ZERO), "0.000s");
        assert_eq!(format_elapsed(ms(50)), "0.050s");
        assert_eq!(format_elapsed(ms(12_345)), "12.345s");
        assert_eq!(format_elapsed(Duration::from_micros(1_999_999)), "1.999s");
    }
}
