// THEORY:
// The `DebouncedDetector` turns the continuous stream of per-frame motion scores into
// discrete, numbered detection events. A runner crossing the zone produces motion for
// several consecutive frames; without debouncing each of those frames would look like
// a fresh crossing.
//
// The cooldown is measured between accepted events using their timestamps, not by
// pausing the capture loop. Polling cadence stays fixed and jitter in frame arrival
// does not change how many frames the cooldown spans.
//
// The detector has no idea how many events a sprint needs. Capping detections at two
// is the session's job.

use crate::core_modules::differencer::MotionSample;
use std::time::Duration;

/// Share of zone pixels that must change before a sample counts as motion.
pub const DEFAULT_MOTION_THRESHOLD_PERCENT: f64 = 5.0;
/// Minimum gap between two accepted detection events.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(500);

/// A discrete motion occurrence accepted by the debouncer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionEvent {
    /// 1 for the first event since the last reset, 2 for the second, and so on.
    pub ordinal: u32,
    pub timestamp: Duration,
}

#[derive(Debug, Clone)]
pub struct DebouncedDetector {
    motion_threshold_percent: f64,
    cooldown: Duration,
    last_event_timestamp: Option<Duration>,
    events_emitted: u32,
}

impl Default for DebouncedDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MOTION_THRESHOLD_PERCENT, DEFAULT_COOLDOWN)
    }
}

impl DebouncedDetector {
    pub fn new(motion_threshold_percent: f64, cooldown: Duration) -> Self {
        Self {
            motion_threshold_percent,
            cooldown,
            last_event_timestamp: None,
            events_emitted: 0,
        }
    }

    /// Feeds one motion sample. Returns an event when the sample is above the motion
    /// threshold and the cooldown since the last event has elapsed.
    pub fn observe(&mut self, sample: &MotionSample) -> Option<DetectionEvent> {
        if sample.percent_changed <= self.motion_threshold_percent {
            return None;
        }
        if let Some(last) = self.last_event_timestamp {
            // A sample older than the last event (clock skew) also stays suppressed.
            if sample.timestamp.saturating_sub(last) < self.cooldown {
                return None;
            }
        }

        self.last_event_timestamp = Some(sample.timestamp);
        self.events_emitted += 1;
        Some(DetectionEvent {
            ordinal: self.events_emitted,
            timestamp: sample.timestamp,
        })
    }

    pub fn reset(&mut self) {
        self.last_event_timestamp = None;
        self.events_emitted = 0;
    }

    pub fn last_event_timestamp(&self) -> Option<Duration> {
        self.last_event_timestamp
    }
}
