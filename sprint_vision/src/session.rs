// THEORY:
// The `DetectionSession` is the state machine of one timed sprint. It owns every piece
// of mutable state the gate needs (previous frame, debouncer, timer, detection count)
// and sequences the core modules for each incoming frame:
//
//     frame -> FrameDifferencer -> DebouncedDetector -> state machine -> SprintTimer
//
// Key architectural principles:
// 1.  **Single writer**: Only `on_frame` and the lifecycle calls mutate the session.
//     Everything the presentation layer needs is a read-only query.
// 2.  **Seed before compare**: The first frame after arming is stored without a
//     comparison, so nothing captured before `start_detecting` can ever trigger.
// 3.  **Two events, then done**: The first accepted detection starts the timer, the
//     second stops it and deactivates the detector. The debouncer may produce more;
//     the session ignores them and never stops the timer twice.
// 4.  **Generations**: Every lifecycle call bumps `generation`. Async callers tag work
//     with the generation it started under and drop results from an older one.

use crate::config::EngineConfig;
use crate::core_modules::debouncer::{DebouncedDetector, DetectionEvent};
use crate::core_modules::differencer::{FrameDifferencer, MotionSample};
use crate::core_modules::frame::FrameBuffer;
use crate::core_modules::sprint_timer::SprintTimer;
use crate::core_modules::zone::{DetectionZone, ZoneBounds};
use crate::error::{EngineError, Result};
use std::time::Duration;

/// Externally observable phase of a sprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No detector active, timer at zero.
    #[default]
    Idle,
    /// Detector active, waiting for the start gate.
    Armed,
    /// Start gate seen, timer ticking.
    Running,
    /// Stop gate seen, elapsed time frozen.
    Completed,
}

/// What a single frame did to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// The detector is not active; the frame was dropped.
    Inactive,
    /// The frame was stored as the comparison baseline.
    Seeded,
    /// The frame was older than the stored baseline and was dropped.
    OutOfOrder,
    /// The frame was compared and produced no detection.
    Quiet(MotionSample),
    /// First detection: the timer started at `event.timestamp`.
    Started(DetectionEvent),
    /// Second detection: the timer stopped with `elapsed`.
    Finished {
        event: DetectionEvent,
        elapsed: Duration,
    },
}

pub struct DetectionSession {
    zone: DetectionZone,
    zone_bounds: ZoneBounds,
    differencer: FrameDifferencer,
    detector: DebouncedDetector,
    timer: SprintTimer,
    previous: Option<FrameBuffer>,
    detection_count: u8,
    state: SessionState,
    active: bool,
    generation: u64,
}

impl DetectionSession {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            zone: config.zone,
            zone_bounds: config.zone_bounds,
            differencer: FrameDifferencer::new(config.sensitivity),
            detector: DebouncedDetector::new(config.motion_threshold_percent, config.cooldown),
            timer: SprintTimer::new(),
            previous: None,
            detection_count: 0,
            state: SessionState::Idle,
            active: false,
            generation: 0,
        }
    }

    /// Arms a fresh sprint. Anything left from an earlier run, including a stored
    /// frame, is discarded first.
    pub fn start_detecting(&mut self) {
        self.reset();
        self.active = true;
        self.state = SessionState::Armed;
        log::info!("detection armed (generation {})", self.generation);
    }

    /// Deactivates the detector without advancing the state. An `Armed` or `Running`
    /// session stays frozen in that state until `reset` or `start_detecting`.
    pub fn stop_detecting(&mut self) {
        if self.active {
            log::info!("detection stopped in state {:?}", self.state);
        }
        self.active = false;
        self.generation += 1;
    }

    /// Returns to `Idle` from any state.
    pub fn reset(&mut self) {
        self.timer.reset();
        self.detector.reset();
        self.previous = None;
        self.detection_count = 0;
        self.state = SessionState::Idle;
        self.active = false;
        self.generation += 1;
    }

    /// Feeds the next captured frame.
    pub fn on_frame(&mut self, frame: FrameBuffer) -> Result<TickOutcome> {
        if !self.active {
            return Ok(TickOutcome::Inactive);
        }

        let Some(previous) = self.previous.as_ref() else {
            self.previous = Some(frame);
            return Ok(TickOutcome::Seeded);
        };
        if frame.timestamp() < previous.timestamp() {
            return Ok(TickOutcome::OutOfOrder);
        }
        if frame.dimensions() != previous.dimensions() {
            log::warn!(
                "camera resolution changed from {:?} to {:?}; reseeding",
                previous.dimensions(),
                frame.dimensions()
            );
            self.previous = Some(frame);
            return Ok(TickOutcome::Seeded);
        }

        let sample = self.differencer.score(previous, &frame, &self.zone)?;
        self.previous = Some(frame);
        log::debug!(
            "zone changed {:.2}% at {:?}",
            sample.percent_changed,
            sample.timestamp
        );

        match self.detector.observe(&sample) {
            Some(event) => self.advance(event, sample),
            None => Ok(TickOutcome::Quiet(sample)),
        }
    }

    fn advance(&mut self, event: DetectionEvent, sample: MotionSample) -> Result<TickOutcome> {
        match self.state {
            SessionState::Armed => {
                self.timer.start(event.timestamp);
                self.detection_count = 1;
                self.state = SessionState::Running;
                log::info!("start gate crossed at {:?}", event.timestamp);
                Ok(TickOutcome::Started(event))
            }
            SessionState::Running => {
                let elapsed = self.timer.stop(event.timestamp)?;
                self.detection_count = 2;
                self.state = SessionState::Completed;
                self.active = false;
                log::info!("stop gate crossed at {:?}, elapsed {:?}", event.timestamp, elapsed);
                Ok(TickOutcome::Finished { event, elapsed })
            }
            SessionState::Idle | SessionState::Completed => Ok(TickOutcome::Quiet(sample)),
        }
    }

    /// Replaces the zone used by the next comparison. Refused while the timer runs so a
    /// sprint is timed against one fixed zone.
    pub fn set_zone(&mut self, zone: DetectionZone) -> Result<()> {
        if self.state == SessionState::Running {
            return Err(EngineError::ZoneLocked);
        }
        self.zone = DetectionZone::new(zone.x, zone.y, zone.width, zone.height);
        Ok(())
    }

    /// Drags the zone by a percentage delta.
    pub fn move_zone(&mut self, delta_x: f64, delta_y: f64) -> Result<DetectionZone> {
        let moved = self.zone.clamped(delta_x, delta_y);
        self.set_zone(moved)?;
        Ok(self.zone)
    }

    /// Resizes the zone within the configured bounds.
    pub fn resize_zone(&mut self, width: f64, height: f64) -> Result<DetectionZone> {
        let resized = self.zone.resized(width, height, &self.zone_bounds);
        self.set_zone(resized)?;
        Ok(self.zone)
    }

    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        self.differencer.sensitivity = EngineConfig::saturate_sensitivity(sensitivity);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn detection_count(&self) -> u8 {
        self.detection_count
    }

    /// Elapsed sprint time as of `now`.
    pub fn elapsed(&self, now: Duration) -> Duration {
        self.timer.sample(now)
    }

    pub fn zone(&self) -> DetectionZone {
        self.zone
    }

    pub fn sensitivity(&self) -> f64 {
        self.differencer.sensitivity
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
