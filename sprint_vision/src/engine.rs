// THEORY:
// The `SprintEngine` is the top-level API. It wraps one `DetectionSession` and drives
// it with two independently paced tokio tasks:
//
// - the **capture task** (every 100ms) pulls a frame from the `FrameSource` and
//   feeds it to the session;
// - the **timer task** (every 10ms) samples the sprint timer and publishes a
//   `SessionSnapshot` so the display never stalls on a dropped frame.
//
// Key architectural principles:
// 1.  **One cycle in flight**: The capture task awaits each frame before asking for
//     the next, and its interval delays rather than bursts after a slow capture. A
//     slow camera can never queue up frame requests.
// 2.  **Locks never cross an await**: The session sits behind a `std::sync::Mutex`
//     that is only taken for the synchronous part of a tick. Lifecycle calls take the
//     same lock, so they always observe a tick either fully applied or not started.
// 3.  **Generation fencing**: Each task remembers the session generation it was
//     spawned for. `stop_detecting` and `reset` bump the generation under the lock and
//     abort both tasks before returning; any tick that was mid-capture at that moment
//     finds a newer generation and publishes nothing.
// 4.  **Explicit teardown**: Dropping the engine aborts both tasks.

use crate::config::EngineConfig;
use crate::core_modules::frame::FrameBuffer;
use crate::core_modules::zone::DetectionZone;
use crate::error::{EngineError, Result};
use crate::frame_source::{FrameSource, SessionClock};
use crate::session::{DetectionSession, SessionState, TickOutcome};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const CAPTURE_PERIOD: Duration = Duration::from_millis(100);
pub const TIMER_SAMPLE_PERIOD: Duration = Duration::from_millis(10);

/// Read-only view of the session for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub detection_count: u8,
    pub elapsed: Duration,
}

type SharedSession = Arc<Mutex<DetectionSession>>;
type StatusSender = Arc<watch::Sender<SessionSnapshot>>;

pub struct SprintEngine<S: FrameSource> {
    source: Arc<S>,
    session: SharedSession,
    status: StatusSender,
    clock: SessionClock,
    capture_task: Option<JoinHandle<()>>,
    timer_task: Option<JoinHandle<()>>,
}

impl<S: FrameSource> SprintEngine<S> {
    /// Builds an idle engine. `clock` must be the clock `source` stamps frames with.
    pub fn new(source: S, config: &EngineConfig, clock: SessionClock) -> Self {
        let (status, _) = watch::channel(SessionSnapshot::default());
        Self {
            source: Arc::new(source),
            session: Arc::new(Mutex::new(DetectionSession::new(config))),
            status: Arc::new(status),
            clock,
            capture_task: None,
            timer_task: None,
        }
    }

    /// Arms a fresh sprint and spawns the capture and timer tasks. Must be called
    /// from within a tokio runtime.
    pub fn start_detecting(&mut self) -> Result<()> {
        if !self.source.is_ready() {
            return Err(EngineError::NotActive);
        }
        self.halt_tasks();

        let generation = {
            let mut session = lock(&self.session);
            session.start_detecting();
            publish(&self.status, &session, self.clock);
            session.generation()
        };

        self.capture_task = Some(tokio::spawn(run_capture(
            Arc::clone(&self.source),
            Arc::clone(&self.session),
            Arc::clone(&self.status),
            self.clock,
            generation,
        )));
        self.timer_task = Some(tokio::spawn(run_timer(
            Arc::clone(&self.session),
            Arc::clone(&self.status),
            self.clock,
            generation,
        )));
        Ok(())
    }

    /// Cancels detection. The session keeps its state (`Armed` or `Running` stay
    /// frozen); no event or timer update is published after this returns.
    pub fn stop_detecting(&mut self) {
        {
            let mut session = lock(&self.session);
            session.stop_detecting();
            publish(&self.status, &session, self.clock);
        }
        self.halt_tasks();
    }

    /// Cancels detection and returns the session to `Idle`.
    pub fn reset(&mut self) {
        {
            let mut session = lock(&self.session);
            session.reset();
            publish(&self.status, &session, self.clock);
        }
        self.halt_tasks();
    }

    /// Swaps the zone for the next comparison.
    pub fn set_zone(&self, zone: DetectionZone) -> Result<()> {
        lock(&self.session).set_zone(zone)
    }

    pub fn move_zone(&self, delta_x: f64, delta_y: f64) -> Result<DetectionZone> {
        lock(&self.session).move_zone(delta_x, delta_y)
    }

    pub fn resize_zone(&self, width: f64, height: f64) -> Result<DetectionZone> {
        lock(&self.session).resize_zone(width, height)
    }

    pub fn set_sensitivity(&self, sensitivity: f64) {
        lock(&self.session).set_sensitivity(sensitivity);
    }

    /// A receiver that sees every published `SessionSnapshot`.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.status.subscribe()
    }

    /// The session as of right now, sampled directly rather than from the last
    /// published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        snapshot_of(&lock(&self.session), self.clock)
    }

    pub fn state(&self) -> SessionState {
        lock(&self.session).state()
    }

    pub fn detection_count(&self) -> u8 {
        lock(&self.session).detection_count()
    }

    pub fn elapsed(&self) -> Duration {
        lock(&self.session).elapsed(self.clock.now())
    }

    pub fn zone(&self) -> DetectionZone {
        lock(&self.session).zone()
    }

    pub fn is_detecting(&self) -> bool {
        lock(&self.session).is_active()
    }

    pub fn clock(&self) -> SessionClock {
        self.clock
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn halt_tasks(&mut self) {
        for task in [self.capture_task.take(), self.timer_task.take()]
            .into_iter()
            .flatten()
        {
            task.abort();
        }
    }
}

impl<S: FrameSource> Drop for SprintEngine<S> {
    fn drop(&mut self) {
        self.halt_tasks();
    }
}

fn lock(session: &SharedSession) -> MutexGuard<'_, DetectionSession> {
    session
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn snapshot_of(session: &DetectionSession, clock: SessionClock) -> SessionSnapshot {
    SessionSnapshot {
        state: session.state(),
        detection_count: session.detection_count(),
        elapsed: session.elapsed(clock.now()),
    }
}

fn publish(status: &StatusSender, session: &DetectionSession, clock: SessionClock) {
    let snapshot = snapshot_of(session, clock);
    status.send_if_modified(|current| {
        if *current == snapshot {
            false
        } else {
            *current = snapshot;
            true
        }
    });
}

async fn run_capture<S: FrameSource>(
    source: Arc<S>,
    session: SharedSession,
    status: StatusSender,
    clock: SessionClock,
    generation: u64,
) {
    let mut ticker = tokio::time::interval(CAPTURE_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let frame = match source.capture_frame().await {
            Ok(frame) => frame,
            // Reporting capture failures belongs to the camera side.
            Err(_) => continue,
        };
        if !apply_frame(&session, &status, clock, generation, frame) {
            break;
        }
    }
}

/// Runs the synchronous half of a capture tick. Returns `false` once the capture
/// task should end.
fn apply_frame(
    session: &SharedSession,
    status: &StatusSender,
    clock: SessionClock,
    generation: u64,
    frame: FrameBuffer,
) -> bool {
    let mut guard = lock(session);
    if guard.generation() != generation {
        return false;
    }

    let outcome = guard.on_frame(frame);
    match outcome {
        Ok(TickOutcome::Started(_)) => {
            publish(status, &guard, clock);
            true
        }
        Ok(TickOutcome::Finished { elapsed, .. }) => {
            publish(status, &guard, clock);
            log::info!("sprint complete in {:?}", elapsed);
            false
        }
        Ok(TickOutcome::Inactive) => false,
        Ok(_) => true,
        Err(err) => {
            drop(guard);
            log::error!("detection invariant broken: {}", err);
            panic!("detection invariant broken: {err}");
        }
    }
}

async fn run_timer(
    session: SharedSession,
    status: StatusSender,
    clock: SessionClock,
    generation: u64,
) {
    let mut ticker = tokio::time::interval(TIMER_SAMPLE_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        if !sample_timer(&session, &status, clock, generation) {
            break;
        }
    }
}

/// Publishes the current elapsed time while running. Returns `false` once the timer
/// task should end.
fn sample_timer(
    session: &SharedSession,
    status: &StatusSender,
    clock: SessionClock,
    generation: u64,
) -> bool {
    let guard = lock(session);
    if guard.generation() != generation {
        return false;
    }
    match guard.state() {
        SessionState::Armed => true,
        SessionState::Running => {
            publish(status, &guard, clock);
            true
        }
        SessionState::Completed => {
            publish(status, &guard, clock);
            false
        }
        SessionState::Idle => false,
    }
}
