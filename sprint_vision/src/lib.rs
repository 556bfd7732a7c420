// THEORY:
// This file is the entry point for the `sprint_vision` library crate. It exposes the
// camera sprint gate as a small public API: build a `SprintEngine` over a
// `FrameSource`, arm it, and read back the `SessionState` and elapsed time while the
// engine watches the detection zone for the start and stop crossings.
//
// The layers, bottom up:
// - `core_modules`: zone geometry, frame buffers, the frame differencer, the debounced
//   detector and the sprint timer. Pure, synchronous building blocks.
// - `session`: the Idle -> Armed -> Running -> Completed state machine that sequences
//   the core modules for each frame.
// - `engine`: the async driver with its capture and timer tasks.

pub mod config;
pub mod core_modules;
pub mod engine;
pub mod error;
pub mod frame_source;
pub mod session;

pub use config::EngineConfig;
pub use core_modules::debouncer::DetectionEvent;
pub use core_modules::differencer::MotionSample;
pub use core_modules::frame::FrameBuffer;
pub use core_modules::sprint_timer::format_elapsed;
pub use core_modules::zone::{DetectionZone, ZoneBounds};
pub use engine::{SessionSnapshot, SprintEngine};
pub use error::EngineError;
pub use frame_source::{FrameSource, ImageSequenceSource, SessionClock};
pub use session::{DetectionSession, SessionState, TickOutcome};
