// THEORY:
// The `frame_source` module is the boundary to the camera. The engine asks a
// `FrameSource` for one frame per capture tick and awaits it; that await is the only
// place the engine can block. Everything after the frame arrives is synchronous.
//
// Sources stamp each frame with a `SessionClock` reading so detection timestamps and
// timer samples share one monotonic timeline. A failed capture is reported as
// `EngineError::CaptureFailure` and the engine simply skips that tick.

use crate::core_modules::frame::FrameBuffer;
use crate::error::{EngineError, Result};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Monotonic time since the engine was created.
#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    origin: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

/// The camera collaborator.
pub trait FrameSource: Send + Sync + 'static {
    /// Whether the camera is started and able to deliver frames.
    fn is_ready(&self) -> bool {
        true
    }

    /// Captures one frame. Called at most once per tick, never concurrently.
    fn capture_frame(&self) -> BoxFuture<'_, Result<FrameBuffer>>;
}

/// Replays still images from disk as if they were camera frames, one per capture.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    cursor: AtomicUsize,
    clock: SessionClock,
}

impl ImageSequenceSource {
    /// Collects every regular file in `dir`, replayed in file name order.
    pub fn from_dir(dir: &Path, clock: SessionClock) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| {
            EngineError::Config(format!("cannot read frame directory {}: {}", dir.display(), e))
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        paths.sort();
        Ok(Self::from_paths(paths, clock))
    }

    pub fn from_paths(paths: Vec<PathBuf>, clock: SessionClock) -> Self {
        Self {
            paths,
            cursor: AtomicUsize::new(0),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Frames not yet handed out.
    pub fn remaining(&self) -> usize {
        self.paths.len().saturating_sub(self.cursor.load(Ordering::Acquire))
    }
}

impl FrameSource for ImageSequenceSource {
    fn is_ready(&self) -> bool {
        !self.paths.is_empty()
    }

    fn capture_frame(&self) -> BoxFuture<'_, Result<FrameBuffer>> {
        async move {
            let index = self.cursor.fetch_add(1, Ordering::AcqRel);
            let path = self
                .paths
                .get(index)
                .cloned()
                .ok_or_else(|| EngineError::CaptureFailure("image sequence exhausted".into()))?;

            let decoded = tokio::task::spawn_blocking(move || image::open(&path))
                .await
                .map_err(|e| EngineError::CaptureFailure(e.to_string()))?
                .map_err(|e| EngineError::CaptureFailure(e.to_string()))?;

            FrameBuffer::from_rgba_image(decoded.to_rgba8(), self.clock.now())
        }
        .boxed()
    }
}
