// THEORY:
// The `FrameDifferencer` is the comparative lens of the engine, the same role a
// `SmartPixel` plays for a single pair of pixels but applied to a whole zone. Given two
// consecutive frames it measures how much of the detection zone changed.
//
// Key architectural principles:
// 1.  **Per-pixel vote**: Each pixel inside the zone is compared across its colour
//     channels. The mean absolute channel difference is its "delta"; a pixel votes
//     "changed" when that delta exceeds the sensitivity.
// 2.  **Zone-relative score**: The output is the share of zone pixels that voted
//     changed, in percent. This makes the score independent of zone size and camera
//     resolution, so one motion threshold works everywhere.
// 3.  **Stateless**: The differencer holds only its sensitivity. Frame history belongs
//     to the session.

use crate::core_modules::frame::{COLOR_CHANNELS, FrameBuffer};
use crate::core_modules::zone::DetectionZone;
use crate::error::{EngineError, Result};
use std::time::Duration;

/// The motion measured between one pair of frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    /// Share of zone pixels that changed, in `[0, 100]`.
    pub percent_changed: f64,
    /// Capture instant of the newer frame.
    pub timestamp: Duration,
}

/// Scores the change inside a zone between two frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDifferencer {
    /// Per-pixel mean channel difference above which a pixel counts as changed.
    pub sensitivity: f64,
}

impl FrameDifferencer {
    pub fn new(sensitivity: f64) -> Self {
        Self { sensitivity }
    }

    /// Compares `current` against `previous` inside `zone`.
    ///
    /// The zone is mapped to pixels using `current`'s dimensions. A zone that covers
    /// no pixels scores zero. Frames of different sizes are a sequencing bug and
    /// return `DimensionMismatch`.
    pub fn score(
        &self,
        previous: &FrameBuffer,
        current: &FrameBuffer,
        zone: &DetectionZone,
    ) -> Result<MotionSample> {
        if previous.dimensions() != current.dimensions() {
            return Err(EngineError::DimensionMismatch {
                previous: previous.dimensions(),
                current: current.dimensions(),
            });
        }

        let rect = zone.pixel_rect(current.width(), current.height());
        let total_pixels = rect.area();
        if total_pixels == 0 {
            return Ok(MotionSample {
                percent_changed: 0.0,
                timestamp: current.timestamp(),
            });
        }

        let mut changed_pixels = 0u64;
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                if self.pixel_changed(previous.color_at(x, y), current.color_at(x, y)) {
                    changed_pixels += 1;
                }
            }
        }

        Ok(MotionSample {
            percent_changed: changed_pixels as f64 / total_pixels as f64 * 100.0,
            timestamp: current.timestamp(),
        })
    }

    #[inline]
    fn pixel_changed(&self, before: &[u8], after: &[u8]) -> bool {
        let delta_sum: u32 = before
            .iter()
            .zip(after)
            .map(|(b, a)| b.abs_diff(*a) as u32)
            .sum();
        delta_sum as f64 / COLOR_CHANNELS as f64 > self.sensitivity
    }
}
