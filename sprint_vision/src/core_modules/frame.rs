// THEORY:
// The `FrameBuffer` is the "dumb" data container of the engine: one captured camera
// image plus the instant it was captured. It knows its own shape and how to hand out
// the colour channels of a pixel, and nothing about comparing itself to other frames.
//
// Frames are immutable once built. The pixel bytes sit behind an `Arc<[u8]>` so the
// session can keep the previous frame while the source hands over the next one
// without copying megabytes every tick.

use crate::error::{EngineError, Result};
use image::RgbaImage;
use std::sync::Arc;
use std::time::Duration;

/// Channels the differencer reads from each pixel (R, G, B).
pub const COLOR_CHANNELS: usize = 3;
/// Byte stride of an RGBA pixel, the layout cameras and `image` hand us.
pub const RGBA_CHANNELS: usize = 4;

/// An immutable, timestamped grid of pixel samples.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    /// Bytes per pixel. Always at least `COLOR_CHANNELS`.
    channels: usize,
    data: Arc<[u8]>,
    /// Capture instant, measured from the engine clock's origin.
    timestamp: Duration,
}

impl FrameBuffer {
    /// Wraps raw interleaved pixel bytes. Fails if the pixel layout has fewer than
    /// three colour channels or the byte count does not match the dimensions.
    pub fn new(
        width: u32,
        height: u32,
        channels: usize,
        data: Vec<u8>,
        timestamp: Duration,
    ) -> Result<Self> {
        let expected = frame_len(width, height, channels.max(COLOR_CHANNELS));
        if channels < COLOR_CHANNELS || expected != Some(data.len()) {
            return Err(EngineError::InvalidFrame {
                expected: expected.unwrap_or(usize::MAX),
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data: data.into(),
            timestamp,
        })
    }

    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>, timestamp: Duration) -> Result<Self> {
        Self::new(width, height, RGBA_CHANNELS, data, timestamp)
    }

    pub fn from_rgba_image(image: RgbaImage, timestamp: Duration) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::from_rgba(width, height, image.into_raw(), timestamp)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// The colour channels of the pixel at `(x, y)`. Callers keep `x < width` and
    /// `y < height`.
    #[inline]
    pub fn color_at(&self, x: u32, y: u32) -> &[u8] {
        let start = (y as usize * self.width as usize + x as usize) * self.channels;
        &self.data[start..start + COLOR_CHANNELS]
    }
}

/// Byte length of a `width` x `height` frame, or `None` if it does not fit in memory.
fn frame_len(width: u32, height: u32, channels: usize) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(channels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_buffer() {
        let err = FrameBuffer::from_rgba(2, 2, vec![0u8; 15], Duration::ZERO).unwrap_err();
        assert_eq!(err, EngineError::InvalidFrame { expected: 16, actual: 15 });
    }

    #[test]
    fn rejects_grayscale_layout() {
        let result = FrameBuffer::new(2, 2, 1, vec![0u8; 4], Duration::ZERO);
        assert!(matches!(result, Err(EngineError::InvalidFrame { .. })));
    }

    #[test]
    fn oversized_layout_is_rejected_not_overflowed() {
        let err = FrameBuffer::new(2, 2, usize::MAX / 2, vec![0u8; 4], Duration::ZERO).unwrap_err();
        assert_eq!(err, EngineError::InvalidFrame { expected: usize::MAX, actual: 4 });
    }

    #[test]
    fn reads_color_channels_of_rgb_and_rgba() {
        let rgb = FrameBuffer::new(2, 1, 3, vec![1, 2, 3, 4, 5, 6], Duration::ZERO).unwrap();
        assert_eq!(rgb.color_at(1, 0), &[4, 5, 6]);

        let rgba = FrameBuffer::from_rgba(2, 1, vec![1, 2, 3, 255, 7, 8, 9, 255], Duration::ZERO)
            .unwrap();
        assert_eq!(rgba.color_at(1, 0), &[7, 8, 9]);
    }

    #[test]
    fn builds_from_image() {
        let image = RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        let frame = FrameBuffer::from_rgba_image(image, Duration::from_millis(40)).unwrap();
        assert_eq!(frame.dimensions(), (3, 2));
        assert_eq!(frame.timestamp(), Duration::from_millis(40));
        assert_eq!(frame.color_at(2, 1), &[10, 20, 30]);
    }
}
