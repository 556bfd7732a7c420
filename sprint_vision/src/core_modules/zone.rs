// THEORY:
// The `zone` module is the geometry layer. A `DetectionZone` is the rectangle of the
// camera frame that the gate watches, expressed in percentages of the frame so it
// stays meaningful when the camera resolution changes.
//
// Key architectural principles:
// 1.  **Saturate, never reject**: The zone editor drags and resizes the zone with
//     arbitrary deltas. Every operation here clamps its result back into the frame
//     instead of returning an error, so the caller always gets a usable zone.
// 2.  **Fractions in, pixels out**: The zone only knows percentages. The conversion
//     to absolute pixel bounds happens once per comparison, against the dimensions
//     of the frame being compared (`pixel_rect`).

use serde::Deserialize;

/// Upper edge of the percentage space both axes live in.
pub const FULL_FRAME: f64 = 100.0;

/// A rectangular region of the frame, each field a percentage in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DetectionZone {
    /// Left edge, percent of frame width.
    pub x: f64,
    /// Top edge, percent of frame height.
    pub y: f64,
    /// Percent of frame width covered.
    pub width: f64,
    /// Percent of frame height covered.
    pub height: f64,
}

/// Caller-supplied limits on zone size, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ZoneBounds {
    pub min_width: f64,
    pub max_width: f64,
    pub min_height: f64,
    pub max_height: f64,
}

/// Absolute pixel bounds of a zone inside a specific frame. `x1`/`y1` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn area(&self) -> u64 {
        (self.x1 - self.x0) as u64 * (self.y1 - self.y0) as u64
    }
}

impl Default for DetectionZone {
    fn default() -> Self {
        Self {
            x: 20.0,
            y: 40.0,
            width: 60.0,
            height: 20.0,
        }
    }
}

impl Default for ZoneBounds {
    fn default() -> Self {
        Self {
            min_width: 20.0,
            max_width: 80.0,
            min_height: 10.0,
            max_height: 50.0,
        }
    }
}

impl ZoneBounds {
    /// Returns bounds with each pair ordered and kept inside the frame.
    pub fn normalized(self) -> Self {
        let (min_width, max_width) = ordered_extent(self.min_width, self.max_width);
        let (min_height, max_height) = ordered_extent(self.min_height, self.max_height);
        Self {
            min_width,
            max_width,
            min_height,
            max_height,
        }
    }
}

impl DetectionZone {
    /// Builds a zone, saturating every field so the invariants hold.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        let width = saturate_extent(width);
        let height = saturate_extent(height);
        Self {
            x: saturate_origin(x, width),
            y: saturate_origin(y, height),
            width,
            height,
        }
    }

    /// Translates the zone by a percentage delta, keeping it inside the frame.
    /// Width and height never change.
    pub fn clamped(&self, delta_x: f64, delta_y: f64) -> Self {
        Self {
            x: saturate_origin(self.x + finite_or_zero(delta_x), self.width),
            y: saturate_origin(self.y + finite_or_zero(delta_y), self.height),
            width: self.width,
            height: self.height,
        }
    }

    /// Applies a new size within `bounds`, then pulls the origin back in if the
    /// larger zone would spill past the frame edge.
    pub fn resized(&self, new_width: f64, new_height: f64, bounds: &ZoneBounds) -> Self {
        let bounds = bounds.normalized();
        let width = pick(new_width, self.width).clamp(bounds.min_width, bounds.max_width);
        let height = pick(new_height, self.height).clamp(bounds.min_height, bounds.max_height);
        Self {
            x: saturate_origin(self.x, width),
            y: saturate_origin(self.y, height),
            width,
            height,
        }
    }

    /// Converts the zone to pixel bounds for a `frame_width` x `frame_height` frame.
    /// Each edge is `floor(percent / 100 * dimension)`, clipped to the frame.
    pub fn pixel_rect(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        let x0 = to_pixel(self.x, frame_width);
        let y0 = to_pixel(self.y, frame_height);
        let span_x = to_pixel(self.width, frame_width);
        let span_y = to_pixel(self.height, frame_height);
        PixelRect {
            x0,
            y0,
            x1: x0.saturating_add(span_x).min(frame_width),
            y1: y0.saturating_add(span_y).min(frame_height),
        }
    }
}

fn to_pixel(percent: f64, dimension: u32) -> u32 {
    let raw = (percent / FULL_FRAME * dimension as f64).floor();
    if raw.is_nan() || raw <= 0.0 {
        0
    } else {
        (raw as u32).min(dimension)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

fn pick(candidate: f64, fallback: f64) -> f64 {
    if candidate.is_finite() { candidate } else { fallback }
}

fn saturate_extent(extent: f64) -> f64 {
    if extent.is_nan() || extent <= 0.0 {
        f64::MIN_POSITIVE
    } else {
        extent.min(FULL_FRAME)
    }
}

fn saturate_origin(origin: f64, extent: f64) -> f64 {
    let max_origin = (FULL_FRAME - extent).max(0.0);
    finite_or_zero(origin).clamp(0.0, max_origin)
}

fn ordered_extent(a: f64, b: f64) -> (f64, f64) {
    let a = saturate_extent(a);
    let b = saturate_extent(b);
    if a <= b { (a, b) } else { (b, a) }
}
