use crate::foundation::core::{Affine, Canvas, Vec2};

/// Where a source raster lands on the canvas at one instant of a waypoint's dwell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Uniform scale applied to the source raster.
    pub scale: f64,
    /// Left edge of the drawn raster in canvas pixels.
    pub x: f64,
    /// Top edge of the drawn raster in canvas pixels.
    pub y: f64,
    /// Drawn width in canvas pixels.
    pub width: f64,
    /// Drawn height in canvas pixels.
    pub height: f64,
}

impl Placement {
    /// Source-raster space to canvas space.
    pub fn to_affine(self) -> Affine {
        Affine::translate(Vec2::new(self.x, self.y)) * Affine::scale(self.scale)
    }
}

/// Transition progress of frame `k` out of `n`: `k / n`, so frame 0 is exactly 0.
pub fn frame_progress(k: u64, n: u64) -> f64 {
    if n == 0 {
        return 0.0;
    }
    k as f64 / n as f64
}

/// `1 + (zoom - 1) * p`, with `p` clamped to `[0, 1]`.
pub fn zoom_scale(zoom: f64, progress: f64) -> f64 {
    1.0 + (zoom - 1.0) * progress.clamp(0.0, 1.0)
}

/// Scale the raster by [`zoom_scale`] and center it on the canvas.
pub fn placement(
    canvas: Canvas,
    image_width: u32,
    image_height: u32,
    zoom: f64,
    progress: f64,
) -> Placement {
    let scale = zoom_scale(zoom, progress);
    let width = f64::from(image_width) * scale;
    let height = f64::from(image_height) * scale;
    Placement {
        scale,
        x: (f64::from(canvas.width) - width) / 2.0,
        y: (f64::from(canvas.height) - height) / 2.0,
        width,
        height,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/synth/transition.rs"]
mod tests;
