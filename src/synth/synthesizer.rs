use std::iter::FusedIterator;

use crate::assets::decode::RasterImage;
use crate::assets::resolver::ImageUnavailable;
use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRGBA};
use crate::foundation::error::{ReelError, ReelResult};
use crate::synth::compositor::Compositor;
use crate::synth::transition::{frame_progress, placement};
use crate::timeline::waypoint::Waypoint;

/// Options for [`FrameSynthesizer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynthOpts {
    /// Output canvas.
    pub canvas: Canvas,
    /// Synthesis frame rate.
    pub fps: Fps,
    /// Straight RGBA background; alpha is ignored, the background is always opaque.
    pub background: [u8; 4],
}

impl Default for SynthOpts {
    fn default() -> Self {
        Self {
            canvas: Canvas::DEFAULT,
            fps: Fps::DEFAULT,
            background: [0, 0, 0, 255],
        }
    }
}

/// One synthesized frame of a waypoint's dwell.
#[derive(Clone, Debug)]
pub struct SynthFrame {
    /// Frame index within the waypoint, `0..N`.
    pub index: FrameIndex,
    /// Transition progress `index / N`.
    pub progress: f64,
    /// Raster scale used for this frame.
    pub scale: f64,
    /// Composited pixels (premultiplied, opaque).
    pub frame: FrameRGBA,
}

/// Turns a waypoint plus its raster into frames.
#[derive(Clone, Debug)]
pub struct FrameSynthesizer {
    opts: SynthOpts,
}

impl FrameSynthesizer {
    /// Create a synthesizer with validated options.
    pub fn new(opts: SynthOpts) -> ReelResult<Self> {
        opts.canvas.validate()?;
        Fps::new(opts.fps.num, opts.fps.den)?;
        Ok(Self { opts })
    }

    /// Options in use.
    pub fn opts(&self) -> SynthOpts {
        self.opts
    }

    /// `round(duration * F)`.
    pub fn frame_count(&self, waypoint: &Waypoint) -> u64 {
        waypoint.frame_count(self.opts.fps)
    }

    /// Lazily produce the dwell frames of the waypoint at `index`.
    ///
    /// A failed image yields [`ReelError::ImageUnavailable`] and no frames. The returned iterator
    /// is finite and single-use.
    pub fn synthesize(
        &self,
        index: usize,
        waypoint: &Waypoint,
        image: Result<RasterImage, ImageUnavailable>,
    ) -> ReelResult<WaypointFrames> {
        let image = image.map_err(|e| ReelError::ImageUnavailable {
            index,
            waypoint: waypoint.id.clone(),
            reason: e.reason,
        })?;
        let compositor = Compositor::new(self.opts.canvas, self.opts.background, &image)?;
        Ok(WaypointFrames {
            compositor,
            canvas: self.opts.canvas,
            zoom: waypoint.zoom,
            next: 0,
            total: self.frame_count(waypoint),
        })
    }

    /// Compose a single frame at an arbitrary `progress` in `[0, 1]`.
    pub fn compose_at(
        &self,
        image: &RasterImage,
        waypoint: &Waypoint,
        progress: f64,
    ) -> ReelResult<FrameRGBA> {
        if !progress.is_finite() {
            return Err(ReelError::validation("progress must be finite"));
        }
        let mut compositor = Compositor::new(self.opts.canvas, self.opts.background, image)?;
        let (iw, ih) = compositor.image_size();
        Ok(compositor.compose(placement(
            self.opts.canvas,
            iw,
            ih,
            waypoint.zoom,
            progress,
        )))
    }
}

/// Lazy frame sequence for one waypoint. Yields exactly `round(duration * F)` frames.
pub struct WaypointFrames {
    compositor: Compositor,
    canvas: Canvas,
    zoom: f64,
    next: u64,
    total: u64,
}

impl WaypointFrames {
    /// Total frames this sequence yields.
    pub fn total(&self) -> u64 {
        self.total
    }
}

impl Iterator for WaypointFrames {
    type Item = SynthFrame;

    fn next(&mut self) -> Option<SynthFrame> {
        if self.next >= self.total {
            return None;
        }
        let k = self.next;
        self.next += 1;

        let progress = frame_progress(k, self.total);
        let (iw, ih) = self.compositor.image_size();
        let p = placement(self.canvas, iw, ih, self.zoom, progress);
        Some(SynthFrame {
            index: FrameIndex(k),
            progress,
            scale: p.scale,
            frame: self.compositor.compose(p),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = usize::try_from(self.total - self.next).unwrap_or(usize::MAX);
        (left, Some(left))
    }
}

impl ExactSizeIterator for WaypointFrames {}

impl FusedIterator for WaypointFrames {}

#[cfg(test)]
#[path = "../../tests/unit/synth/synthesizer.rs"]
mod tests;
