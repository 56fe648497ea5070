//! Per-waypoint frame synthesis.
//!
//! Both playback and rendering go through [`transition`] so that a preview frame and an encoded
//! frame at the same progress are identical.

/// vello_cpu compositing of a raster onto the output canvas.
pub(crate) mod compositor;
/// Lazy per-waypoint frame sequences.
pub mod synthesizer;
/// The zoom-ramp transition law.
pub mod transition;
