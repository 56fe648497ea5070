//! Whole-timeline rendering into an encoded video.

/// Per-render progress record.
pub mod job;
/// The render driver.
pub mod pipeline;
