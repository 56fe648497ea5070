/// Monotonic clock abstraction shared by playback sampling and render pacing.
pub mod clock;
/// Frame, frame-rate and canvas primitives.
pub mod core;
/// Error taxonomy.
pub mod error;
pub(crate) mod math;
