//! Real-time playback of a timeline snapshot.
//!
//! The engine is driven by [`engine::PlaybackEngine::tick`] and reports what happened through a
//! queue of [`event::PlaybackEvent`]s; it never calls into a presenter.

/// The playback state machine.
pub mod engine;
/// Events drained by the presentation layer.
pub mod event;
