//! Video encoders consuming synthesized frames.
//!
//! Every encoder implements [`encoder::VideoEncoder`] and buffers its output in memory until
//! [`encoder::VideoEncoder::finish`] hands it back as one [`encoder::EncodedVideo`].

/// Encoder contract, configuration and selection.
pub mod encoder;
/// System `ffmpeg` subprocess encoder (WebM/VP9, fragmented MP4/H.264).
pub mod ffmpeg;
/// Uncompressed frames, for tests and debugging.
pub mod raw;
/// Pure-Rust YUV4MPEG2 encoder.
pub mod y4m;
