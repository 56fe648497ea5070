//! Panoreel turns an ordered sequence of panorama waypoints into a real-time preview and a
//! deterministic video.
//!
//! - Edit a timeline through a [`WaypointStore`] (or a [`Studio`], which also owns playback)
//! - Play it back with a [`PlaybackEngine`] driven by a [`Clock`]
//! - Render it with a [`RenderPipeline`] into an [`EncodedVideo`]
//!
//! Both consumers go through the same [`FrameSynthesizer`], so a preview frame and an encoded
//! frame at the same progress are identical.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Image sources for waypoints.
pub mod assets;
/// Video encoders.
pub mod encode;
pub mod playback;
pub mod render;
pub mod studio;
pub mod synth;
/// Waypoints, snapshots and the editable store.
pub mod timeline;

pub use crate::foundation::clock::{Clock, ManualClock, SystemClock};
pub use crate::foundation::core::{Affine, Canvas, Fps, FrameIndex, FrameRGBA, Vec2};
pub use crate::foundation::error::{ErrorKind, ReelError, ReelResult};

pub use crate::assets::decode::{RasterImage, decode_image};
pub use crate::assets::resolver::{DirImageResolver, ImageRequest, ImageResolver, ImageUnavailable};
pub use crate::assets::streetview::StreetViewResolver;
pub use crate::encode::encoder::{
    EncodedVideo, EncoderConfig, EncoderKind, VideoEncoder, create_encoder,
};
pub use crate::encode::ffmpeg::{Container, FfmpegEncoder, FfmpegEncoderOpts, is_ffmpeg_on_path};
pub use crate::encode::raw::RawEncoder;
pub use crate::encode::y4m::{Y4mEncoder, Y4mInfo};
pub use crate::playback::engine::{PlaybackEngine, PlaybackOpts, PlaybackPhase, PlaybackState};
pub use crate::playback::event::{PlaybackEvent, StopReason};
pub use crate::render::job::{RenderFailure, RenderJob, RenderStatus};
pub use crate::render::pipeline::{FramePacing, RenderOpts, RenderPipeline};
pub use crate::studio::Studio;
pub use crate::synth::synthesizer::{FrameSynthesizer, SynthFrame, SynthOpts, WaypointFrames};
pub use crate::timeline::snapshot::Timeline;
pub use crate::timeline::store::{StoreOpts, WaypointStore};
pub use crate::timeline::waypoint::{HeadingBoundary, LatLng, Waypoint, WaypointField, WaypointId};
