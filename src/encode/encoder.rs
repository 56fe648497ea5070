use crate::encode::ffmpeg::{FfmpegEncoder, FfmpegEncoderOpts};
use crate::encode::raw::RawEncoder;
use crate::encode::y4m::Y4mEncoder;
use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRGBA};
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::mul_div255_u16;

/// Configuration provided to a [`VideoEncoder`] before the first frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Frame size.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Target bitrate for lossy encoders, in bits per second.
    pub bitrate_bps: u32,
}

impl EncoderConfig {
    /// 5 Mbps.
    pub const DEFAULT_BITRATE_BPS: u32 = 5_000_000;

    /// Config at the default bitrate.
    pub fn new(canvas: Canvas, fps: Fps) -> Self {
        Self {
            canvas,
            fps,
            bitrate_bps: Self::DEFAULT_BITRATE_BPS,
        }
    }

    /// Reject configs no encoder can honor. 4:2:0 output needs even sides.
    pub fn validate(&self) -> ReelResult<()> {
        self.canvas.validate()?;
        Fps::new(self.fps.num, self.fps.den)?;
        if !self.canvas.width.is_multiple_of(2) || !self.canvas.height.is_multiple_of(2) {
            return Err(ReelError::validation(
                "encoder width/height must be even (required for 4:2:0 output)",
            ));
        }
        if self.bitrate_bps == 0 {
            return Err(ReelError::validation("encoder bitrate must be non-zero"));
        }
        Ok(())
    }
}

/// A finalized, self-contained video.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedVideo {
    /// Container bytes.
    pub bytes: Vec<u8>,
    /// MIME type of `bytes`.
    pub mime: &'static str,
    /// Frame rate the frames were encoded at.
    pub fps: Fps,
    /// Number of frames encoded.
    pub frame_count: u64,
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
}

impl EncodedVideo {
    /// Advertised duration: `frame_count / fps`.
    pub fn duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.frame_count)
    }
}

/// Encoder contract.
///
/// Ordering contract: `push_frame` is called in strictly increasing [`FrameIndex`] order between
/// one `begin` and one `finish` or `abort`. `push_frame` may block; that is the pipeline's
/// backpressure.
pub trait VideoEncoder: Send {
    /// Open the output. Called once before any frame.
    fn begin(&mut self, cfg: EncoderConfig) -> ReelResult<()>;
    /// Accept one frame.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()>;
    /// Bytes of container output produced so far.
    fn buffered_bytes(&self) -> usize;
    /// Finalize the container and hand back its bytes.
    fn finish(&mut self) -> ReelResult<EncodedVideo>;
    /// Discard everything produced so far. Safe to call in any state.
    fn abort(&mut self);
}

/// Which encoder a render uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncoderKind {
    /// System `ffmpeg`.
    Ffmpeg(FfmpegEncoderOpts),
    /// Deterministic YUV4MPEG2.
    Y4m,
    /// Uncompressed RGBA frames.
    Raw,
}

impl Default for EncoderKind {
    fn default() -> Self {
        Self::Ffmpeg(FfmpegEncoderOpts::default())
    }
}

/// Instantiate a fresh encoder.
pub fn create_encoder(kind: &EncoderKind) -> Box<dyn VideoEncoder> {
    match kind {
        EncoderKind::Ffmpeg(opts) => Box::new(FfmpegEncoder::new(opts.clone())),
        EncoderKind::Y4m => Box::new(Y4mEncoder::new()),
        EncoderKind::Raw => Box::new(RawEncoder::new()),
    }
}

pub(crate) fn check_frame(
    cfg: Option<&EncoderConfig>,
    last_idx: Option<FrameIndex>,
    idx: FrameIndex,
    frame: &FrameRGBA,
) -> ReelResult<EncoderConfig> {
    let cfg = *cfg.ok_or_else(|| ReelError::encoding("encoder not started"))?;
    if let Some(last) = last_idx
        && idx.0 <= last.0
    {
        return Err(ReelError::encoding("encoder received out-of-order frame index"));
    }
    if frame.width != cfg.canvas.width || frame.height != cfg.canvas.height {
        return Err(ReelError::validation(format!(
            "frame size mismatch: got {}x{}, expected {}x{}",
            frame.width, frame.height, cfg.canvas.width, cfg.canvas.height
        )));
    }
    if frame.data.len() != cfg.canvas.rgba_len() {
        return Err(ReelError::validation(
            "frame.data size mismatch with width*height*4",
        ));
    }
    Ok(cfg)
}

/// Composite an RGBA8 frame over an opaque background.
pub(crate) fn flatten_to_opaque_rgba8(
    dst: &mut [u8],
    src: &[u8],
    src_is_premul: bool,
    bg_rgba: [u8; 4],
) -> ReelResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(ReelError::validation(
            "flatten_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        let (r, g, b) = if src_is_premul {
            (s[0] as u16, s[1] as u16, s[2] as u16)
        } else {
            (
                mul_div255_u16(s[0] as u16, a),
                mul_div255_u16(s[1] as u16, a),
                mul_div255_u16(s[2] as u16, a),
            )
        };
        d[0] = (r + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (g + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (b + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/encode/encoder.rs"]
mod tests;
