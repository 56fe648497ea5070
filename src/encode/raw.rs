use crate::encode::encoder::{
    EncodedVideo, EncoderConfig, VideoEncoder, check_frame, flatten_to_opaque_rgba8,
};
use crate::foundation::core::{FrameIndex, FrameRGBA};
use crate::foundation::error::{ReelError, ReelResult};

/// MIME type of [`RawEncoder`] output.
pub const RAW_RGBA_MIME: &str = "video/x-raw-rgba";

/// Concatenates opaque RGBA8 frames. For tests and debugging.
#[derive(Debug, Default)]
pub struct RawEncoder {
    cfg: Option<EncoderConfig>,
    last_idx: Option<FrameIndex>,
    frames: u64,
    buf: Vec<u8>,
}

impl RawEncoder {
    /// Create an idle encoder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VideoEncoder for RawEncoder {
    fn begin(&mut self, cfg: EncoderConfig) -> ReelResult<()> {
        cfg.validate()?;
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames = 0;
        self.buf.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        check_frame(self.cfg.as_ref(), self.last_idx, idx, frame)?;
        self.last_idx = Some(idx);
        let start = self.buf.len();
        self.buf.resize(start + frame.data.len(), 0);
        flatten_to_opaque_rgba8(
            &mut self.buf[start..],
            &frame.data,
            frame.premultiplied,
            [0, 0, 0, 255],
        )?;
        self.frames += 1;
        Ok(())
    }

    fn buffered_bytes(&self) -> usize {
        self.buf.len()
    }

    fn finish(&mut self) -> ReelResult<EncodedVideo> {
        let cfg = self
            .cfg
            .take()
            .ok_or_else(|| ReelError::encoding("raw encoder not started"))?;
        Ok(EncodedVideo {
            bytes: std::mem::take(&mut self.buf),
            mime: RAW_RGBA_MIME,
            fps: cfg.fps,
            frame_count: std::mem::take(&mut self.frames),
            width: cfg.canvas.width,
            height: cfg.canvas.height,
        })
    }

    fn abort(&mut self) {
        self.cfg = None;
        self.frames = 0;
        self.buf = Vec::new();
    }
}
