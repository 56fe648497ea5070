//! YUV4MPEG2 output.
//!
//! Frames are converted to full-range BT.601 (`C420jpeg`) with integer arithmetic only, so two
//! encodes of the same frames are byte-identical.

use crate::encode::encoder::{
    EncodedVideo, EncoderConfig, VideoEncoder, check_frame, flatten_to_opaque_rgba8,
};
use crate::foundation::core::{Fps, FrameIndex, FrameRGBA};
use crate::foundation::error::{ReelError, ReelResult};

/// MIME type of [`Y4mEncoder`] output.
pub const Y4M_MIME: &str = "video/x-yuv4mpeg";

const SIGNATURE: &str = "YUV4MPEG2";
const FRAME_TAG: &[u8] = b"FRAME";

/// Pure-Rust 4:2:0 YUV4MPEG2 encoder.
#[derive(Debug, Default)]
pub struct Y4mEncoder {
    cfg: Option<EncoderConfig>,
    last_idx: Option<FrameIndex>,
    frames: u64,
    scratch: Vec<u8>,
    buf: Vec<u8>,
}

impl Y4mEncoder {
    /// Create an idle encoder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl VideoEncoder for Y4mEncoder {
    fn begin(&mut self, cfg: EncoderConfig) -> ReelResult<()> {
        cfg.validate()?;
        self.buf.clear();
        self.buf.extend_from_slice(
            format!(
                "{SIGNATURE} W{} H{} F{}:{} Ip A1:1 C420jpeg\n",
                cfg.canvas.width, cfg.canvas.height, cfg.fps.num, cfg.fps.den
            )
            .as_bytes(),
        );
        self.scratch = vec![0u8; cfg.canvas.rgba_len()];
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        let cfg = check_frame(self.cfg.as_ref(), self.last_idx, idx, frame)?;
        self.last_idx = Some(idx);

        flatten_to_opaque_rgba8(
            &mut self.scratch,
            &frame.data,
            frame.premultiplied,
            [0, 0, 0, 255],
        )?;
        self.buf.extend_from_slice(FRAME_TAG);
        self.buf.push(b'\n');
        write_i420(
            &mut self.buf,
            &self.scratch,
            cfg.canvas.width as usize,
            cfg.canvas.height as usize,
        );
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
            .ok_or_else(|| ReelError::encoding("y4m encoder not started"))?;
        self.scratch = Vec::new();
        Ok(EncodedVideo {
            bytes: std::mem::take(&mut self.buf),
            mime: Y4M_MIME,
            fps: cfg.fps,
            frame_count: std::mem::take(&mut self.frames),
            width: cfg.canvas.width,
            height: cfg.canvas.height,
        })
    }

    fn abort(&mut self) {
        self.cfg = None;
        self.frames = 0;
        self.scratch = Vec::new();
        self.buf = Vec::new();
    }
}

// Full-range BT.601, coefficients scaled by 256.
fn luma(r: i32, g: i32, b: i32) -> u8 {
    ((77 * r + 150 * g + 29 * b + 128) >> 8).clamp(0, 255) as u8
}

fn chroma(r: i32, g: i32, b: i32) -> (u8, u8) {
    let cb = ((-43 * r - 85 * g + 128 * b + 128) >> 8) + 128;
    let cr = ((128 * r - 107 * g - 21 * b + 128) >> 8) + 128;
    (cb.clamp(0, 255) as u8, cr.clamp(0, 255) as u8)
}

/// Append planar Y, then U, then V. `w` and `h` are even.
fn write_i420(out: &mut Vec<u8>, rgba: &[u8], w: usize, h: usize) {
    out.reserve(w * h + 2 * (w / 2) * (h / 2));
    for px in rgba.chunks_exact(4) {
        out.push(luma(px[0].into(), px[1].into(), px[2].into()));
    }

    let (cw, ch) = (w / 2, h / 2);
    let mut v_plane = Vec::with_capacity(cw * ch);
    for cy in 0..ch {
        for cx in 0..cw {
            let (mut r, mut g, mut b) = (0i32, 0i32, 0i32);
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let i = ((cy * 2 + dy) * w + cx * 2 + dx) * 4;
                r += i32::from(rgba[i]);
                g += i32::from(rgba[i + 1]);
                b += i32::from(rgba[i + 2]);
            }
            let (u, v) = chroma((r + 2) / 4, (g + 2) / 4, (b + 2) / 4);
            out.push(u);
            v_plane.push(v);
        }
    }
    out.extend_from_slice(&v_plane);
}

/// Stream parameters recovered by [`probe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Y4mInfo {
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Frame rate.
    pub fps: Fps,
    /// Number of complete frames.
    pub frame_count: u64,
}

impl Y4mInfo {
    /// `frame_count / fps`.
    pub fn duration_secs(&self) -> f64 {
        self.fps.frames_to_secs(self.frame_count)
    }
}

/// Parse a 4:2:0 YUV4MPEG2 stream's header and count its frames.
pub fn probe(bytes: &[u8]) -> ReelResult<Y4mInfo> {
    let header_end = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| ReelError::validation("y4m: missing stream header"))?;
    let header = std::str::from_utf8(&bytes[..header_end])
        .map_err(|_| ReelError::validation("y4m: stream header is not utf-8"))?;
    let mut params = header.split(' ');
    if params.next() != Some(SIGNATURE) {
        return Err(ReelError::validation("y4m: bad signature"));
    }

    let (mut width, mut height, mut fps) = (None, None, None);
    for p in params {
        let (Some(tag), Some(value)) = (p.get(..1), p.get(1..)) else {
            continue;
        };
        match tag {
            "W" => width = value.parse::<u32>().ok(),
            "H" => height = value.parse::<u32>().ok(),
            "F" => {
                fps = value
                    .split_once(':')
                    .and_then(|(n, d)| Some((n.parse::<u32>().ok()?, d.parse::<u32>().ok()?)))
            }
            "C" if !value.starts_with("420") => {
                return Err(ReelError::validation(format!(
                    "y4m: unsupported colorspace C{value}"
                )));
            }
            _ => {}
        }
    }
    let (Some(width), Some(height), Some((num, den))) = (width, height, fps) else {
        return Err(ReelError::validation("y4m: header lacks W, H or F"));
    };
    let fps = Fps::new(num, den)?;

    let (w, h) = (width as usize, height as usize);
    let frame_len = w * h + 2 * w.div_ceil(2) * h.div_ceil(2);
    let mut pos = header_end + 1;
    let mut frame_count = 0u64;
    while pos < bytes.len() {
        let rest = &bytes[pos..];
        if !rest.starts_with(FRAME_TAG) {
            return Err(ReelError::validation(format!(
                "y4m: expected FRAME at byte {pos}"
            )));
        }
        let line_end = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| ReelError::validation("y4m: unterminated frame header"))?;
        pos += line_end + 1;
        if bytes.len() - pos < frame_len {
            return Err(ReelError::validation("y4m: truncated frame"));
        }
        pos += frame_len;
        frame_count += 1;
    }

    Ok(Y4mInfo {
        width,
        height,
        fps,
        frame_count,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/encode/y4m.rs"]
mod tests;
