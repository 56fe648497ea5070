use std::io::{Read, Write as _};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use crate::encode::encoder::{
    EncodedVideo, EncoderConfig, VideoEncoder, check_frame, flatten_to_opaque_rgba8,
};
use crate::foundation::core::{Fps, FrameIndex, FrameRGBA};
use crate::foundation::error::{ReelError, ReelResult};

/// Output container of [`FfmpegEncoder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Container {
    /// WebM with VP9 video.
    #[default]
    WebM,
    /// Fragmented MP4 with H.264 video, streamable through a pipe.
    Mp4,
}

impl Container {
    /// MIME type of the container.
    pub fn mime(self) -> &'static str {
        match self {
            Self::WebM => "video/webm",
            Self::Mp4 => "video/mp4",
        }
    }

    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::WebM => "webm",
            Self::Mp4 => "mp4",
        }
    }

    fn codec_args(self) -> &'static [&'static str] {
        match self {
            Self::WebM => &["-c:v", "libvpx-vp9", "-pix_fmt", "yuv420p", "-f", "webm"],
            // A seekable moov atom is impossible on a pipe; fragment instead.
            Self::Mp4 => &[
                "-c:v",
                "libx264",
                "-pix_fmt",
                "yuv420p",
                "-movflags",
                "frag_keyframe+empty_moov+default_base_moof",
                "-f",
                "mp4",
            ],
        }
    }
}

/// Options for [`FfmpegEncoder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegEncoderOpts {
    /// Output container.
    pub container: Container,
    /// Background used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl Default for FfmpegEncoderOpts {
    fn default() -> Self {
        Self {
            container: Container::WebM,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

impl FfmpegEncoderOpts {
    /// Options for `container` over black.
    pub fn new(container: Container) -> Self {
        Self {
            container,
            ..Self::default()
        }
    }
}

type Drain = JoinHandle<std::io::Result<Vec<u8>>>;

/// Encoder that spawns the system `ffmpeg`, streams raw frames to its stdin and collects the
/// container from its stdout.
pub struct FfmpegEncoder {
    opts: FfmpegEncoderOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout_drain: Option<Drain>,
    stderr_drain: Option<Drain>,
    produced: Arc<AtomicUsize>,

    scratch: Vec<u8>,
    cfg: Option<EncoderConfig>,
    last_idx: Option<FrameIndex>,
    frames: u64,
}

impl FfmpegEncoder {
    /// Create an encoder; `ffmpeg` is spawned in `begin`.
    pub fn new(opts: FfmpegEncoderOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stdout_drain: None,
            stderr_drain: None,
            produced: Arc::new(AtomicUsize::new(0)),
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
            frames: 0,
        }
    }

    fn reset(&mut self) {
        self.cfg = None;
        self.last_idx = None;
        self.frames = 0;
        self.scratch = Vec::new();
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn begin(&mut self, cfg: EncoderConfig) -> ReelResult<()> {
        cfg.validate()?;
        if self.child.is_some() {
            return Err(ReelError::encoding("ffmpeg encoder already started"));
        }
        if !is_ffmpeg_on_path() {
            return Err(ReelError::encoding(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Input: raw RGBA8, already flattened to opaque in push_frame.
        cmd.args([
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.canvas.width, cfg.canvas.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0", "-an"])
            .args(self.opts.container.codec_args())
            .args(["-b:v", &cfg.bitrate_bps.to_string()])
            .arg("pipe:1");

        let mut child = cmd.spawn().map_err(|e| {
            ReelError::encoding(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::encoding("failed to open ffmpeg stdin (unexpected)"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ReelError::encoding("failed to open ffmpeg stdout (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ReelError::encoding("failed to open ffmpeg stderr (unexpected)"))?;

        self.produced.store(0, Ordering::Relaxed);
        let produced = Arc::clone(&self.produced);
        let stdout_drain = std::thread::spawn(move || drain_counting(stdout, &produced));
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(
            container = ?self.opts.container,
            width = cfg.canvas.width,
            height = cfg.canvas.height,
            "spawned ffmpeg"
        );

        self.scratch = vec![0u8; cfg.canvas.rgba_len()];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stdout_drain = Some(stdout_drain);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> ReelResult<()> {
        check_frame(self.cfg.as_ref(), self.last_idx, idx, frame)?;
        self.last_idx = Some(idx);

        flatten_to_opaque_rgba8(
            &mut self.scratch,
            &frame.data,
            frame.premultiplied,
            self.opts.bg_rgba,
        )?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReelError::encoding("ffmpeg encoder is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            ReelError::encoding(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames += 1;
        Ok(())
    }

    fn buffered_bytes(&self) -> usize {
        self.produced.load(Ordering::Relaxed)
    }

    fn finish(&mut self) -> ReelResult<EncodedVideo> {
        let cfg = self
            .cfg
            .ok_or_else(|| ReelError::encoding("ffmpeg encoder not started"))?;
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ReelError::encoding("ffmpeg encoder not started"))?;

        let status = child
            .wait()
            .map_err(|e| ReelError::encoding(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stdout_bytes = join_drain(self.stdout_drain.take(), "stdout")?;
        let stderr_bytes = join_drain(self.stderr_drain.take(), "stderr")?;
        let frames = self.frames;
        self.reset();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(ReelError::encoding(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }
        if stdout_bytes.is_empty() {
            return Err(ReelError::encoding("ffmpeg produced no output"));
        }

        Ok(EncodedVideo {
            bytes: stdout_bytes,
            mime: self.opts.container.mime(),
            fps: cfg.fps,
            frame_count: frames,
            width: cfg.canvas.width,
            height: cfg.canvas.height,
        })
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!("killed ffmpeg");
        }
        if let Some(h) = self.stdout_drain.take() {
            let _ = h.join();
        }
        if let Some(h) = self.stderr_drain.take() {
            let _ = h.join();
        }
        self.produced.store(0, Ordering::Relaxed);
        self.reset();
    }
}

impl Drop for FfmpegEncoder {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

fn drain_counting(mut src: impl Read, produced: &AtomicUsize) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut chunk = vec![0u8; 64 * 1024];
    loop {
        let n = src.read(&mut chunk)?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&chunk[..n]);
        produced.store(out.len(), Ordering::Relaxed);
    }
}

fn join_drain(handle: Option<Drain>, stream: &str) -> ReelResult<Vec<u8>> {
    match handle {
        Some(handle) => handle
            .join()
            .map_err(|_| ReelError::encoding(format!("ffmpeg {stream} drain thread panicked")))?
            .map_err(|e| ReelError::encoding(format!("ffmpeg {stream} read failed: {e}"))),
        None => Ok(Vec::new()),
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // For rawvideo input, `-r` goes before `-i`.
    cmd.args(["-r", &format!("{}/{}", fps.num, fps.den)]);
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
