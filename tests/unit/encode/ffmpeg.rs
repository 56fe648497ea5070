use super::*;
use crate::foundation::core::Canvas;

fn cfg() -> EncoderConfig {
    EncoderConfig::new(Canvas::new(64, 48).unwrap(), Fps::new(10, 1).unwrap())
}

fn frame(v: u8) -> FrameRGBA {
    FrameRGBA {
        width: 64,
        height: 48,
        data: [v, v / 2, 255 - v, 255].repeat(64 * 48),
        premultiplied: true,
    }
}

fn encode(container: Container, frames: u64) -> EncodedVideo {
    let mut enc = FfmpegEncoder::new(FfmpegEncoderOpts::new(container));
    enc.begin(cfg()).unwrap();
    for i in 0..frames {
        enc.push_frame(FrameIndex(i), &frame((i * 20) as u8)).unwrap();
    }
    enc.finish().unwrap()
}

#[test]
fn container_metadata() {
    assert_eq!(Container::default(), Container::WebM);
    assert_eq!(Container::WebM.mime(), "video/webm");
    assert_eq!(Container::Mp4.mime(), "video/mp4");
    assert_eq!(Container::Mp4.extension(), "mp4");
}

#[test]
fn push_before_begin_fails() {
    let mut enc = FfmpegEncoder::new(FfmpegEncoderOpts::default());
    assert!(enc.push_frame(FrameIndex(0), &frame(0)).is_err());
    assert!(enc.finish().is_err());
    enc.abort();
}

#[test]
fn webm_output_is_ebml() {
    if !is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }
    let out = encode(Container::WebM, 10);
    assert_eq!(out.mime, "video/webm");
    assert_eq!(out.frame_count, 10);
    assert!(out.bytes.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]));
}

#[test]
fn fragmented_mp4_output_has_ftyp() {
    if !is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }
    let out = encode(Container::Mp4, 10);
    assert_eq!(out.mime, "video/mp4");
    assert_eq!(&out.bytes[4..8], b"ftyp");
}

#[test]
fn abort_discards_running_process() {
    if !is_ffmpeg_on_path() {
        eprintln!("skipping: ffmpeg not on PATH");
        return;
    }
    let mut enc = FfmpegEncoder::new(FfmpegEncoderOpts::default());
    enc.begin(cfg()).unwrap();
    enc.push_frame(FrameIndex(0), &frame(1)).unwrap();
    enc.abort();
    assert_eq!(enc.buffered_bytes(), 0);
    assert!(enc.finish().is_err());
}
