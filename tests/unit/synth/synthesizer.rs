use super::*;

const RED: [u8; 4] = [255, 0, 0, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

fn small(fps: u32) -> FrameSynthesizer {
    FrameSynthesizer::new(SynthOpts {
        canvas: Canvas::new(32, 32).unwrap(),
        fps: Fps::new(fps, 1).unwrap(),
        ..SynthOpts::default()
    })
    .unwrap()
}

fn red() -> RasterImage {
    RasterImage::solid(32, 32, RED)
}

#[test]
fn yields_round_duration_times_fps_frames() {
    let s = small(30);
    for secs in [5.0, 7.0, 9.5, 15.0] {
        let w = Waypoint::new("a", 0.0, 0.0).with_duration(secs);
        let frames = s.synthesize(0, &w, Ok(red())).unwrap();
        let expected = (secs * 30.0_f64).round() as usize;
        assert_eq!(frames.len(), expected);
        assert_eq!(frames.total() as usize, expected);
    }
}

#[test]
fn first_frame_is_unscaled_and_last_reaches_zoom() {
    let s = small(2);
    let w = Waypoint::new("a", 0.0, 0.0)
        .with_duration(5.0)
        .with_view(0.0, 0.0, 2.0);
    let frames: Vec<_> = s.synthesize(0, &w, Ok(red())).unwrap().collect();
    let n = frames.len();
    assert_eq!(n, 10);
    assert_eq!(frames[0].scale, 1.0);
    assert_eq!(frames[0].progress, 0.0);
    // p = k/N, so the last frame sits one frame step short of the target zoom.
    let step = (w.zoom - 1.0) / n as f64;
    assert!((frames[n - 1].scale - w.zoom).abs() <= step + 1e-12);
    for pair in frames.windows(2) {
        assert!(pair[1].scale > pair[0].scale);
        assert_eq!(pair[1].index.0, pair[0].index.0 + 1);
    }
}

#[test]
fn frames_are_canvas_sized_opaque_and_premultiplied() {
    let s = small(1);
    let w = Waypoint::new("a", 0.0, 0.0).with_duration(5.0);
    let f = s
        .synthesize(0, &w, Ok(red()))
        .unwrap()
        .next()
        .unwrap()
        .frame;
    assert_eq!((f.width, f.height), (32, 32));
    assert_eq!(f.data.len(), 32 * 32 * 4);
    assert!(f.premultiplied);
    assert!(f.data.chunks_exact(4).all(|p| p[3] == 255));
}

#[test]
fn pull_out_reveals_black_background() {
    let s = small(1);
    let w = Waypoint::new("a", 0.0, 0.0)
        .with_duration(5.0)
        .with_view(0.0, 0.0, 0.5);
    let last = s.synthesize(0, &w, Ok(red())).unwrap().last().unwrap();
    // k=4 of 5: scale 0.6, raster spans [6.4, 25.6).
    assert!((last.scale - 0.6).abs() < 1e-12);
    assert_eq!(last.frame.pixel(0, 0), Some(BLACK));
    assert_eq!(last.frame.pixel(31, 31), Some(BLACK));
    assert_eq!(last.frame.pixel(16, 16), Some(RED));
}

#[test]
fn failed_image_is_image_unavailable_with_identity() {
    let s = small(30);
    let w = Waypoint::new("tower", 0.0, 0.0);
    let err = match s.synthesize(3, &w, Err(ImageUnavailable::new("404"))) {
        Err(e) => e,
        Ok(_) => panic!("expected failure"),
    };
    match err {
        ReelError::ImageUnavailable {
            index,
            waypoint,
            reason,
        } => {
            assert_eq!(index, 3);
            assert_eq!(waypoint.as_str(), "tower");
            assert_eq!(reason, "404");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn synthesis_is_deterministic() {
    let s = small(2);
    let w = Waypoint::new("a", 0.0, 0.0)
        .with_duration(5.0)
        .with_view(0.0, 0.0, 1.7);
    let mut img = Vec::new();
    for y in 0..32u32 {
        for x in 0..32u32 {
            img.extend_from_slice(&[(x * 8) as u8, (y * 8) as u8, 128, 255]);
        }
    }
    let img = RasterImage::from_straight_rgba8(32, 32, img).unwrap();
    let a: Vec<_> = s
        .synthesize(0, &w, Ok(img.clone()))
        .unwrap()
        .map(|f| f.frame)
        .collect();
    let b: Vec<_> = s
        .synthesize(0, &w, Ok(img))
        .unwrap()
        .map(|f| f.frame)
        .collect();
    assert_eq!(a, b);
}

#[test]
fn compose_at_matches_sequence_frame() {
    let s = small(2);
    let w = Waypoint::new("a", 0.0, 0.0)
        .with_duration(5.0)
        .with_view(0.0, 0.0, 0.5);
    let frames: Vec<_> = s.synthesize(0, &w, Ok(red())).unwrap().collect();
    let direct = s.compose_at(&red(), &w, frames[4].progress).unwrap();
    assert_eq!(direct, frames[4].frame);
}

#[test]
fn rejects_empty_image() {
    let s = small(30);
    let w = Waypoint::new("a", 0.0, 0.0);
    let empty = RasterImage::solid(0, 0, RED);
    assert!(s.synthesize(0, &w, Ok(empty)).is_err());
}

#[test]
fn compose_at_rejects_non_finite_progress() {
    let s = small(30);
    let w = Waypoint::new("a", 0.0, 0.0).with_view(0.0, 0.0, 1.5);
    for p in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        let err = s.compose_at(&red(), &w, p).unwrap_err();
        assert!(matches!(err, ReelError::Validation(_)));
    }
}
