use std::sync::Arc;

use super::*;
use crate::assets::decode::RasterImage;
use crate::assets::resolver::{ImageRequest, ImageUnavailable};
use crate::encode::encoder::EncoderKind;
use crate::foundation::clock::ManualClock;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::ReelError;
use crate::playback::engine::{PlaybackOpts, PlaybackPhase};
use crate::playback::event::{PlaybackEvent, StopReason};
use crate::render::pipeline::RenderOpts;
use crate::timeline::store::StoreOpts;

fn studio() -> (Studio, ManualClock) {
    let clock = ManualClock::new();
    let engine = PlaybackEngine::new(Arc::new(clock.clone()), PlaybackOpts::default()).unwrap();
    let mut s = Studio::new(WaypointStore::new(StoreOpts::default()), engine);
    for id in ["a", "b", "c"] {
        s.append(Waypoint::new(id, 48.85, 2.29).with_duration(5.0))
            .unwrap();
    }
    (s, clock)
}

fn id(s: &str) -> WaypointId {
    WaypointId::new(s)
}

#[test]
fn play_requires_waypoints() {
    let clock = ManualClock::new();
    let engine = PlaybackEngine::new(Arc::new(clock), PlaybackOpts::default()).unwrap();
    let mut s = Studio::new(WaypointStore::default(), engine);
    assert!(matches!(s.play().unwrap_err(), ReelError::EmptyTimeline));
}

#[test]
fn reorder_while_playing_second_waypoint_goes_idle() {
    let (mut s, clock) = studio();
    s.play().unwrap();
    clock.advance_secs(6.0);
    s.engine_mut().tick().unwrap();
    assert_eq!(s.engine().phase(), PlaybackPhase::Playing(1));

    s.reorder(&id("c"), 0).unwrap();
    assert_eq!(s.engine().phase(), PlaybackPhase::Idle);
    assert!(s.engine_mut().drain_events().contains(&PlaybackEvent::Stopped {
        reason: StopReason::TimelineChanged
    }));
}

#[test]
fn field_edit_while_paused_goes_idle() {
    let (mut s, _) = studio();
    s.play().unwrap();
    s.engine_mut().pause().unwrap();
    s.update_field(&id("a"), WaypointField::Zoom, 1.5);
    assert_eq!(s.engine().phase(), PlaybackPhase::Idle);
}

#[test]
fn ineffective_mutations_keep_session() {
    let (mut s, _) = studio();
    s.play().unwrap();
    s.remove(&id("zzz"));
    s.reorder(&id("a"), 0).unwrap();
    s.update_field(&id("a"), WaypointField::Duration, 5.0);
    s.update_field(&id("a"), WaypointField::Pitch, f64::NAN);
    assert_eq!(s.engine().phase(), PlaybackPhase::Playing(0));
}

#[test]
fn edits_while_idle_are_picked_up_by_next_play() {
    let (mut s, clock) = studio();
    s.remove(&id("b"));
    s.play().unwrap();
    assert_eq!(s.engine().timeline().len(), 2);
    clock.advance_secs(10.0);
    s.engine_mut().tick().unwrap();
    assert_eq!(s.engine().phase(), PlaybackPhase::Finished);
}

#[test]
fn render_uses_current_snapshot() {
    let (mut s, _) = studio();
    s.update_field(&id("b"), WaypointField::Duration, 7.0);
    let resolver = Arc::new(|req: &ImageRequest, _: &Waypoint| {
        Ok::<_, ImageUnavailable>(RasterImage::solid(req.width, req.height, [0, 128, 0, 255]))
    });
    let pipeline = RenderPipeline::new(
        resolver,
        RenderOpts {
            canvas: Canvas::new(8, 8).unwrap(),
            fps: Fps::new(2, 1).unwrap(),
            encoder: EncoderKind::Y4m,
            ..RenderOpts::default()
        },
    )
    .unwrap();
    s.play().unwrap();
    let video = s.render(&pipeline).unwrap();
    assert_eq!(video.frame_count, (5 + 7 + 5) * 2);
    assert_eq!(s.engine().phase(), PlaybackPhase::Playing(0));
}
