use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::assets::resolver::ImageUnavailable;
use crate::foundation::clock::ManualClock;
use crate::foundation::core::{Canvas, Fps};
use crate::synth::synthesizer::SynthOpts;
use crate::timeline::store::WaypointStore;
use crate::timeline::waypoint::{Waypoint, WaypointId};

fn timeline(durations: &[f64]) -> Timeline {
    Timeline::new(
        durations
            .iter()
            .enumerate()
            .map(|(i, d)| Waypoint::new(format!("w{i}"), 0.0, 0.0).with_duration(*d))
            .collect(),
    )
    .unwrap()
}

fn engine() -> (PlaybackEngine, ManualClock) {
    let clock = ManualClock::new();
    let e = PlaybackEngine::new(Arc::new(clock.clone()), PlaybackOpts::default()).unwrap();
    (e, clock)
}

fn entered(events: &[PlaybackEvent]) -> Vec<usize> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::Entered { index } => Some(*index),
            _ => None,
        })
        .collect()
}

#[test]
fn rejects_low_sample_rate() {
    let err = PlaybackEngine::new(
        Arc::new(ManualClock::new()),
        PlaybackOpts { sample_hz: 10.0 },
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}

#[test]
fn start_on_empty_timeline_fails() {
    let (mut e, _) = engine();
    let err = e.start(Timeline::empty()).unwrap_err();
    assert!(matches!(err, ReelError::EmptyTimeline));
    assert_eq!(e.phase(), PlaybackPhase::Idle);
}

#[test]
fn advances_through_every_index_in_order() {
    let (mut e, clock) = engine();
    e.start(timeline(&[5.0, 7.0, 9.0])).unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Playing(0));

    let mut seen = Vec::new();
    for _ in 0..(22 * 60) {
        clock.advance_secs(1.0 / 60.0);
        e.tick().unwrap();
        if let Some(i) = e.phase().index()
            && seen.last() != Some(&i)
        {
            seen.push(i);
        }
    }
    assert_eq!(seen, vec![0, 1, 2]);
    assert_eq!(e.phase(), PlaybackPhase::Finished);

    let events = e.drain_events();
    assert_eq!(entered(&events), vec![0, 1, 2]);
    assert_eq!(events.first(), Some(&PlaybackEvent::Started));
    assert_eq!(events.last(), Some(&PlaybackEvent::Finished));
}

#[test]
fn single_late_tick_walks_every_crossed_index() {
    let (mut e, clock) = engine();
    e.start(timeline(&[5.0, 7.0, 9.0])).unwrap();
    clock.advance_secs(13.0);
    e.tick().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Playing(2));
    assert!((e.state().elapsed_in_current_waypoint - 1.0).abs() < 1e-9);

    clock.advance_secs(8.5);
    e.tick().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Finished);
    assert_eq!(entered(&e.drain_events()), vec![0, 1, 2]);
}

#[test]
fn total_playback_time_is_sum_of_durations() {
    let (mut e, clock) = engine();
    e.start(timeline(&[5.0, 7.0, 9.0])).unwrap();
    clock.advance_secs(20.9);
    e.tick().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Playing(2));
    clock.advance_secs(0.1);
    e.tick().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Finished);
}

#[test]
fn progress_is_monotonic_within_a_visit() {
    let (mut e, clock) = engine();
    e.start(timeline(&[5.0])).unwrap();
    let mut last = 0.0;
    for _ in 0..100 {
        clock.advance_secs(0.04);
        e.tick().unwrap();
        let p = e.progress();
        assert!(p >= last);
        assert!((0.0..=1.0).contains(&p));
        last = p;
    }
    assert!((last - 0.8).abs() < 1e-9);
}

#[test]
fn pause_then_resume_preserves_elapsed() {
    let (mut e, clock) = engine();
    e.start(timeline(&[5.0, 7.0])).unwrap();
    clock.advance_secs(2.0);
    e.tick().unwrap();
    e.pause().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Paused(0));
    assert!(!e.state().is_playing);

    clock.advance_secs(100.0);
    e.tick().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Paused(0));
    assert!((e.state().elapsed_in_current_waypoint - 2.0).abs() < 1e-9);

    e.resume();
    clock.advance_secs(1.0);
    e.tick().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Playing(0));
    assert!((e.state().elapsed_in_current_waypoint - 3.0).abs() < 1e-9);
}

#[test]
fn pause_and_resume_are_noops_in_wrong_phase() {
    let (mut e, _) = engine();
    e.pause().unwrap();
    e.resume();
    assert_eq!(e.phase(), PlaybackPhase::Idle);
    assert!(e.drain_events().is_empty());
}

#[test]
fn previous_at_first_and_next_at_last_are_noops() {
    let (mut e, clock) = engine();
    e.start(timeline(&[5.0, 7.0, 9.0])).unwrap();
    clock.advance_secs(1.0);
    e.tick().unwrap();
    let before = e.state();
    e.previous().unwrap();
    assert_eq!(e.state(), before);

    e.seek(2).unwrap();
    clock.advance_secs(1.0);
    e.tick().unwrap();
    let before = e.state();
    e.next().unwrap();
    assert_eq!(e.state(), before);
}

#[test]
fn next_and_previous_keep_mode_and_reset_elapsed() {
    let (mut e, clock) = engine();
    e.start(timeline(&[5.0, 7.0, 9.0])).unwrap();
    clock.advance_secs(3.0);
    e.tick().unwrap();
    e.pause().unwrap();
    e.next().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Paused(1));
    assert_eq!(e.state().elapsed_in_current_waypoint, 0.0);

    e.resume();
    e.previous().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Playing(0));
    clock.advance_secs(4.0);
    e.tick().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Playing(0));
}

#[test]
fn seek_validates_index() {
    let (mut e, _) = engine();
    e.seek(5).unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Idle);

    e.start(timeline(&[5.0, 7.0])).unwrap();
    let err = e.seek(2).unwrap_err();
    assert!(matches!(err, ReelError::InvalidIndex { index: 2, len: 2 }));
    e.seek(1).unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Playing(1));
}

#[test]
fn stop_returns_to_idle_from_any_state() {
    let (mut e, clock) = engine();
    e.stop();
    assert!(e.drain_events().is_empty());

    e.start(timeline(&[5.0])).unwrap();
    e.pause().unwrap();
    e.stop();
    assert_eq!(e.phase(), PlaybackPhase::Idle);
    assert_eq!(
        e.drain_events().last(),
        Some(&PlaybackEvent::Stopped {
            reason: StopReason::User
        })
    );

    e.start(timeline(&[5.0])).unwrap();
    clock.advance_secs(6.0);
    e.tick().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Finished);
    e.stop();
    let s = e.state();
    assert_eq!(s.current_index, None);
    assert!(!s.is_playing);
}

#[test]
fn restart_after_finished() {
    let (mut e, clock) = engine();
    e.start(timeline(&[5.0])).unwrap();
    clock.advance_secs(5.0);
    e.tick().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Finished);
    e.start(timeline(&[5.0, 5.0])).unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Playing(0));
}

#[test]
fn reorder_while_playing_forces_idle() {
    let mut store = WaypointStore::default();
    for i in 0..3 {
        store
            .append(Waypoint::new(format!("w{i}"), 0.0, 0.0))
            .unwrap();
    }
    let (mut e, clock) = engine();
    e.start(store.snapshot()).unwrap();
    clock.advance_secs(7.5);
    e.tick().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Playing(1));

    let t = store.reorder(&WaypointId::new("w2"), 0).unwrap();
    e.on_timeline_changed(&t);
    assert_eq!(e.phase(), PlaybackPhase::Idle);
    assert_eq!(
        e.drain_events().last(),
        Some(&PlaybackEvent::Stopped {
            reason: StopReason::TimelineChanged
        })
    );
}

#[test]
fn unchanged_snapshot_does_not_interrupt() {
    let mut store = WaypointStore::default();
    store.append(Waypoint::new("a", 0.0, 0.0)).unwrap();
    let (mut e, _) = engine();
    e.start(store.snapshot()).unwrap();
    let t = store.remove(&WaypointId::new("absent"));
    e.on_timeline_changed(&t);
    assert_eq!(e.phase(), PlaybackPhase::Playing(0));
}

#[test]
fn play_through_runs_to_finished_on_manual_clock() {
    let (mut e, _) = engine();
    e.start(timeline(&[5.0, 6.0])).unwrap();
    let mut batches = 0usize;
    let mut all = Vec::new();
    e.play_through(|events| {
        batches += 1;
        all.extend_from_slice(events);
    })
    .unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Finished);
    assert!(batches > 60 * 10);
    assert_eq!(entered(&all), vec![0, 1]);
}

fn preview_synth() -> FrameSynthesizer {
    FrameSynthesizer::new(SynthOpts {
        canvas: Canvas::new(16, 16).unwrap(),
        fps: Fps::DEFAULT,
        ..SynthOpts::default()
    })
    .unwrap()
}

#[test]
fn preview_composes_current_frame() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let counter = fetches.clone();
    let resolver = move |req: &ImageRequest, _: &Waypoint| {
        counter.fetch_add(1, Ordering::SeqCst);
        assert_eq!((req.width, req.height), (16, 16));
        Ok::<_, ImageUnavailable>(RasterImage::solid(16, 16, [0, 0, 255, 255]))
    };
    let (e, clock) = engine();
    let mut e = e.with_preview(Arc::new(resolver), preview_synth());
    assert!(e.current_frame().unwrap().is_none());

    e.start(timeline(&[5.0, 5.0])).unwrap();
    clock.advance_secs(2.5);
    e.tick().unwrap();
    let frame = e.current_frame().unwrap().unwrap();
    assert_eq!(frame.pixel(8, 8), Some([0, 0, 255, 255]));

    clock.advance_secs(3.0);
    e.tick().unwrap();
    assert_eq!(fetches.load(Ordering::SeqCst), 2);
}

#[test]
fn preview_fetch_failure_forces_idle() {
    let resolver = |_: &ImageRequest, w: &Waypoint| {
        if w.id.as_str() == "w1" {
            Err(ImageUnavailable::new("no coverage"))
        } else {
            Ok(RasterImage::solid(16, 16, [255, 255, 255, 255]))
        }
    };
    let (e, clock) = engine();
    let mut e = e.with_preview(Arc::new(resolver), preview_synth());
    e.start(timeline(&[5.0, 5.0])).unwrap();
    clock.advance_secs(5.5);
    let err = e.tick().unwrap_err();
    match err {
        ReelError::ImageUnavailable { index, waypoint, .. } => {
            assert_eq!(index, 1);
            assert_eq!(waypoint.as_str(), "w1");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(e.phase(), PlaybackPhase::Idle);
    assert_eq!(
        e.drain_events().last(),
        Some(&PlaybackEvent::Stopped {
            reason: StopReason::ImageUnavailable
        })
    );
}

#[test]
fn system_clock_engine_uses_default_opts() {
    let e = PlaybackEngine::with_system_clock().unwrap();
    assert_eq!(e.opts(), PlaybackOpts::default());
    assert_eq!(e.phase(), PlaybackPhase::Idle);
}

#[test]
fn pause_after_unsampled_boundary_lands_on_next_waypoint() {
    let (mut e, clock) = engine();
    e.start(timeline(&[5.0, 5.0])).unwrap();
    e.tick().unwrap();
    clock.advance_secs(7.0);
    e.pause().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Paused(1));
    assert!((e.state().elapsed_in_current_waypoint - 2.0).abs() < 1e-9);
    assert_eq!(entered(&e.drain_events()), vec![0, 1]);

    e.resume();
    let mut finished_at = None;
    for _ in 0..20 {
        clock.advance_secs(0.5);
        e.tick().unwrap();
        if e.phase() == PlaybackPhase::Finished {
            finished_at = Some(clock.now().as_secs_f64());
            break;
        }
    }
    assert_eq!(finished_at, Some(10.0));
}

#[test]
fn pause_after_unsampled_end_finishes() {
    let (mut e, clock) = engine();
    e.start(timeline(&[5.0])).unwrap();
    clock.advance_secs(6.0);
    e.pause().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Finished);
    assert!(!e.drain_events().contains(&PlaybackEvent::Paused));
}

#[test]
fn next_after_unsampled_boundary_steps_from_current_waypoint() {
    let (mut e, clock) = engine();
    e.start(timeline(&[5.0, 5.0, 5.0])).unwrap();
    clock.advance_secs(6.0);
    e.next().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Playing(2));
    assert_eq!(e.state().elapsed_in_current_waypoint, 0.0);

    let (mut e, clock) = engine();
    e.start(timeline(&[5.0, 5.0, 5.0])).unwrap();
    clock.advance_secs(6.0);
    e.previous().unwrap();
    assert_eq!(e.phase(), PlaybackPhase::Playing(0));
    assert_eq!(entered(&e.drain_events()), vec![0, 1, 0]);
}
