use super::*;

fn id(s: &str) -> WaypointId {
    WaypointId::new(s)
}

fn filled(n: usize) -> WaypointStore {
    let mut s = WaypointStore::default();
    for i in 0..n {
        s.append(Waypoint::new(format!("w{i}"), 1.0, 2.0)).unwrap();
    }
    s
}

fn order(t: &Timeline) -> Vec<&str> {
    t.waypoints().iter().map(|w| w.id.as_str()).collect()
}

#[test]
fn append_fails_at_capacity() {
    let mut s = filled(6);
    let err = s.append(Waypoint::new("x", 0.0, 0.0)).unwrap_err();
    assert!(matches!(err, ReelError::CapacityExceeded { max: 6 }));
    assert_eq!(s.len(), 6);
}

#[test]
fn append_duplicate_id_is_noop() {
    let mut s = filled(2);
    let rev = s.revision();
    let t = s.append(Waypoint::new("w0", 5.0, 5.0)).unwrap();
    assert_eq!(t.len(), 2);
    assert_eq!(s.revision(), rev);
}

#[test]
fn append_clamps_out_of_range_fields() {
    let mut s = WaypointStore::default();
    let mut w = Waypoint::new("a", 0.0, 0.0);
    w.duration = 40.0;
    w.zoom = f64::NAN;
    let t = s.append(w).unwrap();
    assert_eq!(t.waypoints()[0].duration, 15.0);
    assert_eq!(t.waypoints()[0].zoom, 0.5);
}

#[test]
fn remove_absent_is_noop() {
    let mut s = filled(3);
    let rev = s.revision();
    let t = s.remove(&id("nope"));
    assert_eq!(t.len(), 3);
    assert_eq!(s.revision(), rev);

    let t = s.remove(&id("w1"));
    assert_eq!(order(&t), vec!["w0", "w2"]);
    assert!(s.revision() > rev);
}

#[test]
fn reorder_moves_like_array_move() {
    let mut s = filled(4);
    let t = s.reorder(&id("w0"), 2).unwrap();
    assert_eq!(order(&t), vec!["w1", "w2", "w0", "w3"]);
    let t = s.reorder(&id("w3"), 0).unwrap();
    assert_eq!(order(&t), vec!["w3", "w1", "w2", "w0"]);
}

#[test]
fn reorder_out_of_range_is_invalid_index() {
    let mut s = filled(3);
    let err = s.reorder(&id("w0"), 3).unwrap_err();
    assert!(matches!(err, ReelError::InvalidIndex { index: 3, len: 3 }));
    let err = WaypointStore::default().reorder(&id("w0"), 0).unwrap_err();
    assert_eq!(err.kind(), crate::foundation::error::ErrorKind::InvalidIndex);
}

#[test]
fn reorder_absent_or_same_index_keeps_revision() {
    let mut s = filled(3);
    let rev = s.revision();
    s.reorder(&id("zz"), 1).unwrap();
    s.reorder(&id("w1"), 1).unwrap();
    assert_eq!(s.revision(), rev);
}

#[test]
fn update_field_clamps_duration() {
    let mut s = filled(1);
    let t = s.update_field(&id("w0"), WaypointField::Duration, 2.0);
    assert_eq!(t.waypoints()[0].duration, 5.0);
    let t = s.update_field(&id("w0"), WaypointField::Duration, 50.0);
    assert_eq!(t.waypoints()[0].duration, 15.0);
}

#[test]
fn update_field_heading_policy_both_ways() {
    let mut sat = filled(1);
    let t = sat.update_field(&id("w0"), WaypointField::Heading, 400.0);
    assert_eq!(t.waypoints()[0].heading, 360.0);

    let mut wrap = WaypointStore::new(StoreOpts {
        heading_boundary: HeadingBoundary::Wrap,
    });
    wrap.append(Waypoint::new("w0", 0.0, 0.0)).unwrap();
    let t = wrap.update_field(&id("w0"), WaypointField::Heading, 400.0);
    assert_eq!(t.waypoints()[0].heading, 0.0);
    let t = wrap.update_field(&id("w0"), WaypointField::Heading, 359.0);
    assert_eq!(t.waypoints()[0].heading, 359.0);
}

#[test]
fn update_field_never_touches_old_snapshots() {
    let mut s = filled(1);
    let before = s.snapshot();
    s.update_field(&id("w0"), WaypointField::Zoom, 1.8);
    assert_eq!(before.waypoints()[0].zoom, 1.0);
    assert_eq!(s.snapshot().waypoints()[0].zoom, 1.8);
    assert!(s.snapshot().revision() > before.revision());
}

#[test]
fn update_field_unknown_id_or_same_value_is_noop() {
    let mut s = filled(1);
    let rev = s.revision();
    s.update_field(&id("nope"), WaypointField::Zoom, 1.5);
    s.update_field(&id("w0"), WaypointField::Zoom, 1.0);
    s.update_field(&id("w0"), WaypointField::Zoom, f64::NAN);
    assert_eq!(s.revision(), rev);
}

#[test]
fn total_duration_tracks_edits() {
    let mut s = filled(2);
    assert_eq!(s.total_duration_secs(), 14.0);
    s.update_field(&id("w1"), WaypointField::Duration, 10.0);
    assert_eq!(s.total_duration_secs(), 17.0);
}
