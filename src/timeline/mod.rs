//! Waypoint data model, immutable timeline snapshots and the mutable waypoint store.

/// Mutable, capacity-bounded waypoint store.
pub mod store;
/// Immutable timeline snapshots and their JSON boundary.
pub mod snapshot;
/// Waypoints and their clamped fields.
pub mod waypoint;
