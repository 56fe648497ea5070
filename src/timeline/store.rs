use crate::foundation::error::{ReelError, ReelResult};
use crate::timeline::snapshot::Timeline;
use crate::timeline::waypoint::{HeadingBoundary, Waypoint, WaypointField, WaypointId};

/// Options for [`WaypointStore`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoreOpts {
    /// Upper-edge policy for heading edits.
    #[serde(default)]
    pub heading_boundary: HeadingBoundary,
}

/// The single authoritative, ordered, mutable waypoint sequence.
///
/// Every mutation is synchronous and returns the resulting [`Timeline`] snapshot. Snapshots handed
/// out earlier are never affected. `revision` increases only on mutations that change something.
#[derive(Clone, Debug, Default)]
pub struct WaypointStore {
    waypoints: Vec<Waypoint>,
    revision: u64,
    opts: StoreOpts,
}

impl WaypointStore {
    /// Create an empty store.
    pub fn new(opts: StoreOpts) -> Self {
        Self {
            waypoints: Vec::new(),
            revision: 0,
            opts,
        }
    }

    /// Seed a store from an existing snapshot.
    pub fn from_timeline(timeline: &Timeline, opts: StoreOpts) -> Self {
        Self {
            waypoints: timeline.waypoints().to_vec(),
            revision: 0,
            opts,
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Timeline {
        Timeline::from_parts(self.waypoints.clone(), self.revision)
    }

    /// Mutation counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Return `true` when the store is empty.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Look up a waypoint by id.
    pub fn get(&self, id: &WaypointId) -> Option<&Waypoint> {
        self.waypoints.iter().find(|w| &w.id == id)
    }

    /// Sum of dwell durations.
    pub fn total_duration_secs(&self) -> f64 {
        self.waypoints.iter().map(|w| w.duration).sum()
    }

    /// Append at the end.
    ///
    /// Fails with [`ReelError::CapacityExceeded`] at [`Timeline::MAX_WAYPOINTS`]. Numeric fields
    /// are clamped like edits. Appending an id that is already present changes nothing.
    pub fn append(&mut self, mut waypoint: Waypoint) -> ReelResult<Timeline> {
        if self.waypoints.len() >= Timeline::MAX_WAYPOINTS {
            return Err(ReelError::CapacityExceeded {
                max: Timeline::MAX_WAYPOINTS,
            });
        }
        if self.get(&waypoint.id).is_some() {
            return Ok(self.snapshot());
        }
        for field in WaypointField::ALL {
            let v = waypoint.field(field);
            if !waypoint.set_field(field, v, self.opts.heading_boundary) {
                let (min, _) = field.bounds();
                waypoint.set_field(field, min, self.opts.heading_boundary);
            }
        }
        tracing::debug!(id = %waypoint.id, "append waypoint");
        self.waypoints.push(waypoint);
        self.bump();
        Ok(self.snapshot())
    }

    /// Remove by id. Absent ids are a no-op.
    pub fn remove(&mut self, id: &WaypointId) -> Timeline {
        let before = self.waypoints.len();
        self.waypoints.retain(|w| &w.id != id);
        if self.waypoints.len() != before {
            tracing::debug!(%id, "remove waypoint");
            self.bump();
        }
        self.snapshot()
    }

    /// Move the waypoint `id` to `new_index` (array-move semantics).
    ///
    /// Fails with [`ReelError::InvalidIndex`] when `new_index` is outside `[0, len)`. Absent ids
    /// are a no-op.
    pub fn reorder(&mut self, id: &WaypointId, new_index: usize) -> ReelResult<Timeline> {
        let len = self.waypoints.len();
        if new_index >= len {
            return Err(ReelError::InvalidIndex {
                index: new_index,
                len,
            });
        }
        let Some(old_index) = self.waypoints.iter().position(|w| &w.id == id) else {
            return Ok(self.snapshot());
        };
        if old_index != new_index {
            let w = self.waypoints.remove(old_index);
            self.waypoints.insert(new_index, w);
            tracing::debug!(%id, old_index, new_index, "reorder waypoint");
            self.bump();
        }
        Ok(self.snapshot())
    }

    /// Clamp `value` into the field's range and store it. Never fails; absent ids and non-finite
    /// values are no-ops.
    pub fn update_field(&mut self, id: &WaypointId, field: WaypointField, value: f64) -> Timeline {
        let boundary = self.opts.heading_boundary;
        if let Some(w) = self.waypoints.iter_mut().find(|w| &w.id == id) {
            let before = w.field(field);
            if w.set_field(field, value, boundary) && w.field(field).to_bits() != before.to_bits() {
                tracing::debug!(%id, field = field.name(), value = w.field(field), "update field");
                self.bump();
            }
        }
        self.snapshot()
    }

    fn bump(&mut self) {
        self.revision += 1;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/store.rs"]
mod tests;
