use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};
use crate::foundation::math::Fnv1a64;
use crate::timeline::waypoint::{Waypoint, WaypointId};

/// Immutable, ordered waypoint sequence handed to playback and render.
///
/// Cloning is cheap (the waypoints are shared). A snapshot never observes later store mutations.
#[derive(Clone, Debug, PartialEq)]
pub struct Timeline {
    waypoints: Arc<[Waypoint]>,
    revision: u64,
}

/// JSON boundary representation of a timeline.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TimelineDef {
    /// Waypoints in playback order.
    pub waypoints: Vec<Waypoint>,
}

impl Timeline {
    /// Maximum number of waypoints in one timeline.
    pub const MAX_WAYPOINTS: usize = 6;

    /// Build a validated snapshot (capacity, unique ids, strict field ranges).
    pub fn new(waypoints: Vec<Waypoint>) -> ReelResult<Self> {
        if waypoints.len() > Self::MAX_WAYPOINTS {
            return Err(ReelError::CapacityExceeded {
                max: Self::MAX_WAYPOINTS,
            });
        }
        for (i, w) in waypoints.iter().enumerate() {
            w.validate()?;
            if waypoints[..i].iter().any(|o| o.id == w.id) {
                return Err(ReelError::validation(format!(
                    "duplicate waypoint id '{}'",
                    w.id
                )));
            }
        }
        Ok(Self::from_parts(waypoints, 0))
    }

    /// The empty timeline.
    pub fn empty() -> Self {
        Self::from_parts(Vec::new(), 0)
    }

    pub(crate) fn from_parts(waypoints: Vec<Waypoint>, revision: u64) -> Self {
        Self {
            waypoints: waypoints.into(),
            revision,
        }
    }

    /// Parse and validate a timeline from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> ReelResult<Self> {
        let def: TimelineDef = serde_json::from_reader(r)
            .map_err(|e| ReelError::serde(format!("parse timeline JSON: {e}")))?;
        Self::new(def.waypoints)
    }

    /// Parse and validate a timeline from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> ReelResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            ReelError::validation(format!("open timeline JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Serialize to pretty JSON.
    pub fn to_json_string(&self) -> ReelResult<String> {
        let def = TimelineDef {
            waypoints: self.waypoints.to_vec(),
        };
        serde_json::to_string_pretty(&def)
            .map_err(|e| ReelError::serde(format!("serialize timeline JSON: {e}")))
    }

    /// Waypoints in order.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Return `true` when there is nothing to play or render.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoint at `index`.
    pub fn get(&self, index: usize) -> Option<&Waypoint> {
        self.waypoints.get(index)
    }

    /// Position of the waypoint with `id`.
    pub fn position(&self, id: &WaypointId) -> Option<usize> {
        self.waypoints.iter().position(|w| &w.id == id)
    }

    /// Store revision this snapshot was taken at.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Advertised running time: the sum of all dwell durations.
    pub fn total_duration_secs(&self) -> f64 {
        self.waypoints.iter().map(|w| w.duration).sum()
    }

    /// Total frames a render emits at `fps`.
    pub fn total_frames(&self, fps: Fps) -> u64 {
        self.waypoints.iter().map(|w| w.frame_count(fps)).sum()
    }

    /// Content digest. Equal for snapshots with identical ids, order and fields, regardless of
    /// revision.
    pub fn fingerprint(&self) -> u64 {
        let mut h = Fnv1a64::new_default();
        h.write_u64(self.waypoints.len() as u64);
        for w in self.waypoints.iter() {
            h.write_str(w.id.as_str());
            h.write_f64(w.location.lat);
            h.write_f64(w.location.lng);
            h.write_f64(w.heading);
            h.write_f64(w.pitch);
            h.write_f64(w.zoom);
            h.write_f64(w.duration);
        }
        h.finish()
    }

    /// Return `true` when `other` holds the same waypoint ids in the same order.
    pub(crate) fn same_sequence(&self, other: &Timeline) -> bool {
        self.waypoints.len() == other.waypoints.len()
            && self
                .waypoints
                .iter()
                .zip(other.waypoints.iter())
                .all(|(a, b)| a.id == b.id)
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/snapshot.rs"]
mod tests;
