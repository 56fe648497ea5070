use std::fmt;

use crate::foundation::core::Fps;
use crate::foundation::error::{ReelError, ReelResult};

/// Opaque waypoint identifier (a place id, CID, or any caller-chosen key).
#[derive(
    Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct WaypointId(String);

impl WaypointId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WaypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WaypointId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for WaypointId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Geographic position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LatLng {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

/// One stop of a journey: where to look from, how, and for how long.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Waypoint {
    /// Opaque identifier, unique within a timeline.
    pub id: WaypointId,
    /// Display name; never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Display address; never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Camera position.
    pub location: LatLng,
    /// Camera heading in degrees.
    #[serde(default)]
    pub heading: f64,
    /// Camera pitch in degrees.
    #[serde(default)]
    pub pitch: f64,
    /// Zoom factor; also the final scale of the push-in/pull-out ramp.
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    /// Dwell time in seconds.
    #[serde(default = "default_duration")]
    pub duration: f64,
}

fn default_zoom() -> f64 {
    Waypoint::DEFAULT_ZOOM
}

fn default_duration() -> f64 {
    Waypoint::DEFAULT_DURATION_SECS
}

impl Waypoint {
    /// Dwell time given to a freshly added location.
    pub const DEFAULT_DURATION_SECS: f64 = 7.0;
    /// Zoom given to a freshly added location.
    pub const DEFAULT_ZOOM: f64 = 1.0;

    /// New waypoint at `lat`/`lng` with default camera and dwell settings.
    pub fn new(id: impl Into<WaypointId>, lat: f64, lng: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            address: None,
            location: LatLng { lat, lng },
            heading: 0.0,
            pitch: 0.0,
            zoom: Self::DEFAULT_ZOOM,
            duration: Self::DEFAULT_DURATION_SECS,
        }
    }

    /// Builder-style dwell time, clamped like an edit.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.set_field(WaypointField::Duration, secs, HeadingBoundary::default());
        self
    }

    /// Builder-style camera settings, clamped like an edit.
    pub fn with_view(mut self, heading: f64, pitch: f64, zoom: f64) -> Self {
        let b = HeadingBoundary::default();
        self.set_field(WaypointField::Heading, heading, b);
        self.set_field(WaypointField::Pitch, pitch, b);
        self.set_field(WaypointField::Zoom, zoom, b);
        self
    }

    /// Builder-style display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Read one numeric field.
    pub fn field(&self, field: WaypointField) -> f64 {
        match field {
            WaypointField::Duration => self.duration,
            WaypointField::Heading => self.heading,
            WaypointField::Pitch => self.pitch,
            WaypointField::Zoom => self.zoom,
        }
    }

    /// Clamp `value` into the field's range and store it.
    ///
    /// Returns `false` (leaving the field untouched) for non-finite input.
    pub fn set_field(&mut self, field: WaypointField, value: f64, heading: HeadingBoundary) -> bool {
        let Some(v) = field.clamp(value, heading) else {
            return false;
        };
        match field {
            WaypointField::Duration => self.duration = v,
            WaypointField::Heading => self.heading = v,
            WaypointField::Pitch => self.pitch = v,
            WaypointField::Zoom => self.zoom = v,
        }
        true
    }

    /// Number of frames this waypoint occupies at `fps`.
    pub fn frame_count(&self, fps: Fps) -> u64 {
        fps.secs_to_frames_round(self.duration)
    }

    /// Strict range check used at the JSON boundary.
    pub fn validate(&self) -> ReelResult<()> {
        if self.id.as_str().is_empty() {
            return Err(ReelError::validation("waypoint id must be non-empty"));
        }
        if !self.location.lat.is_finite() || !(-90.0..=90.0).contains(&self.location.lat) {
            return Err(ReelError::validation(format!(
                "waypoint '{}' latitude must be within [-90, 90]",
                self.id
            )));
        }
        if !self.location.lng.is_finite() || !(-180.0..=180.0).contains(&self.location.lng) {
            return Err(ReelError::validation(format!(
                "waypoint '{}' longitude must be within [-180, 180]",
                self.id
            )));
        }
        for field in WaypointField::ALL {
            let v = self.field(field);
            let (min, max) = field.bounds();
            if !v.is_finite() || v < min || v > max {
                return Err(ReelError::validation(format!(
                    "waypoint '{}' {} {v} is outside [{min}, {max}]",
                    self.id,
                    field.name()
                )));
            }
        }
        Ok(())
    }
}

/// Editable numeric fields of a [`Waypoint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaypointField {
    /// Dwell time, seconds in `[5, 15]`.
    Duration,
    /// Heading, degrees in `[0, 360)`; see [`HeadingBoundary`] for the upper edge.
    Heading,
    /// Pitch, degrees in `[-90, 90]`.
    Pitch,
    /// Zoom factor in `[0.5, 2.0]`.
    Zoom,
}

impl WaypointField {
    /// Every editable field.
    pub const ALL: [WaypointField; 4] = [Self::Duration, Self::Heading, Self::Pitch, Self::Zoom];

    /// Inclusive `(min, max)` clamp bounds.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            Self::Duration => (5.0, 15.0),
            Self::Heading => (0.0, 360.0),
            Self::Pitch => (-90.0, 90.0),
            Self::Zoom => (0.5, 2.0),
        }
    }

    /// Lower-case field name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Duration => "duration",
            Self::Heading => "heading",
            Self::Pitch => "pitch",
            Self::Zoom => "zoom",
        }
    }

    /// Clamp an edited value. `None` for NaN/infinite input.
    pub fn clamp(self, value: f64, heading: HeadingBoundary) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        let (min, max) = self.bounds();
        let v = value.clamp(min, max);
        if self == Self::Heading && heading == HeadingBoundary::Wrap && v >= 360.0 {
            return Some(0.0);
        }
        Some(v)
    }
}

/// How a heading at or above 360 degrees is stored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingBoundary {
    /// Saturate at 360 (`400 -> 360`). Matches the editing form's `min(360, x)`.
    #[default]
    Saturate,
    /// Treat 360 as the excluded edge of `[0, 360)`: anything clamped to 360 becomes 0.
    Wrap,
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/waypoint.rs"]
mod tests;
