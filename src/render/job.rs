use crate::foundation::error::{ErrorKind, ReelError};
use crate::timeline::waypoint::WaypointId;

/// Lifecycle of a [`RenderJob`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderStatus {
    /// Created, encoder not yet open.
    Pending,
    /// Frames are being produced.
    Running,
    /// The container was finalized and returned.
    Succeeded,
    /// The render stopped; no bytes were returned.
    Failed,
}

/// Where and why a render failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderFailure {
    /// Failure class.
    pub kind: ErrorKind,
    /// Waypoint being processed, if any.
    pub index: Option<usize>,
    /// Identifier of that waypoint.
    pub waypoint: Option<WaypointId>,
    /// Display form of the error.
    pub message: String,
}

/// Progress record of one render call.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderJob {
    /// Waypoints in the snapshot.
    pub total_waypoints: usize,
    /// Waypoint being processed, `None` before the first and after success.
    pub current_waypoint_index: Option<usize>,
    /// Frame index within the current waypoint.
    pub current_frame_index: u64,
    /// Frames pushed to the encoder so far.
    pub frames_encoded: u64,
    /// Completed waypoints over total, in `[0, 1]`.
    pub overall_progress: f64,
    /// Container bytes the encoder holds.
    pub buffered_bytes: usize,
    /// Lifecycle.
    pub status: RenderStatus,
    /// Set when `status` is [`RenderStatus::Failed`].
    pub failure: Option<RenderFailure>,
}

impl RenderJob {
    pub(crate) fn new(total_waypoints: usize) -> Self {
        Self {
            total_waypoints,
            current_waypoint_index: None,
            current_frame_index: 0,
            frames_encoded: 0,
            overall_progress: 0.0,
            buffered_bytes: 0,
            status: RenderStatus::Pending,
            failure: None,
        }
    }

    pub(crate) fn run(&mut self) {
        self.status = RenderStatus::Running;
    }

    pub(crate) fn enter_waypoint(&mut self, index: usize) {
        self.current_waypoint_index = Some(index);
        self.current_frame_index = 0;
    }

    pub(crate) fn record_frame(&mut self, frame: u64, buffered_bytes: usize) {
        self.current_frame_index = frame;
        self.frames_encoded += 1;
        self.buffered_bytes = buffered_bytes;
    }

    pub(crate) fn complete_waypoint(&mut self, index: usize, buffered_bytes: usize) {
        self.buffered_bytes = buffered_bytes;
        self.overall_progress = if self.total_waypoints == 0 {
            1.0
        } else {
            ((index + 1) as f64 / self.total_waypoints as f64).min(1.0)
        };
    }

    pub(crate) fn succeed(&mut self, bytes: usize) {
        self.current_waypoint_index = None;
        self.overall_progress = 1.0;
        self.buffered_bytes = bytes;
        self.status = RenderStatus::Succeeded;
    }

    pub(crate) fn fail(&mut self, err: &ReelError) {
        let (index, waypoint) = match err {
            ReelError::ImageUnavailable {
                index, waypoint, ..
            } => (Some(*index), Some(waypoint.clone())),
            _ => (self.current_waypoint_index, None),
        };
        self.failure = Some(RenderFailure {
            kind: err.kind(),
            index,
            waypoint,
            message: err.to_string(),
        });
        self.buffered_bytes = 0;
        self.status = RenderStatus::Failed;
    }

    /// `true` once the job is Succeeded or Failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, RenderStatus::Succeeded | RenderStatus::Failed)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/job.rs"]
mod tests;
