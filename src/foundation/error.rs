use crate::timeline::waypoint::WaypointId;

/// Convenience result type used across panoreel.
pub type ReelResult<T> = Result<T, ReelError>;

/// Top-level error taxonomy used by store, playback and render APIs.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// The timeline already holds its maximum number of waypoints.
    #[error("timeline already holds the maximum of {max} waypoints")]
    CapacityExceeded {
        /// Capacity of the timeline.
        max: usize,
    },

    /// A target index is outside `[0, len)`.
    #[error("index {index} is out of range for a timeline of {len} waypoints")]
    InvalidIndex {
        /// Requested index.
        index: usize,
        /// Timeline length at the time of the request.
        len: usize,
    },

    /// Playback or render was requested on a timeline with no waypoints.
    #[error("timeline has no waypoints")]
    EmptyTimeline,

    /// The image resolver could not produce a raster for a waypoint.
    #[error("image unavailable for waypoint '{waypoint}' at index {index}: {reason}")]
    ImageUnavailable {
        /// Position of the failing waypoint in the timeline.
        index: usize,
        /// Identifier of the failing waypoint.
        waypoint: WaypointId,
        /// Resolver-provided failure description.
        reason: String,
    },

    /// A render of the same timeline is already running.
    #[error("a render of this timeline is already in progress")]
    RenderInProgress,

    /// The video encoder could not accept frames or finalize its container.
    #[error("encoding failure: {0}")]
    EncodingFailure(String),

    /// Invalid options or timeline data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Copyable error code, delivered to callers that only need the failure class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`ReelError::CapacityExceeded`].
    CapacityExceeded,
    /// See [`ReelError::InvalidIndex`].
    InvalidIndex,
    /// See [`ReelError::EmptyTimeline`].
    EmptyTimeline,
    /// See [`ReelError::ImageUnavailable`].
    ImageUnavailable,
    /// See [`ReelError::RenderInProgress`].
    RenderInProgress,
    /// See [`ReelError::EncodingFailure`].
    EncodingFailure,
    /// See [`ReelError::Validation`].
    Validation,
    /// See [`ReelError::Serde`].
    Serde,
    /// See [`ReelError::Other`].
    Other,
}

impl ReelError {
    /// Build a [`ReelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ReelError::EncodingFailure`] value.
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::EncodingFailure(msg.into())
    }

    /// Build a [`ReelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::InvalidIndex { .. } => ErrorKind::InvalidIndex,
            Self::EmptyTimeline => ErrorKind::EmptyTimeline,
            Self::ImageUnavailable { .. } => ErrorKind::ImageUnavailable,
            Self::RenderInProgress => ErrorKind::RenderInProgress,
            Self::EncodingFailure(_) => ErrorKind::EncodingFailure,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Serde(_) => ErrorKind::Serde,
            Self::Other(_) => ErrorKind::Other,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
