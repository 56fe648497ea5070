/// Why a session ended before reaching the last waypoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// `stop()` was called.
    User,
    /// The timeline was mutated during the session.
    TimelineChanged,
    /// The preview image of the entered waypoint could not be fetched.
    ImageUnavailable,
}

/// Something observable happened to the playback session.
#[derive(Clone, Debug, PartialEq)]
pub enum PlaybackEvent {
    /// A session started at index 0.
    Started,
    /// Waypoint `index` became current.
    Entered {
        /// Position in the timeline.
        index: usize,
    },
    /// Sampled progress of the current waypoint, in `[0, 1]`.
    Progress {
        /// Position in the timeline.
        index: usize,
        /// `elapsed / duration`.
        progress: f64,
    },
    /// Playback was paused.
    Paused,
    /// Playback was resumed.
    Resumed,
    /// The last waypoint's dwell completed.
    Finished,
    /// The session was torn down.
    Stopped {
        /// Cause.
        reason: StopReason,
    },
}
