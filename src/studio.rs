//! One editable timeline plus its playback session.

use crate::encode::encoder::EncodedVideo;
use crate::foundation::error::ReelResult;
use crate::playback::engine::PlaybackEngine;
use crate::render::pipeline::RenderPipeline;
use crate::timeline::snapshot::Timeline;
use crate::timeline::store::WaypointStore;
use crate::timeline::waypoint::{Waypoint, WaypointField, WaypointId};

/// Owns a [`WaypointStore`] and a [`PlaybackEngine`] and keeps them consistent: every effective
/// store mutation is reported to the engine, which drops an active session.
#[derive(Debug)]
pub struct Studio {
    store: WaypointStore,
    engine: PlaybackEngine,
}

impl Studio {
    /// Pair `store` with `engine`.
    pub fn new(store: WaypointStore, engine: PlaybackEngine) -> Self {
        let mut studio = Self { store, engine };
        let snapshot = studio.store.snapshot();
        studio.engine.on_timeline_changed(&snapshot);
        studio
    }

    /// The store, read-only. Mutate through the studio.
    pub fn store(&self) -> &WaypointStore {
        &self.store
    }

    /// Current snapshot.
    pub fn timeline(&self) -> Timeline {
        self.store.snapshot()
    }

    /// The playback session.
    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    /// The playback session, for transport controls and ticking.
    pub fn engine_mut(&mut self) -> &mut PlaybackEngine {
        &mut self.engine
    }

    /// See [`WaypointStore::append`].
    pub fn append(&mut self, waypoint: Waypoint) -> ReelResult<Timeline> {
        let t = self.store.append(waypoint)?;
        self.engine.on_timeline_changed(&t);
        Ok(t)
    }

    /// See [`WaypointStore::remove`].
    pub fn remove(&mut self, id: &WaypointId) -> Timeline {
        let t = self.store.remove(id);
        self.engine.on_timeline_changed(&t);
        t
    }

    /// See [`WaypointStore::reorder`].
    pub fn reorder(&mut self, id: &WaypointId, new_index: usize) -> ReelResult<Timeline> {
        let t = self.store.reorder(id, new_index)?;
        self.engine.on_timeline_changed(&t);
        Ok(t)
    }

    /// See [`WaypointStore::update_field`].
    pub fn update_field(&mut self, id: &WaypointId, field: WaypointField, value: f64) -> Timeline {
        let t = self.store.update_field(id, field, value);
        self.engine.on_timeline_changed(&t);
        t
    }

    /// Start playback of the current snapshot.
    pub fn play(&mut self) -> ReelResult<()> {
        let t = self.store.snapshot();
        self.engine.start(t)
    }

    /// Render the current snapshot. Independent of any playback session.
    pub fn render(&self, pipeline: &RenderPipeline) -> ReelResult<EncodedVideo> {
        pipeline.render(&self.store.snapshot())
    }
}

#[cfg(test)]
#[path = "../tests/unit/studio.rs"]
mod tests;
