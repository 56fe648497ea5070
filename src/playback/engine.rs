use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::assets::decode::RasterImage;
use crate::assets::resolver::{ImageRequest, ImageResolver};
use crate::foundation::clock::{Clock, SystemClock};
use crate::foundation::core::FrameRGBA;
use crate::foundation::error::{ReelError, ReelResult};
use crate::playback::event::{PlaybackEvent, StopReason};
use crate::synth::synthesizer::FrameSynthesizer;
use crate::timeline::snapshot::Timeline;

/// Playback tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackOpts {
    /// Progress sampling rate in Hz. Must be at least [`PlaybackOpts::MIN_SAMPLE_HZ`].
    pub sample_hz: f64,
}

impl PlaybackOpts {
    /// Lowest accepted sampling rate.
    pub const MIN_SAMPLE_HZ: f64 = 30.0;

    fn validate(self) -> ReelResult<()> {
        if !self.sample_hz.is_finite() || self.sample_hz < Self::MIN_SAMPLE_HZ {
            return Err(ReelError::validation(format!(
                "playback sample_hz must be >= {}, got {}",
                Self::MIN_SAMPLE_HZ,
                self.sample_hz
            )));
        }
        Ok(())
    }
}

impl Default for PlaybackOpts {
    fn default() -> Self {
        Self { sample_hz: 60.0 }
    }
}

/// Coarse engine state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// No session.
    Idle,
    /// Advancing through the waypoint at this index.
    Playing(usize),
    /// Holding on the waypoint at this index with elapsed time frozen.
    Paused(usize),
    /// The last waypoint completed. `start()` begins a new session.
    Finished,
}

impl PlaybackPhase {
    /// Current waypoint index while a session is active.
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Playing(i) | Self::Paused(i) => Some(i),
            Self::Idle | Self::Finished => None,
        }
    }
}

/// Snapshot of the session, as seen by a presenter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackState {
    /// Current waypoint, `None` when idle or finished.
    pub current_index: Option<usize>,
    /// `true` only in [`PlaybackPhase::Playing`].
    pub is_playing: bool,
    /// Seconds spent on the current waypoint at the last sample.
    pub elapsed_in_current_waypoint: f64,
}

struct Preview {
    resolver: Arc<dyn ImageResolver>,
    synth: FrameSynthesizer,
    image: Option<RasterImage>,
}

/// Drives a timeline snapshot in real time.
///
/// Elapsed time is anchored on the clock: the start of the current visit is remembered, so a late
/// `tick()` carries its overshoot into the following waypoints instead of dropping it.
pub struct PlaybackEngine {
    clock: Arc<dyn Clock>,
    opts: PlaybackOpts,
    timeline: Timeline,
    phase: PlaybackPhase,
    // Clock time (seconds) at which the current visit had zero elapsed.
    visit_start: f64,
    elapsed: f64,
    last_sample: Option<Duration>,
    events: VecDeque<PlaybackEvent>,
    preview: Option<Preview>,
}

impl PlaybackEngine {
    /// Create an idle engine on `clock`.
    pub fn new(clock: Arc<dyn Clock>, opts: PlaybackOpts) -> ReelResult<Self> {
        opts.validate()?;
        Ok(Self {
            clock,
            opts,
            timeline: Timeline::empty(),
            phase: PlaybackPhase::Idle,
            visit_start: 0.0,
            elapsed: 0.0,
            last_sample: None,
            events: VecDeque::new(),
            preview: None,
        })
    }

    /// Idle engine on the wall clock with default options.
    pub fn with_system_clock() -> ReelResult<Self> {
        Self::new(Arc::new(SystemClock::new()), PlaybackOpts::default())
    }

    /// Fetch each entered waypoint's image through `resolver` so [`Self::current_frame`] can
    /// compose it.
    pub fn with_preview(
        mut self,
        resolver: Arc<dyn ImageResolver>,
        synth: FrameSynthesizer,
    ) -> Self {
        self.preview = Some(Preview {
            resolver,
            synth,
            image: None,
        });
        self
    }

    /// Options in use.
    pub fn opts(&self) -> PlaybackOpts {
        self.opts
    }

    /// Snapshot the session plays.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Coarse state.
    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    /// Presenter-facing state.
    pub fn state(&self) -> PlaybackState {
        let current_index = self.phase.index();
        PlaybackState {
            current_index,
            is_playing: matches!(self.phase, PlaybackPhase::Playing(_)),
            elapsed_in_current_waypoint: if current_index.is_some() {
                self.elapsed
            } else {
                0.0
            },
        }
    }

    /// `elapsed / duration` of the current waypoint in `[0, 1]`; 0 without a session.
    pub fn progress(&self) -> f64 {
        let Some(index) = self.phase.index() else {
            return 0.0;
        };
        match self.timeline.get(index) {
            Some(w) if w.duration > 0.0 => (self.elapsed / w.duration).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Take all queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        self.events.drain(..).collect()
    }

    /// Begin a session at index 0 from Idle or Finished.
    ///
    /// An active session is left untouched.
    pub fn start(&mut self, timeline: Timeline) -> ReelResult<()> {
        if timeline.is_empty() {
            return Err(ReelError::EmptyTimeline);
        }
        if self.phase.index().is_some() {
            return Ok(());
        }
        self.timeline = timeline;
        self.visit_start = self.now_secs();
        self.last_sample = None;
        self.push(PlaybackEvent::Started);
        tracing::debug!(waypoints = self.timeline.len(), "playback started");
        self.enter(0, true)
    }

    /// Playing(i) to Paused(i). Elapsed is sampled and then frozen.
    ///
    /// Boundaries crossed since the last tick are walked first, so the pause lands on the
    /// waypoint the clock is actually in.
    pub fn pause(&mut self) -> ReelResult<()> {
        self.catch_up()?;
        let PlaybackPhase::Playing(index) = self.phase else {
            return Ok(());
        };
        self.phase = PlaybackPhase::Paused(index);
        self.push(PlaybackEvent::Paused);
        tracing::debug!(index, elapsed = self.elapsed, "playback paused");
        Ok(())
    }

    /// Paused(i) to Playing(i) with elapsed preserved.
    pub fn resume(&mut self) {
        let PlaybackPhase::Paused(index) = self.phase else {
            return;
        };
        self.visit_start = self.now_secs() - self.elapsed;
        self.phase = PlaybackPhase::Playing(index);
        self.push(PlaybackEvent::Resumed);
        tracing::debug!(index, "playback resumed");
    }

    /// Jump to the following waypoint. No-op at the last index or without a session.
    pub fn next(&mut self) -> ReelResult<()> {
        self.catch_up()?;
        let Some(index) = self.phase.index() else {
            return Ok(());
        };
        if index + 1 >= self.timeline.len() {
            return Ok(());
        }
        self.jump(index + 1)
    }

    /// Jump to the preceding waypoint. No-op at index 0 or without a session.
    pub fn previous(&mut self) -> ReelResult<()> {
        self.catch_up()?;
        let Some(index) = self.phase.index() else {
            return Ok(());
        };
        if index == 0 {
            return Ok(());
        }
        self.jump(index - 1)
    }

    /// Jump to `index` with elapsed 0, keeping the Playing/Paused mode.
    pub fn seek(&mut self, index: usize) -> ReelResult<()> {
        self.catch_up()?;
        if self.phase.index().is_none() {
            return Ok(());
        }
        if index >= self.timeline.len() {
            return Err(ReelError::InvalidIndex {
                index,
                len: self.timeline.len(),
            });
        }
        self.jump(index)
    }

    /// Tear down any session.
    pub fn stop(&mut self) {
        self.halt(StopReason::User);
    }

    /// Sample the clock and advance across every dwell boundary crossed since the last sample.
    ///
    /// No-op unless playing. Fails only when the preview image of an entered waypoint cannot be
    /// fetched, which also ends the session.
    pub fn tick(&mut self) -> ReelResult<()> {
        if !matches!(self.phase, PlaybackPhase::Playing(_)) {
            return Ok(());
        }
        self.last_sample = Some(self.clock.now());
        self.catch_up()?;
        if let PlaybackPhase::Playing(index) = self.phase {
            let progress = self.progress();
            self.push(PlaybackEvent::Progress { index, progress });
        }
        Ok(())
    }

    /// Clock time of the next progress sample.
    pub fn next_sample_at(&self) -> Duration {
        let interval = Duration::from_secs_f64(1.0 / self.opts.sample_hz);
        match self.last_sample {
            Some(t) => t + interval,
            None => self.clock.now(),
        }
    }

    /// Tick at the sampling rate until the session is no longer playing, handing each batch of
    /// events to `on_events`.
    pub fn play_through<F>(&mut self, mut on_events: F) -> ReelResult<()>
    where
        F: FnMut(&[PlaybackEvent]),
    {
        let pending = self.drain_events();
        if !pending.is_empty() {
            on_events(&pending);
        }
        while matches!(self.phase, PlaybackPhase::Playing(_)) {
            self.clock.sleep_until(self.next_sample_at());
            let res = self.tick();
            let batch = self.drain_events();
            if !batch.is_empty() {
                on_events(&batch);
            }
            res?;
        }
        Ok(())
    }

    /// React to a store mutation.
    ///
    /// Any effective change during an active session forces Idle. Otherwise the new snapshot is
    /// adopted for the next `start()`.
    pub fn on_timeline_changed(&mut self, timeline: &Timeline) {
        if timeline.revision() == self.timeline.revision()
            && timeline.fingerprint() == self.timeline.fingerprint()
        {
            return;
        }
        if self.phase.index().is_some() {
            tracing::debug!(
                revision = timeline.revision(),
                structural = !self.timeline.same_sequence(timeline),
                "timeline changed during playback"
            );
            self.halt(StopReason::TimelineChanged);
        }
        self.timeline = timeline.clone();
    }

    /// Compose the preview frame for the current waypoint at the current progress.
    ///
    /// `None` without a preview source or without a session.
    pub fn current_frame(&self) -> ReelResult<Option<FrameRGBA>> {
        let Some(index) = self.phase.index() else {
            return Ok(None);
        };
        let Some(preview) = &self.preview else {
            return Ok(None);
        };
        let (Some(image), Some(waypoint)) = (&preview.image, self.timeline.get(index)) else {
            return Ok(None);
        };
        preview
            .synth
            .compose_at(image, waypoint, self.progress())
            .map(Some)
    }

    /// Walk every dwell boundary the clock has crossed while playing, carrying the overshoot,
    /// and leave `elapsed` current. Emits no sample for the visit it stops in.
    fn catch_up(&mut self) -> ReelResult<()> {
        let PlaybackPhase::Playing(mut index) = self.phase else {
            return Ok(());
        };
        let now = self.now_secs();
        loop {
            let duration = self.duration_at(index);
            let elapsed = now - self.visit_start;
            if elapsed < duration {
                self.elapsed = elapsed.max(0.0);
                return Ok(());
            }

            self.push(PlaybackEvent::Progress {
                index,
                progress: 1.0,
            });
            self.visit_start += duration;
            if index + 1 >= self.timeline.len() {
                self.finish();
                return Ok(());
            }
            index += 1;
            self.enter(index, true)?;
        }
    }

    fn jump(&mut self, index: usize) -> ReelResult<()> {
        let playing = matches!(self.phase, PlaybackPhase::Playing(_));
        self.visit_start = self.now_secs();
        self.enter(index, playing)
    }

    fn enter(&mut self, index: usize, playing: bool) -> ReelResult<()> {
        self.phase = if playing {
            PlaybackPhase::Playing(index)
        } else {
            PlaybackPhase::Paused(index)
        };
        self.elapsed = 0.0;
        self.push(PlaybackEvent::Entered { index });
        tracing::debug!(index, playing, "entered waypoint");
        self.load_preview(index)
    }

    fn load_preview(&mut self, index: usize) -> ReelResult<()> {
        let Some(preview) = self.preview.as_mut() else {
            return Ok(());
        };
        let Some(waypoint) = self.timeline.get(index) else {
            return Ok(());
        };
        let request = ImageRequest::for_waypoint(waypoint, preview.synth.opts().canvas);
        match preview.resolver.fetch(&request, waypoint) {
            Ok(image) => {
                preview.image = Some(image);
                Ok(())
            }
            Err(e) => {
                preview.image = None;
                let err = ReelError::ImageUnavailable {
                    index,
                    waypoint: waypoint.id.clone(),
                    reason: e.reason,
                };
                tracing::warn!(error = %err, "preview image fetch failed");
                self.halt(StopReason::ImageUnavailable);
                Err(err)
            }
        }
    }

    fn finish(&mut self) {
        self.phase = PlaybackPhase::Finished;
        self.elapsed = 0.0;
        if let Some(preview) = self.preview.as_mut() {
            preview.image = None;
        }
        self.push(PlaybackEvent::Finished);
        tracing::debug!("playback finished");
    }

    fn halt(&mut self, reason: StopReason) {
        if self.phase == PlaybackPhase::Idle {
            return;
        }
        self.phase = PlaybackPhase::Idle;
        self.elapsed = 0.0;
        self.last_sample = None;
        if let Some(preview) = self.preview.as_mut() {
            preview.image = None;
        }
        self.push(PlaybackEvent::Stopped { reason });
        tracing::debug!(?reason, "playback stopped");
    }

    fn duration_at(&self, index: usize) -> f64 {
        self.timeline.get(index).map_or(0.0, |w| w.duration)
    }

    fn now_secs(&self) -> f64 {
        self.clock.now().as_secs_f64()
    }

    fn push(&mut self, event: PlaybackEvent) {
        self.events.push_back(event);
    }
}

impl std::fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("opts", &self.opts)
            .field("phase", &self.phase)
            .field("elapsed", &self.elapsed)
            .field("revision", &self.timeline.revision())
            .field("preview", &self.preview.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/engine.rs"]
mod tests;
