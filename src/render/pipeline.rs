use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::assets::resolver::{ImageRequest, ImageResolver};
use crate::encode::encoder::{
    EncodedVideo, EncoderConfig, EncoderKind, VideoEncoder, create_encoder,
};
use crate::foundation::clock::{Clock, SystemClock};
use crate::foundation::core::{Canvas, Fps, FrameIndex};
use crate::foundation::error::{ReelError, ReelResult};
use crate::render::job::RenderJob;
use crate::synth::synthesizer::{FrameSynthesizer, SynthOpts};
use crate::timeline::snapshot::Timeline;

/// How frame emission relates to wall-clock time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FramePacing {
    /// As fast as the encoder accepts frames.
    #[default]
    Unpaced,
    /// Each frame waits for its cadence boundary on the pipeline clock.
    Realtime,
}

/// Options controlling [`RenderPipeline`] output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderOpts {
    /// Output frame size.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Target bitrate handed to the encoder.
    pub bitrate_bps: u32,
    /// Frame emission pacing.
    pub pacing: FramePacing,
    /// Encoder instantiated per render.
    pub encoder: EncoderKind,
}

impl Default for RenderOpts {
    fn default() -> Self {
        Self {
            canvas: Canvas::DEFAULT,
            fps: Fps::DEFAULT,
            bitrate_bps: EncoderConfig::DEFAULT_BITRATE_BPS,
            pacing: FramePacing::Unpaced,
            encoder: EncoderKind::default(),
        }
    }
}

impl RenderOpts {
    fn encoder_config(&self) -> EncoderConfig {
        EncoderConfig {
            canvas: self.canvas,
            fps: self.fps,
            bitrate_bps: self.bitrate_bps,
        }
    }
}

/// Renders whole timelines into encoded videos.
///
/// The pipeline is `Sync`: renders of different timelines may run concurrently, while a second
/// render of a timeline with the same content fails with [`ReelError::RenderInProgress`].
pub struct RenderPipeline {
    resolver: Arc<dyn ImageResolver>,
    clock: Arc<dyn Clock>,
    synth: FrameSynthesizer,
    opts: RenderOpts,
    in_flight: Mutex<HashSet<u64>>,
}

impl RenderPipeline {
    /// Create a pipeline fetching images through `resolver`.
    pub fn new(resolver: Arc<dyn ImageResolver>, opts: RenderOpts) -> ReelResult<Self> {
        opts.encoder_config().validate()?;
        let synth = FrameSynthesizer::new(SynthOpts {
            canvas: opts.canvas,
            fps: opts.fps,
            ..SynthOpts::default()
        })?;
        Ok(Self {
            resolver,
            clock: Arc::new(SystemClock::new()),
            synth,
            opts,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Use `clock` for realtime pacing.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Options in use.
    pub fn opts(&self) -> &RenderOpts {
        &self.opts
    }

    /// Synthesizer shared by every render of this pipeline.
    pub fn synthesizer(&self) -> &FrameSynthesizer {
        &self.synth
    }

    /// `true` while a render of a timeline with this content is running.
    pub fn is_rendering(&self, timeline: &Timeline) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&timeline.fingerprint())
    }

    /// Render `timeline` into one encoded video.
    pub fn render(&self, timeline: &Timeline) -> ReelResult<EncodedVideo> {
        self.render_with_observer(timeline, |_| {})
    }

    /// Like [`Self::render`], reporting every job state change to `observer`.
    #[tracing::instrument(skip(self, timeline, observer), fields(waypoints = timeline.len()))]
    pub fn render_with_observer<F>(
        &self,
        timeline: &Timeline,
        mut observer: F,
    ) -> ReelResult<EncodedVideo>
    where
        F: FnMut(&RenderJob),
    {
        if timeline.is_empty() {
            return Err(ReelError::EmptyTimeline);
        }
        let _claim = InFlightGuard::claim(&self.in_flight, timeline.fingerprint())?;
        let snapshot = timeline.clone();

        let mut job = RenderJob::new(snapshot.len());
        observer(&job);

        let mut encoder = create_encoder(&self.opts.encoder);
        match self.run(&snapshot, &mut job, encoder.as_mut(), &mut observer) {
            Ok(video) => {
                job.succeed(video.bytes.len());
                observer(&job);
                tracing::info!(
                    frames = video.frame_count,
                    bytes = video.bytes.len(),
                    mime = video.mime,
                    "render succeeded"
                );
                Ok(video)
            }
            Err(err) => {
                encoder.abort();
                job.fail(&err);
                observer(&job);
                tracing::warn!(error = %err, "render failed");
                Err(err)
            }
        }
    }

    fn run(
        &self,
        timeline: &Timeline,
        job: &mut RenderJob,
        encoder: &mut dyn VideoEncoder,
        observer: &mut dyn FnMut(&RenderJob),
    ) -> ReelResult<EncodedVideo> {
        encoder.begin(self.opts.encoder_config())?;
        job.run();
        observer(job);

        let origin = self.clock.now();
        let mut next = 0u64;
        for (index, waypoint) in timeline.waypoints().iter().enumerate() {
            job.enter_waypoint(index);
            observer(job);

            let request = ImageRequest::for_waypoint(waypoint, self.opts.canvas);
            let image = self.resolver.fetch(&request, waypoint);
            let frames = self.synth.synthesize(index, waypoint, image)?;
            tracing::debug!(
                index,
                id = %waypoint.id,
                frames = frames.len(),
                "synthesizing waypoint"
            );

            for f in frames {
                if self.opts.pacing == FramePacing::Realtime {
                    let due = Duration::from_secs_f64(self.opts.fps.frames_to_secs(next));
                    self.clock.sleep_until(origin + due);
                }
                encoder.push_frame(FrameIndex(next), &f.frame)?;
                next += 1;
                job.record_frame(f.index.0, encoder.buffered_bytes());
            }

            job.complete_waypoint(index, encoder.buffered_bytes());
            observer(job);
        }

        encoder.finish()
    }
}

impl std::fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("opts", &self.opts)
            .finish_non_exhaustive()
    }
}

/// Holds a fingerprint in the in-flight set until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<u64>>,
    key: u64,
}

impl<'a> InFlightGuard<'a> {
    fn claim(set: &'a Mutex<HashSet<u64>>, key: u64) -> ReelResult<Self> {
        let mut in_flight = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(key) {
            return Err(ReelError::RenderInProgress);
        }
        Ok(Self { set, key })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
