use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "panoreel", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a timeline into a video file.
    Render(RenderArgs),
    /// Play a timeline back in real time, printing playback events.
    Preview(PreviewArgs),
    /// Render a single waypoint frame as a PNG.
    Frame(FrameArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Directory holding `<waypoint id>.{png,jpg,jpeg,webp}` images.
    #[arg(long, conflicts_with = "streetview")]
    images: Option<PathBuf>,

    /// Fetch images from the Street View Static API (key from GOOGLE_MAPS_API_KEY).
    #[arg(long)]
    streetview: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input timeline JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[command(flatten)]
    source: SourceArgs,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = FormatChoice::Webm)]
    format: FormatChoice,

    /// Frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Square frame size in pixels.
    #[arg(long, default_value_t = 640)]
    size: u32,

    /// Emit frames at their wall-clock cadence.
    #[arg(long)]
    realtime: bool,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    /// Input timeline JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[command(flatten)]
    source: SourceArgs,

    /// Progress sampling rate in Hz.
    #[arg(long, default_value_t = 60.0)]
    sample_hz: f64,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input timeline JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    #[command(flatten)]
    source: SourceArgs,

    /// Waypoint id.
    #[arg(long)]
    waypoint: String,

    /// Transition progress in [0, 1].
    #[arg(long, default_value_t = 0.0)]
    progress: f64,

    /// Square frame size in pixels.
    #[arg(long, default_value_t = 640)]
    size: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    /// WebM/VP9 through ffmpeg.
    Webm,
    /// Fragmented MP4/H.264 through ffmpeg.
    Mp4,
    /// Uncompressed YUV4MPEG2, no ffmpeg needed.
    Y4m,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Preview(args) => cmd_preview(args),
        Command::Frame(args) => cmd_frame(args),
    }
}

fn read_timeline(path: &Path) -> anyhow::Result<panoreel::Timeline> {
    panoreel::Timeline::from_path(path)
        .with_context(|| format!("load timeline '{}'", path.display()))
}

fn make_resolver(source: &SourceArgs) -> anyhow::Result<Arc<dyn panoreel::ImageResolver>> {
    if let Some(dir) = &source.images {
        return Ok(Arc::new(panoreel::DirImageResolver::new(dir)));
    }
    if source.streetview {
        return Ok(Arc::new(panoreel::StreetViewResolver::from_env()?));
    }
    anyhow::bail!("an image source is required: pass --images <dir> or --streetview")
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let timeline = read_timeline(&args.in_path)?;
    let resolver = make_resolver(&args.source)?;

    let encoder = match args.format {
        FormatChoice::Webm => panoreel::EncoderKind::Ffmpeg(panoreel::FfmpegEncoderOpts::new(
            panoreel::Container::WebM,
        )),
        FormatChoice::Mp4 => panoreel::EncoderKind::Ffmpeg(panoreel::FfmpegEncoderOpts::new(
            panoreel::Container::Mp4,
        )),
        FormatChoice::Y4m => panoreel::EncoderKind::Y4m,
    };
    let opts = panoreel::RenderOpts {
        canvas: panoreel::Canvas::new(args.size, args.size)?,
        fps: panoreel::Fps::new(args.fps, 1)?,
        pacing: if args.realtime {
            panoreel::FramePacing::Realtime
        } else {
            panoreel::FramePacing::Unpaced
        },
        encoder,
        ..panoreel::RenderOpts::default()
    };
    let pipeline = panoreel::RenderPipeline::new(resolver, opts)?;

    let mut last_progress = -1.0;
    let video = pipeline.render_with_observer(&timeline, |job| {
        if job.status == panoreel::RenderStatus::Running && job.overall_progress > last_progress {
            last_progress = job.overall_progress;
            eprintln!(
                "  {:>3.0}%  waypoint {}/{}",
                job.overall_progress * 100.0,
                job.current_waypoint_index.map_or(0, |i| i + 1),
                job.total_waypoints
            );
        }
    })?;

    ensure_parent_dir(&args.out)?;
    std::fs::write(&args.out, &video.bytes)
        .with_context(|| format!("write video '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({}, {} frames, {:.2}s)",
        args.out.display(),
        video.mime,
        video.frame_count,
        video.duration_secs()
    );
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let timeline = read_timeline(&args.in_path)?;
    let mut engine = panoreel::PlaybackEngine::new(
        Arc::new(panoreel::SystemClock::new()),
        panoreel::PlaybackOpts {
            sample_hz: args.sample_hz,
        },
    )?;
    if args.source.images.is_some() || args.source.streetview {
        let synth = panoreel::FrameSynthesizer::new(panoreel::SynthOpts::default())?;
        engine = engine.with_preview(make_resolver(&args.source)?, synth);
    }

    let names: Vec<String> = timeline
        .waypoints()
        .iter()
        .map(|w| w.name.clone().unwrap_or_else(|| w.id.to_string()))
        .collect();
    engine.start(timeline)?;
    engine.play_through(|events| {
        for event in events {
            match event {
                panoreel::PlaybackEvent::Entered { index } => {
                    let name = names.get(*index).map_or("?", String::as_str);
                    eprintln!("[{}/{}] {name}", index + 1, names.len());
                }
                panoreel::PlaybackEvent::Finished => eprintln!("finished"),
                panoreel::PlaybackEvent::Stopped { reason } => eprintln!("stopped: {reason:?}"),
                _ => {}
            }
        }
    })?;
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    if !args.progress.is_finite() {
        anyhow::bail!("--progress must be a finite number in [0, 1]");
    }
    let timeline = read_timeline(&args.in_path)?;
    let id = panoreel::WaypointId::new(args.waypoint);
    let index = timeline
        .position(&id)
        .with_context(|| format!("waypoint '{id}' not found in timeline"))?;
    let waypoint = &timeline.waypoints()[index];

    let canvas = panoreel::Canvas::new(args.size, args.size)?;
    let resolver = make_resolver(&args.source)?;
    let request = panoreel::ImageRequest::for_waypoint(waypoint, canvas);
    let image = resolver
        .fetch(&request, waypoint)
        .map_err(|e| panoreel::ReelError::ImageUnavailable {
            index,
            waypoint: id.clone(),
            reason: e.reason,
        })?;

    let synth = panoreel::FrameSynthesizer::new(panoreel::SynthOpts {
        canvas,
        ..panoreel::SynthOpts::default()
    })?;
    let frame = synth.compose_at(&image, waypoint, args.progress.clamp(0.0, 1.0))?;

    ensure_parent_dir(&args.out)?;
    // Frames are opaque, so premultiplied and straight RGBA coincide.
    image::save_buffer_with_format(
        &args.out,
        &frame.data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
