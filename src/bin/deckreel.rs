use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use deckreel::foundation::io::{read_json, write_json};
use deckreel::{
    AnimationTrack, ContentUnit, FfmpegEncoder, FfmpegEncoderOpts, ManagerConfig, RenderJob,
    RenderJobManager, RenderSettings, RenderTimeline, TrackId, TrackStore,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "deckreel", version)]
struct Cli {
    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lay content units out on a render timeline.
    Compose(ComposeArgs),
    /// Print sampled points of one animation track.
    Sample(SampleArgs),
    /// Render a timeline to a video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// Content units JSON (array).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output timeline JSON.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct SampleArgs {
    /// Animation tracks JSON (array).
    #[arg(long)]
    tracks: PathBuf,

    /// Track id to sample.
    #[arg(long)]
    track: String,

    /// Start time in seconds.
    #[arg(long, default_value_t = 0.0)]
    from: f64,

    /// End time in seconds.
    #[arg(long)]
    to: f64,

    /// Number of intervals; `steps + 1` points are printed.
    #[arg(long, default_value_t = 100)]
    steps: usize,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Render timeline JSON.
    #[arg(long)]
    timeline: PathBuf,

    /// Render settings JSON.
    #[arg(long)]
    settings: PathBuf,

    /// Animation tracks JSON (array).
    #[arg(long)]
    tracks: Option<PathBuf>,

    /// Manager config JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Encoder options JSON.
    #[arg(long)]
    encoder: Option<PathBuf>,
}

#[derive(serde::Serialize)]
struct SamplePoint {
    time: f64,
    value: f64,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Compose(args) => cmd_compose(args),
        Command::Sample(args) => cmd_sample(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "deckreel=debug" } else { "deckreel=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_compose(args: ComposeArgs) -> anyhow::Result<()> {
    let units: Vec<ContentUnit> = read_json(&args.in_path, "content units")?;
    let timeline = deckreel::compose(&units)?;
    write_json(&args.out, &timeline)?;
    eprintln!(
        "wrote {} ({} tracks, {:.3}s)",
        args.out.display(),
        timeline.tracks.len(),
        timeline.total_duration
    );
    Ok(())
}

fn cmd_sample(args: SampleArgs) -> anyhow::Result<()> {
    let store = load_tracks(&args.tracks)?;
    let points: Vec<SamplePoint> = store
        .sample_track(&TrackId(args.track), args.from, args.to, args.steps)?
        .into_iter()
        .map(|(time, value)| SamplePoint { time, value })
        .collect();
    println!("{}", serde_json::to_string_pretty(&points)?);
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let timeline: RenderTimeline = read_json(&args.timeline, "render timeline")?;
    let settings: RenderSettings = read_json(&args.settings, "render settings")?;
    let animations = match &args.tracks {
        Some(p) => load_tracks(p)?,
        None => TrackStore::new(),
    };
    let config = match &args.config {
        Some(p) => ManagerConfig::from_json_file(p)?,
        None => ManagerConfig::default(),
    };
    let opts: FfmpegEncoderOpts = match &args.encoder {
        Some(p) => read_json(p, "encoder options")?,
        None => FfmpegEncoderOpts::default(),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")?;
    let job = runtime.block_on(async move {
        let encoder = FfmpegEncoder::new(opts);
        if !encoder.is_available().await {
            anyhow::bail!(
                "'{}' is not runnable; install ffmpeg or pass --encoder",
                encoder.opts().program.display()
            );
        }
        let manager = RenderJobManager::new(Arc::new(encoder), config)?;
        let id = manager.submit_animated(timeline, settings, animations)?;
        let job = manager.wait_for(id).await?;
        anyhow::Ok(job)
    })?;

    println!("{}", serde_json::to_string_pretty(&job)?);
    report(&job)
}

fn report(job: &RenderJob) -> anyhow::Result<()> {
    for w in &job.warnings {
        eprintln!("warning: {w}");
    }
    match (&job.output_path, &job.error_message) {
        (Some(out), _) => {
            eprintln!("wrote {}", out.display());
            Ok(())
        }
        (None, Some(msg)) => anyhow::bail!("render failed: {msg}"),
        (None, None) => anyhow::bail!("render ended without output"),
    }
}

fn load_tracks(path: &Path) -> anyhow::Result<TrackStore> {
    let tracks: Vec<AnimationTrack> = read_json(path, "animation tracks")?;
    TrackStore::from_tracks(tracks)
        .with_context(|| format!("load animation tracks '{}'", path.display()))
}
