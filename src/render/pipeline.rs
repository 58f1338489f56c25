//! Stage bodies of a render job.
//!
//! Stages run strictly in order inside one job task. Each reports its checkpoint through the
//! [`JobReporter`]; per-unit and per-frame failures are recovered locally and surface as
//! aggregated warnings, anything else aborts the job.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::animation::property::AnimatedProperty;
use crate::animation::store::TrackStore;
use crate::encode::encoder::{
    AudioRequest, AudioSegment, CombineRequest, Encoder, FrameOverlay, FrameRequest,
    OverlayContent, RasterizeRequest,
};
use crate::encode::fallback::{parse_hex_rgba, write_solid_png};
use crate::encode::settings::RenderSettings;
use crate::foundation::core::{FrameIndex, JobId, Vec2, now_millis};
use crate::foundation::error::{DeckreelError, DeckreelResult};
use crate::render::config::ManagerConfig;
use crate::render::job::{LogLevel, RenderJob, Stage};
use crate::render::workspace::JobWorkspace;
use crate::timeline::model::{RenderTimeline, TimelineTrack, TrackContent, TrackKind};

/// Write side of one job's snapshot channel.
///
/// All updates go through [`RenderJob`]'s transition methods, so terminal jobs ignore late
/// reports and progress never moves backwards.
#[derive(Debug)]
pub(crate) struct JobReporter {
    job_id: JobId,
    tx: watch::Sender<RenderJob>,
}

impl JobReporter {
    pub(crate) fn new(tx: watch::Sender<RenderJob>) -> Self {
        let job_id = tx.borrow().id;
        Self { job_id, tx }
    }

    pub(crate) fn sender(&self) -> &watch::Sender<RenderJob> {
        &self.tx
    }

    pub(crate) fn snapshot(&self) -> RenderJob {
        self.tx.borrow().clone()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut RenderJob) -> bool) -> bool {
        self.tx.send_if_modified(f)
    }

    fn enter(&self, stage: Stage) {
        tracing::debug!(job_id = %self.job_id, %stage, "stage started");
        self.update(|job| job.enter_stage(stage, now_millis()));
    }

    fn checkpoint(&self, stage: Stage) {
        tracing::debug!(job_id = %self.job_id, %stage, progress = stage.checkpoint(), "stage done");
        self.advance(stage.checkpoint());
    }

    fn advance(&self, progress: u8) {
        self.update(|job| job.advance(progress));
    }

    fn log(&self, level: LogLevel, message: String) {
        self.update(|job| {
            if job.is_terminal() {
                return false;
            }
            job.push_log(now_millis(), level, message);
            true
        });
    }

    fn warn(&self, message: String) {
        tracing::warn!(job_id = %self.job_id, "{message}");
        self.update(|job| {
            if job.is_terminal() {
                return false;
            }
            job.warn(message, now_millis());
            true
        });
    }
}

/// Everything a job's stages read.
pub(crate) struct StageContext<'a> {
    pub(crate) encoder: &'a dyn Encoder,
    pub(crate) cancel: &'a CancellationToken,
    pub(crate) reporter: &'a JobReporter,
    pub(crate) workspace: &'a JobWorkspace,
    pub(crate) timeline: &'a RenderTimeline,
    pub(crate) settings: &'a RenderSettings,
    pub(crate) animations: &'a TrackStore,
    pub(crate) config: &'a ManagerConfig,
    pub(crate) output: PathBuf,
}

/// Run every stage; returns the validated artifact path.
pub(crate) async fn run_stages(ctx: &StageContext<'_>) -> DeckreelResult<PathBuf> {
    ctx.reporter.enter(Stage::AssetPreparation);
    let rasters = prepare_assets(ctx)
        .await
        .map_err(|e| fatal(Stage::AssetPreparation, e))?;
    ctx.reporter.checkpoint(Stage::AssetPreparation);

    ctx.reporter.enter(Stage::FrameGeneration);
    let frames = generate_frames(ctx, &rasters)
        .await
        .map_err(|e| fatal(Stage::FrameGeneration, e))?;
    ctx.reporter.checkpoint(Stage::FrameGeneration);

    let audio = if ctx.settings.enable_audio {
        ctx.reporter.enter(Stage::AudioRender);
        let stem = render_audio(ctx)
            .await
            .map_err(|e| fatal(Stage::AudioRender, e))?;
        Some(stem)
    } else {
        ctx.reporter
            .log(LogLevel::Debug, "audio disabled; skipping audio render".to_owned());
        None
    };
    ctx.reporter.checkpoint(Stage::AudioRender);

    ctx.reporter.enter(Stage::Combine);
    let output = combine(ctx, frames, audio)
        .await
        .map_err(|e| fatal(Stage::Combine, e))?;
    ctx.reporter.checkpoint(Stage::Combine);

    ctx.reporter.enter(Stage::Postprocess);
    let bytes = postprocess(ctx, &output).await?;
    ctx.reporter.log(
        LogLevel::Info,
        format!("artifact '{}' is {bytes} bytes", output.display()),
    );
    Ok(output)
}

/// Keep cancellation and already-classified errors; wrap everything else as fatal for `stage`.
fn fatal(stage: Stage, e: DeckreelError) -> DeckreelError {
    match e {
        DeckreelError::Cancelled
        | DeckreelError::CorruptOutput { .. }
        | DeckreelError::StageFatalFailure { .. } => e,
        other => DeckreelError::stage_fatal(stage.label(), other.to_string()),
    }
}

fn check_cancel(cancel: &CancellationToken) -> DeckreelResult<()> {
    if cancel.is_cancelled() {
        return Err(DeckreelError::Cancelled);
    }
    Ok(())
}

/// One raster per video track, keyed by track id. Failed units get a solid fallback.
#[tracing::instrument(level = "debug", skip(ctx))]
async fn prepare_assets(ctx: &StageContext<'_>) -> DeckreelResult<HashMap<String, PathBuf>> {
    let (w, h) = (ctx.settings.width, ctx.settings.height);
    let videos: Vec<&TimelineTrack> = ctx.timeline.tracks_of(TrackKind::Video).collect();
    let mut rasters = HashMap::with_capacity(videos.len());
    let mut fallbacks = 0usize;

    for (idx, track) in videos.iter().enumerate() {
        check_cancel(ctx.cancel)?;
        let unit_id = track.unit_id();
        let path = ctx.workspace.raster_path(idx, unit_id);

        let (background, result) = match &track.content {
            TrackContent::Unit {
                background,
                elements,
                ..
            } => {
                let req = RasterizeRequest {
                    unit_id: unit_id.to_owned(),
                    width: w,
                    height: h,
                    background: background.clone(),
                    elements: elements.clone(),
                    output: path.clone(),
                };
                (
                    background.as_deref(),
                    ctx.encoder.rasterize_unit(&req, ctx.cancel).await,
                )
            }
            _ => (
                None,
                Err(DeckreelError::validation(format!(
                    "video track '{}' does not reference a content unit",
                    track.id
                ))),
            ),
        };

        let raster = match result {
            Ok(p) => p,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                let partial = DeckreelError::stage_partial(
                    Stage::AssetPreparation.label(),
                    format!("unit '{unit_id}': {e}"),
                );
                tracing::warn!(unit_id, error = %partial, "using fallback raster");
                ctx.reporter.log(LogLevel::Warn, partial.to_string());
                fallbacks += 1;
                let rgba = background
                    .and_then(parse_hex_rgba)
                    .unwrap_or(ctx.config.fallback_rgba);
                write_solid_png(path, w, h, rgba).await?
            }
        };
        rasters.insert(track.id.clone(), raster);

        let done = (idx + 1) as u64;
        let p = u64::from(Stage::AssetPreparation.checkpoint()) * done / videos.len() as u64;
        ctx.reporter.advance(p as u8);
    }

    if fallbacks > 0 {
        ctx.reporter
            .warn(format!("{fallbacks} units used fallback rasters"));
    }
    Ok(rasters)
}

/// Emit every frame in time order and return a gap-free list for combine.
///
/// A failed frame repeats the previous frame of the job, even across a unit boundary. Only a
/// failure on the job's very first frame falls back to that unit's raster.
#[tracing::instrument(level = "debug", skip(ctx, rasters))]
async fn generate_frames(
    ctx: &StageContext<'_>,
    rasters: &HashMap<String, PathBuf>,
) -> DeckreelResult<Vec<PathBuf>> {
    let fps = ctx.settings.fps;
    let videos: Vec<&TimelineTrack> = ctx.timeline.tracks_of(TrackKind::Video).collect();
    let total: u64 = videos.iter().map(|t| fps.frames_for(t.duration)).sum();
    if total == 0 {
        return Err(DeckreelError::validation("timeline produced no frames"));
    }

    let from = u64::from(Stage::AssetPreparation.checkpoint());
    let span = u64::from(Stage::FrameGeneration.checkpoint()) - from;
    let mut frames: Vec<PathBuf> = Vec::with_capacity(total as usize);
    let mut fallbacks = 0u64;
    let mut index = 0u64;

    for track in videos {
        let base = rasters.get(&track.id).ok_or_else(|| {
            DeckreelError::not_found(format!("raster for video track '{}'", track.id))
        })?;
        let unit_id = track.unit_id();

        for f in 0..fps.frames_for(track.duration) {
            check_cancel(ctx.cancel)?;
            let t = fps.time_of(track.start_time, f);
            let req = FrameRequest {
                index: FrameIndex(index),
                time: t,
                width: ctx.settings.width,
                height: ctx.settings.height,
                base: base.clone(),
                properties: unit_properties(ctx, unit_id, t),
                overlays: overlays_at(ctx, t),
                output: ctx.workspace.frame_path(FrameIndex(index)),
            };

            match ctx.encoder.render_frame(&req, ctx.cancel).await {
                Ok(p) => frames.push(p),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    tracing::warn!(frame = index, unit_id, error = %e, "frame failed; holding previous");
                    ctx.reporter
                        .log(LogLevel::Warn, format!("frame {index} failed: {e}"));
                    fallbacks += 1;
                    let held = frames.last().unwrap_or(base).clone();
                    frames.push(held);
                }
            }

            index += 1;
            ctx.reporter.advance((from + span * index / total) as u8);
        }
    }

    if fallbacks > 0 {
        ctx.reporter
            .warn(format!("{fallbacks} frames used fallback rendering"));
    }
    Ok(frames)
}

/// Animated unit properties at `t`, clamped to the catalog ranges.
fn unit_properties(ctx: &StageContext<'_>, unit_id: &str, t: f64) -> BTreeMap<AnimatedProperty, f64> {
    match ctx.animations.values_at(unit_id, t) {
        Ok(values) => values
            .into_iter()
            .map(|(p, v)| {
                let v = p.clamp_value(v);
                (p, v)
            })
            .collect(),
        Err(e) => {
            tracing::warn!(unit_id, t, error = %e, "animation lookup failed; using defaults");
            BTreeMap::new()
        }
    }
}

/// Text and image overlays at `t` with fades, effects and element animations folded in.
fn overlays_at(ctx: &StageContext<'_>, t: f64) -> Vec<FrameOverlay> {
    let (w, h) = (ctx.settings.width, ctx.settings.height);
    let mut out = Vec::new();
    for tr in ctx.timeline.active_overlays(t) {
        let (content, element_id) = match &tr.content {
            TrackContent::Text {
                text,
                style,
                element_id,
                ..
            } => (
                OverlayContent::Text {
                    text: text.clone(),
                    style: style.clone(),
                },
                element_id,
            ),
            TrackContent::Image {
                source, element_id, ..
            } => (
                OverlayContent::Image {
                    source: source.clone(),
                },
                element_id,
            ),
            TrackContent::Unit { .. } | TrackContent::Audio { .. } => continue,
        };

        let mut opacity = tr.opacity_at(t);
        let mut transform = tr.transform_at(t);
        if let Ok(values) = ctx.animations.values_at(element_id, t) {
            for (prop, v) in values {
                let v = prop.clamp_value(v);
                match prop {
                    AnimatedProperty::Opacity => opacity *= v / 100.0,
                    AnimatedProperty::Scale => transform.scale *= v,
                    AnimatedProperty::Rotation => transform.rotation_deg += v,
                    AnimatedProperty::PositionX => transform.offset += Vec2::new(v, 0.0),
                    AnimatedProperty::PositionY => transform.offset += Vec2::new(0.0, v),
                    AnimatedProperty::Volume | AnimatedProperty::Custom(_) => {}
                }
            }
        }
        if opacity <= 0.0 {
            continue;
        }

        out.push(FrameOverlay {
            track_id: tr.id.clone(),
            content,
            rect: tr.position.and_then(|p| p.clip_to_canvas(w, h)),
            opacity: opacity.clamp(0.0, 1.0),
            transform,
        });
    }
    out
}

/// Base audio stem over `[0, totalDuration]`; missing inputs are dropped with a warning.
#[tracing::instrument(level = "debug", skip(ctx))]
async fn render_audio(ctx: &StageContext<'_>) -> DeckreelResult<PathBuf> {
    let mut segments = Vec::new();
    if let Some(voice) = &ctx.settings.voice_over {
        segments.push(AudioSegment {
            source: voice.clone(),
            start: 0.0,
            duration: None,
        });
    }
    for tr in ctx.timeline.tracks_of(TrackKind::Audio) {
        if let TrackContent::Audio { source, .. } = &tr.content {
            segments.push(AudioSegment {
                source: source.clone(),
                start: tr.start_time,
                duration: Some(tr.duration),
            });
        }
    }

    let mut usable = Vec::with_capacity(segments.len());
    for seg in segments {
        if is_file(&seg.source).await {
            usable.push(seg);
        } else {
            ctx.reporter.warn(format!(
                "audio input '{}' not found; using silence",
                seg.source.display()
            ));
        }
    }
    let music = match &ctx.settings.background_music {
        Some(m) if is_file(m).await => Some(m.clone()),
        Some(m) => {
            ctx.reporter.warn(format!(
                "background music '{}' not found; using silence",
                m.display()
            ));
            None
        }
        None => None,
    };

    check_cancel(ctx.cancel)?;
    let req = AudioRequest {
        duration: ctx.timeline.total_duration,
        segments: usable,
        music,
        output: ctx.workspace.audio_path(),
    };
    ctx.encoder.render_audio(&req, ctx.cancel).await
}

async fn is_file(path: &std::path::Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[tracing::instrument(level = "debug", skip(ctx, frames, audio), fields(frames = frames.len()))]
async fn combine(
    ctx: &StageContext<'_>,
    frames: Vec<PathBuf>,
    audio: Option<PathBuf>,
) -> DeckreelResult<PathBuf> {
    check_cancel(ctx.cancel)?;
    let req = CombineRequest {
        frames,
        fps: ctx.settings.fps,
        audio,
        settings: ctx.settings.clone(),
        preset: ctx.settings.preset(),
        output: ctx.output.clone(),
    };
    ctx.encoder.combine(&req, ctx.cancel).await
}

/// The artifact must exist and reach the configured minimum size.
async fn postprocess(ctx: &StageContext<'_>, output: &std::path::Path) -> DeckreelResult<u64> {
    check_cancel(ctx.cancel)?;
    let min_bytes = ctx.config.min_output_bytes;
    let bytes = match tokio::fs::metadata(output).await {
        Ok(m) if m.is_file() => m.len(),
        _ => {
            return Err(DeckreelError::CorruptOutput {
                path: output.display().to_string(),
                bytes: 0,
                min_bytes,
            });
        }
    };
    if bytes < min_bytes {
        return Err(DeckreelError::CorruptOutput {
            path: output.display().to_string(),
            bytes,
            min_bytes,
        });
    }
    Ok(bytes)
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
