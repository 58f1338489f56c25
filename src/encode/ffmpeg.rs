use std::ffi::OsString;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Context as _;
use tokio::io::AsyncReadExt as _;
use tokio_util::sync::CancellationToken;

use crate::animation::property::AnimatedProperty;
use crate::encode::encoder::{
    AudioRequest, CombineRequest, Encoder, FrameOverlay, FrameRequest, OverlayContent,
    RasterizeRequest,
};
use crate::encode::fallback::{ensure_parent_dir, parse_hex_rgba};
use crate::encode::settings::OutputFormat;
use crate::foundation::error::{DeckreelError, DeckreelResult};
use crate::timeline::model::ElementKind;

/// Options for [`FfmpegEncoder`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FfmpegEncoderOpts {
    /// ffmpeg executable, resolved through `PATH` when relative.
    pub program: PathBuf,
    /// Overwrite existing outputs (`-y`) instead of failing (`-n`).
    pub overwrite: bool,
    /// Sample rate of the rendered audio stem.
    pub audio_sample_rate: u32,
    /// Channel count of the rendered audio stem.
    pub audio_channels: u16,
    /// Gain applied to background music when mixed under narration.
    pub music_volume: f64,
}

impl Default for FfmpegEncoderOpts {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            overwrite: true,
            audio_sample_rate: 48_000,
            audio_channels: 2,
            music_volume: 0.3,
        }
    }
}

/// [`Encoder`] that shells out to the system `ffmpeg`.
///
/// Every call builds an explicit argument vector and runs one child process. The child is killed
/// as soon as the job's cancellation token fires.
///
/// Text overlays are drawn with `drawtext`, which cannot rotate, so `rotate` effects only apply to
/// image overlays and the unit raster.
#[derive(Clone, Debug, Default)]
pub struct FfmpegEncoder {
    opts: FfmpegEncoderOpts,
}

impl FfmpegEncoder {
    /// Create an encoder with `opts`.
    pub fn new(opts: FfmpegEncoderOpts) -> Self {
        Self { opts }
    }

    /// Options in use.
    pub fn opts(&self) -> &FfmpegEncoderOpts {
        &self.opts
    }

    /// Return `true` when the configured program answers `-version`.
    pub async fn is_available(&self) -> bool {
        tokio::process::Command::new(&self.opts.program)
            .arg("-version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    #[tracing::instrument(level = "debug", skip(self, args, cancel))]
    async fn run(
        &self,
        what: &str,
        args: Vec<OsString>,
        cancel: &CancellationToken,
    ) -> DeckreelResult<()> {
        if cancel.is_cancelled() {
            return Err(DeckreelError::Cancelled);
        }

        let mut cmd = tokio::process::Command::new(&self.opts.program);
        cmd.arg(if self.opts.overwrite { "-y" } else { "-n" })
            .args(["-hide_banner", "-loglevel", "error"])
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            DeckreelError::encoder(format!(
                "failed to spawn '{}' for {what}: {e}",
                self.opts.program.display()
            ))
        })?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DeckreelError::encoder("failed to open ffmpeg stderr (unexpected)"))?;
        let drain = tokio::spawn(async move {
            let mut buf = Vec::new();
            stderr.read_to_end(&mut buf).await.map(|_| buf)
        });

        let status = tokio::select! {
            status = child.wait() => status.with_context(|| format!("wait for ffmpeg ({what})"))?,
            _ = cancel.cancelled() => {
                tracing::debug!(what, "killing ffmpeg on cancellation");
                // The child may already have exited; either way it is gone afterwards.
                let _ = child.start_kill();
                let _ = child.wait().await;
                drain.abort();
                return Err(DeckreelError::Cancelled);
            }
        };

        let stderr_bytes = match drain.await {
            Ok(Ok(buf)) => buf,
            _ => Vec::new(),
        };
        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(DeckreelError::encoder(format!(
                "ffmpeg ({what}) exited with status {status}: {}",
                stderr.trim()
            )));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Encoder for FfmpegEncoder {
    async fn rasterize_unit(
        &self,
        req: &RasterizeRequest,
        cancel: &CancellationToken,
    ) -> DeckreelResult<PathBuf> {
        ensure_parent_dir(&req.output)?;
        self.run("rasterize", rasterize_args(req), cancel).await?;
        Ok(req.output.clone())
    }

    async fn render_frame(
        &self,
        req: &FrameRequest,
        cancel: &CancellationToken,
    ) -> DeckreelResult<PathBuf> {
        ensure_parent_dir(&req.output)?;
        let mut text_files = Vec::new();
        for (i, ov) in req.overlays.iter().enumerate() {
            if let OverlayContent::Text { text, .. } = &ov.content {
                let path = req.output.with_extension(format!("t{i}.txt"));
                tokio::fs::write(&path, text)
                    .await
                    .with_context(|| format!("write overlay text '{}'", path.display()))?;
                text_files.push((i, path));
            }
        }
        let res = self.run("frame", frame_args(req, &text_files), cancel).await;
        for (_, path) in &text_files {
            let _ = tokio::fs::remove_file(path).await;
        }
        res?;
        Ok(req.output.clone())
    }

    async fn render_audio(
        &self,
        req: &AudioRequest,
        cancel: &CancellationToken,
    ) -> DeckreelResult<PathBuf> {
        ensure_parent_dir(&req.output)?;
        self.run("audio", audio_args(req, &self.opts), cancel).await?;
        Ok(req.output.clone())
    }

    async fn combine(
        &self,
        req: &CombineRequest,
        cancel: &CancellationToken,
    ) -> DeckreelResult<PathBuf> {
        let Some(first) = req.frames.first() else {
            return Err(DeckreelError::validation("combine needs at least one frame"));
        };
        ensure_parent_dir(&req.output)?;
        let list = first
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("frames.ffconcat");
        tokio::fs::write(&list, concat_list(&req.frames, req.fps.frame_secs()))
            .await
            .with_context(|| format!("write concat list '{}'", list.display()))?;
        self.run("combine", combine_args(req, &list), cancel).await?;
        Ok(req.output.clone())
    }
}

fn push(args: &mut Vec<OsString>, items: &[&str]) {
    args.extend(items.iter().map(OsString::from));
}

/// Escape a filter option value for both the option parser and the filtergraph parser.
fn escape_filter_value(s: &str) -> String {
    let escape = |s: &str, special: &[char]| {
        let mut out = String::with_capacity(s.len());
        for c in s.chars() {
            if special.contains(&c) {
                out.push('\\');
            }
            out.push(c);
        }
        out
    };
    let option = escape(s, &['\\', '\'', ':']);
    escape(&option, &['\\', '\'', ',', ';', '[', ']'])
}

/// ffmpeg colour literal with alpha, e.g. `0xff8000@0.500`.
fn ffmpeg_color(rgba: [u8; 4], opacity: f64) -> String {
    let a = (f64::from(rgba[3]) / 255.0) * opacity.clamp(0.0, 1.0);
    format!("0x{:02x}{:02x}{:02x}@{a:.3}", rgba[0], rgba[1], rgba[2])
}

fn rasterize_args(req: &RasterizeRequest) -> Vec<OsString> {
    let (w, h) = (req.width, req.height);
    let mut args = Vec::new();
    let mut chain = Vec::<String>::new();

    match req.background.as_deref() {
        Some(bg) if parse_hex_rgba(bg).is_none() => {
            args.push(OsString::from("-i"));
            args.push(OsString::from(bg));
            chain.push(format!(
                "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h}"
            ));
        }
        bg => {
            let rgba = bg.and_then(parse_hex_rgba).unwrap_or([255, 255, 255, 255]);
            push(&mut args, &["-f", "lavfi", "-i"]);
            args.push(OsString::from(format!(
                "color=c={}:s={w}x{h}:d=1",
                ffmpeg_color(rgba, 1.0)
            )));
        }
    }

    for el in req.elements.iter().filter(|e| e.kind == ElementKind::Shape) {
        let Some(pos) = el.position else { continue };
        let Some(r) = pos.clip_to_canvas(w, h) else {
            continue;
        };
        let rgba = el
            .style
            .background_color
            .as_deref()
            .or(el.style.color.as_deref())
            .and_then(parse_hex_rgba)
            .unwrap_or([255, 255, 255, 255]);
        chain.push(format!(
            "drawbox=x={:.0}:y={:.0}:w={:.0}:h={:.0}:color={}:t=fill",
            r.x0,
            r.y0,
            r.width(),
            r.height(),
            ffmpeg_color(rgba, 1.0)
        ));
    }

    if !chain.is_empty() {
        args.push(OsString::from("-vf"));
        args.push(OsString::from(chain.join(",")));
    }
    push(&mut args, &["-frames:v", "1"]);
    args.push(req.output.clone().into_os_string());
    args
}

fn frame_args(req: &FrameRequest, text_files: &[(usize, PathBuf)]) -> Vec<OsString> {
    let (w, h) = (req.width, req.height);
    let mut args = vec![OsString::from("-i"), req.base.clone().into_os_string()];
    let prop = |p: AnimatedProperty| req.properties.get(&p).copied();

    // Base raster: scale/rotate about the centre, then offset and fade toward black.
    let mut base = vec![format!("scale={w}:{h}")];
    if let Some(s) = prop(AnimatedProperty::Scale).filter(|s| (*s - 1.0).abs() > 1e-9) {
        base.push(format!("scale=iw*{s:.4}:ih*{s:.4}"));
        base.push(format!(
            "pad=w='max(iw,{w})':h='max(ih,{h})':x=(ow-iw)/2:y=(oh-ih)/2:color=black"
        ));
        base.push(format!("crop={w}:{h}"));
    }
    if let Some(deg) = prop(AnimatedProperty::Rotation).filter(|d| d.abs() > 1e-9) {
        base.push(format!("rotate={:.6}:c=black", deg.to_radians()));
    }
    let dx = prop(AnimatedProperty::PositionX).unwrap_or(0.0);
    let dy = prop(AnimatedProperty::PositionY).unwrap_or(0.0);
    if dx.abs() > 1e-9 || dy.abs() > 1e-9 {
        let px = dx.abs().ceil() as u32;
        let py = dy.abs().ceil() as u32;
        base.push(format!(
            "pad=w=iw+{}:h=ih+{}:x={px}:y={py}:color=black",
            2 * px,
            2 * py
        ));
        base.push(format!(
            "crop={w}:{h}:{:.0}:{:.0}",
            f64::from(px) - dx,
            f64::from(py) - dy
        ));
    }
    if let Some(op) = prop(AnimatedProperty::Opacity).filter(|o| *o < 100.0) {
        let k = (op / 100.0).clamp(0.0, 1.0);
        base.push(format!("colorchannelmixer=rr={k:.4}:gg={k:.4}:bb={k:.4}"));
    }

    let mut graph = String::new();
    let _ = write!(graph, "[0:v]{}[b0]", base.join(","));
    let mut cur = "b0".to_owned();
    let mut next_input = 1usize;

    for (i, ov) in req.overlays.iter().enumerate() {
        let next = format!("b{}", i + 1);
        let (x, y) = overlay_origin(ov);
        match &ov.content {
            OverlayContent::Text { style, .. } => {
                let Some((_, file)) = text_files.iter().find(|(idx, _)| *idx == i) else {
                    continue;
                };
                let size = style.font_size.unwrap_or(48.0) * ov.transform.scale;
                let rgba = style
                    .color
                    .as_deref()
                    .and_then(parse_hex_rgba)
                    .unwrap_or([255, 255, 255, 255]);
                let mut dt = format!(
                    "drawtext=textfile={}:x={x:.0}:y={y:.0}:fontsize={size:.0}:fontcolor={}",
                    escape_filter_value(&file.to_string_lossy()),
                    ffmpeg_color(rgba, ov.opacity)
                );
                if let Some(family) = &style.font_family {
                    let _ = write!(dt, ":font={}", escape_filter_value(family));
                }
                let _ = write!(graph, ";[{cur}]{dt}[{next}]");
            }
            OverlayContent::Image { source } => {
                args.push(OsString::from("-i"));
                args.push(source.clone().into_os_string());
                let mut chain = Vec::new();
                if let Some(r) = ov.rect {
                    chain.push(format!("scale={:.0}:{:.0}", r.width(), r.height()));
                }
                if (ov.transform.scale - 1.0).abs() > 1e-9 {
                    let s = ov.transform.scale;
                    chain.push(format!("scale=iw*{s:.4}:ih*{s:.4}"));
                }
                chain.push("format=rgba".to_owned());
                if ov.transform.rotation_deg.abs() > 1e-9 {
                    chain.push(format!(
                        "rotate={:.6}:c=none:ow=rotw({0:.6}):oh=roth({0:.6})",
                        ov.transform.rotation_deg.to_radians()
                    ));
                }
                if ov.opacity < 1.0 {
                    chain.push(format!("colorchannelmixer=aa={:.4}", ov.opacity.max(0.0)));
                }
                let _ = write!(
                    graph,
                    ";[{next_input}:v]{}[ov{i}];[{cur}][ov{i}]overlay=x={x:.0}:y={y:.0}[{next}]",
                    chain.join(",")
                );
                next_input += 1;
            }
        }
        cur = next;
    }

    args.push(OsString::from("-filter_complex"));
    args.push(OsString::from(graph));
    push(&mut args, &["-map"]);
    args.push(OsString::from(format!("[{cur}]")));
    push(&mut args, &["-frames:v", "1"]);
    args.push(req.output.clone().into_os_string());
    args
}

fn overlay_origin(ov: &FrameOverlay) -> (f64, f64) {
    let (x, y) = ov.rect.map(|r| (r.x0, r.y0)).unwrap_or((0.0, 0.0));
    (x + ov.transform.offset.x, y + ov.transform.offset.y)
}

fn audio_args(req: &AudioRequest, opts: &FfmpegEncoderOpts) -> Vec<OsString> {
    let rate = opts.audio_sample_rate;
    let layout = if opts.audio_channels == 1 {
        "mono"
    } else {
        "stereo"
    };
    let total = format!("{:.3}", req.duration.max(0.0));

    let mut args = Vec::new();
    push(&mut args, &["-f", "lavfi", "-t", &total, "-i"]);
    args.push(OsString::from(format!("anullsrc=r={rate}:cl={layout}")));

    let mut graph = String::new();
    let mut mix = vec!["[0:a]".to_owned()];
    for (i, seg) in req.segments.iter().enumerate() {
        args.push(OsString::from("-i"));
        args.push(seg.source.clone().into_os_string());
        let input = i + 1;
        let delay_ms = (seg.start.max(0.0) * 1000.0).round() as u64;
        let trim = match seg.duration {
            Some(d) => format!("atrim=duration={d:.3},"),
            None => String::new(),
        };
        let _ = write!(
            graph,
            "[{input}:a]{trim}aresample={rate},adelay={delay_ms}:all=1[s{i}];"
        );
        mix.push(format!("[s{i}]"));
    }
    if let Some(music) = &req.music {
        push(&mut args, &["-stream_loop", "-1", "-i"]);
        args.push(music.clone().into_os_string());
        let input = req.segments.len() + 1;
        let _ = write!(
            graph,
            "[{input}:a]aresample={rate},volume={:.3}[m];",
            opts.music_volume
        );
        mix.push("[m]".to_owned());
    }
    let _ = write!(
        graph,
        "{}amix=inputs={}:duration=first:normalize=0[out]",
        mix.join(""),
        mix.len()
    );

    push(&mut args, &["-filter_complex"]);
    args.push(OsString::from(graph));
    push(&mut args, &["-map", "[out]", "-t", &total, "-ar"]);
    args.push(OsString::from(rate.to_string()));
    push(&mut args, &["-c:a", "pcm_s16le"]);
    args.push(req.output.clone().into_os_string());
    args
}

/// Concat-demuxer script: one entry per frame lasting `frame_secs`.
///
/// The last file is listed twice because the demuxer ignores the final `duration`.
fn concat_list(frames: &[PathBuf], frame_secs: f64) -> String {
    let mut out = String::from("ffconcat version 1.0\n");
    for f in frames {
        let _ = writeln!(out, "file '{}'", concat_quote(f));
        let _ = writeln!(out, "duration {frame_secs:.6}");
    }
    if let Some(last) = frames.last() {
        let _ = writeln!(out, "file '{}'", concat_quote(last));
    }
    out
}

fn concat_quote(p: &Path) -> String {
    p.to_string_lossy().replace('\'', r"'\''")
}

fn combine_args(req: &CombineRequest, list: &Path) -> Vec<OsString> {
    let s = &req.settings;
    let p = &req.preset;
    let mut args = Vec::new();
    push(&mut args, &["-f", "concat", "-safe", "0", "-i"]);
    args.push(list.to_path_buf().into_os_string());
    if let Some(audio) = &req.audio {
        args.push(OsString::from("-i"));
        args.push(audio.clone().into_os_string());
    }

    let fps = req.fps.get().to_string();
    let size = format!("scale={}:{}", s.width, s.height);
    let crf = p.crf.to_string();
    let maxrate = format!("{}k", p.maxrate_kbps);
    let bufsize = format!("{}k", p.bufsize_kbps);
    push(
        &mut args,
        &[
            "-vf",
            &size,
            "-r",
            &fps,
            "-c:v",
            s.format.video_codec(),
            "-pix_fmt",
            "yuv420p",
            "-crf",
            &crf,
        ],
    );
    match s.format {
        OutputFormat::Mp4 | OutputFormat::Mov => push(
            &mut args,
            &[
                "-preset",
                &p.speed,
                "-maxrate",
                &maxrate,
                "-bufsize",
                &bufsize,
                "-movflags",
                "+faststart",
            ],
        ),
        OutputFormat::Webm => {
            let cpu_used = match p.speed.as_str() {
                "slow" => "1",
                "medium" => "2",
                _ => "5",
            };
            push(
                &mut args,
                &[
                    "-b:v",
                    &maxrate,
                    "-maxrate",
                    &maxrate,
                    "-bufsize",
                    &bufsize,
                    "-deadline",
                    "good",
                    "-cpu-used",
                    cpu_used,
                ],
            );
        }
    }

    if req.audio.is_some() {
        let abr = format!("{}k", s.audio_quality_kbps);
        push(
            &mut args,
            &[
                "-map",
                "0:v:0",
                "-map",
                "1:a:0",
                "-c:a",
                s.format.audio_codec(),
                "-b:a",
                &abr,
                "-shortest",
            ],
        );
    } else {
        push(&mut args, &["-an"]);
    }
    args.push(req.output.clone().into_os_string());
    args
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
