use std::path::PathBuf;

use crate::foundation::core::Fps;
use crate::foundation::error::{DeckreelError, DeckreelResult};
use crate::timeline::model::RenderTimeline;

/// Output container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// MPEG-4 (H.264 + AAC).
    #[default]
    Mp4,
    /// WebM (VP9 + Opus).
    Webm,
    /// QuickTime (H.264 + AAC).
    Mov,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mov => "mov",
        }
    }

    /// ffmpeg video codec name.
    pub fn video_codec(self) -> &'static str {
        match self {
            Self::Mp4 | Self::Mov => "libx264",
            Self::Webm => "libvpx-vp9",
        }
    }

    /// ffmpeg audio codec name.
    pub fn audio_codec(self) -> &'static str {
        match self {
            Self::Mp4 | Self::Mov => "aac",
            Self::Webm => "libopus",
        }
    }
}

/// Quality tier; maps to a fixed [`EncoderPreset`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Smallest files, most aggressive compression.
    Low,
    /// Balanced.
    #[default]
    Medium,
    /// High quality.
    High,
    /// Most conservative compression.
    Ultra,
}

/// Per-job output settings. Immutable once the job is submitted.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSettings {
    /// Output width in pixels (even).
    pub width: u32,
    /// Output height in pixels (even).
    pub height: u32,
    /// Frame rate.
    pub fps: Fps,
    /// Target video bitrate in kbps; derived from resolution and quality when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    /// Container.
    #[serde(default)]
    pub format: OutputFormat,
    /// Quality tier.
    #[serde(default)]
    pub quality: Quality,
    /// Audio bitrate in kbps.
    #[serde(default = "default_audio_kbps")]
    pub audio_quality_kbps: u32,
    /// Render and mux an audio track.
    #[serde(default = "default_true")]
    pub enable_audio: bool,
    /// Music bed mixed under the whole timeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_music: Option<PathBuf>,
    /// Narration played from t=0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_over: Option<PathBuf>,
}

fn default_audio_kbps() -> u32 {
    128
}

fn default_true() -> bool {
    true
}

impl RenderSettings {
    /// 1920x1080 @ 30 fps mp4, medium quality.
    pub fn full_hd() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: Fps::FPS_30,
            bitrate: None,
            format: OutputFormat::Mp4,
            quality: Quality::Medium,
            audio_quality_kbps: default_audio_kbps(),
            enable_audio: true,
            background_music: None,
            voice_over: None,
        }
    }

    /// Reject settings the encoder cannot honour.
    pub fn validate(&self) -> DeckreelResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(DeckreelError::validation("width/height must be non-zero"));
        }
        if !self.width.is_multiple_of(2) || !self.height.is_multiple_of(2) {
            return Err(DeckreelError::validation(
                "width/height must be even (required for yuv420p output)",
            ));
        }
        if self.bitrate == Some(0) {
            return Err(DeckreelError::validation("bitrate must be > 0 when set"));
        }
        if self.audio_quality_kbps == 0 {
            return Err(DeckreelError::validation("audioQualityKbps must be > 0"));
        }
        Ok(())
    }

    /// Bitrate in kbps actually used for encoding.
    pub fn effective_bitrate_kbps(&self) -> u32 {
        self.bitrate
            .unwrap_or_else(|| default_bitrate_kbps(self.height, self.quality))
    }

    /// Encoder preset for these settings.
    pub fn preset(&self) -> EncoderPreset {
        EncoderPreset::for_quality(self.quality, self.effective_bitrate_kbps())
    }
}

/// Default video bitrate in kbps for a frame height and quality tier.
pub fn default_bitrate_kbps(height: u32, quality: Quality) -> u32 {
    let table: [u32; 4] = if height <= 720 {
        [1000, 2500, 4000, 6000]
    } else if height <= 1080 {
        [2000, 5000, 8000, 12000]
    } else {
        [8000, 20000, 35000, 50000]
    };
    table[quality as usize]
}

/// Rate-control parameters handed to the encoder.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderPreset {
    /// Constant rate factor; lower is better quality.
    pub crf: u8,
    /// Speed/compression trade-off (`-preset`).
    pub speed: String,
    /// Peak bitrate in kbps.
    pub maxrate_kbps: u32,
    /// Rate-control buffer in kbits.
    pub bufsize_kbps: u32,
}

impl EncoderPreset {
    /// Pure mapping from `(quality, bitrate)` to encoder parameters.
    pub fn for_quality(quality: Quality, bitrate_kbps: u32) -> Self {
        let (crf, speed) = match quality {
            Quality::Ultra => (16, "slow"),
            Quality::High => (20, "medium"),
            Quality::Medium => (23, "medium"),
            Quality::Low => (28, "veryfast"),
        };
        Self {
            crf,
            speed: speed.to_owned(),
            maxrate_kbps: bitrate_kbps,
            bufsize_kbps: bitrate_kbps.saturating_mul(2),
        }
    }
}

/// Rough wall-clock estimate in seconds for rendering `timeline` with `settings`.
pub fn estimate_render_secs(timeline: &RenderTimeline, settings: &RenderSettings) -> u64 {
    let resolution = if settings.height <= 720 {
        1.0
    } else if settings.height <= 1080 {
        1.5
    } else {
        3.0
    };
    let quality = match settings.quality {
        Quality::Low => 0.5,
        Quality::Medium => 1.0,
        Quality::High => 1.5,
        Quality::Ultra => 2.0,
    };
    let transitions = if timeline.transitions.is_empty() {
        1.0
    } else {
        1.2
    };
    (timeline.total_duration * resolution * quality * transitions)
        .ceil()
        .max(0.0) as u64
}

#[cfg(test)]
#[path = "../../tests/unit/encode/settings.rs"]
mod tests;
