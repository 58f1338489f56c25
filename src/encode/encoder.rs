use std::collections::BTreeMap;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use crate::animation::property::AnimatedProperty;
use crate::encode::settings::{EncoderPreset, RenderSettings};
use crate::foundation::core::{Fps, FrameIndex, Rect};
use crate::foundation::error::DeckreelResult;
use crate::timeline::effect::OverlayTransform;
use crate::timeline::model::{ElementStyle, UnitElement};

/// Rasterize one static content unit.
#[derive(Clone, Debug)]
pub struct RasterizeRequest {
    /// Unit id.
    pub unit_id: String,
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Background colour (`#rrggbb`) or image path.
    pub background: Option<String>,
    /// Shapes painted over the background.
    pub elements: Vec<UnitElement>,
    /// PNG to write.
    pub output: PathBuf,
}

/// What an overlay draws.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayContent {
    /// Text with styling.
    Text {
        /// Text body.
        text: String,
        /// Styling.
        style: ElementStyle,
    },
    /// Image file.
    Image {
        /// Image path.
        source: PathBuf,
    },
}

/// Overlay active on one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameOverlay {
    /// Timeline track the overlay comes from.
    pub track_id: String,
    /// Content.
    pub content: OverlayContent,
    /// Placement clipped to the canvas; `None` means encoder default placement.
    pub rect: Option<Rect>,
    /// Opacity in `[0, 1]` after fades.
    pub opacity: f64,
    /// Zoom/pan/rotate state.
    pub transform: OverlayTransform,
}

/// Produce one annotated frame from a unit raster.
#[derive(Clone, Debug)]
pub struct FrameRequest {
    /// Absolute output frame index.
    pub index: FrameIndex,
    /// Absolute timeline time in seconds.
    pub time: f64,
    /// Canvas width.
    pub width: u32,
    /// Canvas height.
    pub height: u32,
    /// Unit raster the frame starts from.
    pub base: PathBuf,
    /// Animated property values of the unit at `time`, already clamped to their ranges.
    pub properties: BTreeMap<AnimatedProperty, f64>,
    /// Text and image overlays in paint order.
    pub overlays: Vec<FrameOverlay>,
    /// PNG to write.
    pub output: PathBuf,
}

/// A clip placed on the audio timeline.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSegment {
    /// Audio file.
    pub source: PathBuf,
    /// Timeline start in seconds.
    pub start: f64,
    /// Maximum length in seconds; `None` plays to the end of the timeline.
    pub duration: Option<f64>,
}

/// Render the base audio stem covering `[0, duration]`.
#[derive(Clone, Debug)]
pub struct AudioRequest {
    /// Stem length in seconds.
    pub duration: f64,
    /// Narration clips. Empty together with `music` means silence.
    pub segments: Vec<AudioSegment>,
    /// Music bed looped under the whole stem.
    pub music: Option<PathBuf>,
    /// File to write (uncompressed; the final codec is applied by `combine`).
    pub output: PathBuf,
}

/// Encode the final artifact from a gap-free frame sequence.
#[derive(Clone, Debug)]
pub struct CombineRequest {
    /// One PNG per output frame, in order.
    pub frames: Vec<PathBuf>,
    /// Frame rate.
    pub fps: Fps,
    /// Audio stem, if any.
    pub audio: Option<PathBuf>,
    /// Job settings.
    pub settings: RenderSettings,
    /// Rate control derived from the settings.
    pub preset: EncoderPreset,
    /// Artifact to write.
    pub output: PathBuf,
}

/// External media encoder.
///
/// Every call returns the path it wrote. Implementations must stop work and return
/// [`DeckreelError::Cancelled`](crate::DeckreelError::Cancelled) promptly once `cancel` fires;
/// for process-backed encoders that means killing the child.
#[async_trait::async_trait]
pub trait Encoder: Send + Sync {
    /// Rasterize one static content unit.
    async fn rasterize_unit(
        &self,
        req: &RasterizeRequest,
        cancel: &CancellationToken,
    ) -> DeckreelResult<PathBuf>;

    /// Generate one frame: unit raster plus overlays and property adjustments.
    async fn render_frame(
        &self,
        req: &FrameRequest,
        cancel: &CancellationToken,
    ) -> DeckreelResult<PathBuf>;

    /// Render the base audio stem.
    async fn render_audio(
        &self,
        req: &AudioRequest,
        cancel: &CancellationToken,
    ) -> DeckreelResult<PathBuf>;

    /// Encode the final artifact.
    async fn combine(
        &self,
        req: &CombineRequest,
        cancel: &CancellationToken,
    ) -> DeckreelResult<PathBuf>;
}
