use std::path::PathBuf;

use crate::foundation::core::{Rect, Vec2};
use crate::foundation::error::{DeckreelError, DeckreelResult};
use crate::timeline::effect::{Effect, EffectInstance, EffectKind, OverlayTransform};

/// One slide-like unit of authored content, as supplied by content extraction.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUnit {
    /// Stable unit id.
    pub id: String,
    /// Display duration in seconds, `> 0`.
    pub duration: f64,
    /// Background colour (`#rrggbb`) or image path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    /// Narration file played while the unit is on screen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_over: Option<PathBuf>,
    /// Elements in paint order.
    #[serde(default)]
    pub elements: Vec<UnitElement>,
}

/// Element kind inside a content unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    /// Text block; becomes a faded `text` track.
    Text,
    /// Image; becomes an `image` track spanning the unit.
    Image,
    /// Vector shape; baked into the unit raster.
    Shape,
}

/// Text/shape styling passed through to the encoder.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ElementStyle {
    /// Font size in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Font family name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Foreground colour.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Fill colour for shapes and text boxes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

/// Element placement in canvas pixels.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Position {
    /// Placement as a rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.x + self.width, self.y + self.height)
    }

    /// Placement clipped to a `width x height` canvas; `None` when nothing is visible.
    pub fn clip_to_canvas(&self, width: u32, height: u32) -> Option<Rect> {
        let canvas = Rect::new(0.0, 0.0, f64::from(width), f64::from(height));
        let r = self.rect().abs().intersect(canvas);
        (r.area() > 0.0).then_some(r)
    }
}

/// One element of a content unit.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitElement {
    /// Element id; generated from the unit id and index when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Element kind.
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Text body, image path, or shape name.
    #[serde(default)]
    pub content: String,
    /// Styling.
    #[serde(default)]
    pub style: ElementStyle,
    /// Placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Authored effects.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<EffectInstance>,
}

/// Kind of a rendered timeline track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// A content unit's base picture.
    Video,
    /// Narration.
    Audio,
    /// Text overlay.
    Text,
    /// Image overlay.
    Image,
}

/// What a timeline track renders.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TrackContent {
    /// Whole content unit; rasterized once during asset preparation.
    Unit {
        /// Unit id, also the element id animation tracks bind to.
        unit_id: String,
        /// Background colour or image.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        background: Option<String>,
        /// Shape elements painted into the unit raster.
        #[serde(default)]
        elements: Vec<UnitElement>,
    },
    /// Text overlay.
    Text {
        /// Owning unit.
        unit_id: String,
        /// Source element.
        element_id: String,
        /// Text body.
        text: String,
        /// Styling.
        #[serde(default)]
        style: ElementStyle,
    },
    /// Image overlay.
    Image {
        /// Owning unit.
        unit_id: String,
        /// Source element.
        element_id: String,
        /// Image path.
        source: PathBuf,
    },
    /// Audio clip.
    Audio {
        /// Owning unit.
        unit_id: String,
        /// Audio path.
        source: PathBuf,
    },
}

/// Timed track of a [`RenderTimeline`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineTrack {
    /// Track id, unique within the timeline.
    pub id: String,
    /// Track kind.
    #[serde(rename = "type")]
    pub kind: TrackKind,
    /// Start in seconds, `>= 0`.
    pub start_time: f64,
    /// Duration in seconds, `> 0`.
    pub duration: f64,
    /// Rendered content.
    pub content: TrackContent,
    /// Effects in application order.
    #[serde(default)]
    pub effects: Vec<Effect>,
    /// Placement for overlays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl TimelineTrack {
    /// End of the track (exclusive).
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Return `true` when `start <= t < end`.
    pub fn is_active_at(&self, t: f64) -> bool {
        self.start_time <= t && t < self.end_time()
    }

    /// Opacity in `[0, 1]` after folding every fade effect at `t`.
    pub fn opacity_at(&self, t: f64) -> f64 {
        self.effects
            .iter()
            .fold(1.0, |acc, e| match e.kind {
                EffectKind::FadeIn => acc * e.progress_at(t),
                EffectKind::FadeOut => acc * (1.0 - e.progress_at(t)),
                _ => acc,
            })
            .clamp(0.0, 1.0)
    }

    /// Zoom/pan/rotate state at `t`; each effect ramps linearly across its window.
    pub fn transform_at(&self, t: f64) -> OverlayTransform {
        let mut out = OverlayTransform::default();
        for e in &self.effects {
            let p = e.progress_at(t);
            match e.kind {
                EffectKind::Zoom { factor } => out.scale *= 1.0 + (factor - 1.0) * p,
                EffectKind::Pan { dx, dy } => out.offset += Vec2::new(dx, dy) * p,
                EffectKind::Rotate { degrees } => out.rotation_deg += degrees * p,
                EffectKind::FadeIn | EffectKind::FadeOut => {}
            }
        }
        out
    }

    /// Id of the content unit this track belongs to.
    pub fn unit_id(&self) -> &str {
        match &self.content {
            TrackContent::Unit { unit_id, .. }
            | TrackContent::Text { unit_id, .. }
            | TrackContent::Image { unit_id, .. }
            | TrackContent::Audio { unit_id, .. } => unit_id,
        }
    }
}

/// Transition kinds between consecutive units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Cross-fade.
    Fade,
}

/// Transition centred on a unit boundary.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
    /// Transition kind.
    #[serde(rename = "type")]
    pub kind: TransitionKind,
    /// Boundary time in seconds.
    pub at: f64,
    /// Duration in seconds.
    pub duration: f64,
}

/// Flat, timed render input produced by [`compose`](crate::compose).
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTimeline {
    /// Sum of unit durations, in authoring order.
    pub total_duration: f64,
    /// All tracks.
    pub tracks: Vec<TimelineTrack>,
    /// Transitions between units.
    #[serde(default)]
    pub transitions: Vec<Transition>,
}

impl RenderTimeline {
    /// Tracks of one kind, in timeline order.
    pub fn tracks_of(&self, kind: TrackKind) -> impl Iterator<Item = &TimelineTrack> {
        self.tracks.iter().filter(move |t| t.kind == kind)
    }

    /// Text and image tracks active at `t`, in paint order.
    pub fn active_overlays(&self, t: f64) -> impl Iterator<Item = &TimelineTrack> {
        self.tracks.iter().filter(move |tr| {
            matches!(tr.kind, TrackKind::Text | TrackKind::Image) && tr.is_active_at(t)
        })
    }

    /// Check track bounds and ids.
    ///
    /// Timelines loaded from storage go through this before rendering.
    pub fn validate(&self) -> DeckreelResult<()> {
        if !self.total_duration.is_finite() || self.total_duration < 0.0 {
            return Err(DeckreelError::validation(
                "timeline totalDuration must be finite and >= 0",
            ));
        }
        let mut seen = std::collections::HashSet::new();
        for tr in &self.tracks {
            if !seen.insert(tr.id.as_str()) {
                return Err(DeckreelError::validation(format!(
                    "duplicate timeline track id '{}'",
                    tr.id
                )));
            }
            if !tr.start_time.is_finite() || tr.start_time < 0.0 {
                return Err(DeckreelError::validation(format!(
                    "track '{}' startTime must be finite and >= 0",
                    tr.id
                )));
            }
            if !tr.duration.is_finite() || tr.duration <= 0.0 {
                return Err(DeckreelError::validation(format!(
                    "track '{}' duration must be finite and > 0",
                    tr.id
                )));
            }
            if tr.end_time() > self.total_duration + 1e-9 {
                return Err(DeckreelError::validation(format!(
                    "track '{}' ends at {} past totalDuration {}",
                    tr.id,
                    tr.end_time(),
                    self.total_duration
                )));
            }
        }
        for tr in &self.transitions {
            if !(tr.at > 0.0 && tr.at < self.total_duration) || tr.duration < 0.0 {
                return Err(DeckreelError::validation(format!(
                    "transition at {} is outside the timeline",
                    tr.at
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/model.rs"]
mod tests;
