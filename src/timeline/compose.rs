use std::path::PathBuf;

use crate::foundation::error::{DeckreelError, DeckreelResult};
use crate::timeline::effect::{Effect, parse_effect};
use crate::timeline::model::{
    ContentUnit, ElementKind, RenderTimeline, TimelineTrack, TrackContent, TrackKind, Transition,
    TransitionKind,
};

/// Inset applied to both ends of a text track inside its unit.
pub const TEXT_INSET_SECS: f64 = 0.5;
/// Length of the automatic text fades.
pub const TEXT_FADE_SECS: f64 = 0.5;
/// Length of the fade transition between consecutive units.
pub const TRANSITION_SECS: f64 = 1.0;

/// Flatten ordered content units into a [`RenderTimeline`].
///
/// Each unit becomes a `video` track over `[cursor, cursor + duration)`. Text elements become
/// `text` tracks inset by half a second at both ends with automatic fades; units shorter than a
/// second get no text tracks. Image elements span the whole unit, shapes stay in the unit
/// raster, and a voice-over becomes an `audio` track. Unit boundaries get a one second fade.
#[tracing::instrument(skip(units), fields(units = units.len()))]
pub fn compose(units: &[ContentUnit]) -> DeckreelResult<RenderTimeline> {
    let mut tracks = Vec::new();
    let mut transitions = Vec::with_capacity(units.len().saturating_sub(1));
    let mut cursor = 0.0f64;

    for (unit_idx, unit) in units.iter().enumerate() {
        if !unit.duration.is_finite() || unit.duration <= 0.0 {
            return Err(DeckreelError::validation(format!(
                "unit '{}' duration must be finite and > 0, got {}",
                unit.id, unit.duration
            )));
        }
        if unit_idx > 0 {
            transitions.push(Transition {
                kind: TransitionKind::Fade,
                at: cursor,
                duration: TRANSITION_SECS,
            });
        }

        tracks.push(TimelineTrack {
            id: format!("{}:video", unit.id),
            kind: TrackKind::Video,
            start_time: cursor,
            duration: unit.duration,
            content: TrackContent::Unit {
                unit_id: unit.id.clone(),
                background: unit.background.clone(),
                elements: unit
                    .elements
                    .iter()
                    .filter(|e| e.kind == ElementKind::Shape)
                    .cloned()
                    .collect(),
            },
            effects: Vec::new(),
            position: None,
        });

        for (el_idx, el) in unit.elements.iter().enumerate() {
            let element_id = el
                .id
                .clone()
                .unwrap_or_else(|| format!("{}-el{el_idx}", unit.id));
            match el.kind {
                ElementKind::Text => {
                    let duration = (unit.duration - 2.0 * TEXT_INSET_SECS).max(0.0);
                    if duration <= 0.0 {
                        tracing::debug!(
                            unit_id = %unit.id,
                            %element_id,
                            "unit too short for text track"
                        );
                        continue;
                    }
                    let start = cursor + TEXT_INSET_SECS;
                    let fade = TEXT_FADE_SECS.min(duration);
                    let mut effects = vec![
                        Effect::fade_in(start, fade),
                        Effect::fade_out(start + duration - fade, fade),
                    ];
                    for inst in &el.effects {
                        effects.push(parse_effect(inst, start, duration)?);
                    }
                    tracks.push(TimelineTrack {
                        id: format!("{}:{element_id}:text", unit.id),
                        kind: TrackKind::Text,
                        start_time: start,
                        duration,
                        content: TrackContent::Text {
                            unit_id: unit.id.clone(),
                            element_id,
                            text: el.content.clone(),
                            style: el.style.clone(),
                        },
                        effects,
                        position: el.position,
                    });
                }
                ElementKind::Image => {
                    let effects = el
                        .effects
                        .iter()
                        .map(|inst| parse_effect(inst, cursor, unit.duration))
                        .collect::<DeckreelResult<Vec<_>>>()?;
                    tracks.push(TimelineTrack {
                        id: format!("{}:{element_id}:image", unit.id),
                        kind: TrackKind::Image,
                        start_time: cursor,
                        duration: unit.duration,
                        content: TrackContent::Image {
                            unit_id: unit.id.clone(),
                            element_id,
                            source: PathBuf::from(&el.content),
                        },
                        effects,
                        position: el.position,
                    });
                }
                ElementKind::Shape => {}
            }
        }

        if let Some(voice) = &unit.voice_over {
            tracks.push(TimelineTrack {
                id: format!("{}:audio", unit.id),
                kind: TrackKind::Audio,
                start_time: cursor,
                duration: unit.duration,
                content: TrackContent::Audio {
                    unit_id: unit.id.clone(),
                    source: voice.clone(),
                },
                effects: Vec::new(),
                position: None,
            });
        }

        cursor += unit.duration;
    }

    tracing::debug!(
        total_duration = cursor,
        tracks = tracks.len(),
        "composed timeline"
    );
    Ok(RenderTimeline {
        total_duration: cursor,
        tracks,
        transitions,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/compose.rs"]
mod tests;
