use crate::foundation::core::Vec2;
use crate::foundation::error::{DeckreelError, DeckreelResult};

/// Authored effect as it arrives from content extraction: a kind name plus an open parameter bag.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EffectInstance {
    /// Effect kind name (`fadeIn`, `fadeOut`, `zoom`, `pan`, `rotate`).
    pub kind: String,
    /// Kind-specific parameters.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub params: serde_json::Value,
}

/// Closed set of track effects.
///
/// Fades carry no extra fields: their length is the owning [`Effect::duration`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EffectKind {
    /// Opacity ramps 0 → 1 over the effect window.
    FadeIn,
    /// Opacity ramps 1 → 0 over the effect window.
    FadeOut,
    /// Scale ramps 1 → `factor`.
    Zoom {
        /// Final scale factor, `> 0`.
        factor: f64,
    },
    /// Offset ramps to `(dx, dy)` pixels.
    Pan {
        /// Horizontal offset.
        dx: f64,
        /// Vertical offset.
        dy: f64,
    },
    /// Rotation ramps to `degrees`.
    Rotate {
        /// Final rotation in degrees.
        degrees: f64,
    },
}

/// Timed effect attached to a [`TimelineTrack`](crate::TimelineTrack).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Effect {
    /// Absolute timeline start in seconds.
    pub start_time: f64,
    /// Effect length in seconds, `>= 0`.
    pub duration: f64,
    /// What the effect does.
    #[serde(flatten)]
    pub kind: EffectKind,
}

impl Effect {
    /// Automatic fade-in over `[start, start + duration)`.
    pub fn fade_in(start_time: f64, duration: f64) -> Self {
        Self {
            start_time,
            duration,
            kind: EffectKind::FadeIn,
        }
    }

    /// Automatic fade-out over `[start, start + duration)`.
    pub fn fade_out(start_time: f64, duration: f64) -> Self {
        Self {
            start_time,
            duration,
            kind: EffectKind::FadeOut,
        }
    }

    /// End of the effect window.
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Linear progress through the effect window at `t`, clamped to `[0, 1]`.
    ///
    /// Zero-length effects jump straight to 1 at their start.
    pub fn progress_at(&self, t: f64) -> f64 {
        if t < self.start_time {
            return 0.0;
        }
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((t - self.start_time) / self.duration).clamp(0.0, 1.0)
    }
}

/// Accumulated geometric effect state of an overlay at one instant.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayTransform {
    /// Uniform scale factor.
    pub scale: f64,
    /// Pixel offset.
    pub offset: Vec2,
    /// Rotation in degrees.
    pub rotation_deg: f64,
}

impl Default for OverlayTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Vec2::ZERO,
            rotation_deg: 0.0,
        }
    }
}

impl OverlayTransform {
    /// Return `true` when applying the transform is a no-op.
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Convert an authored effect into a timed [`Effect`] for a track spanning
/// `[track_start, track_start + track_duration)`.
///
/// Optional `startTime` (relative to the track start) and `duration` params position the window;
/// the default window covers the whole track, except that a `fadeOut` without `startTime` is
/// anchored to the track end.
pub fn parse_effect(
    inst: &EffectInstance,
    track_start: f64,
    track_duration: f64,
) -> DeckreelResult<Effect> {
    let kind_name = inst.kind.trim();
    if kind_name.is_empty() {
        return Err(DeckreelError::validation("effect kind must be non-empty"));
    }

    let kind = match kind_name.to_ascii_lowercase().as_str() {
        "fadein" | "fade_in" | "fade-in" => EffectKind::FadeIn,
        "fadeout" | "fade_out" | "fade-out" => EffectKind::FadeOut,
        "zoom" => {
            let factor = get_f64(&inst.params, "factor")?;
            if factor <= 0.0 {
                return Err(DeckreelError::validation("zoom.factor must be > 0"));
            }
            EffectKind::Zoom { factor }
        }
        "pan" => EffectKind::Pan {
            dx: get_f64(&inst.params, "dx")?,
            dy: get_f64(&inst.params, "dy")?,
        },
        "rotate" => EffectKind::Rotate {
            degrees: get_f64(&inst.params, "degrees")?,
        },
        _ => {
            return Err(DeckreelError::validation(format!(
                "unknown effect kind '{kind_name}'"
            )));
        }
    };

    let duration = match opt_f64(&inst.params, "duration")? {
        Some(d) if d < 0.0 => {
            return Err(DeckreelError::validation(
                "effect param 'duration' must be >= 0",
            ));
        }
        Some(d) => d.min(track_duration),
        None => track_duration,
    };
    let offset = match opt_f64(&inst.params, "startTime")? {
        Some(s) => s.clamp(0.0, track_duration - duration),
        None if kind == EffectKind::FadeOut => track_duration - duration,
        None => 0.0,
    };

    Ok(Effect {
        start_time: track_start + offset,
        duration,
        kind,
    })
}

fn opt_f64(obj: &serde_json::Value, key: &str) -> DeckreelResult<Option<f64>> {
    match obj.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => get_f64(obj, key).map(Some),
    }
}

fn get_f64(obj: &serde_json::Value, key: &str) -> DeckreelResult<f64> {
    let Some(v) = obj.get(key) else {
        return Err(DeckreelError::validation(format!(
            "missing effect param '{key}'"
        )));
    };
    let Some(n) = v.as_f64() else {
        return Err(DeckreelError::validation(format!(
            "effect param '{key}' must be a number"
        )));
    };
    if !n.is_finite() {
        return Err(DeckreelError::validation(format!(
            "effect param '{key}' must be finite"
        )));
    }
    Ok(n)
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/effect.rs"]
mod tests;
