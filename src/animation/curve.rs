use crate::{
    animation::ease::{Easing, Interpolation},
    foundation::core::{KeyframeId, ensure_finite},
    foundation::error::{DeckreelError, DeckreelResult},
};

/// One user-authored `(time, value)` anchor of an animated property.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe {
    /// Stable id inside the owning track.
    pub id: KeyframeId,
    /// Time in seconds, `>= 0`.
    pub time: f64,
    /// Property value at `time`.
    pub value: f64,
    /// Easing applied toward the next keyframe.
    #[serde(default)]
    pub easing: Easing,
    /// Blend shape toward the next keyframe.
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl Keyframe {
    /// Build a keyframe with a fresh id and linear interpolation.
    pub fn new(time: f64, value: f64, easing: Easing) -> Self {
        Self {
            id: KeyframeId::generate(),
            time,
            value,
            easing,
            interpolation: Interpolation::Linear,
        }
    }

    /// Replace the interpolation mode.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }
}

/// Evaluate a curve defined by `keys` (sorted ascending by time) at time `t`.
///
/// Values clamp to the first/last keyframe outside the keyed range. Between keys `a` and `b`
/// the progress is eased with `a.easing` and blended according to `a.interpolation`.
pub fn evaluate(keys: &[Keyframe], t: f64) -> DeckreelResult<f64> {
    ensure_finite("query time", t)?;
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return Err(DeckreelError::EmptyCurve);
    };
    if t <= first.time {
        return Ok(first.value);
    }
    if t >= last.time {
        return Ok(last.value);
    }

    // `idx` is the first key with time > t. The early returns leave at least two keys; the clamp
    // only matters for unsorted input.
    let idx = keys.partition_point(|k| k.time <= t).clamp(1, keys.len() - 1);
    let a = &keys[idx - 1];
    let b = &keys[idx];
    let span = b.time - a.time;
    if span.is_nan() || span <= 0.0 {
        return Err(DeckreelError::DegenerateSpan { at: a.time });
    }

    let progress = (t - a.time) / span;
    let eased = a.easing.apply(progress);
    match a.interpolation.shape(eased) {
        Some(f) => Ok(a.value + (b.value - a.value) * f),
        None => Ok(a.value),
    }
}

/// Sample `steps + 1` evenly spaced `(time, value)` points over `[start, end]`.
pub fn sample_curve(
    keys: &[Keyframe],
    start: f64,
    end: f64,
    steps: usize,
) -> DeckreelResult<Vec<(f64, f64)>> {
    ensure_finite("sample start", start)?;
    ensure_finite("sample end", end)?;
    if end < start {
        return Err(DeckreelError::validation("sample end must be >= start"));
    }
    if steps == 0 {
        return Err(DeckreelError::validation("sample steps must be > 0"));
    }

    let mut out = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let t = if i == steps {
            end
        } else {
            start + (end - start) * (i as f64) / (steps as f64)
        };
        out.push((t, evaluate(keys, t)?));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/animation/curve.rs"]
mod tests;
