use std::collections::BTreeMap;

use crate::{
    animation::curve::{Keyframe, evaluate, sample_curve},
    animation::ease::{Easing, Interpolation},
    animation::property::AnimatedProperty,
    foundation::core::{KeyframeId, TrackId, ensure_finite},
    foundation::error::{DeckreelError, DeckreelResult},
};

/// Keyframed property binding for one element.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationTrack {
    /// Track id.
    pub id: TrackId,
    /// Element the property belongs to (a content unit or one of its elements).
    pub element_id: String,
    /// Animated property.
    pub property: AnimatedProperty,
    /// Keyframes sorted ascending by time, unique times.
    pub keyframes: Vec<Keyframe>,
    /// Hidden tracks do not contribute to rendered frames.
    #[serde(default = "default_true")]
    pub visible: bool,
    /// Locked tracks reject keyframe mutations.
    #[serde(default)]
    pub locked: bool,
}

fn default_true() -> bool {
    true
}

impl AnimationTrack {
    /// Create an empty, visible, unlocked track.
    pub fn new(element_id: impl Into<String>, property: AnimatedProperty) -> Self {
        Self {
            id: TrackId::generate(),
            element_id: element_id.into(),
            property,
            keyframes: Vec::new(),
            visible: true,
            locked: false,
        }
    }

    /// Evaluate the track's curve at `t`.
    pub fn value_at(&self, t: f64) -> DeckreelResult<f64> {
        evaluate(&self.keyframes, t)
    }

    /// Validate time ordering/uniqueness.
    pub fn validate(&self) -> DeckreelResult<()> {
        for k in &self.keyframes {
            ensure_finite("keyframe time", k.time)?;
            ensure_finite("keyframe value", k.value)?;
            if k.time < 0.0 {
                return Err(DeckreelError::validation(format!(
                    "track '{}' has a keyframe before t=0",
                    self.id
                )));
            }
        }
        for w in self.keyframes.windows(2) {
            if w[0].time == w[1].time {
                return Err(DeckreelError::DuplicateTime {
                    track: self.id.to_string(),
                    time: w[0].time,
                });
            }
            if w[0].time > w[1].time {
                return Err(DeckreelError::validation(format!(
                    "track '{}' keyframes must be sorted by time",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

/// Optional changes applied by [`TrackStore::update_keyframe`].
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyframePatch {
    /// New time.
    pub time: Option<f64>,
    /// New value.
    pub value: Option<f64>,
    /// New easing.
    pub easing: Option<Easing>,
    /// New interpolation.
    pub interpolation: Option<Interpolation>,
}

/// In-memory collection of animation tracks keyed by id.
///
/// Mutations check time uniqueness before touching a track, so a rejected call leaves the track
/// unchanged.
#[derive(Clone, Debug, Default)]
pub struct TrackStore {
    tracks: BTreeMap<TrackId, AnimationTrack>,
}

impl TrackStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted tracks, re-validating every track.
    pub fn from_tracks(tracks: impl IntoIterator<Item = AnimationTrack>) -> DeckreelResult<Self> {
        let mut store = Self::new();
        for track in tracks {
            store.insert_track(track)?;
        }
        Ok(store)
    }

    /// Clone all tracks, e.g. for saving.
    pub fn snapshot(&self) -> Vec<AnimationTrack> {
        self.tracks.values().cloned().collect()
    }

    /// Bind `property` on `element_id` with an empty track.
    pub fn create_track(
        &mut self,
        element_id: impl Into<String>,
        property: AnimatedProperty,
    ) -> TrackId {
        let track = AnimationTrack::new(element_id, property);
        let id = track.id.clone();
        self.tracks.insert(id.clone(), track);
        id
    }

    /// Insert a fully formed track (sorted on the way in).
    pub fn insert_track(&mut self, mut track: AnimationTrack) -> DeckreelResult<()> {
        if self.tracks.contains_key(&track.id) {
            return Err(DeckreelError::validation(format!(
                "duplicate track id '{}'",
                track.id
            )));
        }
        track.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        track.validate()?;
        self.tracks.insert(track.id.clone(), track);
        Ok(())
    }

    /// Remove one track.
    pub fn remove_track(&mut self, track_id: &TrackId) -> DeckreelResult<AnimationTrack> {
        self.tracks
            .remove(track_id)
            .ok_or_else(|| DeckreelError::not_found(format!("track '{track_id}'")))
    }

    /// Remove every track bound to `element_id`; returns how many were removed.
    pub fn remove_element(&mut self, element_id: &str) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|_, t| t.element_id != element_id);
        before - self.tracks.len()
    }

    /// Borrow a track.
    pub fn track(&self, track_id: &TrackId) -> DeckreelResult<&AnimationTrack> {
        self.tracks
            .get(track_id)
            .ok_or_else(|| DeckreelError::not_found(format!("track '{track_id}'")))
    }

    /// Iterate all tracks in id order.
    pub fn tracks(&self) -> impl Iterator<Item = &AnimationTrack> {
        self.tracks.values()
    }

    /// Number of tracks.
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// Return `true` when the store has no tracks.
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Show or hide a track.
    pub fn set_visible(&mut self, track_id: &TrackId, visible: bool) -> DeckreelResult<()> {
        self.track_mut(track_id)?.visible = visible;
        Ok(())
    }

    /// Lock or unlock a track.
    pub fn set_locked(&mut self, track_id: &TrackId, locked: bool) -> DeckreelResult<()> {
        self.track_mut(track_id)?.locked = locked;
        Ok(())
    }

    /// Add a keyframe with linear interpolation.
    ///
    /// Re-adding a removed keyframe through this call only restores the curve when the removed
    /// keyframe was linear; [`TrackStore::restore_keyframe`] keeps every field.
    pub fn add_keyframe(
        &mut self,
        track_id: &TrackId,
        time: f64,
        value: f64,
        easing: Easing,
    ) -> DeckreelResult<KeyframeId> {
        self.add_keyframe_with(track_id, time, value, easing, Interpolation::Linear)
    }

    /// Add a keyframe with an explicit interpolation mode.
    pub fn add_keyframe_with(
        &mut self,
        track_id: &TrackId,
        time: f64,
        value: f64,
        easing: Easing,
        interpolation: Interpolation,
    ) -> DeckreelResult<KeyframeId> {
        check_time(time)?;
        ensure_finite("keyframe value", value)?;
        let track = self.unlocked_track_mut(track_id)?;
        if track.keyframes.iter().any(|k| k.time == time) {
            return Err(DeckreelError::DuplicateTime {
                track: track_id.to_string(),
                time,
            });
        }

        let kf = Keyframe::new(time, value, easing).with_interpolation(interpolation);
        let id = kf.id.clone();
        let at = track.keyframes.partition_point(|k| k.time < time);
        track.keyframes.insert(at, kf);
        Ok(id)
    }

    /// Apply `patch` to one keyframe, re-sorting when the time changes.
    pub fn update_keyframe(
        &mut self,
        track_id: &TrackId,
        keyframe_id: &KeyframeId,
        patch: KeyframePatch,
    ) -> DeckreelResult<()> {
        if let Some(time) = patch.time {
            check_time(time)?;
        }
        if let Some(value) = patch.value {
            ensure_finite("keyframe value", value)?;
        }
        let track = self.unlocked_track_mut(track_id)?;
        let idx = track
            .keyframes
            .iter()
            .position(|k| &k.id == keyframe_id)
            .ok_or_else(|| {
                DeckreelError::not_found(format!("keyframe '{keyframe_id}' in track '{track_id}'"))
            })?;

        if let Some(time) = patch.time
            && track
                .keyframes
                .iter()
                .enumerate()
                .any(|(i, k)| i != idx && k.time == time)
        {
            return Err(DeckreelError::DuplicateTime {
                track: track_id.to_string(),
                time,
            });
        }

        let kf = &mut track.keyframes[idx];
        if let Some(time) = patch.time {
            kf.time = time;
        }
        if let Some(value) = patch.value {
            kf.value = value;
        }
        if let Some(easing) = patch.easing {
            kf.easing = easing;
        }
        if let Some(interpolation) = patch.interpolation {
            kf.interpolation = interpolation;
        }
        if patch.time.is_some() {
            track.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
        Ok(())
    }

    /// Remove one keyframe. Removing the last keyframe leaves an empty track.
    pub fn remove_keyframe(
        &mut self,
        track_id: &TrackId,
        keyframe_id: &KeyframeId,
    ) -> DeckreelResult<Keyframe> {
        let track = self.unlocked_track_mut(track_id)?;
        let idx = track
            .keyframes
            .iter()
            .position(|k| &k.id == keyframe_id)
            .ok_or_else(|| {
                DeckreelError::not_found(format!("keyframe '{keyframe_id}' in track '{track_id}'"))
            })?;
        Ok(track.keyframes.remove(idx))
    }

    /// Put back a keyframe returned by [`TrackStore::remove_keyframe`], id and interpolation
    /// included.
    pub fn restore_keyframe(
        &mut self,
        track_id: &TrackId,
        keyframe: Keyframe,
    ) -> DeckreelResult<()> {
        check_time(keyframe.time)?;
        ensure_finite("keyframe value", keyframe.value)?;
        let track = self.unlocked_track_mut(track_id)?;
        if track.keyframes.iter().any(|k| k.time == keyframe.time) {
            return Err(DeckreelError::DuplicateTime {
                track: track_id.to_string(),
                time: keyframe.time,
            });
        }
        if track.keyframes.iter().any(|k| k.id == keyframe.id) {
            return Err(DeckreelError::validation(format!(
                "keyframe '{}' already exists in track '{track_id}'",
                keyframe.id
            )));
        }
        let at = track.keyframes.partition_point(|k| k.time < keyframe.time);
        track.keyframes.insert(at, keyframe);
        Ok(())
    }

    /// Clone the keyframes named by `ids`, in track order.
    pub fn copy_keyframes(
        &self,
        track_id: &TrackId,
        ids: &[KeyframeId],
    ) -> DeckreelResult<Vec<Keyframe>> {
        let track = self.track(track_id)?;
        if let Some(missing) = ids
            .iter()
            .find(|id| !track.keyframes.iter().any(|k| &k.id == *id))
        {
            return Err(DeckreelError::not_found(format!(
                "keyframe '{missing}' in track '{track_id}'"
            )));
        }
        Ok(track
            .keyframes
            .iter()
            .filter(|k| ids.contains(&k.id))
            .cloned()
            .collect())
    }

    /// Paste copied keyframes so the earliest one lands on `at`, shifting the rest by the same
    /// offset. Pasted keyframes get fresh ids and keep their easing and interpolation.
    ///
    /// Every target time is checked before the track changes: a collision with an existing
    /// keyframe (or between two pasted ones) fails with [`DeckreelError::DuplicateTime`] and
    /// pastes nothing.
    pub fn paste_keyframes(
        &mut self,
        track_id: &TrackId,
        keyframes: &[Keyframe],
        at: f64,
    ) -> DeckreelResult<Vec<KeyframeId>> {
        check_time(at)?;
        let Some(earliest) = keyframes.iter().map(|k| k.time).reduce(f64::min) else {
            return Ok(Vec::new());
        };
        ensure_finite("keyframe time", earliest)?;
        let offset = at - earliest;

        let mut pasted = Vec::with_capacity(keyframes.len());
        for src in keyframes {
            let time = src.time + offset;
            check_time(time)?;
            ensure_finite("keyframe value", src.value)?;
            pasted.push(
                Keyframe::new(time, src.value, src.easing).with_interpolation(src.interpolation),
            );
        }

        let track = self.unlocked_track_mut(track_id)?;
        for (i, kf) in pasted.iter().enumerate() {
            let clash = track.keyframes.iter().any(|k| k.time == kf.time)
                || pasted[..i].iter().any(|k| k.time == kf.time);
            if clash {
                return Err(DeckreelError::DuplicateTime {
                    track: track_id.to_string(),
                    time: kf.time,
                });
            }
        }

        let ids = pasted.iter().map(|k| k.id.clone()).collect();
        track.keyframes.extend(pasted);
        track.keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(ids)
    }

    /// Drop interior keyframes that sit on the straight line between their kept neighbours
    /// (within `tolerance`). Returns how many keyframes were removed.
    ///
    /// Only plain linear spans qualify, so the evaluated curve moves by at most `tolerance`.
    pub fn optimize_track(
        &mut self,
        track_id: &TrackId,
        tolerance: f64,
    ) -> DeckreelResult<usize> {
        ensure_finite("optimize tolerance", tolerance)?;
        if tolerance < 0.0 {
            return Err(DeckreelError::validation(format!(
                "optimize tolerance must be >= 0, got {tolerance}"
            )));
        }
        let track = self.unlocked_track_mut(track_id)?;
        let keys = std::mem::take(&mut track.keyframes);
        let before = keys.len();

        let mut kept: Vec<Keyframe> = Vec::with_capacity(before);
        let mut skipped: Vec<Keyframe> = Vec::new();
        let mut iter = keys.into_iter().peekable();
        while let Some(kf) = iter.next() {
            let redundant = match (kept.last(), iter.peek()) {
                (Some(anchor), Some(next)) => {
                    is_plain_linear(anchor)
                        && is_plain_linear(&kf)
                        && skipped.iter().chain(std::iter::once(&kf)).all(|k| {
                            (line_at(anchor, next, k.time) - k.value).abs() <= tolerance
                        })
                }
                _ => false,
            };
            if redundant {
                skipped.push(kf);
            } else {
                skipped.clear();
                kept.push(kf);
            }
        }

        track.keyframes = kept;
        let removed = before - track.keyframes.len();
        if removed > 0 {
            tracing::debug!(track = %track_id, removed, "optimized keyframes");
        }
        Ok(removed)
    }

    /// Evaluate a track at `t`.
    pub fn value_at(&self, track_id: &TrackId, t: f64) -> DeckreelResult<f64> {
        self.track(track_id)?.value_at(t)
    }

    /// Sample a track's curve for drawing.
    pub fn sample_track(
        &self,
        track_id: &TrackId,
        start: f64,
        end: f64,
        steps: usize,
    ) -> DeckreelResult<Vec<(f64, f64)>> {
        sample_curve(&self.track(track_id)?.keyframes, start, end, steps)
    }

    /// Values of every visible, keyed track bound to `element_id` at `t`.
    ///
    /// When several tracks animate the same property the one with the greatest id wins.
    pub fn values_at(
        &self,
        element_id: &str,
        t: f64,
    ) -> DeckreelResult<BTreeMap<AnimatedProperty, f64>> {
        let mut out = BTreeMap::new();
        for track in self.tracks.values() {
            if track.element_id != element_id || !track.visible || track.keyframes.is_empty() {
                continue;
            }
            out.insert(track.property.clone(), track.value_at(t)?);
        }
        Ok(out)
    }

    fn track_mut(&mut self, track_id: &TrackId) -> DeckreelResult<&mut AnimationTrack> {
        self.tracks
            .get_mut(track_id)
            .ok_or_else(|| DeckreelError::not_found(format!("track '{track_id}'")))
    }

    fn unlocked_track_mut(&mut self, track_id: &TrackId) -> DeckreelResult<&mut AnimationTrack> {
        let track = self.track_mut(track_id)?;
        if track.locked {
            return Err(DeckreelError::TrackLocked(track_id.to_string()));
        }
        Ok(track)
    }
}

fn is_plain_linear(k: &Keyframe) -> bool {
    k.easing == Easing::Linear && k.interpolation == Interpolation::Linear
}

fn line_at(a: &Keyframe, b: &Keyframe, t: f64) -> f64 {
    a.value + (b.value - a.value) * (t - a.time) / (b.time - a.time)
}

fn check_time(time: f64) -> DeckreelResult<()> {
    ensure_finite("keyframe time", time)?;
    if time < 0.0 {
        return Err(DeckreelError::validation(format!(
            "keyframe time must be >= 0, got {time}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/animation/store.rs"]
mod tests;
