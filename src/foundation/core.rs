use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::foundation::error::{DeckreelError, DeckreelResult};

pub use kurbo::{Point, Rect, Vec2};

/// Absolute 0-based frame index in the rendered output.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

/// Integral frames-per-second, always non-zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Fps(u32);

impl Fps {
    /// 30 frames per second.
    pub const FPS_30: Self = Self(30);

    /// Create a validated frame rate.
    pub fn new(fps: u32) -> DeckreelResult<Self> {
        if fps == 0 {
            return Err(DeckreelError::validation("fps must be > 0"));
        }
        Ok(Self(fps))
    }

    /// Frames per second.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Duration of one frame in seconds.
    pub fn frame_secs(self) -> f64 {
        1.0 / f64::from(self.0)
    }

    /// Number of frames needed to cover `duration_secs`: `ceil(duration * fps)`.
    ///
    /// Products within `1e-9` of an integer are snapped first so `8.3s @ 30fps` yields 249
    /// frames rather than 250.
    pub fn frames_for(self, duration_secs: f64) -> u64 {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return 0;
        }
        let raw = duration_secs * f64::from(self.0);
        let snapped = raw.round();
        if (raw - snapped).abs() < 1e-9 {
            return snapped as u64;
        }
        raw.ceil() as u64
    }

    /// Timeline time of frame `f` within a span starting at `start_secs`.
    pub fn time_of(self, start_secs: f64, f: u64) -> f64 {
        start_secs + (f as f64) / f64::from(self.0)
    }
}

impl TryFrom<u32> for Fps {
    type Error = DeckreelError;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        Self::new(v)
    }
}

impl From<Fps> for u32 {
    fn from(v: Fps) -> Self {
        v.0
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh random id.
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Borrow the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(v: &str) -> Self {
                Self(v.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(v: String) -> Self {
                Self(v)
            }
        }
    };
}

string_id!(
    /// Identifier of an [`AnimationTrack`](crate::AnimationTrack).
    TrackId
);
string_id!(
    /// Identifier of a keyframe inside one animation track.
    KeyframeId
);

/// Identifier of a render job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct JobId(pub uuid::Uuid);

impl JobId {
    /// Generate a fresh job id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

/// Milliseconds since the unix epoch (0 if the clock is before the epoch).
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Reject NaN/infinite times.
pub(crate) fn ensure_finite(what: &str, v: f64) -> DeckreelResult<()> {
    if !v.is_finite() {
        return Err(DeckreelError::validation(format!(
            "{what} must be finite, got {v}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
