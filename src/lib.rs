//! Deckreel turns slide-deck content into rendered videos.
//!
//! The crate has three layers:
//!
//! - Keyframe animation: [`Keyframe`] curves evaluated with named [`Easing`]s, stored per
//!   element and property in a [`TrackStore`]
//! - Timeline composition: [`compose`] lays ordered [`ContentUnit`]s out on a flat
//!   [`RenderTimeline`] with automatic text fades and unit transitions
//! - Render jobs: [`RenderJobManager`] runs each job through asset preparation, frame
//!   generation, audio render, combine and postprocess, delegating pixel and audio work to an
//!   external [`Encoder`] such as [`FfmpegEncoder`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Animation curves, easing and the keyframe track store.
pub mod animation;
/// External encoder interface and the `ffmpeg` adapter.
pub mod encode;
/// Shared ids, errors and IO helpers.
pub mod foundation;
/// Render job lifecycle and scheduling.
pub mod render;
/// Content units and the render timeline.
pub mod timeline;

pub use crate::foundation::core::{Fps, FrameIndex, JobId, KeyframeId, TrackId, Vec2};
pub use crate::foundation::error::{DeckreelError, DeckreelResult};

pub use crate::animation::curve::{Keyframe, evaluate, sample_curve};
pub use crate::animation::ease::{Easing, Interpolation};
pub use crate::animation::property::AnimatedProperty;
pub use crate::animation::store::{AnimationTrack, KeyframePatch, TrackStore};

pub use crate::timeline::compose::compose;
pub use crate::timeline::effect::{Effect, EffectInstance, EffectKind};
pub use crate::timeline::model::{
    ContentUnit, ElementKind, RenderTimeline, TimelineTrack, TrackContent, TrackKind,
    Transition, UnitElement,
};

pub use crate::encode::encoder::Encoder;
pub use crate::encode::ffmpeg::{FfmpegEncoder, FfmpegEncoderOpts};
pub use crate::encode::settings::{OutputFormat, Quality, RenderSettings};

pub use crate::render::config::ManagerConfig;
pub use crate::render::job::{FailureKind, JobMetrics, JobStatus, Priority, RenderJob, Stage};
pub use crate::render::manager::RenderJobManager;
