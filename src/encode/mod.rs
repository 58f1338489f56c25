//! Encoding collaborators.
//!
//! The render pipeline never builds encoder command lines itself; it talks to an [`Encoder`]
//! implementation. [`FfmpegEncoder`] is the bundled process-backed one.
//!
//! [`Encoder`]: encoder::Encoder
//! [`FfmpegEncoder`]: ffmpeg::FfmpegEncoder

/// Encoder trait and request types.
pub mod encoder;
/// Locally generated fallback rasters.
pub mod fallback;
/// `ffmpeg`-backed encoder.
pub mod ffmpeg;
/// Render settings, quality presets and estimates.
pub mod settings;
