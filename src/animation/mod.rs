/// Keyframes and curve evaluation.
pub mod curve;
/// Named easing functions and interpolation shapes.
pub mod ease;
/// Animatable property catalog.
pub mod property;
/// Per-element keyframe track store.
pub mod store;
