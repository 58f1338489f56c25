/// Content units to render timeline conversion.
pub mod compose;
/// Track effects and their authored form.
pub mod effect;
/// Content units, tracks and the render timeline.
pub mod model;
