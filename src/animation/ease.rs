use std::f64::consts::PI;

/// Easing functions used to map normalized keyframe progress.
///
/// Overshoot styles (`Bounce`, `Elastic`, `Back`) may leave `[0, 1]` between the endpoints.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    /// Linear progress.
    #[default]
    Linear,
    /// Quadratic ease-in.
    EaseIn,
    /// Quadratic ease-out.
    EaseOut,
    /// Quadratic ease-in/out.
    EaseInOut,
    /// Damped cosine settle.
    Bounce,
    /// Exponentially damped sine.
    Elastic,
    /// Cubic with a pull-back before the start.
    Back,
}

impl Easing {
    /// Every named easing, in catalog order.
    pub const ALL: [Easing; 7] = [
        Self::Linear,
        Self::EaseIn,
        Self::EaseOut,
        Self::EaseInOut,
        Self::Bounce,
        Self::Elastic,
        Self::Back,
    ];

    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::Bounce => 1.0 - (1.0 - t).powi(2) * (7.0 * PI * t).cos(),
            Self::Elastic => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else {
                    -(2f64.powf(10.0 * (t - 1.0))) * ((t - 1.1) * 5.0 * PI).sin()
                }
            }
            Self::Back => {
                if t == 1.0 {
                    1.0
                } else {
                    2.7 * t * t * t - 1.7 * t * t
                }
            }
        }
    }
}

/// Blend shape between two adjacent keyframes, independent of easing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    /// `a + (b - a) * eased`.
    #[default]
    Linear,
    /// Eased progress shaped by a cubic Bézier with flat handles (`3e² - 2e³`).
    Bezier,
    /// Hold `a` until the next keyframe time.
    Step,
}

impl Interpolation {
    /// Blend factor for eased progress `eased`; `None` means "hold the left value".
    pub fn shape(self, eased: f64) -> Option<f64> {
        match self {
            Self::Linear => Some(eased),
            Self::Bezier => Some(eased * eased * (3.0 - 2.0 * eased)),
            Self::Step => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
