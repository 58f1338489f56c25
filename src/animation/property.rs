use std::fmt;

/// Animatable element property.
///
/// Known properties carry a value range and a default; anything else is a free-form custom
/// property with no range.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnimatedProperty {
    /// Opacity in percent.
    Opacity,
    /// Uniform scale factor.
    Scale,
    /// Rotation in degrees.
    Rotation,
    /// Horizontal offset in pixels.
    PositionX,
    /// Vertical offset in pixels.
    PositionY,
    /// Audio volume in percent.
    Volume,
    /// Any other property name.
    Custom(String),
}

impl AnimatedProperty {
    /// Resolve a property from its wire name.
    pub fn parse(name: &str) -> Self {
        match name {
            "opacity" => Self::Opacity,
            "scale" => Self::Scale,
            "rotation" => Self::Rotation,
            "positionX" => Self::PositionX,
            "positionY" => Self::PositionY,
            "volume" => Self::Volume,
            other => Self::Custom(other.to_owned()),
        }
    }

    /// Wire name of the property.
    pub fn name(&self) -> &str {
        match self {
            Self::Opacity => "opacity",
            Self::Scale => "scale",
            Self::Rotation => "rotation",
            Self::PositionX => "positionX",
            Self::PositionY => "positionY",
            Self::Volume => "volume",
            Self::Custom(name) => name,
        }
    }

    /// Inclusive `(min, max)` range, if the property has one.
    pub fn range(&self) -> Option<(f64, f64)> {
        match self {
            Self::Opacity | Self::Volume => Some((0.0, 100.0)),
            Self::Scale => Some((0.1, 5.0)),
            Self::Rotation => Some((-360.0, 360.0)),
            Self::PositionX => Some((-500.0, 500.0)),
            Self::PositionY => Some((-300.0, 300.0)),
            Self::Custom(_) => None,
        }
    }

    /// Display unit.
    pub fn unit(&self) -> &'static str {
        match self {
            Self::Opacity | Self::Volume => "%",
            Self::Scale => "x",
            Self::Rotation => "°",
            Self::PositionX | Self::PositionY => "px",
            Self::Custom(_) => "",
        }
    }

    /// Value used for a freshly created keyframe.
    pub fn default_value(&self) -> f64 {
        match self {
            Self::Opacity | Self::Volume => 100.0,
            Self::Scale => 1.0,
            _ => 0.0,
        }
    }

    /// Clamp `v` into this property's range (no-op for custom properties).
    pub fn clamp_value(&self, v: f64) -> f64 {
        match self.range() {
            Some((lo, hi)) => v.clamp(lo, hi),
            None => v,
        }
    }
}

impl fmt::Display for AnimatedProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl serde::Serialize for AnimatedProperty {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.name())
    }
}

impl<'de> serde::Deserialize<'de> for AnimatedProperty {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let name = String::deserialize(d)?;
        Ok(Self::parse(&name))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/property.rs"]
mod tests;
