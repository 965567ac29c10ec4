use serde::{Deserialize, Serialize};

/// International foot, exact by definition.
pub const METERS_PER_FOOT: f64 = 0.3048;

/// LM-63 units code: 1 = feet, 2 = meters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitsType {
    Feet,
    #[default]
    Meters,
}

impl UnitsType {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(UnitsType::Feet),
            2 => Some(UnitsType::Meters),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn code(&self) -> u8 {
        match self {
            UnitsType::Feet => 1,
            UnitsType::Meters => 2,
        }
    }

    #[inline(always)]
    pub fn label(&self) -> &'static str {
        match self {
            UnitsType::Feet => "feet",
            UnitsType::Meters => "meters",
        }
    }

    /// Unit tags as they appear in CSV uploads. Anything unrecognized,
    /// including an empty tag, falls back to meters.
    pub fn parse_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "feet" | "ft" | "foot" => UnitsType::Feet,
            _ => UnitsType::Meters,
        }
    }
}

#[inline(always)]
pub fn meters_to_feet(value: f64) -> f64 {
    value / METERS_PER_FOOT
}

#[inline(always)]
pub fn feet_to_meters(value: f64) -> f64 {
    value * METERS_PER_FOOT
}

pub fn convert(value: f64, from: UnitsType, to: UnitsType) -> f64 {
    match (from, to) {
        (UnitsType::Feet, UnitsType::Meters) => feet_to_meters(value),
        (UnitsType::Meters, UnitsType::Feet) => meters_to_feet(value),
        _ => value,
    }
}
