use crate::units::UnitsType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed slack between the denormalized total and the per-lamp product;
/// both sides are rounded to 3 decimals independently.
const TOTAL_LUMENS_TOLERANCE: f64 = 0.1;

/// Luminous opening dimensions, in the order scaling priority uses them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Length,
    Width,
    Height,
}

impl Dimension {
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "length" => Some(Dimension::Length),
            "width" => Some(Dimension::Width),
            "height" => Some(Dimension::Height),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Length => "length",
            Dimension::Width => "width",
            Dimension::Height => "height",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum IntegrityError {
    #[error("declared {declared} vertical angles, found {actual}")]
    VerticalAngles { declared: usize, actual: usize },
    #[error("declared {declared} horizontal angles, found {actual}")]
    HorizontalAngles { declared: usize, actual: usize },
    #[error("candela matrix has {actual} rows, expected {declared}")]
    CandelaRows { declared: usize, actual: usize },
    #[error("candela row {row} has {actual} values, expected {declared}")]
    CandelaRowLength {
        row: usize,
        declared: usize,
        actual: usize,
    },
    #[error("total lumens {total} does not match {per_lamp} lm/lamp x {lamps} lamps")]
    TotalLumens {
        total: f64,
        per_lamp: f64,
        lamps: u32,
    },
}

/// The numeric body of a luminaire file.
///
/// `total_lumens` is denormalized (`lumens_per_lamp * number_of_lamps`) and
/// every scaling operation keeps it consistent. The candela matrix is
/// indexed `[horizontal][vertical]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhotometricData {
    pub number_of_lamps: u32,
    pub lumens_per_lamp: f64,
    pub total_lumens: f64,
    pub candela_multiplier: f64,
    pub tilt: String,
    pub vertical_angle_count: usize,
    pub horizontal_angle_count: usize,
    pub photometric_type: u8,
    pub units_type: UnitsType,
    pub width: f64,
    pub length: f64,
    pub height: f64,
    pub ballast_factor: f64,
    pub ballast_lamp_factor: f64,
    pub input_watts: f64,
    pub vertical_angles: Vec<f64>,
    pub horizontal_angles: Vec<f64>,
    pub candela_values: Vec<Vec<f64>>,
}

impl PhotometricData {
    #[inline(always)]
    pub fn dimension(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Length => self.length,
            Dimension::Width => self.width,
            Dimension::Height => self.height,
        }
    }

    pub fn set_dimension(&mut self, dimension: Dimension, value: f64) {
        match dimension {
            Dimension::Length => self.length = value,
            Dimension::Width => self.width = value,
            Dimension::Height => self.height = value,
        }
    }

    /// Checks the declared-count and denormalization invariants.
    pub fn integrity(&self) -> Result<(), IntegrityError> {
        if self.vertical_angles.len() != self.vertical_angle_count {
            return Err(IntegrityError::VerticalAngles {
                declared: self.vertical_angle_count,
                actual: self.vertical_angles.len(),
            });
        }
        if self.horizontal_angles.len() != self.horizontal_angle_count {
            return Err(IntegrityError::HorizontalAngles {
                declared: self.horizontal_angle_count,
                actual: self.horizontal_angles.len(),
            });
        }
        if self.candela_values.len() != self.horizontal_angle_count {
            return Err(IntegrityError::CandelaRows {
                declared: self.horizontal_angle_count,
                actual: self.candela_values.len(),
            });
        }
        for (row, values) in self.candela_values.iter().enumerate() {
            if values.len() != self.vertical_angle_count {
                return Err(IntegrityError::CandelaRowLength {
                    row,
                    declared: self.vertical_angle_count,
                    actual: values.len(),
                });
            }
        }
        let product = self.lumens_per_lamp * self.number_of_lamps as f64;
        if (self.total_lumens - product).abs() > TOTAL_LUMENS_TOLERANCE {
            return Err(IntegrityError::TotalLumens {
                total: self.total_lumens,
                per_lamp: self.lumens_per_lamp,
                lamps: self.number_of_lamps,
            });
        }
        Ok(())
    }
}
