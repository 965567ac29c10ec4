use crate::metadata::Metadata;
use crate::photometric::PhotometricData;
use serde::{Deserialize, Serialize};

/// One parsed luminaire file. Engine operations never mutate a Document in
/// place; they return a fresh snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub file_name: String,
    pub file_size: u64,
    pub metadata: Metadata,
    pub photometric: PhotometricData,
}

impl Document {
    pub fn with_photometric(&self, photometric: PhotometricData) -> Self {
        Self {
            photometric,
            ..self.clone()
        }
    }

    pub fn with_metadata(&self, metadata: Metadata) -> Self {
        Self {
            metadata,
            ..self.clone()
        }
    }
}

/// Reference values captured once when a file is loaded.
///
/// Reconciliation compares proposed wattage/lumens against these, not
/// against the current document, so display-formatting noise on an already
/// edited file cannot re-trigger a scale. Later edits must never overwrite
/// a baseline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub input_watts: f64,
    pub total_lumens: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Baseline {
    pub fn capture(data: &PhotometricData) -> Self {
        Self {
            input_watts: data.input_watts,
            total_lumens: data.total_lumens,
            length: data.length,
            width: data.width,
            height: data.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitsType;

    fn sample_data() -> PhotometricData {
        PhotometricData {
            number_of_lamps: 2,
            lumens_per_lamp: 500.0,
            total_lumens: 1000.0,
            candela_multiplier: 1.0,
            tilt: "NONE".to_string(),
            vertical_angle_count: 1,
            horizontal_angle_count: 1,
            photometric_type: 1,
            units_type: UnitsType::Meters,
            width: 0.2,
            length: 1.2,
            height: 0.1,
            ballast_factor: 1.0,
            ballast_lamp_factor: 1.0,
            input_watts: 12.0,
            vertical_angles: vec![0.0],
            horizontal_angles: vec![0.0],
            candela_values: vec![vec![500.0]],
        }
    }

    #[test]
    fn test_baseline_capture() {
        let data = sample_data();
        let baseline = Baseline::capture(&data);
        assert_eq!(baseline.input_watts, 12.0);
        assert_eq!(baseline.total_lumens, 1000.0);
        assert_eq!(baseline.length, 1.2);
        assert_eq!(baseline.width, 0.2);
        assert_eq!(baseline.height, 0.1);
    }

    #[test]
    fn test_with_photometric_keeps_identity() {
        let document = Document {
            file_name: "a.ies".to_string(),
            file_size: 10,
            metadata: Metadata::default(),
            photometric: sample_data(),
        };
        let mut scaled = sample_data();
        scaled.input_watts = 24.0;
        let next = document.with_photometric(scaled);
        assert_eq!(next.file_name, "a.ies");
        assert_eq!(next.photometric.input_watts, 24.0);
        // the original snapshot is untouched
        assert_eq!(document.photometric.input_watts, 12.0);
    }
}
