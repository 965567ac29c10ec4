use crate::photometric::PhotometricData;
use crate::scaling::round3;
use serde::{Deserialize, Serialize};

const BEAM_THRESHOLD: f64 = 0.5;
const FIELD_THRESHOLD: f64 = 0.1;
/// Relative tolerance when comparing horizontal slices for symmetry.
const SYMMETRY_TOLERANCE: f64 = 0.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symmetry {
    Rotational,
    Symmetric,
    Asymmetric,
}

/// Values derived from the photometric body on demand; never persisted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalculatedProperties {
    pub peak_intensity: f64,
    pub efficacy: f64,
    pub beam_angle: f64,
    pub field_angle: f64,
    pub light_output_ratio: f64,
    pub symmetry: Symmetry,
    pub center_beam_intensity: f64,
}

impl CalculatedProperties {
    pub fn from_data(data: &PhotometricData) -> Self {
        let peak_intensity = data
            .candela_values
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max);
        let efficacy = if data.input_watts > 0.0 {
            round3(data.total_lumens / data.input_watts)
        } else {
            0.0
        };
        let nominal = data.lumens_per_lamp * data.number_of_lamps as f64;
        let light_output_ratio = if nominal == 0.0 {
            100.0
        } else {
            round3(data.total_lumens / nominal * 100.0)
        };
        Self {
            peak_intensity,
            efficacy,
            beam_angle: spread_angle(data, peak_intensity, BEAM_THRESHOLD),
            field_angle: spread_angle(data, peak_intensity, FIELD_THRESHOLD),
            light_output_ratio,
            symmetry: classify_symmetry(data),
            center_beam_intensity: data
                .candela_values
                .first()
                .and_then(|row| row.first())
                .copied()
                .unwrap_or(0.0),
        }
    }
}

/// Full spread angle: twice the first vertical angle along horizontal slice
/// 0 where intensity has fallen to the threshold fraction of the peak, or
/// 180 degrees when it never does.
fn spread_angle(data: &PhotometricData, peak: f64, threshold: f64) -> f64 {
    let Some(slice) = data.candela_values.first() else {
        return 180.0;
    };
    for (value, angle) in slice.iter().zip(&data.vertical_angles) {
        if *value <= threshold * peak {
            return round3(2.0 * angle);
        }
    }
    180.0
}

fn classify_symmetry(data: &PhotometricData) -> Symmetry {
    if data.candela_values.len() <= 1 {
        return Symmetry::Rotational;
    }
    let base = &data.candela_values[0];
    for slice in &data.candela_values[1..] {
        for (reference, value) in base.iter().zip(slice) {
            // a zero reference cell tolerates nothing
            if (value - reference).abs() > SYMMETRY_TOLERANCE * reference.abs() {
                return Symmetry::Asymmetric;
            }
        }
    }
    Symmetry::Symmetric
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitsType;

    fn sample_data() -> PhotometricData {
        PhotometricData {
            number_of_lamps: 1,
            lumens_per_lamp: 1000.0,
            total_lumens: 1000.0,
            candela_multiplier: 1.0,
            tilt: "NONE".to_string(),
            vertical_angle_count: 4,
            horizontal_angle_count: 2,
            photometric_type: 1,
            units_type: UnitsType::Meters,
            width: 0.1,
            length: 1.0,
            height: 0.1,
            ballast_factor: 1.0,
            ballast_lamp_factor: 1.0,
            input_watts: 10.0,
            vertical_angles: vec![0.0, 30.0, 60.0, 90.0],
            horizontal_angles: vec![0.0, 90.0],
            candela_values: vec![
                vec![800.0, 600.0, 300.0, 50.0],
                vec![800.0, 600.0, 300.0, 50.0],
            ],
        }
    }

    #[test]
    fn test_peak_and_center_beam() {
        let properties = CalculatedProperties::from_data(&sample_data());
        assert_eq!(properties.peak_intensity, 800.0);
        assert_eq!(properties.center_beam_intensity, 800.0);
    }

    #[test]
    fn test_efficacy() {
        let properties = CalculatedProperties::from_data(&sample_data());
        assert_eq!(properties.efficacy, 100.0);

        let mut unpowered = sample_data();
        unpowered.input_watts = 0.0;
        assert_eq!(CalculatedProperties::from_data(&unpowered).efficacy, 0.0);
    }

    #[test]
    fn test_beam_and_field_angles() {
        let properties = CalculatedProperties::from_data(&sample_data());
        // 50% of 800 is 400: first hit at 60 degrees
        assert_eq!(properties.beam_angle, 120.0);
        // 10% of 800 is 80: first hit at 90 degrees
        assert_eq!(properties.field_angle, 180.0);
    }

    #[test]
    fn test_narrow_beam() {
        let mut data = sample_data();
        data.candela_values = vec![
            vec![1000.0, 400.0, 90.0, 0.0],
            vec![1000.0, 400.0, 90.0, 0.0],
        ];
        let properties = CalculatedProperties::from_data(&data);
        assert_eq!(properties.beam_angle, 60.0);
        assert_eq!(properties.field_angle, 120.0);
    }

    #[test]
    fn test_light_output_ratio() {
        let properties = CalculatedProperties::from_data(&sample_data());
        assert_eq!(properties.light_output_ratio, 100.0);

        let mut derated = sample_data();
        derated.total_lumens = 900.0;
        assert_eq!(
            CalculatedProperties::from_data(&derated).light_output_ratio,
            90.0
        );

        let mut no_nominal = sample_data();
        no_nominal.lumens_per_lamp = 0.0;
        assert_eq!(
            CalculatedProperties::from_data(&no_nominal).light_output_ratio,
            100.0
        );
    }

    #[test]
    fn test_symmetry_classification() {
        assert_eq!(
            CalculatedProperties::from_data(&sample_data()).symmetry,
            Symmetry::Symmetric
        );

        let mut skewed = sample_data();
        skewed.candela_values[1][1] = 700.0;
        assert_eq!(
            CalculatedProperties::from_data(&skewed).symmetry,
            Symmetry::Asymmetric
        );

        // within 10% relative tolerance still counts as symmetric
        let mut near = sample_data();
        near.candela_values[1][1] = 650.0;
        assert_eq!(
            CalculatedProperties::from_data(&near).symmetry,
            Symmetry::Symmetric
        );
    }

    #[test]
    fn test_single_slice_is_always_rotational() {
        let mut data = sample_data();
        data.horizontal_angle_count = 1;
        data.horizontal_angles = vec![0.0];
        data.candela_values = vec![vec![1.0, 99.0, 3.0, 7.0]];
        assert_eq!(
            CalculatedProperties::from_data(&data).symmetry,
            Symmetry::Rotational
        );
    }
}
