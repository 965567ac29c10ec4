use crate::photometric::{Dimension, PhotometricData};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error, Serialize, Deserialize)]
pub enum ScaleError {
    #[error("invalid scale target for {quantity}: {value}")]
    InvalidScaleTarget { quantity: &'static str, value: f64 },
}

/// A scaling result: the new snapshot plus the factor that was applied.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scaled {
    pub data: PhotometricData,
    pub factor: f64,
}

/// Rounds half-to-nearest at the 3rd decimal.
///
/// Part of the scaling contract: every numeric output passes through this,
/// so repeated edits cannot accumulate floating drift and downstream
/// equality checks can rely on stable values.
#[inline(always)]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn positive(quantity: &'static str, value: f64) -> Result<f64, ScaleError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ScaleError::InvalidScaleTarget { quantity, value })
    }
}

fn scale_factor(quantity: &'static str, target: f64, current: f64) -> Result<f64, ScaleError> {
    positive(quantity, target)?;
    positive(quantity, current)?;
    positive(quantity, round3(target / current))
}

fn scaled_candela(values: &[Vec<f64>], factor: f64) -> Vec<Vec<f64>> {
    values
        .iter()
        .map(|row| row.iter().map(|v| round3(v * factor)).collect())
        .collect()
}

/// Color-temperature conversion: lumen output shifts by a flux multiplier,
/// wattage stays put.
pub fn scale_by_cct(data: &PhotometricData, multiplier: f64) -> Result<Scaled, ScaleError> {
    let factor = positive("cct multiplier", round3(multiplier))?;
    let mut out = data.clone();
    out.lumens_per_lamp = round3(data.lumens_per_lamp * factor);
    out.total_lumens = round3(out.lumens_per_lamp * out.number_of_lamps as f64);
    out.candela_values = scaled_candela(&data.candela_values, factor);
    Ok(Scaled { data: out, factor })
}

/// Drives lumens and candela proportionally to a new wattage, preserving
/// efficacy by construction.
pub fn scale_by_wattage(data: &PhotometricData, new_watts: f64) -> Result<Scaled, ScaleError> {
    let factor = scale_factor("wattage", new_watts, data.input_watts)?;
    let mut out = data.clone();
    out.lumens_per_lamp = round3(data.lumens_per_lamp * factor);
    out.total_lumens = round3(data.total_lumens * factor);
    out.candela_values = scaled_candela(&data.candela_values, factor);
    out.input_watts = round3(new_watts);
    Ok(Scaled { data: out, factor })
}

/// Forces a new total lumen output. Wattage follows only when
/// `adjust_wattage` is set, otherwise efficacy changes.
pub fn scale_by_lumens(
    data: &PhotometricData,
    new_total_lumens: f64,
    adjust_wattage: bool,
) -> Result<Scaled, ScaleError> {
    let factor = scale_factor("lumens", new_total_lumens, data.total_lumens)?;
    if data.number_of_lamps == 0 {
        return Err(ScaleError::InvalidScaleTarget {
            quantity: "lamp count",
            value: 0.0,
        });
    }
    let mut out = data.clone();
    out.total_lumens = round3(new_total_lumens);
    out.lumens_per_lamp = round3(new_total_lumens / data.number_of_lamps as f64);
    out.candela_values = scaled_candela(&data.candela_values, factor);
    if adjust_wattage {
        out.input_watts = round3(data.input_watts * factor);
    }
    Ok(Scaled { data: out, factor })
}

/// Resizes one luminous-opening dimension under the linear-fixture
/// assumption: doubling the emitting length doubles power and output at
/// constant intensity per unit length. Only the named dimension changes.
pub fn scale_by_dimension(
    data: &PhotometricData,
    new_value: f64,
    dimension: Dimension,
) -> Result<Scaled, ScaleError> {
    let factor = scale_factor(dimension.label(), new_value, data.dimension(dimension))?;
    let mut out = data.clone();
    out.input_watts = round3(data.input_watts * factor);
    out.lumens_per_lamp = round3(data.lumens_per_lamp * factor);
    out.total_lumens = round3(data.total_lumens * factor);
    out.candela_values = scaled_candela(&data.candela_values, factor);
    out.set_dimension(dimension, round3(new_value));
    Ok(Scaled { data: out, factor })
}

/// Relabels orientation: length and width trade places, photometry stays.
pub fn swap_dimensions(data: &PhotometricData) -> Scaled {
    let mut out = data.clone();
    out.length = data.width;
    out.width = data.length;
    Scaled {
        data: out,
        factor: 1.0,
    }
}

/// Advisory signal that the length-scaling assumption is plausible.
pub fn is_linear_fixture(data: &PhotometricData) -> bool {
    data.length / data.width > 5.0 && data.length / data.height > 5.0
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
            vertical_angle_count: 3,
            horizontal_angle_count: 2,
            photometric_type: 1,
            units_type: UnitsType::Meters,
            width: 0.1,
            length: 1.0,
            height: 0.1,
            ballast_factor: 1.0,
            ballast_lamp_factor: 1.0,
            input_watts: 10.0,
            vertical_angles: vec![0.0, 45.0, 90.0],
            horizontal_angles: vec![0.0, 90.0],
            candela_values: vec![vec![800.0, 400.0, 50.0], vec![800.0, 400.0, 50.0]],
        }
    }

    fn efficacy(data: &PhotometricData) -> f64 {
        data.total_lumens / data.input_watts
    }

    #[test]
    fn test_round3() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(2.71828), 2.718);
        assert_eq!(round3(2.0), 2.0);
        assert_eq!(round3(-1.23456), -1.235);
    }

    #[test]
    fn test_scale_by_cct() {
        let scaled = scale_by_cct(&sample_data(), 1.1).unwrap();
        assert_eq!(scaled.factor, 1.1);
        assert_eq!(scaled.data.lumens_per_lamp, 1100.0);
        assert_eq!(scaled.data.total_lumens, 1100.0);
        assert_eq!(scaled.data.candela_values[0], vec![880.0, 440.0, 55.0]);
        // wattage untouched
        assert_eq!(scaled.data.input_watts, 10.0);
    }

    #[test]
    fn test_scale_by_wattage_preserves_efficacy() {
        let data = sample_data();
        let scaled = scale_by_wattage(&data, 7.0).unwrap();
        assert_eq!(scaled.factor, 0.7);
        assert_eq!(scaled.data.input_watts, 7.0);
        assert_eq!(scaled.data.total_lumens, 700.0);
        assert_eq!(efficacy(&scaled.data), efficacy(&data));
    }

    #[test]
    fn test_scale_by_lumens_without_wattage_changes_efficacy() {
        let data = sample_data();
        let scaled = scale_by_lumens(&data, 2000.0, false).unwrap();
        assert_eq!(scaled.factor, 2.0);
        assert_eq!(scaled.data.total_lumens, 2000.0);
        assert_eq!(scaled.data.lumens_per_lamp, 2000.0);
        assert_eq!(scaled.data.candela_values[1], vec![1600.0, 800.0, 100.0]);
        assert_eq!(scaled.data.input_watts, 10.0);
        assert_eq!(efficacy(&scaled.data), 2.0 * efficacy(&data));
    }

    #[test]
    fn test_scale_by_lumens_with_wattage_adjustment() {
        let scaled = scale_by_lumens(&sample_data(), 2000.0, true).unwrap();
        assert_eq!(scaled.data.input_watts, 20.0);
        assert_eq!(scaled.data.total_lumens, 2000.0);
    }

    #[test]
    fn test_scale_by_dimension_doubles_linear_fixture() {
        let scaled = scale_by_dimension(&sample_data(), 2.0, Dimension::Length).unwrap();
        assert_eq!(scaled.factor, 2.0);
        assert_eq!(scaled.data.length, 2.0);
        assert_eq!(scaled.data.input_watts, 20.0);
        assert_eq!(scaled.data.total_lumens, 2000.0);
        // the other two dimensions are untouched
        assert_eq!(scaled.data.width, 0.1);
        assert_eq!(scaled.data.height, 0.1);
    }

    #[test]
    fn test_swap_dimensions_is_pure_relabeling() {
        let data = sample_data();
        let swapped = swap_dimensions(&data);
        assert_eq!(swapped.factor, 1.0);
        assert_eq!(swapped.data.length, 0.1);
        assert_eq!(swapped.data.width, 1.0);
        assert_eq!(swapped.data.candela_values, data.candela_values);
        assert_eq!(swapped.data.input_watts, data.input_watts);
    }

    #[test]
    fn test_is_linear_fixture() {
        assert!(is_linear_fixture(&sample_data()));
        let mut squat = sample_data();
        squat.width = 0.9;
        assert!(!is_linear_fixture(&squat));
    }

    #[test]
    fn test_invalid_scale_targets_leave_input_alone() {
        let data = sample_data();
        assert!(scale_by_wattage(&data, 0.0).is_err());
        assert!(scale_by_wattage(&data, -5.0).is_err());
        assert!(scale_by_lumens(&data, 0.0, false).is_err());
        assert!(scale_by_dimension(&data, -1.0, Dimension::Width).is_err());
        assert!(scale_by_cct(&data, 0.0).is_err());
        // the input snapshot is untouched either way
        assert_eq!(data, sample_data());
    }

    #[test]
    fn test_scale_by_lumens_rejects_zero_lamps() {
        let mut data = sample_data();
        data.number_of_lamps = 0;
        data.lumens_per_lamp = 0.0;
        data.total_lumens = 1000.0;
        assert!(scale_by_lumens(&data, 2000.0, false).is_err());
    }

    #[test]
    fn test_zero_current_wattage_is_rejected() {
        let mut data = sample_data();
        data.input_watts = 0.0;
        assert!(matches!(
            scale_by_wattage(&data, 20.0),
            Err(ScaleError::InvalidScaleTarget { .. })
        ));
    }

    #[test]
    fn test_truncation_to_three_decimals() {
        let mut data = sample_data();
        data.candela_values = vec![vec![1.0, 1.0, 1.0], vec![1.0, 1.0, 1.0]];
        let scaled = scale_by_cct(&data, 1.23456).unwrap();
        // the factor itself is truncated before it is applied
        assert_eq!(scaled.factor, 1.235);
        assert_eq!(scaled.data.candela_values[0][0], 1.235);
        assert_eq!(scaled.data.lumens_per_lamp, 1235.0);
    }
}
