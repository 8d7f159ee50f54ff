// Calibration domain model - least-squares mapping of cycle time to water level
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reference levels (mm) of the seed set a fresh session starts from.
pub const DEFAULT_REFERENCES_MM: [f64; 7] = [200.0, 250.0, 300.0, 350.0, 400.0, 450.0, 500.0];

/// One measured signal paired with an independently known reference.
///
/// The backend names these `x` and `y`, so the wire names follow it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    #[serde(rename = "x")]
    pub signal: f64,
    #[serde(rename = "y")]
    pub reference: f64,
}

impl CalibrationPoint {
    pub fn new(signal: f64, reference: f64) -> Self {
        Self { signal, reference }
    }
}

/// Seed points: known references with a zero signal, waiting to be measured.
pub fn default_points() -> Vec<CalibrationPoint> {
    DEFAULT_REFERENCES_MM
        .iter()
        .map(|&reference| CalibrationPoint::new(0.0, reference))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearModel {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

impl LinearModel {
    /// Returned when there is not enough data to fit anything.
    pub const ZERO: Self = Self {
        slope: 0.0,
        intercept: 0.0,
        r_squared: 0.0,
    };

    /// Build a model from externally supplied parameters, scoring it against `points`.
    pub fn with_parameters(slope: f64, intercept: f64, points: &[CalibrationPoint]) -> Self {
        let r_squared = if points.is_empty() {
            0.0
        } else {
            r_squared(points, slope, intercept)
        };
        Self {
            slope,
            intercept,
            r_squared,
        }
    }

    /// Unclamped prediction. Use [`convert`] for anything shown to a user.
    pub fn predict(&self, signal: f64) -> f64 {
        self.slope * signal + self.intercept
    }
}

/// Range a converted value is clamped into before it reaches a display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayRange {
    pub min: f64,
    pub max: f64,
}

impl DisplayRange {
    pub fn new(min: f64, max: f64) -> Result<Self, CalibrationError> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(CalibrationError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// NaN collapses to `min`; infinities land on the nearest bound.
    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }
}

impl Default for DisplayRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalibrationError {
    #[error("calibration point index {index} out of range (have {len} points)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no calibration point is armed")]
    NothingArmed,
    #[error("no live signal has been received yet")]
    NoSignal,
    #[error("invalid display range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },
}

/// Ordinary least-squares fit of reference against signal.
///
/// Fewer than two points yields [`LinearModel::ZERO`]. When every signal is
/// identical the slope is undefined, so a flat line through the mean reference
/// is returned instead and scored like any other line.
///
/// Deviations from the means are scaled by their largest magnitude before
/// squaring, so any finite input gives finite parameters.
pub fn fit(points: &[CalibrationPoint]) -> LinearModel {
    if points.len() < 2 {
        return LinearModel::ZERO;
    }

    let x_mean = mean(points.iter().map(|p| p.signal));
    let y_mean = mean(points.iter().map(|p| p.reference));
    let x_scale = spread(points.iter().map(|p| p.signal), x_mean);
    let y_scale = spread(points.iter().map(|p| p.reference), y_mean);

    let first_signal = points[0].signal;
    let flat_signal = points.iter().all(|p| p.signal == first_signal);
    let degenerate = |scale: f64| scale == 0.0 || !scale.is_finite();

    let slope = if flat_signal || degenerate(x_scale) || degenerate(y_scale) {
        0.0
    } else {
        let (sum_xx, sum_xy) = points.iter().fold((0.0, 0.0), |(sum_xx, sum_xy), p| {
            let dx = (p.signal - x_mean) / x_scale;
            let dy = (p.reference - y_mean) / y_scale;
            (sum_xx + dx * dx, sum_xy + dx * dy)
        });
        (sum_xy / sum_xx) * (y_scale / x_scale)
    };

    let intercept = y_mean - slope * x_mean;
    let (slope, intercept) = if slope.is_finite() && intercept.is_finite() {
        (slope, intercept)
    } else {
        (0.0, y_mean)
    };

    LinearModel {
        slope,
        intercept,
        r_squared: r_squared(points, slope, intercept),
    }
}

/// Mean that stays finite when the plain sum would overflow.
fn mean(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let (count, sum) = values.clone().fold((0usize, 0.0), |(n, sum), v| (n + 1, sum + v));
    let n = count as f64;
    if sum.is_finite() {
        sum / n
    } else {
        values.map(|v| v / n).sum()
    }
}

/// Largest absolute deviation from `center`.
fn spread(values: impl Iterator<Item = f64>, center: f64) -> f64 {
    values.fold(0.0, |max: f64, v| max.max((v - center).abs()))
}

fn r_squared(points: &[CalibrationPoint], slope: f64, intercept: f64) -> f64 {
    let y_mean = mean(points.iter().map(|p| p.reference));
    let scale = spread(points.iter().map(|p| p.reference), y_mean);
    if scale == 0.0 {
        return 1.0;
    }

    let (ss_total, ss_residual) = points.iter().fold((0.0, 0.0), |(total, residual), p| {
        let deviation = (p.reference - y_mean) / scale;
        let error = (p.reference - (slope * p.signal + intercept)) / scale;
        (total + deviation * deviation, residual + error * error)
    });

    let r_squared = 1.0 - ss_residual / ss_total;
    if r_squared.is_nan() {
        0.0
    } else {
        r_squared.clamp(f64::MIN, 1.0)
    }
}

/// Convert a raw signal to a physical value that is safe to display.
pub fn convert(model: &LinearModel, signal: f64, range: &DisplayRange) -> f64 {
    range.clamp(model.predict(signal))
}

/// Copy of `points` with the signal at `index` replaced; references are untouched.
pub fn update_point(
    points: &[CalibrationPoint],
    index: usize,
    new_signal: f64,
) -> Result<Vec<CalibrationPoint>, CalibrationError> {
    if index >= points.len() {
        return Err(CalibrationError::IndexOutOfRange {
            index,
            len: points.len(),
        });
    }

    let mut updated = points.to_vec();
    updated[index].signal = new_signal;
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_fit_insufficient_points() {
        assert_eq!(fit(&[]), LinearModel::ZERO);
        assert_eq!(fit(&[CalibrationPoint::new(12.0, 40.0)]), LinearModel::ZERO);
    }

    #[test]
    fn test_fit_two_points() {
        let model = fit(&[CalibrationPoint::new(10.0, 100.0), CalibrationPoint::new(20.0, 200.0)]);
        assert_eq!(model.slope, 10.0);
        assert_eq!(model.intercept, 0.0);
        assert_eq!(model.r_squared, 1.0);
        assert_eq!(convert(&model, 15.0, &DisplayRange::default()), 150.0);
    }

    #[test]
    fn test_fit_passes_through_any_two_distinct_points() {
        let cases = [
            ((1.5, -3.0), (4.0, 7.25)),
            ((-20.0, 0.5), (33.0, 0.5)),
            ((1200.0, 480.0), (1900.0, 210.0)),
        ];
        for ((x1, y1), (x2, y2)) in cases {
            let model = fit(&[CalibrationPoint::new(x1, y1), CalibrationPoint::new(x2, y2)]);
            assert!(approx(model.predict(x1), y1), "{model:?}");
            assert!(approx(model.predict(x2), y2), "{model:?}");
            assert!(approx(model.r_squared, 1.0));
        }
    }

    #[test]
    fn test_fit_default_seed_is_flat_mean() {
        let model = fit(&default_points());
        assert_eq!(model.slope, 0.0);
        assert_eq!(model.intercept, 350.0);
        // Flat line through the mean explains none of the variance.
        assert_eq!(model.r_squared, 0.0);
        assert!(model.r_squared.is_finite());
    }

    #[test]
    fn test_fit_huge_signals_keep_exact_line() {
        let model = fit(&[CalibrationPoint::new(1e160, 1.0), CalibrationPoint::new(2e160, 2.0)]);
        assert!((model.slope * 1e160 - 1.0).abs() < 1e-9, "{model:?}");
        assert!(model.intercept.abs() < 1e-9, "{model:?}");
        assert!(approx(model.r_squared, 1.0), "{model:?}");
        assert!(approx(model.predict(1.5e160), 1.5));
    }

    #[test]
    fn test_fit_huge_references_stay_finite() {
        let points = [
            CalibrationPoint::new(0.0, 1e200),
            CalibrationPoint::new(1.0, -1e200),
            CalibrationPoint::new(2.0, 1e200),
        ];
        let model = fit(&points);
        assert_eq!(model.slope, 0.0);
        assert!(model.intercept.is_finite());
        assert!(((model.intercept - 1e200 / 3.0) / 1e200).abs() < 1e-12);
        assert!(model.r_squared.is_finite());
        assert!(model.r_squared.abs() < 1e-9, "{model:?}");
    }

    #[test]
    fn test_fit_extreme_finite_inputs_never_nan() {
        let extremes = [f64::MAX, -f64::MAX, f64::MIN_POSITIVE, 0.0, 1e-300, -1e300];
        for &x1 in &extremes {
            for &y1 in &extremes {
                let points = [
                    CalibrationPoint::new(x1, y1),
                    CalibrationPoint::new(1.0, -y1),
                    CalibrationPoint::new(-x1, 2.0),
                ];
                let model = fit(&points);
                assert!(model.slope.is_finite(), "{points:?} -> {model:?}");
                assert!(model.intercept.is_finite(), "{points:?} -> {model:?}");
                assert!(model.r_squared.is_finite() && model.r_squared <= 1.0, "{points:?} -> {model:?}");
            }
        }
    }

    #[test]
    fn test_fit_constant_signal() {
        let points = [
            CalibrationPoint::new(0.1, 10.0),
            CalibrationPoint::new(0.1, 20.0),
            CalibrationPoint::new(0.1, 60.0),
        ];
        let model = fit(&points);
        assert_eq!(model.slope, 0.0);
        assert!(approx(model.intercept, 30.0));
        assert!(model.r_squared.is_finite());
    }

    #[test]
    fn test_fit_constant_reference_scores_one() {
        let points = [
            CalibrationPoint::new(5.0, 42.0),
            CalibrationPoint::new(5.0, 42.0),
            CalibrationPoint::new(5.0, 42.0),
        ];
        let model = fit(&points);
        assert_eq!(model.intercept, 42.0);
        assert_eq!(model.r_squared, 1.0);
    }

    #[test]
    fn test_fit_noisy_line() {
        let points = [
            CalibrationPoint::new(1.0, 31.0),
            CalibrationPoint::new(2.0, 58.5),
            CalibrationPoint::new(3.0, 84.0),
            CalibrationPoint::new(4.0, 112.5),
            CalibrationPoint::new(5.0, 139.0),
        ];
        let model = fit(&points);
        assert!((model.slope - 27.0).abs() < 0.5);
        assert!(model.r_squared > 0.99 && model.r_squared <= 1.0);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let points = [
            CalibrationPoint::new(812.3, 200.0),
            CalibrationPoint::new(901.7, 250.0),
            CalibrationPoint::new(1003.2, 300.0),
            CalibrationPoint::new(901.7, 251.0),
        ];
        let first = fit(&points);
        let second = fit(&points);
        assert_eq!(first.slope.to_bits(), second.slope.to_bits());
        assert_eq!(first.intercept.to_bits(), second.intercept.to_bits());
        assert_eq!(first.r_squared.to_bits(), second.r_squared.to_bits());
    }

    #[test]
    fn test_convert_stays_in_range() {
        let range = DisplayRange::default();
        let models = [
            LinearModel::ZERO,
            LinearModel::with_parameters(1e300, -1e300, &[]),
            LinearModel::with_parameters(-4.2, 9000.0, &[]),
            LinearModel::with_parameters(f64::INFINITY, 0.0, &[]),
            LinearModel::with_parameters(f64::NAN, f64::NAN, &[]),
        ];
        let signals = [0.0, -1.0, 15.0, 1e308, -1e308, f64::INFINITY, f64::NAN];
        for model in &models {
            for &signal in &signals {
                let value = convert(model, signal, &range);
                assert!(value >= range.min && value <= range.max, "{model:?} {signal} -> {value}");
            }
        }
    }

    #[test]
    fn test_display_range_rejects_inverted_bounds() {
        assert_eq!(
            DisplayRange::new(10.0, 0.0),
            Err(CalibrationError::InvalidRange { min: 10.0, max: 0.0 })
        );
        assert!(DisplayRange::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_update_point_out_of_range() {
        let points = default_points();
        let err = update_point(&points, points.len(), 1.0).unwrap_err();
        assert_eq!(err, CalibrationError::IndexOutOfRange { index: 7, len: 7 });
    }

    #[test]
    fn test_update_point_touches_only_signal() {
        let points = default_points();
        let updated = update_point(&points, 2, 950.5).unwrap();
        assert_eq!(updated.len(), points.len());
        assert_eq!(updated[2], CalibrationPoint::new(950.5, 300.0));
        for (i, (before, after)) in points.iter().zip(&updated).enumerate() {
            if i != 2 {
                assert_eq!(before, after);
            }
        }
        // The input collection is left alone.
        assert_eq!(points[2].signal, 0.0);
    }

    #[test]
    fn test_point_wire_names() {
        let json = serde_json::to_value(CalibrationPoint::new(1.0, 31.0)).unwrap();
        assert_eq!(json, serde_json::json!({ "x": 1.0, "y": 31.0 }));
    }

    #[test]
    fn test_with_parameters_scores_against_points() {
        let points = [CalibrationPoint::new(1.0, 2.0), CalibrationPoint::new(2.0, 4.0)];
        let model = LinearModel::with_parameters(2.0, 0.0, &points);
        assert_eq!(model.r_squared, 1.0);
    }
}
