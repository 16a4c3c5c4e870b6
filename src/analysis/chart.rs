//! Pie chart data for the top predictions

use super::Prediction;

/// Slice colours as RGB, in slice order. The last one is reserved for "Others".
pub const SLICE_COLORS: [[u8; 3]; 4] = [[255, 99, 132], [54, 162, 235], [255, 205, 86], [97, 96, 96]];

pub const CHART_TITLE: &str = "Top 3 Predictions";

#[derive(Debug, Clone, PartialEq)]
pub struct PieSlice {
    pub label: String,
    /// Share of the pie, rounded to two significant digits
    pub value: f64,
    pub color: [u8; 3],
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieChart {
    pub title: String,
    pub slices: Vec<PieSlice>,
}

impl PieChart {
    /// One slice per prediction plus a trailing "Others" slice for the remainder
    pub fn from_predictions(predictions: &[Prediction]) -> Self {
        let mut slices: Vec<PieSlice> = predictions
            .iter()
            .enumerate()
            .map(|(i, pred)| {
                let value = round_significant(pred.probability as f64, 2);
                PieSlice {
                    label: format!("{} ({})", pred.class_name, value),
                    value,
                    color: SLICE_COLORS[i.min(SLICE_COLORS.len() - 2)],
                }
            })
            .collect();

        let shown: f64 = slices.iter().map(|s| s.value).sum();
        let others = round_significant(1.0 - shown, 2);
        slices.push(PieSlice {
            label: format!("Others ({})", others),
            value: others,
            color: SLICE_COLORS[SLICE_COLORS.len() - 1],
        });

        Self {
            title: CHART_TITLE.to_string(),
            slices,
        }
    }

    /// Drawable fraction of the full circle for each slice.
    ///
    /// Negative values (rounding can push "Others" slightly below zero) count as empty.
    pub fn fractions(&self) -> Vec<f64> {
        let total: f64 = self.slices.iter().map(|s| s.value.max(0.0)).sum();
        if total <= 0.0 {
            return vec![0.0; self.slices.len()];
        }
        self.slices.iter().map(|s| s.value.max(0.0) / total).collect()
    }
}

/// Round to `digits` significant digits
pub fn round_significant(value: f64, digits: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let power = digits as i32 - 1 - magnitude;
    let factor = 10f64.powi(power.abs());
    if power >= 0 {
        (value * factor).round() / factor
    } else {
        (value / factor).round() * factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(name: &str, probability: f32, index: usize) -> Prediction {
        Prediction {
            class_name: name.to_string(),
            probability,
            index,
        }
    }

    #[test]
    fn test_round_significant() {
        assert_eq!(round_significant(0.123456, 2), 0.12);
        assert_eq!(round_significant(0.0456, 2), 0.046);
        assert_eq!(round_significant(0.999, 2), 1.0);
        assert_eq!(round_significant(123.0, 2), 120.0);
        assert_eq!(round_significant(0.0, 2), 0.0);
        assert_eq!(round_significant(-0.0123, 2), -0.012);
    }

    #[test]
    fn test_chart_slices_and_labels() {
        let chart = PieChart::from_predictions(&[
            prediction("seven", 0.71234, 7),
            prediction("one", 0.2049, 1),
            prediction("nine", 0.04, 9),
        ]);

        assert_eq!(chart.title, "Top 3 Predictions");
        assert_eq!(chart.slices.len(), 4);
        assert_eq!(chart.slices[0].label, "seven (0.71)");
        assert_eq!(chart.slices[1].label, "one (0.2)");
        assert_eq!(chart.slices[2].label, "nine (0.04)");
        assert_eq!(chart.slices[3].label, "Others (0.05)");
        assert_eq!(chart.slices[3].color, [97, 96, 96]);
        assert_eq!(chart.slices[0].color, [255, 99, 132]);
    }

    #[test]
    fn test_fractions_sum_to_one() {
        let chart = PieChart::from_predictions(&[
            prediction("a", 0.5, 0),
            prediction("b", 0.3, 1),
            prediction("c", 0.15, 2),
        ]);

        let sum: f64 = chart.fractions().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_negative_others_is_empty_slice() {
        // Rounded values exceed 1.0
        let chart = PieChart::from_predictions(&[
            prediction("a", 0.996, 0),
            prediction("b", 0.0049, 1),
        ]);

        let others = chart.slices.last().unwrap();
        assert!(others.value < 0.0);
        assert_eq!(*chart.fractions().last().unwrap(), 0.0);
    }
}
