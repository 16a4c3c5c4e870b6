//! Prediction analysis
//!
//! Ranks raw model scores against the label list and shapes the result for
//! the pie chart.

pub mod chart;

pub use chart::PieChart;

use std::cmp::Ordering;

/// One ranked class
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub class_name: String,
    pub probability: f32,
    /// Position of the class in the model output
    pub index: usize,
}

/// Pair each score with its label and keep the `k` most probable.
///
/// Sorting is stable, so equal scores keep model-output order. Scores beyond
/// the end of the label list are named by their index.
pub fn top_k(scores: &[f32], labels: &[String], k: usize) -> Vec<Prediction> {
    let mut predictions: Vec<Prediction> = scores
        .iter()
        .enumerate()
        .map(|(index, &probability)| Prediction {
            class_name: labels
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("class {}", index)),
            probability,
            index,
        })
        .collect();

    predictions.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(Ordering::Equal)
    });
    predictions.truncate(k);
    predictions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_top_k_sorted_descending() {
        let scores = [0.05, 0.6, 0.1, 0.25];
        let top = top_k(&scores, &labels(&["zero", "one", "two", "three"]), 3);

        assert_eq!(top.len(), 3);
        assert_eq!(top[0].class_name, "one");
        assert_eq!(top[0].index, 1);
        assert_eq!(top[1].class_name, "three");
        assert_eq!(top[2].class_name, "two");
        assert!(top.windows(2).all(|w| w[0].probability >= w[1].probability));
    }

    #[test]
    fn test_top_k_ties_keep_order() {
        let scores = [0.3, 0.3, 0.4];
        let top = top_k(&scores, &labels(&["a", "b", "c"]), 3);

        let names: Vec<&str> = top.iter().map(|p| p.class_name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_top_k_fewer_scores_than_k() {
        let top = top_k(&[0.9, 0.1], &labels(&["yes", "no"]), 3);
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn test_top_k_unlabelled_scores() {
        let top = top_k(&[0.1, 0.9], &labels(&["only"]), 1);
        assert_eq!(top[0].class_name, "class 1");
    }
}
