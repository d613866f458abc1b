//! Equal-width binning of scenario P&L outcomes.

use serde::Serialize;

use crate::types::SCENARIO_WINDOW;

/// Number of buckets the scenario chart is drawn with.
pub const BUCKET_COUNT: usize = 24;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Histogram {
    /// `"start ~ end"`, two decimals, one per bucket.
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
    /// Number of input values.
    pub total: usize,
}

impl Histogram {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Index and count of the fullest bucket (first one on ties).
    pub fn peak(&self) -> Option<(usize, usize)> {
        self.counts
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, c)| match best {
                Some((_, bc)) if bc >= c => best,
                _ => Some((i, c)),
            })
    }

    pub fn footer(&self) -> String {
        format!("シナリオ件数: {}件 / {}件", self.total, SCENARIO_WINDOW)
    }
}

pub fn bin_scenarios(values: &[f64]) -> Histogram {
    bin_values(values, BUCKET_COUNT)
}

/// Partition `[min, max]` into `bucket_count` half-open buckets of width
/// `(max - min) / bucket_count`. A zero range is treated as a range of 1, so the
/// width becomes `1 / bucket_count`. Indices are clamped
/// to the last bucket so `max` lands in it.
pub fn bin_values(values: &[f64], bucket_count: usize) -> Histogram {
    if values.is_empty() || bucket_count == 0 {
        return Histogram {
            labels: Vec::new(),
            counts: Vec::new(),
            total: values.len(),
        };
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    let safe_range = if range == 0.0 || !range.is_finite() { 1.0 } else { range };
    let width = safe_range / bucket_count as f64;

    let mut counts = vec![0usize; bucket_count];
    for &value in values {
        counts[bucket_index(value, min, width, bucket_count)] += 1;
    }

    let labels = (0..bucket_count)
        .map(|i| {
            let start = min + width * i as f64;
            let end = start + width;
            format!("{:.2} ~ {:.2}", start, end)
        })
        .collect();

    Histogram {
        labels,
        counts,
        total: values.len(),
    }
}

fn bucket_index(value: f64, min: f64, width: f64, bucket_count: usize) -> usize {
    let raw = ((value - min) / width).floor();
    // NaN casts to 0
    let idx = raw.max(0.0) as usize;
    idx.min(bucket_count - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_gives_empty_buckets() {
        let h = bin_scenarios(&[]);
        assert!(h.labels.is_empty());
        assert!(h.counts.is_empty());
        assert_eq!(h.total, 0);
        assert!(h.peak().is_none());
    }

    #[test]
    fn identical_values_land_in_first_bucket() {
        let h = bin_scenarios(&[3.5; 10]);
        assert_eq!(h.counts.len(), BUCKET_COUNT);
        assert_eq!(h.counts[0], 10);
        assert_eq!(h.counts.iter().sum::<usize>(), 10);
        // width substitutes to 1 / 24
        assert_eq!(h.labels[0], "3.50 ~ 3.54");
        assert_eq!(h.labels[BUCKET_COUNT - 1], "4.46 ~ 4.50");
    }

    #[test]
    fn two_cluster_example() {
        let h = bin_scenarios(&[1.0, 1.0, 1.0, 1.0, 5.0, 5.0]);
        assert_eq!(h.counts[0], 4);
        assert_eq!(h.counts[23], 2);
        assert_eq!(h.counts[1..23].iter().sum::<usize>(), 0);
        assert_eq!(h.total, 6);
        assert_eq!(h.labels[0], "1.00 ~ 1.17");
        assert_eq!(h.labels[23], "4.83 ~ 5.00");
    }

    #[test]
    fn max_value_maps_to_last_bucket() {
        let values: Vec<f64> = (0..=240).map(|i| i as f64 * 0.1 - 3.0).collect();
        let h = bin_scenarios(&values);
        assert_eq!(h.counts.iter().sum::<usize>(), values.len());
        assert!(h.counts[23] >= 1);
        assert_eq!(h.labels.len(), 24);
    }

    #[test]
    fn custom_bucket_count() {
        let h = bin_values(&[0.0, 1.0, 2.0, 3.0], 2);
        assert_eq!(h.counts, vec![2, 2]);
        assert_eq!(h.labels, vec!["0.00 ~ 1.50", "1.50 ~ 3.00"]);
    }

    #[test]
    fn peak_prefers_first_on_ties() {
        let h = bin_values(&[0.0, 0.0, 3.0, 3.0], 2);
        assert_eq!(h.peak(), Some((0, 2)));
        assert_eq!(h.footer(), "シナリオ件数: 4件 / 800件");
    }
}
