//! Randomized checks of the histogram binner over seeded inputs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use varwatch::histogram::{bin_scenarios, bin_values, BUCKET_COUNT};
use varwatch::sample::build_sample_scenario_distribution;
use varwatch::types::SCENARIO_WINDOW;

fn random_values(rng: &mut StdRng) -> Vec<f64> {
    let len = rng.gen_range(1..=1200);
    let center: f64 = rng.gen_range(-50.0..50.0);
    let spread: f64 = rng.gen_range(0.0..20.0);
    (0..len).map(|_| center + rng.gen_range(-1.0..1.0) * spread).collect()
}

#[test]
fn counts_are_conserved() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..200 {
        let values = random_values(&mut rng);
        let h = bin_scenarios(&values);
        assert_eq!(h.counts.len(), BUCKET_COUNT);
        assert_eq!(h.labels.len(), BUCKET_COUNT);
        assert_eq!(h.counts.iter().sum::<usize>(), values.len());
        assert_eq!(h.total, values.len());
    }
}

#[test]
fn maximum_lands_in_last_bucket_and_minimum_in_first() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let values = random_values(&mut rng);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        if max == min {
            continue;
        }
        let h = bin_values(&[min, max], BUCKET_COUNT);
        assert_eq!(h.counts[0], 1);
        assert_eq!(h.counts[BUCKET_COUNT - 1], 1);

        let full = bin_scenarios(&values);
        assert!(full.counts[0] >= 1);
        assert!(full.counts[BUCKET_COUNT - 1] >= 1);
    }
}

#[test]
fn arbitrary_bucket_counts_cover_every_value() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let values = random_values(&mut rng);
        let buckets = rng.gen_range(1..64);
        let h = bin_values(&values, buckets);
        assert_eq!(h.counts.len(), buckets);
        assert_eq!(h.counts.iter().sum::<usize>(), values.len());
    }
}

#[test]
fn sample_distributions_bin_completely() {
    for ric in ["ALL_ASSETS", "JP_EQ_LARGE", "US_RATES_CORE", "X"] {
        let dist = build_sample_scenario_distribution(ric, SCENARIO_WINDOW);
        let h = bin_scenarios(&dist.values);
        assert_eq!(h.counts.iter().sum::<usize>(), SCENARIO_WINDOW);
        assert!(h.counts[0] >= 1 && h.counts[BUCKET_COUNT - 1] >= 1);
        assert_eq!(bin_scenarios(&dist.values), h);
    }
}
