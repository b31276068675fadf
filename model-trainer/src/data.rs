use anyhow::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use risk_core::FEATURE_COUNT;

pub const DEFAULT_SAMPLES: usize = 1000;
pub const DEFAULT_SEED: u64 = 42;

/// One synthetic patient: the eight vitals features plus the label.
#[derive(Debug, Clone)]
pub struct LabeledSample {
    pub features: [f64; FEATURE_COUNT],
    pub high_risk: bool,
}

/// Draw a synthetic cohort from fixed per-feature distributions.
///
/// Labels follow a linear risk score over the standardized deviations of
/// every vital except gender, so the cohort is separable by construction
/// and gender never influences the label.
pub fn generate_cohort(samples: usize, seed: u64) -> Result<Vec<LabeledSample>> {
    let mut rng = StdRng::seed_from_u64(seed);

    let age = Normal::new(45.0, 15.0)?;
    let blood_pressure = Normal::new(120.0, 15.0)?;
    let heart_rate = Normal::new(75.0, 10.0)?;
    let temperature = Normal::new(37.0, 0.5)?;
    let cholesterol = Normal::new(200.0, 30.0)?;
    let glucose = Normal::new(100.0, 15.0)?;
    let bmi = Normal::new(25.0, 5.0)?;

    let mut cohort = Vec::with_capacity(samples);
    for _ in 0..samples {
        let features = [
            age.sample(&mut rng),
            if rng.random_bool(0.5) { 1.0 } else { 0.0 },
            blood_pressure.sample(&mut rng),
            heart_rate.sample(&mut rng),
            temperature.sample(&mut rng),
            cholesterol.sample(&mut rng),
            glucose.sample(&mut rng),
            bmi.sample(&mut rng),
        ];
        cohort.push(LabeledSample {
            high_risk: high_risk_label(&features),
            features,
        });
    }

    Ok(cohort)
}

/// Linear risk score over standardized deviations from the distribution
/// means. Gender carries no weight.
fn risk_score(features: &[f64; FEATURE_COUNT]) -> f64 {
    let [age, _gender, blood_pressure, heart_rate, temperature, cholesterol, glucose, bmi] =
        *features;

    0.1 * ((age - 45.0) / 15.0
        + (blood_pressure - 120.0) / 15.0
        + (heart_rate - 75.0) / 10.0
        + (temperature - 37.0) / 0.5
        + (cholesterol - 200.0) / 30.0
        + (glucose - 100.0) / 15.0
        + (bmi - 25.0) / 5.0)
}

fn high_risk_label(features: &[f64; FEATURE_COUNT]) -> bool {
    risk_score(features) > 0.5
}

/// Shuffled train/test split. The same seed always yields the same split.
pub fn split_cohort(
    mut cohort: Vec<LabeledSample>,
    train_fraction: f64,
    seed: u64,
) -> (Vec<LabeledSample>, Vec<LabeledSample>) {
    let mut rng = StdRng::seed_from_u64(seed);
    cohort.shuffle(&mut rng);

    let train_len = (cohort.len() as f64 * train_fraction).round() as usize;
    let test = cohort.split_off(train_len.min(cohort.len()));
    (cohort, test)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cohorts_are_deterministic_per_seed() {
        let first = generate_cohort(50, DEFAULT_SEED).unwrap();
        let second = generate_cohort(50, DEFAULT_SEED).unwrap();
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.features, b.features);
            assert_eq!(a.high_risk, b.high_risk);
        }

        let reseeded = generate_cohort(50, 7).unwrap();
        assert!(
            first
                .iter()
                .zip(&reseeded)
                .any(|(a, b)| a.features != b.features)
        );
    }

    #[test]
    fn gender_never_moves_the_risk_score() {
        let cohort = generate_cohort(200, DEFAULT_SEED).unwrap();
        for sample in &cohort {
            let mut flipped = sample.features;
            flipped[1] = 1.0 - flipped[1];
            assert_eq!(risk_score(&flipped), risk_score(&sample.features));
        }
    }

    #[test]
    fn labels_follow_the_risk_score() {
        let baseline = [45.0, 0.0, 120.0, 75.0, 37.0, 200.0, 100.0, 25.0];
        assert_eq!(risk_score(&baseline), 0.0);
        assert!(!high_risk_label(&baseline));

        let mut elevated = baseline;
        // blood pressure six deviations out carries the label on its own
        elevated[2] = 120.0 + 15.0 * 6.0;
        assert!(high_risk_label(&elevated));
    }

    #[test]
    fn high_risk_share_of_the_cohort_is_small() {
        let cohort = generate_cohort(DEFAULT_SAMPLES, DEFAULT_SEED).unwrap();
        let positives = cohort.iter().filter(|s| s.high_risk).count();

        assert!(positives > 0, "cohort needs positive examples");
        assert!(positives < cohort.len() / 4, "positives: {positives}");
    }

    #[test]
    fn split_respects_the_train_fraction() {
        let cohort = generate_cohort(DEFAULT_SAMPLES, DEFAULT_SEED).unwrap();
        let positives = cohort.iter().filter(|s| s.high_risk).count();

        let (train, test) = split_cohort(cohort, 0.8, DEFAULT_SEED);
        assert_eq!(train.len(), 800);
        assert_eq!(test.len(), 200);

        let split_positives = train.iter().chain(&test).filter(|s| s.high_risk).count();
        assert_eq!(split_positives, positives);
    }
}
