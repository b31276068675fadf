use risk_core::{FEATURE_COUNT, FeatureScaler, RiskClassifier};

use crate::data::LabeledSample;

pub const EPOCHS: usize = 500;
pub const LEARNING_RATE: f64 = 0.5;

/// Fit per-feature standardization statistics on the training split.
/// Population (not sample) standard deviation, matching what the scorer
/// divides by at prediction time.
pub fn fit_scaler(samples: &[LabeledSample]) -> FeatureScaler {
    let count = samples.len().max(1) as f64;

    let mut mean = [0.0; FEATURE_COUNT];
    for sample in samples {
        for (total, value) in mean.iter_mut().zip(sample.features) {
            *total += value;
        }
    }
    for total in &mut mean {
        *total /= count;
    }

    let mut std = [0.0; FEATURE_COUNT];
    for sample in samples {
        for ((total, value), mean) in std.iter_mut().zip(sample.features).zip(mean) {
            let deviation = value - mean;
            *total += deviation * deviation;
        }
    }
    for total in &mut std {
        *total = (*total / count).sqrt();
    }

    FeatureScaler { mean, std }
}

/// Fit the logistic head by batch gradient descent on the standardized
/// training split.
pub fn fit_classifier(scaler: &FeatureScaler, samples: &[LabeledSample]) -> RiskClassifier {
    let scaled: Vec<([f64; FEATURE_COUNT], f64)> = samples
        .iter()
        .map(|sample| {
            (
                scaler.transform(&sample.features),
                if sample.high_risk { 1.0 } else { 0.0 },
            )
        })
        .collect();

    let mut model = RiskClassifier {
        weights: [0.0; FEATURE_COUNT],
        intercept: 0.0,
    };
    let count = scaled.len().max(1) as f64;

    for _ in 0..EPOCHS {
        let mut weight_grads = [0.0; FEATURE_COUNT];
        let mut intercept_grad = 0.0;

        for (features, target) in &scaled {
            let error = model.predict_proba(features)[1] - target;
            for (grad, value) in weight_grads.iter_mut().zip(features) {
                *grad += error * value;
            }
            intercept_grad += error;
        }

        for (weight, grad) in model.weights.iter_mut().zip(weight_grads) {
            *weight -= LEARNING_RATE * grad / count;
        }
        model.intercept -= LEARNING_RATE * intercept_grad / count;
    }

    model
}

/// Share of samples whose hard 0.5-threshold prediction matches the label.
pub fn accuracy(scaler: &FeatureScaler, model: &RiskClassifier, samples: &[LabeledSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }

    let correct = samples
        .iter()
        .filter(|sample| {
            let proba = model.predict_proba(&scaler.transform(&sample.features));
            (proba[1] > 0.5) == sample.high_risk
        })
        .count();

    correct as f64 / samples.len() as f64
}
