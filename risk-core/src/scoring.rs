use serde::{Deserialize, Serialize};

use crate::vitals::FEATURE_COUNT;

/// Fitted per-column standardization applied before classification.
///
/// `mean` and `std` come from the offline fit over the training split and
/// must line up with [`crate::vitals::FEATURE_ORDER`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    pub mean: [f64; FEATURE_COUNT],
    pub std: [f64; FEATURE_COUNT],
}

impl FeatureScaler {
    /// Standardize a feature vector: `(x - mean) / std` per column.
    ///
    /// A column fitted with zero spread divides by 1.0, matching the
    /// behavior of the fitting procedure that produced the artifact.
    pub fn transform(&self, features: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        std::array::from_fn(|i| {
            let scale = if self.std[i] == 0.0 { 1.0 } else { self.std[i] };
            (features[i] - self.mean[i]) / scale
        })
    }
}

/// Fitted binary classifier over the standardized features.
///
/// A logistic model: the positive-class probability is
/// `sigmoid(weights . x + intercept)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskClassifier {
    pub weights: [f64; FEATURE_COUNT],
    pub intercept: f64,
}

impl RiskClassifier {
    /// Probability mass per class, `[negative, positive]`. Always sums to 1.
    pub fn predict_proba(&self, features: &[f64; FEATURE_COUNT]) -> [f64; 2] {
        let logit: f64 = self
            .weights
            .iter()
            .zip(features)
            .map(|(weight, value)| weight * value)
            .sum::<f64>()
            + self.intercept;
        let positive = sigmoid(logit);
        [1.0 - positive, positive]
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Output of one scoring pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskPrediction {
    /// Probability mass assigned to the positive (high-risk) class.
    pub prediction: f64,
    /// Maximum class probability.
    pub confidence: f64,
}

/// Process-lifetime scoring service: standardizes a feature vector and runs
/// the fitted classifier on it.
///
/// Read-only after construction; share it across requests behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    scaler: FeatureScaler,
    classifier: RiskClassifier,
}

impl RiskScorer {
    pub fn new(scaler: FeatureScaler, classifier: RiskClassifier) -> Self {
        Self { scaler, classifier }
    }

    /// Score one feature vector.
    pub fn score(&self, features: &[f64; FEATURE_COUNT]) -> RiskPrediction {
        let scaled = self.scaler.transform(features);
        let proba = self.classifier.predict_proba(&scaled);

        RiskPrediction {
            prediction: proba[1],
            confidence: proba[0].max(proba[1]),
        }
    }
}
