use serde::{Deserialize, Serialize};

/// Number of numeric vitals fed to the scorer.
pub const FEATURE_COUNT: usize = 8;

/// Column order the scaler was fitted with. The feature vector must be
/// assembled in exactly this order or the standardization is meaningless.
pub const FEATURE_ORDER: [&str; FEATURE_COUNT] = [
    "age",
    "gender",
    "blood_pressure",
    "heart_rate",
    "temperature",
    "cholesterol",
    "glucose",
    "bmi",
];

/// Structured vitals for one prediction request.
///
/// Out-of-range physiological values are accepted as-is; the scorer sees
/// whatever the caller sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsInput {
    /// Age in years.
    pub age: f64,
    /// Binary code: 0 = female, 1 = male.
    pub gender: u8,
    pub blood_pressure: f64,
    pub heart_rate: f64,
    pub temperature: f64,
    pub cholesterol: f64,
    pub glucose: f64,
    pub bmi: f64,
    /// Reported symptoms. Accepted but not consulted by the current
    /// scoring or recommendation rules.
    pub symptoms: Vec<String>,
    /// Prior diagnoses. Accepted but not consulted, same as `symptoms`.
    #[serde(default)]
    pub previous_conditions: Vec<String>,
}

impl VitalsInput {
    /// Assemble the numeric feature vector in the fixed column order of
    /// [`FEATURE_ORDER`].
    pub fn feature_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.age,
            f64::from(self.gender),
            self.blood_pressure,
            self.heart_rate,
            self.temperature,
            self.cholesterol,
            self.glucose,
            self.bmi,
        ]
    }
}
