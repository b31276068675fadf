use risk_core::ImageAnalysisResult;
use serde::{Deserialize, Serialize};

/// Response body of the vitals risk endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Probability of the high-risk class.
    pub prediction: f64,
    pub confidence: f64,
    pub recommended_tests: Vec<String>,
}

/// Response body of the image analysis endpoints. Analysis failures are
/// carried inside `results` as an error record, not as an HTTP error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageAnalysisResponse {
    pub results: ImageAnalysisResult,
    pub recommendations: Vec<String>,
    pub confidence: f64,
}
