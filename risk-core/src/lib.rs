pub mod artifacts;
pub mod catalog;
pub mod error;
pub mod imaging;
pub mod recommend;
pub mod scoring;
pub mod vitals;

// Re-export commonly used types
pub use artifacts::{ModelArtifacts, MODEL_FILE, SCALER_FILE};
pub use catalog::{classify_tier, recommendations_for, RiskTier};
pub use error::{Result, RiskError};
pub use imaging::{
    prepare_image, ImageAnalysisResult, ImageAnalyzer, ImageFindings, ImageScorer, ImageTensor,
    Modality,
};
pub use recommend::recommended_tests;
pub use scoring::{FeatureScaler, RiskClassifier, RiskPrediction, RiskScorer};
pub use vitals::{VitalsInput, FEATURE_COUNT, FEATURE_ORDER};
