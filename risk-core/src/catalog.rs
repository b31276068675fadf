use serde::{Deserialize, Serialize};

use crate::imaging::{ImageAnalysisResult, Modality};

/// Risk tier derived from an image analysis. Drives which recommendation
/// triple the caller hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Map an analysis result to its risk tier.
///
/// The error record and any absent probability field read as zero, so a
/// failed analysis always lands in the low tier. Thresholds are strict:
/// a probability of exactly 0.5 or 0.7 stays in the lower tier.
pub fn classify_tier(modality: Modality, result: &ImageAnalysisResult) -> RiskTier {
    let Some(findings) = result.findings() else {
        return RiskTier::Low;
    };

    let peak = match modality {
        Modality::ChestXray => findings
            .probability("pneumonia_probability")
            .max(findings.probability("tuberculosis_probability")),
        Modality::SkinCancer => findings.probability("malignant_probability"),
        Modality::BrainTumor => findings.probability("tumor_probability"),
    };

    if peak > 0.7 {
        RiskTier::High
    } else if peak > 0.5 {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Clinical follow-up catalog: three fixed recommendations per modality
/// and tier.
pub fn recommendations_for(modality: Modality, tier: RiskTier) -> [&'static str; 3] {
    match (modality, tier) {
        (Modality::ChestXray, RiskTier::High) => [
            "Schedule a follow-up with a pulmonologist",
            "Get a CT scan for detailed analysis",
            "Consider blood tests for infection markers",
        ],
        (Modality::ChestXray, RiskTier::Medium) => [
            "Schedule a follow-up with your primary care physician",
            "Monitor symptoms and vital signs",
            "Consider a second opinion",
        ],
        (Modality::ChestXray, RiskTier::Low) => [
            "Regular check-ups",
            "Maintain healthy lifestyle",
            "Monitor for any changes",
        ],
        (Modality::SkinCancer, RiskTier::High) => [
            "Schedule an appointment with a dermatologist",
            "Consider a biopsy",
            "Monitor for changes in size or color",
        ],
        (Modality::SkinCancer, RiskTier::Medium) => [
            "Regular skin checks",
            "Protect from sun exposure",
            "Consider a second opinion",
        ],
        (Modality::SkinCancer, RiskTier::Low) => [
            "Regular skin monitoring",
            "Use sunscreen",
            "Annual skin check",
        ],
        (Modality::BrainTumor, RiskTier::High) => [
            "Schedule an appointment with a neurologist",
            "Get an MRI scan",
            "Monitor for neurological symptoms",
        ],
        (Modality::BrainTumor, RiskTier::Medium) => [
            "Schedule a follow-up scan",
            "Monitor for symptoms",
            "Consider a second opinion",
        ],
        (Modality::BrainTumor, RiskTier::Low) => [
            "Regular check-ups",
            "Monitor for any changes",
            "Maintain healthy lifestyle",
        ],
    }
}
