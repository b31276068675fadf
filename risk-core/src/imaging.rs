use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, RiskError};

/// Square edge length every image is resized to before scoring.
pub const INPUT_EDGE: u32 = 224;

/// Per-channel means of the backbone's pretraining corpus (R, G, B),
/// subtracted during normalization.
const CHANNEL_MEANS: [f32; 3] = [123.68, 116.779, 103.939];

/// Imaging modality handled by the analyzer. Each modality reads its own
/// label set and carries its own tier thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    ChestXray,
    SkinCancer,
    BrainTumor,
}

impl Modality {
    /// Probability field names reported for this modality, in slot order.
    pub fn labels(&self) -> &'static [&'static str] {
        match self {
            Modality::ChestXray => &[
                "normal_probability",
                "pneumonia_probability",
                "tuberculosis_probability",
            ],
            Modality::SkinCancer => &["benign_probability", "malignant_probability"],
            Modality::BrainTumor => &["normal_probability", "tumor_probability"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::ChestXray => "chest_xray",
            Modality::SkinCancer => "skin_cancer",
            Modality::BrainTumor => "brain_tumor",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Preprocessed image ready for scoring: a single batch entry of
/// mean-normalized RGB float data, row-major height x width x channel.
#[derive(Debug, Clone)]
pub struct ImageTensor {
    pub batch: usize,
    pub height: u32,
    pub width: u32,
    pub channels: usize,
    pub data: Vec<f32>,
}

/// Decode an image file and shape it the way the scorers expect: resize to
/// [`INPUT_EDGE`] square, convert to RGB floats, subtract the per-channel
/// means, and add a batch dimension of one.
pub fn prepare_image(path: &Path) -> Result<ImageTensor> {
    let decoded = image::open(path)
        .map_err(|err| RiskError::ImageAnalysis(format!("failed to decode image: {err}")))?;

    let resized = decoded
        .resize_exact(INPUT_EDGE, INPUT_EDGE, FilterType::Triangle)
        .to_rgb8();

    let mut data = Vec::with_capacity((INPUT_EDGE * INPUT_EDGE * 3) as usize);
    for pixel in resized.pixels() {
        for (value, mean) in pixel.0.iter().zip(CHANNEL_MEANS) {
            data.push(f32::from(*value) - mean);
        }
    }

    Ok(ImageTensor {
        batch: 1,
        height: INPUT_EDGE,
        width: INPUT_EDGE,
        channels: 3,
        data,
    })
}

/// Opaque image scorer: given a preprocessed image, return one probability
/// in [0, 1] per requested class.
///
/// Implementations must be safe for unsynchronized concurrent use; the
/// analyzer shares them across requests without locking.
pub trait ImageScorer: Send + Sync {
    fn class_probabilities(&self, input: &ImageTensor, classes: usize) -> Result<Vec<f64>>;
}

/// Deterministic stand-in for a pretrained classification backbone.
///
/// Pools per-channel statistics of the input and projects them through a
/// fixed softmax head. The output is a valid probability distribution but
/// carries no clinical calibration; a real backbone plugs in behind
/// [`ImageScorer`] without touching the analyzer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PooledStatScorer;

impl ImageScorer for PooledStatScorer {
    fn class_probabilities(&self, input: &ImageTensor, classes: usize) -> Result<Vec<f64>> {
        if classes == 0 {
            return Ok(Vec::new());
        }
        if input.data.is_empty() {
            return Err(RiskError::ImageAnalysis("empty image tensor".to_string()));
        }

        let stats = channel_stats(input);
        let logits: Vec<f64> = (0..classes)
            .map(|class| {
                stats
                    .iter()
                    .enumerate()
                    .map(|(feature, value)| head_weight(class, feature) * value)
                    .sum()
            })
            .collect();

        Ok(softmax(&logits))
    }
}

/// Mean and standard deviation per channel, rescaled into unit range.
fn channel_stats(input: &ImageTensor) -> [f64; 6] {
    let channels = input.channels.max(1);
    let mut sums = vec![0.0f64; channels];
    let mut squares = vec![0.0f64; channels];
    let mut pixels = 0usize;

    for pixel in input.data.chunks_exact(channels) {
        for (channel, value) in pixel.iter().enumerate() {
            let value = f64::from(*value);
            sums[channel] += value;
            squares[channel] += value * value;
        }
        pixels += 1;
    }

    let count = pixels.max(1) as f64;
    std::array::from_fn(|i| {
        if i < 3 {
            let mean = sums.get(i).copied().unwrap_or(0.0) / count;
            mean / 255.0
        } else {
            let channel = i - 3;
            let mean = sums.get(channel).copied().unwrap_or(0.0) / count;
            let square = squares.get(channel).copied().unwrap_or(0.0) / count;
            (square - mean * mean).max(0.0).sqrt() / 255.0
        }
    })
}

/// Fixed projection constants of the uncalibrated head.
fn head_weight(class: usize, feature: usize) -> f64 {
    ((class * 7 + feature * 3 + 1) as f64).sin()
}

fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|logit| (logit - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|exp| exp / total).collect()
}

/// Named probabilities for one modality plus the maximum among them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFindings {
    #[serde(flatten)]
    pub probabilities: BTreeMap<String, f64>,
    pub confidence: f64,
}

impl ImageFindings {
    /// Probability for a named field; absent fields read as zero.
    pub fn probability(&self, label: &str) -> f64 {
        self.probabilities.get(label).copied().unwrap_or(0.0)
    }
}

/// Outcome of one image analysis.
///
/// Decode and inference failures are reported in-band as the `Failed`
/// record; callers must check for it before reading probability fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageAnalysisResult {
    Findings(ImageFindings),
    Failed { error: String },
}

impl ImageAnalysisResult {
    pub fn findings(&self) -> Option<&ImageFindings> {
        match self {
            ImageAnalysisResult::Findings(findings) => Some(findings),
            ImageAnalysisResult::Failed { .. } => None,
        }
    }

    /// Confidence reported to callers; the error record reads as zero.
    pub fn confidence(&self) -> f64 {
        self.findings().map_or(0.0, |findings| findings.confidence)
    }
}

/// Per-modality wrapper around the opaque scorers.
///
/// Holds one scorer per modality, mirroring the three independently loaded
/// backbones of the deployment it fronts. Read-only after construction.
pub struct ImageAnalyzer {
    chest_xray: Arc<dyn ImageScorer>,
    skin_cancer: Arc<dyn ImageScorer>,
    brain_tumor: Arc<dyn ImageScorer>,
}

impl ImageAnalyzer {
    pub fn new(
        chest_xray: Arc<dyn ImageScorer>,
        skin_cancer: Arc<dyn ImageScorer>,
        brain_tumor: Arc<dyn ImageScorer>,
    ) -> Self {
        Self {
            chest_xray,
            skin_cancer,
            brain_tumor,
        }
    }

    /// Analyzer with the built-in backbone stand-in behind every modality.
    pub fn with_default_scorers() -> Self {
        Self::new(
            Arc::new(PooledStatScorer),
            Arc::new(PooledStatScorer),
            Arc::new(PooledStatScorer),
        )
    }

    fn scorer_for(&self, modality: Modality) -> &Arc<dyn ImageScorer> {
        match modality {
            Modality::ChestXray => &self.chest_xray,
            Modality::SkinCancer => &self.skin_cancer,
            Modality::BrainTumor => &self.brain_tumor,
        }
    }

    /// Run the full pipeline for one stored upload: preprocess, score, and
    /// name the leading probability slots after the modality's labels.
    ///
    /// Never returns an error: any failure along the way becomes the
    /// in-band error record.
    pub fn analyze(&self, modality: Modality, path: &Path) -> ImageAnalysisResult {
        match self.try_analyze(modality, path) {
            Ok(findings) => ImageAnalysisResult::Findings(findings),
            Err(err) => {
                warn!(modality = %modality, error = %err, "image analysis failed");
                ImageAnalysisResult::Failed {
                    error: err.to_string(),
                }
            }
        }
    }

    fn try_analyze(&self, modality: Modality, path: &Path) -> Result<ImageFindings> {
        let tensor = prepare_image(path)?;
        let labels = modality.labels();
        let probabilities = self
            .scorer_for(modality)
            .class_probabilities(&tensor, labels.len())?;

        if probabilities.len() < labels.len() {
            return Err(RiskError::ImageAnalysis(format!(
                "scorer returned {} probabilities for {} classes",
                probabilities.len(),
                labels.len()
            )));
        }

        let named: BTreeMap<String, f64> = labels
            .iter()
            .zip(&probabilities)
            .map(|(label, probability)| ((*label).to_string(), *probability))
            .collect();
        let confidence = named.values().copied().fold(0.0, f64::max);

        Ok(ImageFindings {
            probabilities: named,
            confidence,
        })
    }
}
