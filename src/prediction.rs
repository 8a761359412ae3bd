//! Prediction records produced by classifiers and the merged response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ClassifyError, ClassifyResult};

/// Number of predictions every classifier reports.
pub const TOP_K: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Prediction {
            label: label.into(),
            confidence,
        }
    }
}

/// Exactly [`TOP_K`] predictions, highest confidence first.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PredictionSet(Vec<Prediction>);

impl PredictionSet {
    pub fn new(predictions: Vec<Prediction>) -> ClassifyResult<Self> {
        if predictions.len() != TOP_K {
            return Err(ClassifyError::Inference(format!(
                "expected {} predictions, got {}",
                TOP_K,
                predictions.len()
            )));
        }
        for p in &predictions {
            if !p.confidence.is_finite() || !(0.0..=1.0).contains(&p.confidence) {
                return Err(ClassifyError::Inference(format!(
                    "confidence {} for '{}' is outside [0, 1]",
                    p.confidence, p.label
                )));
            }
        }
        if predictions
            .windows(2)
            .any(|w| w[0].confidence < w[1].confidence)
        {
            return Err(ClassifyError::Inference(
                "predictions are not sorted by descending confidence".to_string(),
            ));
        }
        Ok(PredictionSet(predictions))
    }

    pub fn as_slice(&self) -> &[Prediction] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Prediction> {
        self.0.iter()
    }

    pub fn top(&self) -> &Prediction {
        &self.0[0]
    }
}

/// Per-classifier prediction sets plus the URL of the stored upload.
///
/// Serializes flat: `{"<classifier>": [...], ..., "image_url": "..."}`.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    #[serde(flatten)]
    pub predictions: BTreeMap<String, PredictionSet>,
    pub image_url: String,
}
