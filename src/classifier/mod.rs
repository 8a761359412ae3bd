//! Image classifiers and the registry the aggregator iterates over.
//!
//! Every backing model is wrapped behind [`ImageClassifier`], a single
//! `classify(path) -> PredictionSet` operation. The aggregator only sees the
//! trait, so models can be added or swapped without touching it.

use std::{collections::HashSet, path::Path, sync::Arc};

use crate::{
    config::{ConfigError, ConfigResult},
    error::{ClassifyError, ClassifyResult},
    labels::LabelTable,
    prediction::{Prediction, PredictionSet, TOP_K},
};

pub mod mobilenet;
pub mod onnx;
pub mod resnet;

pub use mobilenet::MobileNetClassifier;
pub use resnet::ResNetClassifier;

/// Key the response reserves for the stored image URL.
const RESERVED_NAME: &str = "image_url";

pub trait ImageClassifier: Send + Sync {
    /// Key under which this classifier's predictions are reported.
    fn name(&self) -> &str;

    /// Top-[`TOP_K`] predictions for the image at `image_path`.
    ///
    /// Must be a pure function of the image contents.
    fn classify(&self, image_path: &Path) -> ClassifyResult<PredictionSet>;
}

/// Ordered set of classifiers with unique names.
#[derive(Clone)]
pub struct ClassifierRegistry {
    classifiers: Vec<Arc<dyn ImageClassifier>>,
}

impl ClassifierRegistry {
    pub fn new(classifiers: Vec<Arc<dyn ImageClassifier>>) -> ConfigResult<Self> {
        if classifiers.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one classifier is required".to_string(),
            });
        }
        let mut seen = HashSet::new();
        for classifier in &classifiers {
            let name = classifier.name();
            if name.is_empty() || name == RESERVED_NAME {
                return Err(ConfigError::InvalidValue {
                    field: "classifier name".to_string(),
                    value: name.to_string(),
                    reason: format!("must be non-empty and not '{}'", RESERVED_NAME),
                });
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::InvalidValue {
                    field: "classifier name".to_string(),
                    value: name.to_string(),
                    reason: "duplicate classifier name".to_string(),
                });
            }
        }
        Ok(ClassifierRegistry { classifiers })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ImageClassifier>> {
        self.classifiers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.classifiers.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }
}

/// Numerically stable softmax.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Exact top-`k` selection: `(index, score)` pairs, highest score first.
///
/// Equal scores are ordered by ascending index.
pub fn top_k(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    let k = k.min(scores.len());
    if k == 0 {
        return Vec::new();
    }
    let order = |a: &usize, b: &usize| scores[*b].total_cmp(&scores[*a]).then(a.cmp(b));
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.select_nth_unstable_by(k - 1, order);
    indices.truncate(k);
    indices.sort_by(order);
    indices.into_iter().map(|i| (i, scores[i])).collect()
}

/// Map a probability vector to a [`PredictionSet`] using `labels`.
pub fn decode_predictions(
    probabilities: &[f32],
    labels: &LabelTable,
) -> ClassifyResult<PredictionSet> {
    if probabilities.len() < TOP_K {
        return Err(ClassifyError::Inference(format!(
            "model produced {} scores, need at least {}",
            probabilities.len(),
            TOP_K
        )));
    }
    if probabilities.len() != labels.len() {
        return Err(ClassifyError::Inference(format!(
            "model produced {} scores but the label table has {} entries",
            probabilities.len(),
            labels.len()
        )));
    }
    let predictions = top_k(probabilities, TOP_K)
        .into_iter()
        .map(|(idx, p)| {
            labels
                .get(idx)
                .map(|label| Prediction::new(label, p))
                .ok_or_else(|| ClassifyError::Inference(format!("no label for class {}", idx)))
        })
        .collect::<ClassifyResult<Vec<_>>>()?;
    PredictionSet::new(predictions)
}
