//! MobileNetV2 classifier (Keras ImageNet weights exported to ONNX).
//!
//! Pipeline:
//! 1. Decode to RGB
//! 2. Resize exactly to 224x224, nearest neighbour (Keras `load_img`)
//! 3. Scale pixels to [-1, 1]
//! 4. NHWC forward pass; the network ends in softmax
//! 5. Top-5 over the probabilities, names from the Keras class index

use std::path::Path;

use anyhow::bail;
use image::imageops::FilterType;

use super::{ImageClassifier, decode_predictions, onnx::OnnxModel};
use crate::{
    error::ClassifyResult,
    labels::LabelTable,
    prediction::PredictionSet,
    vision::{self, PixelScaling, Preprocess, ResizePolicy, TensorLayout},
};

pub const INPUT_SIZE: u32 = 224;

pub struct MobileNetClassifier {
    name: String,
    model: OnnxModel,
    labels: LabelTable,
}

impl MobileNetClassifier {
    pub const PREPROCESS: Preprocess = Preprocess {
        resize: ResizePolicy::Exact {
            width: INPUT_SIZE,
            height: INPUT_SIZE,
            filter: FilterType::Nearest,
        },
        scaling: PixelScaling::Symmetric,
        layout: TensorLayout::Nhwc,
    };

    /// Load the network and its Keras `imagenet_class_index.json`.
    pub fn load(
        name: impl Into<String>,
        model_path: &Path,
        class_index_path: &Path,
    ) -> anyhow::Result<Self> {
        let labels = LabelTable::from_class_index_file(class_index_path)?;
        let model = OnnxModel::load(model_path, Self::PREPROCESS.input_shape())?;
        Self::new(name, model, labels)
    }

    /// Use an already loaded network. Its input shape must match [`Self::PREPROCESS`].
    pub fn new(
        name: impl Into<String>,
        model: OnnxModel,
        labels: LabelTable,
    ) -> anyhow::Result<Self> {
        let expected = Self::PREPROCESS.input_shape();
        if model.input_shape() != expected {
            bail!(
                "model input {:?} does not match preprocessing output {:?}",
                model.input_shape(),
                expected
            );
        }
        Ok(MobileNetClassifier {
            name: name.into(),
            model,
            labels,
        })
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }
}

impl ImageClassifier for MobileNetClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, image_path: &Path) -> ClassifyResult<PredictionSet> {
        let image = vision::load_image(image_path)?;
        let input = Self::PREPROCESS.run(&image);
        let probabilities = self.model.run(input)?;
        decode_predictions(&probabilities, &self.labels)
    }
}
