//! ResNet-50 classifier (torchvision ImageNet weights exported to ONNX).
//!
//! Pipeline:
//! 1. Decode to RGB
//! 2. Center crop the region that becomes 224x224 once the shorter edge is
//!    scaled to 256, then resize it to 224x224 (bilinear)
//! 3. Rescale to [0, 1] and normalize with ImageNet mean/std
//! 4. NCHW forward pass producing logits
//! 5. Softmax, exact top-5, names from the shared [`LabelTable`]

use std::path::Path;

use anyhow::bail;
use image::imageops::FilterType;

use super::{ImageClassifier, decode_predictions, onnx::OnnxModel, softmax};
use crate::{
    error::ClassifyResult,
    labels::LabelTable,
    prediction::PredictionSet,
    vision::{
        self, PixelScaling, Preprocess, ResizePolicy, TensorLayout,
        transforms::{IMAGENET_MEAN, IMAGENET_STD},
    },
};

pub const RESIZE_SHORTEST_EDGE: u32 = 256;
pub const CROP_SIZE: u32 = 224;

pub struct ResNetClassifier {
    name: String,
    model: OnnxModel,
    labels: LabelTable,
}

impl ResNetClassifier {
    pub const PREPROCESS: Preprocess = Preprocess {
        resize: ResizePolicy::ShortestEdgeThenCrop {
            shortest_edge: RESIZE_SHORTEST_EDGE,
            crop: CROP_SIZE,
            filter: FilterType::Triangle,
        },
        scaling: PixelScaling::MeanStd {
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        },
        layout: TensorLayout::Nchw,
    };

    pub fn load(
        name: impl Into<String>,
        model_path: &Path,
        labels: LabelTable,
    ) -> anyhow::Result<Self> {
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
        Ok(ResNetClassifier {
            name: name.into(),
            model,
            labels,
        })
    }
}

impl ImageClassifier for ResNetClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, image_path: &Path) -> ClassifyResult<PredictionSet> {
        let image = vision::load_image(image_path)?;
        let input = Self::PREPROCESS.run(&image);
        let logits = self.model.run(input)?;
        decode_predictions(&softmax(&logits), &self.labels)
    }
}
