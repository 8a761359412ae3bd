//! Image decoding and preprocessing shared by the classifiers.

use std::path::Path;

use image::{DynamicImage, ImageReader};

use crate::error::{ClassifyError, ClassifyResult};

pub mod transforms;

pub use transforms::{PixelScaling, Preprocess, ResizePolicy, TensorLayout};

/// Decode an image file, sniffing the format from its contents.
pub fn load_image(path: &Path) -> ClassifyResult<DynamicImage> {
    let reader = ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| {
            ClassifyError::Inference(format!("cannot read image {}: {}", path.display(), e))
        })?;
    Ok(reader.decode()?)
}
