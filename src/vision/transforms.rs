//! Core image transformations: resize, crop, pixel scaling and tensor layout.

use image::{DynamicImage, RgbImage, imageops, imageops::FilterType};
use tract_onnx::prelude::tract_ndarray::Array4;

/// ImageNet per-channel mean (torchvision convention).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet per-channel std (torchvision convention).
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// How the decoded image is brought to the network's input resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizePolicy {
    /// Stretch to exactly `width` x `height`, ignoring aspect ratio.
    Exact {
        width: u32,
        height: u32,
        filter: FilterType,
    },
    /// Scale the shorter edge to `shortest_edge`, then center crop `crop` x `crop`.
    ShortestEdgeThenCrop {
        shortest_edge: u32,
        crop: u32,
        filter: FilterType,
    },
}

impl ResizePolicy {
    pub fn output_size(&self) -> (u32, u32) {
        match *self {
            ResizePolicy::Exact { width, height, .. } => (width, height),
            ResizePolicy::ShortestEdgeThenCrop { crop, .. } => (crop, crop),
        }
    }

    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        match *self {
            ResizePolicy::Exact {
                width,
                height,
                filter,
            } => imageops::resize(image, width, height, filter),
            ResizePolicy::ShortestEdgeThenCrop {
                shortest_edge,
                crop,
                filter,
            } => {
                let (left, top, width, height) =
                    source_crop_window(image.dimensions(), shortest_edge, crop);
                let window = imageops::crop_imm(image, left, top, width, height).to_image();
                imageops::resize(&window, crop, crop, filter)
            }
        }
    }
}

/// Mapping from 8-bit pixel values to network input values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PixelScaling {
    /// `x / 127.5 - 1`, giving [-1, 1] (Keras MobileNet `preprocess_input`).
    Symmetric,
    /// `(x / 255 - mean) / std` per channel.
    MeanStd { mean: [f32; 3], std: [f32; 3] },
}

impl PixelScaling {
    #[inline]
    pub fn scale(&self, value: u8, channel: usize) -> f32 {
        match self {
            PixelScaling::Symmetric => value as f32 / 127.5 - 1.0,
            PixelScaling::MeanStd { mean, std } => {
                (value as f32 / 255.0 - mean[channel]) / std[channel]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[1, 3, H, W]`
    Nchw,
    /// `[1, H, W, 3]`
    Nhwc,
}

impl TensorLayout {
    pub fn shape(&self, width: u32, height: u32) -> [usize; 4] {
        let (w, h) = (width as usize, height as usize);
        match self {
            TensorLayout::Nchw => [1, 3, h, w],
            TensorLayout::Nhwc => [1, h, w, 3],
        }
    }
}

/// Complete input pipeline for one network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preprocess {
    pub resize: ResizePolicy,
    pub scaling: PixelScaling,
    pub layout: TensorLayout,
}

impl Preprocess {
    /// Shape of the tensor produced by [`Preprocess::run`].
    pub fn input_shape(&self) -> [usize; 4] {
        let (w, h) = self.resize.output_size();
        self.layout.shape(w, h)
    }

    pub fn run(&self, image: &DynamicImage) -> Array4<f32> {
        let rgb = image.to_rgb8();
        let resized = self.resize.apply(&rgb);
        to_tensor(&resized, self.scaling, self.layout)
    }
}

/// Source-pixel rectangle `(left, top, width, height)` that ends up as the
/// central `crop` x `crop` square after scaling the shorter edge to
/// `shortest_edge`.
///
/// The window never leaves the source and is at least one pixel on each side.
pub fn source_crop_window(
    (width, height): (u32, u32),
    shortest_edge: u32,
    crop: u32,
) -> (u32, u32, u32, u32) {
    let short = width.min(height).max(1) as f64;
    let side = crop as f64 * short / shortest_edge.max(1) as f64;
    let window = |extent: u32| (side.round() as u64).clamp(1, extent.max(1) as u64) as u32;
    let (win_w, win_h) = (window(width), window(height));
    let left = ((width.saturating_sub(win_w)) as f64 / 2.0).round() as u32;
    let top = ((height.saturating_sub(win_h)) as f64 / 2.0).round() as u32;
    (left, top, win_w, win_h)
}

pub fn to_tensor(image: &RgbImage, scaling: PixelScaling, layout: TensorLayout) -> Array4<f32> {
    let (w, h) = image.dimensions();
    let shape = layout.shape(w, h);
    match layout {
        TensorLayout::Nchw => Array4::from_shape_fn(shape, |(_, c, y, x)| {
            scaling.scale(image.get_pixel(x as u32, y as u32)[c], c)
        }),
        TensorLayout::Nhwc => Array4::from_shape_fn(shape, |(_, y, x, c)| {
            scaling.scale(image.get_pixel(x as u32, y as u32)[c], c)
        }),
    }
}
