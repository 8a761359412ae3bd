#![allow(dead_code)]

use std::{
    io::Cursor,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use vision_classify::{
    AppState, ClassifierRegistry, ClassifyResult, ImageClassifier, PredictionSet,
    classifier::decode_predictions, labels::LabelTable, storage::UploadStore, vision,
};

pub const BOUNDARY: &str = "----visionclassifytestboundary";

/// Deterministic stand-in for a real network.
///
/// Decodes the image like the real classifiers do, then scores five colour
/// classes from the mean pixel value.
pub struct StubClassifier {
    name: String,
    labels: LabelTable,
    calls: Arc<AtomicUsize>,
}

impl StubClassifier {
    pub fn new(name: &str) -> Self {
        let labels = ["red", "green", "blue", "dark", "light"]
            .iter()
            .map(|l| l.to_string())
            .collect();
        StubClassifier {
            name: name.to_string(),
            labels: LabelTable::new(labels).expect("stub labels"),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl ImageClassifier for StubClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, image_path: &Path) -> ClassifyResult<PredictionSet> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let image = vision::load_image(image_path)?.to_rgb8();
        let pixels = (image.width() as f32 * image.height() as f32).max(1.0);
        let mut sums = [0f32; 3];
        for pixel in image.pixels() {
            for (c, sum) in sums.iter_mut().enumerate() {
                *sum += pixel[c] as f32;
            }
        }
        let [r, g, b] = sums.map(|s| s / pixels);
        let brightness = (r + g + b) / 3.0;
        let scores = [r + 1.0, g + 1.0, b + 1.0, 256.0 - brightness, brightness + 1.0];
        let total: f32 = scores.iter().sum();
        let probabilities: Vec<f32> = scores.iter().map(|s| s / total).collect();
        decode_predictions(&probabilities, &self.labels)
    }
}

pub struct TestContext {
    pub upload_dir: TempDir,
    pub state: AppState,
    pub first_calls: Arc<AtomicUsize>,
    pub second_calls: Arc<AtomicUsize>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_limit(16 * 1024 * 1024)
    }

    pub fn with_limit(max_upload_bytes: usize) -> Self {
        let upload_dir = tempfile::tempdir().expect("tempdir");
        let first = StubClassifier::new("tensorflow");
        let second = StubClassifier::new("pytorch");
        let first_calls = first.calls();
        let second_calls = second.calls();
        let classifiers: Vec<Arc<dyn ImageClassifier>> = vec![Arc::new(first), Arc::new(second)];
        let registry = ClassifierRegistry::new(classifiers).expect("registry");
        let store = UploadStore::new(upload_dir.path()).expect("upload store");
        TestContext {
            upload_dir,
            state: AppState::new(registry, store, max_upload_bytes),
            first_calls,
            second_calls,
        }
    }
}

pub fn solid_jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)));
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .expect("encode jpeg");
    buf
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// A single-part multipart body. `filename: None` sends a plain form field.
pub fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> Vec<u8> {
    let disposition = match filename {
        Some(name) => format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n",
            field, name
        ),
        None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", field),
    };
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(disposition.as_bytes());
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}
