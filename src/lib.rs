pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod error;
pub mod labels;
pub mod logging;
pub mod prediction;
pub mod server;
pub mod state;
pub mod storage;
pub mod vision;

pub use classifier::{ClassifierRegistry, ImageClassifier};
pub use error::{ClassifyError, ClassifyResult};
pub use prediction::{ClassificationResult, Prediction, PredictionSet};
pub use state::AppState;
