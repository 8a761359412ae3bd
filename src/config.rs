use std::{path::PathBuf, time::Duration};

/// Default upper bound on an upload body.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Invalid value for field '{field}': {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Incompatible configuration: {reason}")]
    IncompatibleConfig { reason: String },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// One network plus the file mapping its outputs to names.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Response key for this model's predictions.
    pub name: String,
    pub model_path: PathBuf,
    pub labels_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    /// MobileNetV2, labels from a Keras class-index JSON.
    pub mobilenet: ModelConfig,
    /// ResNet-50, labels from a one-per-line text file.
    pub resnet: ModelConfig,
    /// Uploads older than this are deleted; `None` keeps them forever.
    pub upload_ttl: Option<Duration>,
    pub sweep_interval: Duration,
    pub log_level: log::LevelFilter,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            mobilenet: ModelConfig {
                name: "tensorflow".to_string(),
                model_path: PathBuf::from("models/mobilenet_v2.onnx"),
                labels_path: PathBuf::from("models/imagenet_class_index.json"),
            },
            resnet: ModelConfig {
                name: "pytorch".to_string(),
                model_path: PathBuf::from("models/resnet50.onnx"),
                labels_path: PathBuf::from("models/imagenet_classes.txt"),
            },
            upload_ttl: None,
            sweep_interval: Duration::from_secs(300),
            log_level: log::LevelFilter::Info,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.host.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "host".to_string(),
            });
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_upload_bytes".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.upload_ttl.is_some() && self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "sweep_interval".to_string(),
                value: "0".to_string(),
                reason: "must be positive when an upload TTL is set".to_string(),
            });
        }
        for model in [&self.mobilenet, &self.resnet] {
            if model.name.is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: "model name".to_string(),
                });
            }
            let files = [
                ("model_path", &model.model_path),
                ("labels_path", &model.labels_path),
            ];
            for (field, path) in files {
                if !path.is_file() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("{}.{}", model.name, field),
                        value: path.display().to_string(),
                        reason: "file does not exist".to_string(),
                    });
                }
            }
        }
        if self.mobilenet.name == self.resnet.name {
            return Err(ConfigError::IncompatibleConfig {
                reason: format!("both models are named '{}'", self.mobilenet.name),
            });
        }
        Ok(())
    }
}
