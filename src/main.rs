use std::{path::PathBuf, time::Duration};

use clap::Parser;
use vision_classify::{
    config::{ModelConfig, ServerConfig},
    logging::init_logging,
    server,
    state::AppState,
};

#[derive(Parser, Debug)]
#[command(name = "vision-classify")]
#[command(about = "Classify uploaded images with MobileNetV2 and ResNet-50 side by side")]
struct CliArgs {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Directory uploaded images are written to and served from
    #[arg(long, default_value = "uploads")]
    upload_dir: PathBuf,

    /// Maximum upload size in MiB
    #[arg(long, default_value_t = 16)]
    max_upload_mb: usize,

    #[arg(long, default_value = "models/mobilenet_v2.onnx")]
    mobilenet_model: PathBuf,

    /// Keras imagenet_class_index.json
    #[arg(long, default_value = "models/imagenet_class_index.json")]
    mobilenet_labels: PathBuf,

    /// Response key for MobileNetV2 predictions
    #[arg(long, default_value = "tensorflow")]
    mobilenet_name: String,

    #[arg(long, default_value = "models/resnet50.onnx")]
    resnet_model: PathBuf,

    /// One class name per line
    #[arg(long, default_value = "models/imagenet_classes.txt")]
    resnet_labels: PathBuf,

    /// Response key for ResNet-50 predictions
    #[arg(long, default_value = "pytorch")]
    resnet_name: String,

    /// Delete uploads older than this many seconds (kept forever when unset)
    #[arg(long)]
    upload_ttl_secs: Option<u64>,

    #[arg(long, default_value_t = 300)]
    sweep_interval_secs: u64,

    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

impl CliArgs {
    fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            upload_dir: self.upload_dir.clone(),
            max_upload_bytes: self.max_upload_mb.saturating_mul(1024 * 1024),
            mobilenet: ModelConfig {
                name: self.mobilenet_name.clone(),
                model_path: self.mobilenet_model.clone(),
                labels_path: self.mobilenet_labels.clone(),
            },
            resnet: ModelConfig {
                name: self.resnet_name.clone(),
                model_path: self.resnet_model.clone(),
                labels_path: self.resnet_labels.clone(),
            },
            upload_ttl: self.upload_ttl_secs.map(Duration::from_secs),
            sweep_interval: Duration::from_secs(self.sweep_interval_secs),
            log_level: self.log_level,
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let config = args.to_server_config();
    init_logging(config.log_level);
    config.validate()?;

    log::info!("Starting image classifier application...");
    let app_state = AppState::from_config(&config)?;
    server::startup(config, app_state).await?;
    log::info!("Application shutdown");
    Ok(())
}
