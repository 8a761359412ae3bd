use std::sync::Arc;

use anyhow::Context;

use crate::{
    classifier::{ClassifierRegistry, ImageClassifier, MobileNetClassifier, ResNetClassifier},
    config::ServerConfig,
    labels::{IMAGENET_CLASSES, LabelTable},
    storage::UploadStore,
};

/// Process-wide request state. Everything inside is immutable after startup.
#[derive(Clone)]
pub struct AppState {
    pub classifiers: ClassifierRegistry,
    pub store: UploadStore,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(classifiers: ClassifierRegistry, store: UploadStore, max_upload_bytes: usize) -> Self {
        AppState {
            classifiers,
            store,
            max_upload_bytes,
        }
    }

    /// Load both networks and prepare the upload directory.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let store = UploadStore::new(&config.upload_dir).with_context(|| {
            format!("failed to create upload dir {}", config.upload_dir.display())
        })?;
        log::info!(
            "Upload directory created/confirmed at: {}",
            store.dir().display()
        );

        log::info!("Initializing {} model...", config.mobilenet.name);
        let mobilenet = MobileNetClassifier::load(
            config.mobilenet.name.clone(),
            &config.mobilenet.model_path,
            &config.mobilenet.labels_path,
        )?;
        warn_on_label_count(&config.mobilenet.name, mobilenet.labels());
        log::info!("{} model loaded successfully", config.mobilenet.name);

        log::info!("Initializing {} model...", config.resnet.name);
        let labels = LabelTable::from_text_file(&config.resnet.labels_path)?;
        warn_on_label_count(&config.resnet.name, &labels);
        let resnet =
            ResNetClassifier::load(config.resnet.name.clone(), &config.resnet.model_path, labels)?;
        log::info!("{} model loaded successfully", config.resnet.name);

        let classifiers: Vec<Arc<dyn ImageClassifier>> = vec![Arc::new(mobilenet), Arc::new(resnet)];
        let registry = ClassifierRegistry::new(classifiers)?;
        Ok(AppState::new(registry, store, config.max_upload_bytes))
    }
}

fn warn_on_label_count(name: &str, labels: &LabelTable) {
    if labels.len() != IMAGENET_CLASSES {
        log::warn!(
            "{} label table has {} entries, expected {}",
            name,
            labels.len(),
            IMAGENET_CLASSES
        );
    }
}
