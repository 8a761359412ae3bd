//! Class-index to human-readable name tables.
//!
//! Two on-disk formats are supported:
//!
//! - plain text, one class name per line (torchvision's `imagenet_classes.txt`)
//! - Keras' `imagenet_class_index.json`: `{"0": ["n01440764", "tench"], ...}`

use std::{collections::HashMap, path::Path, sync::Arc};

use anyhow::{Context, bail};

/// Number of classes in the ImageNet-1k label space.
pub const IMAGENET_CLASSES: usize = 1000;

/// Ordered, immutable list of class names. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LabelTable {
    labels: Arc<[String]>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> anyhow::Result<Self> {
        if labels.is_empty() {
            bail!("label table is empty");
        }
        if let Some(idx) = labels.iter().position(|l| l.is_empty()) {
            bail!("label {} is empty", idx);
        }
        Ok(LabelTable {
            labels: labels.into(),
        })
    }

    pub fn from_text(content: &str) -> anyhow::Result<Self> {
        Self::new(content.lines().map(|l| l.trim().to_string()).collect())
    }

    pub fn from_text_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read label file {}", path.display()))?;
        Self::from_text(&content).with_context(|| format!("invalid label file {}", path.display()))
    }

    pub fn from_class_index_json(content: &str) -> anyhow::Result<Self> {
        let index: HashMap<String, (String, String)> =
            serde_json::from_str(content).context("class index is not valid JSON")?;
        let count = index.len();
        let mut labels = vec![String::new(); count];
        for (key, (_synset, name)) in index {
            let idx: usize = key
                .parse()
                .with_context(|| format!("class index key '{}' is not a number", key))?;
            let Some(slot) = labels.get_mut(idx) else {
                bail!("class index {} is out of range for {} entries", idx, count);
            };
            *slot = name;
        }
        Self::new(labels)
    }

    pub fn from_class_index_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read class index {}", path.display()))?;
        Self::from_class_index_json(&content)
            .with_context(|| format!("invalid class index {}", path.display()))
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
