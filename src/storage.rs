//! Flat on-disk store for uploaded images.
//!
//! Files are named `<uuid v4><original extension>` and served back under
//! `/uploads/<name>`.

use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use uuid::Uuid;

use crate::error::{ClassifyError, ClassifyResult};

pub const UPLOAD_URL_PREFIX: &str = "/uploads";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub file_name: String,
    pub path: PathBuf,
}

impl StoredImage {
    pub fn url(&self) -> String {
        format!("{}/{}", UPLOAD_URL_PREFIX, self.file_name)
    }
}

#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Create the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> std::io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(UploadStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `bytes` under a fresh name that keeps `original_filename`'s extension.
    pub async fn save(&self, original_filename: &str, bytes: &[u8]) -> ClassifyResult<StoredImage> {
        if original_filename.is_empty() {
            return Err(ClassifyError::Validation("No image selected".to_string()));
        }
        let file_name = format!("{}{}", Uuid::new_v4(), extension_of(original_filename));
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(StoredImage { file_name, path })
    }

    /// Path of a previously stored file, if `file_name` names one.
    pub async fn open(&self, file_name: &str) -> ClassifyResult<PathBuf> {
        let not_found = || ClassifyError::NotFound(file_name.to_string());
        if !is_plain_file_name(file_name) {
            return Err(not_found());
        }
        let path = self.dir.join(file_name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(not_found()),
        }
    }

    /// Delete uploads last modified more than `ttl` ago. Returns how many were removed.
    pub async fn sweep_expired(&self, ttl: Duration) -> std::io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_generated_name(&path) {
                continue;
            }
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let age = meta
                .modified()
                .ok()
                .and_then(|mtime| now.duration_since(mtime).ok())
                .unwrap_or_default();
            if age > ttl {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => removed += 1,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(removed)
    }
}

/// Background loop removing expired uploads every `interval`.
pub async fn periodic_sweep(store: UploadStore, ttl: Duration, interval: Duration) {
    loop {
        tokio::time::sleep(interval).await;
        match store.sweep_expired(ttl).await {
            Ok(0) => {}
            Ok(n) => log::info!("Removed {} expired uploads from {}", n, store.dir().display()),
            Err(e) => log::error!("Failed to sweep uploads: {}", e),
        }
    }
}

/// `.ext` of the basename, or empty when absent or not ASCII alphanumeric.
fn extension_of(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rfind('.') {
        Some(pos) if pos > 0 => {
            let ext = &base[pos + 1..];
            if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
                format!(".{}", ext)
            } else {
                String::new()
            }
        }
        _ => String::new(),
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && Path::new(name).file_name().is_some_and(|n| n == name)
}

fn is_generated_name(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| Uuid::parse_str(s).is_ok())
}
