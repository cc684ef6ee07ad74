//! JSON catalog bundles on disk.
//!
//! The path may name a single bundle file, or a directory whose `*.json`
//! files are read in file-name order and merged into one bundle.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::infrastructure::catalog::CatalogBundle;
use crate::infrastructure::ports::{CatalogSource, CatalogSourceError};

/// Loads catalog bundles from a JSON file or directory.
pub struct JsonCatalogSource {
    path: PathBuf,
}

impl JsonCatalogSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_bundle(path: &Path) -> Result<CatalogBundle, CatalogSourceError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| CatalogSourceError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| CatalogSourceError::json(path, e))
    }

    async fn bundle_files(dir: &Path) -> Result<Vec<PathBuf>, CatalogSourceError> {
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|e| CatalogSourceError::io(dir, e))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CatalogSourceError::io(dir, e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl CatalogSource for JsonCatalogSource {
    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }

    async fn load(&self) -> Result<CatalogBundle, CatalogSourceError> {
        let metadata = match fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CatalogSourceError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(CatalogSourceError::io(&self.path, e)),
        };

        if !metadata.is_dir() {
            return Self::read_bundle(&self.path).await;
        }

        let files = Self::bundle_files(&self.path).await?;
        let mut merged: Option<CatalogBundle> = None;
        for file in &files {
            let bundle = Self::read_bundle(file).await?;
            tracing::debug!(
                path = %file.display(),
                version = %bundle.version,
                "Read catalog bundle"
            );
            merged = Some(match merged {
                Some(acc) => acc.merge(bundle),
                None => bundle,
            });
        }
        merged.ok_or_else(|| CatalogSourceError::Empty(self.path.clone()))
    }
}
