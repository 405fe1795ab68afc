//! A rate history serialized as one JSON document on disk

use crate::core::error::StoreError;
use crate::core::history::RateHistory;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A JSON file holding a whole [`RateHistory`].
///
/// Writes always replace the full document: the new content goes to a sibling
/// temp file which is then renamed over the target, so readers observe either
/// the previous or the new document and never a truncated one.
#[derive(Debug, Clone)]
pub struct DocumentFile {
    path: PathBuf,
}

impl DocumentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// `None` when the document does not exist yet.
    pub async fn read(&self) -> Result<Option<RateHistory>, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Document does not exist");
                return Ok(None);
            }
            Err(source) => {
                return Err(StoreError::Unreadable {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    pub async fn write(&self, history: &RateHistory) -> Result<(), StoreError> {
        let persistence = |reason: String| StoreError::Persistence {
            path: self.path.clone(),
            reason,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| persistence(format!("create {}: {e}", parent.display())))?;
        }

        let json = serde_json::to_vec_pretty(history).map_err(|e| persistence(e.to_string()))?;
        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, json)
            .await
            .map_err(|e| persistence(format!("write {}: {e}", temp_path.display())))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| persistence(format!("rename {}: {e}", temp_path.display())))?;

        debug!(path = %self.path.display(), samples = history.len(), "Document written");
        Ok(())
    }
}
