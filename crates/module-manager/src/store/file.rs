//! Directory-backed store: one `<id>.json` file per document.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{not_found, ResourceStore};
use crate::error::{ManagerError, ManagerResult};
use crate::model::ResourceDocument;

const EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens the store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> ManagerResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "file store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file of `id`, or `None` for ids that can never be stored.
    fn path(&self, id: &str) -> Option<PathBuf> {
        let unsafe_id = id.is_empty()
            || id.starts_with('.')
            || id.contains(['/', '\\', '\0']);
        (!unsafe_id).then(|| self.dir.join(format!("{id}.{EXTENSION}")))
    }
}

#[async_trait]
impl ResourceStore for FileStore {
    async fn get(&self, id: &str) -> ManagerResult<ResourceDocument> {
        let path = self.path(id).ok_or_else(|| not_found(id))?;
        match fs::read(&path).await {
            Ok(raw) => Ok(serde_json::from_slice(&raw)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(id)),
            Err(e) => Err(ManagerError::store(format!("reading '{}': {e}", path.display()))),
        }
    }

    async fn set(&self, id: &str, document: &ResourceDocument) -> ManagerResult<()> {
        let path = self.path(id).ok_or_else(|| {
            ManagerError::validation(format!("'{id}' cannot be used as a resource id"))
        })?;
        let raw = serde_json::to_vec_pretty(document)?;

        // Write next to the target, then rename over it.
        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        fs::write(&tmp, raw)
            .await
            .map_err(|e| ManagerError::store(format!("writing '{}': {e}", tmp.display())))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| ManagerError::store(format!("replacing '{}': {e}", path.display())))?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> ManagerResult<()> {
        let path = self.path(id).ok_or_else(|| not_found(id))?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found(id)),
            Err(e) => Err(ManagerError::store(format!("removing '{}': {e}", path.display()))),
        }
    }

    async fn keys(&self) -> ManagerResult<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
