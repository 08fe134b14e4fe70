//! In-process store; contents are lost on restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{not_found, ResourceStore};
use crate::error::ManagerResult;
use crate::model::ResourceDocument;

/// Keeps each document as its serialized JSON text.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResourceStore for MemoryStore {
    async fn get(&self, id: &str) -> ManagerResult<ResourceDocument> {
        let documents = self.documents.read().await;
        let raw = documents.get(id).ok_or_else(|| not_found(id))?;
        Ok(serde_json::from_str(raw)?)
    }

    async fn set(&self, id: &str, document: &ResourceDocument) -> ManagerResult<()> {
        let raw = serde_json::to_string(document)?;
        self.documents.write().await.insert(id.to_owned(), raw);
        Ok(())
    }

    async fn delete(&self, id: &str) -> ManagerResult<()> {
        self.documents
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    async fn keys(&self) -> ManagerResult<Vec<String>> {
        Ok(self.documents.read().await.keys().cloned().collect())
    }
}
