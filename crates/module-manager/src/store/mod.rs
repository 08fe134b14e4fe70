//! Persistent storage of resource documents, keyed by resource id.
//!
//! Documents are JSON. Implementations must be safe to use from many tasks
//! at once for distinct keys; writes to the same key are serialized by the
//! worker registry before they reach the store.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::error::ManagerResult;
use crate::model::ResourceDocument;

pub use file::FileStore;
pub use memory::MemoryStore;

#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fails with [`ManagerError::NotFound`](crate::error::ManagerError::NotFound)
    /// when nothing is stored under `id`.
    async fn get(&self, id: &str) -> ManagerResult<ResourceDocument>;

    async fn set(&self, id: &str, document: &ResourceDocument) -> ManagerResult<()>;

    /// Fails with [`ManagerError::NotFound`](crate::error::ManagerError::NotFound)
    /// when nothing is stored under `id`.
    async fn delete(&self, id: &str) -> ManagerResult<()>;

    /// All stored ids, sorted.
    async fn keys(&self) -> ManagerResult<Vec<String>>;
}

pub(crate) fn not_found(id: &str) -> crate::error::ManagerError {
    crate::error::ManagerError::not_found(format!("nothing stored under '{id}'"))
}
