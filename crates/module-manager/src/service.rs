//! Request-level operations on one resource kind.
//!
//! Everything a request can be refused for (validation, conflict, missing
//! resource, busy worker, config storage failure) is checked here before
//! any workflow starts. Accepted state changes and removals run on a
//! [`Worker`](worker_framework::Worker) and are not awaited.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{info, instrument};
use worker_framework::WorkerClient;

use crate::clients::{ConfigService, DeploymentService};
use crate::error::{ManagerError, ManagerResult};
use crate::model::{normalize, ResourceDocument, ResourceKind, ResourceState, TeardownPolicy};
use crate::orchestrator::Orchestrator;
use crate::store::ResourceStore;

/// Downstream collaborators of one resource kind.
#[derive(Clone)]
pub struct KindBackends {
    pub config: Arc<dyn ConfigService>,
    pub deployment: Arc<dyn DeploymentService>,
    pub store: Arc<dyn ResourceStore>,
}

/// Identity and teardown settings of one resource kind.
#[derive(Debug, Clone, Default)]
pub struct KindSettings {
    pub reserved_id: Option<String>,
    pub gateway_local_ip: Option<String>,
    pub policy: TeardownPolicy,
}

/// Outcome of a state change request.
#[derive(Debug)]
pub enum Transition {
    /// A workflow was launched; the handle resolves after its slot is released.
    Started(JoinHandle<()>),
    /// The resource already is in the requested state.
    Unchanged,
}

/// Name of the worker slot guarding resource `id` of kind `K`.
pub fn worker_name<K: ResourceKind>(id: &str) -> String {
    format!("worker-{}-{}", K::NAME, id)
}

pub struct ResourceService<K: ResourceKind> {
    orchestrator: Orchestrator<K>,
    config: Arc<dyn ConfigService>,
    store: Arc<dyn ResourceStore>,
    workers: WorkerClient,
    reserved_id: Option<String>,
}

impl<K: ResourceKind> ResourceService<K> {
    pub fn new(backends: KindBackends, workers: WorkerClient, settings: KindSettings) -> Self {
        let orchestrator = Orchestrator::new(
            backends.deployment,
            backends.store.clone(),
            settings.policy,
            settings.gateway_local_ip,
        );
        Self {
            orchestrator,
            config: backends.config,
            store: backends.store,
            workers,
            reserved_id: settings.reserved_id,
        }
    }

    /// Every stored document, keyed by id.
    pub async fn list(&self) -> ManagerResult<BTreeMap<String, ResourceDocument>> {
        let mut documents = BTreeMap::new();
        for id in self.store.keys().await? {
            let document = self.store.get(&id).await?;
            documents.insert(id, document);
        }
        Ok(documents)
    }

    pub async fn get(&self, id: &str) -> ManagerResult<ResourceDocument> {
        self.store.get(id).await
    }

    /// Registers a new definition, or replaces an inactive one.
    ///
    /// The configs are stored with the config storage service and the slim
    /// document is stored as `inactive`. The worker slot is held for the
    /// duration so a submission cannot interleave with a running workflow.
    #[instrument(skip_all, fields(kind = K::NAME))]
    pub async fn submit(&self, definition: Value) -> ManagerResult<ResourceDocument> {
        // The reserved id is refused whatever else the payload contains.
        if let Some(id) = definition.get("id").and_then(Value::as_str) {
            if self.reserved_id.as_deref() == Some(id) {
                return Err(ManagerError::conflict(format!(
                    "'{id}' is the manager's own {} id",
                    K::NAME
                )));
            }
        }

        let normalized = normalize(definition)?;
        let id = normalized.id;
        let _worker = self.workers.acquire(&worker_name::<K>(&id)).await?;

        match self.store.get(&id).await {
            Ok(existing) if existing.is_active() => {
                return Err(ManagerError::conflict(format!(
                    "can't update active {} '{id}'",
                    K::NAME
                )));
            }
            Ok(_) | Err(ManagerError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        self.config.put_configs(&id, &normalized.configs).await?;
        self.store.set(&id, &normalized.document).await?;
        info!(id = %id, services = normalized.document.services.len(), "definition stored");
        Ok(normalized.document)
    }

    /// Launches the workflow that moves `id` to the requested state.
    ///
    /// `body` must be `{"state": "active" | "inactive"}`.
    #[instrument(skip(self, body), fields(kind = K::NAME))]
    pub async fn set_state(&self, id: &str, body: &Value) -> ManagerResult<Transition> {
        let requested = match body.get("state") {
            Some(Value::String(state)) => ResourceState::parse(state)?,
            Some(_) => return Err(ManagerError::validation("'state' must be a string")),
            None => return Err(ManagerError::validation("missing key 'state'")),
        };

        // The document is read under the slot so no workflow can change it meanwhile.
        let worker = self.workers.acquire(&worker_name::<K>(id)).await?;
        let document = self.store.get(id).await?;
        if document.state == requested {
            return Ok(Transition::Unchanged);
        }

        let orchestrator = self.orchestrator.clone();
        let id = id.to_owned();
        let handle = match requested {
            ResourceState::Active => {
                let configs = self.config.get_configs(&id).await?;
                worker.run(async move {
                    orchestrator.activate(&id, configs, document).await.map(|_| ())
                })
            }
            ResourceState::Inactive => worker.run(async move {
                orchestrator.deactivate(&id, document).await.map(|_| ())
            }),
        };
        Ok(Transition::Started(handle))
    }

    /// Removes the configs of an inactive resource and launches the workflow
    /// that deletes its services and document.
    #[instrument(skip(self), fields(kind = K::NAME))]
    pub async fn remove(&self, id: &str) -> ManagerResult<JoinHandle<()>> {
        let worker = self.workers.acquire(&worker_name::<K>(id)).await?;
        let document = self.store.get(id).await?;
        if document.is_active() {
            return Err(ManagerError::conflict(format!(
                "can't remove active {} '{id}'",
                K::NAME
            )));
        }

        self.config.delete_configs(id).await?;

        let orchestrator = self.orchestrator.clone();
        let id = id.to_owned();
        Ok(worker.run(async move { orchestrator.remove(&id, document).await }))
    }
}
