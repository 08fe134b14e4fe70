//! # Lifecycle Orchestrator
//!
//! The three workflows that move a resource between `inactive` and `active`
//! and finally out of the store:
//!
//! | Workflow | Deployment calls, per service | Persisted on success |
//! |----------|-------------------------------|----------------------|
//! | [`activate`](Orchestrator::activate) | create, then start (two passes) | `active` |
//! | [`deactivate`](Orchestrator::deactivate) | stop, then delete if the policy says so | `inactive` |
//! | [`remove`](Orchestrator::remove) | delete | document removed |
//!
//! Calls run strictly one after another. The first failing call aborts the
//! workflow; nothing is persisted and effects of earlier calls are left in
//! place.

mod error;

pub use error::{WorkflowError, WorkflowStep};
pub use crate::model::definition::normalize;

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::clients::{DeploymentService, ServiceState};
use crate::error::{ManagerError, ManagerResult};
use crate::model::{
    ResourceDocument, ResourceKind, ResourceState, ServiceConfigs, TeardownPolicy,
    GATEWAY_LOCAL_IP_VAR,
};
use crate::store::ResourceStore;

/// Runs lifecycle workflows for resources of kind `K`.
///
/// Stateless between calls; cloning is cheap.
pub struct Orchestrator<K: ResourceKind> {
    deployment: Arc<dyn DeploymentService>,
    store: Arc<dyn ResourceStore>,
    policy: TeardownPolicy,
    gateway_local_ip: Option<String>,
    _kind: PhantomData<fn() -> K>,
}

impl<K: ResourceKind> Clone for Orchestrator<K> {
    fn clone(&self) -> Self {
        Self {
            deployment: self.deployment.clone(),
            store: self.store.clone(),
            policy: self.policy,
            gateway_local_ip: self.gateway_local_ip.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: ResourceKind> Orchestrator<K> {
    pub fn new(
        deployment: Arc<dyn DeploymentService>,
        store: Arc<dyn ResourceStore>,
        policy: TeardownPolicy,
        gateway_local_ip: Option<String>,
    ) -> Self {
        Self {
            deployment,
            store,
            policy,
            gateway_local_ip,
            _kind: PhantomData,
        }
    }

    /// Creates every service, starts every service, then stores the document
    /// as `active`. Returns the stored document.
    pub async fn activate(
        &self,
        id: &str,
        configs: ServiceConfigs,
        document: ResourceDocument,
    ) -> Result<ResourceDocument, WorkflowError> {
        info!(kind = K::NAME, id, services = configs.len(), "activating");

        for (service, config) in &configs {
            let payload = self
                .runtime_config(id, service, config)
                .map_err(|e| self.fail(WorkflowStep::Create, service, e))?;
            debug!(kind = K::NAME, id, service = %service, "creating service");
            self.deployment
                .create(&payload)
                .await
                .map_err(|e| self.fail(WorkflowStep::Create, service, e))?;
        }

        for service in configs.keys() {
            self.transition(WorkflowStep::Start, service, ServiceState::Running)
                .await?;
        }

        let document = document.with_state(ResourceState::Active);
        self.persist(id, &document).await?;
        info!(kind = K::NAME, id, "active");
        Ok(document)
    }

    /// Stops every service, deletes them when the policy asks for it, then
    /// stores the document as `inactive`. Returns the stored document.
    pub async fn deactivate(
        &self,
        id: &str,
        document: ResourceDocument,
    ) -> Result<ResourceDocument, WorkflowError> {
        info!(kind = K::NAME, id, services = document.services.len(), "deactivating");

        for service in document.services.keys() {
            self.transition(WorkflowStep::Stop, service, ServiceState::Stopped)
                .await?;
        }

        if self.policy.delete_on_deactivate {
            for service in document.services.keys() {
                self.delete_service(service).await?;
            }
        }

        let document = document.with_state(ResourceState::Inactive);
        self.persist(id, &document).await?;
        info!(kind = K::NAME, id, "inactive");
        Ok(document)
    }

    /// Deletes every service, then removes the document from the store.
    pub async fn remove(&self, id: &str, document: ResourceDocument) -> Result<(), WorkflowError> {
        info!(kind = K::NAME, id, services = document.services.len(), "removing");

        for service in document.services.keys() {
            self.delete_service(service).await?;
        }

        self.store
            .delete(id)
            .await
            .map_err(|e| self.fail(WorkflowStep::Persist, id, e))?;
        info!(kind = K::NAME, id, "removed");
        Ok(())
    }

    /// The create payload: the stored config plus `name` and `runtime_vars`.
    fn runtime_config(&self, id: &str, service: &str, config: &Value) -> ManagerResult<Value> {
        let Value::Object(config) = config else {
            return Err(ManagerError::validation(format!(
                "config of service '{service}' is not an object"
            )));
        };

        let mut runtime_vars = Map::new();
        runtime_vars.insert(K::ID_VAR.to_owned(), Value::from(id));
        runtime_vars.insert(
            GATEWAY_LOCAL_IP_VAR.to_owned(),
            self.gateway_local_ip.clone().map_or(Value::Null, Value::from),
        );

        let mut payload = config.clone();
        payload.insert("name".to_owned(), Value::from(service));
        payload.insert("runtime_vars".to_owned(), Value::Object(runtime_vars));
        Ok(Value::Object(payload))
    }

    async fn transition(
        &self,
        step: WorkflowStep,
        service: &str,
        state: ServiceState,
    ) -> Result<(), WorkflowError> {
        debug!(kind = K::NAME, service, %state, "changing service state");
        self.deployment
            .set_state(service, state)
            .await
            .map_err(|e| self.fail(step, service, e))
    }

    async fn delete_service(&self, service: &str) -> Result<(), WorkflowError> {
        let purge = self.policy.purge_on_remove;
        debug!(kind = K::NAME, service, purge, "deleting service");
        self.deployment
            .delete(service, purge)
            .await
            .map_err(|e| self.fail(WorkflowStep::Delete, service, e))
    }

    async fn persist(&self, id: &str, document: &ResourceDocument) -> Result<(), WorkflowError> {
        self.store
            .set(id, document)
            .await
            .map_err(|e| self.fail(WorkflowStep::Persist, id, e))
    }

    fn fail(&self, step: WorkflowStep, target: &str, source: ManagerError) -> WorkflowError {
        error!(kind = K::NAME, %step, service = target, error = %source, "workflow aborted");
        WorkflowError {
            step,
            target: target.to_owned(),
            source,
        }
    }
}
