//! # In-memory service fakes
//!
//! Stand-ins for the config storage and deployment services that record
//! every call and fail on request, for testing the orchestrator and the
//! HTTP layer without a network.
//!
//! ```rust
//! use module_manager::clients::fake::{DeploymentCall, FakeDeploymentService};
//! use module_manager::clients::{DeploymentService, ServiceState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let deployment = FakeDeploymentService::new();
//!     deployment.fail_on(DeploymentCall::SetState("svcB".into(), ServiceState::Running));
//!
//!     deployment.set_state("svcA", ServiceState::Running).await.unwrap();
//!     assert!(deployment.set_state("svcB", ServiceState::Running).await.is_err());
//!     assert_eq!(deployment.calls().len(), 2);
//! }
//! ```
//!
//! ## Holding calls
//!
//! [`FakeDeploymentService::with_gate`] makes every call wait for a permit
//! on a semaphore, which keeps a workflow in flight until the test adds
//! permits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Semaphore;

use super::{ConfigService, DeploymentService, ServiceState};
use crate::error::{ManagerError, ManagerResult};
use crate::model::ServiceConfigs;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConfigCall {
    Put(String),
    Get(String),
    Delete(String),
}

/// Keeps configurations in a map keyed by resource id.
#[derive(Debug, Default)]
pub struct FakeConfigService {
    configs: Mutex<HashMap<String, ServiceConfigs>>,
    calls: Mutex<Vec<ConfigCall>>,
    failures: Mutex<Vec<ConfigCall>>,
}

impl FakeConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every future `call` answer with HTTP 500.
    pub fn fail_on(&self, call: ConfigCall) {
        self.failures.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<ConfigCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The configurations currently stored for `id`.
    pub fn stored(&self, id: &str) -> Option<ServiceConfigs> {
        self.configs.lock().unwrap().get(id).cloned()
    }

    fn record(&self, call: ConfigCall) -> ManagerResult<()> {
        self.calls.lock().unwrap().push(call.clone());
        if self.failures.lock().unwrap().contains(&call) {
            return Err(ManagerError::downstream(format!("{call:?}"), "status 500"));
        }
        Ok(())
    }
}

#[async_trait]
impl ConfigService for FakeConfigService {
    async fn put_configs(&self, id: &str, configs: &ServiceConfigs) -> ManagerResult<()> {
        self.record(ConfigCall::Put(id.to_owned()))?;
        self.configs
            .lock()
            .unwrap()
            .insert(id.to_owned(), configs.clone());
        Ok(())
    }

    async fn get_configs(&self, id: &str) -> ManagerResult<ServiceConfigs> {
        self.record(ConfigCall::Get(id.to_owned()))?;
        self.stored(id)
            .ok_or_else(|| ManagerError::downstream(format!("Get({id:?})"), "status 404"))
    }

    async fn delete_configs(&self, id: &str) -> ManagerResult<()> {
        self.record(ConfigCall::Delete(id.to_owned()))?;
        self.configs.lock().unwrap().remove(id);
        Ok(())
    }
}

/// One recorded deployment call. `Create` carries the injected service name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeploymentCall {
    Create(String),
    SetState(String, ServiceState),
    Delete { service: String, purge: bool },
}

#[derive(Debug, Default)]
pub struct FakeDeploymentService {
    calls: Mutex<Vec<DeploymentCall>>,
    created: Mutex<Vec<Value>>,
    failures: Mutex<Vec<DeploymentCall>>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeDeploymentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call first takes one permit from `gate`.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Makes every future `call` answer with HTTP 500.
    pub fn fail_on(&self, call: DeploymentCall) {
        self.failures.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<DeploymentCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Bodies of all create calls, in call order.
    pub fn created(&self) -> Vec<Value> {
        self.created.lock().unwrap().clone()
    }

    async fn record(&self, call: DeploymentCall) -> ManagerResult<()> {
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| ManagerError::Internal(e.to_string()))?
                .forget();
        }
        self.calls.lock().unwrap().push(call.clone());
        if self.failures.lock().unwrap().contains(&call) {
            return Err(ManagerError::downstream(format!("{call:?}"), "status 500"));
        }
        Ok(())
    }
}

#[async_trait]
impl DeploymentService for FakeDeploymentService {
    async fn create(&self, config: &Value) -> ManagerResult<()> {
        let service = config
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        self.record(DeploymentCall::Create(service)).await?;
        self.created.lock().unwrap().push(config.clone());
        Ok(())
    }

    async fn set_state(&self, service: &str, state: ServiceState) -> ManagerResult<()> {
        self.record(DeploymentCall::SetState(service.to_owned(), state))
            .await
    }

    async fn delete(&self, service: &str, purge: bool) -> ManagerResult<()> {
        self.record(DeploymentCall::Delete {
            service: service.to_owned(),
            purge,
        })
        .await
    }
}
