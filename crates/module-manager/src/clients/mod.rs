//! Clients of the two downstream services.
//!
//! The orchestrator only sees the [`ConfigService`] and [`DeploymentService`]
//! traits; [`HttpConfigService`] and [`HttpDeploymentService`] talk to the
//! real services, the fakes in [`fake`] stand in for them in tests.
//! Every call succeeds on exactly HTTP 200.

pub mod config_storage;
pub mod deployment;
#[cfg(any(test, feature = "testing"))]
pub mod fake;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::error::ManagerResult;
use crate::model::ServiceConfigs;

pub use config_storage::HttpConfigService;
pub use deployment::HttpDeploymentService;

/// Stores the full service configurations of each resource.
#[async_trait]
pub trait ConfigService: Send + Sync {
    async fn put_configs(&self, id: &str, configs: &ServiceConfigs) -> ManagerResult<()>;
    async fn get_configs(&self, id: &str) -> ManagerResult<ServiceConfigs>;
    async fn delete_configs(&self, id: &str) -> ManagerResult<()>;
}

/// Creates, starts, stops and deletes runtime service instances.
#[async_trait]
pub trait DeploymentService: Send + Sync {
    /// Creates an instance from a full service configuration.
    async fn create(&self, config: &Value) -> ManagerResult<()>;
    async fn set_state(&self, service: &str, state: ServiceState) -> ManagerResult<()>;
    async fn delete(&self, service: &str, purge: bool) -> ManagerResult<()>;
}

/// Target state of a runtime service instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Running,
    Stopped,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
        }
    }
}

/// Builds a reqwest client with the endpoint's request timeout.
pub(crate) fn http_client(timeout_secs: u64) -> ManagerResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| crate::error::ManagerError::Config(format!("building HTTP client: {e}")))
}

/// Maps anything but HTTP 200 to a downstream error for `call`.
pub(crate) fn expect_ok(call: &str, response: &reqwest::Response) -> ManagerResult<()> {
    if response.status() == reqwest::StatusCode::OK {
        Ok(())
    } else {
        Err(crate::error::ManagerError::downstream(
            call,
            format!("status {}", response.status().as_u16()),
        ))
    }
}
