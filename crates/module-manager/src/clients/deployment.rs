//! HTTP client of the deployment management service.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::instrument;

use super::{expect_ok, http_client, DeploymentService, ServiceState};
use crate::config::EndpointConfig;
use crate::error::{ManagerError, ManagerResult};

/// Creates at `{base}/{api}` and addresses instances at `{base}/{api}/{service}`.
#[derive(Debug, Clone)]
pub struct HttpDeploymentService {
    client: reqwest::Client,
    base_url: String,
    api: String,
}

impl HttpDeploymentService {
    pub fn new(endpoint: &EndpointConfig, api: &str) -> ManagerResult<Self> {
        Ok(Self {
            client: http_client(endpoint.timeout_secs)?,
            base_url: endpoint.url.trim_end_matches('/').to_owned(),
            api: api.to_owned(),
        })
    }

    pub fn with_url(base_url: &str, api: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api: api.to_owned(),
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.api)
    }

    fn service_url(&self, service: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api, service)
    }
}

#[async_trait]
impl DeploymentService for HttpDeploymentService {
    #[instrument(skip(self, config))]
    async fn create(&self, config: &Value) -> ManagerResult<()> {
        let service = config.get("name").and_then(Value::as_str).unwrap_or_default();
        let call = format!("creating service '{service}'");
        let response = self
            .client
            .post(self.collection_url())
            .json(config)
            .send()
            .await
            .map_err(|e| ManagerError::downstream(&call, e))?;
        expect_ok(&call, &response)
    }

    #[instrument(skip(self))]
    async fn set_state(&self, service: &str, state: ServiceState) -> ManagerResult<()> {
        let call = format!("setting service '{service}' to {state}");
        let response = self
            .client
            .patch(self.service_url(service))
            .json(&json!({ "state": state }))
            .send()
            .await
            .map_err(|e| ManagerError::downstream(&call, e))?;
        expect_ok(&call, &response)
    }

    #[instrument(skip(self))]
    async fn delete(&self, service: &str, purge: bool) -> ManagerResult<()> {
        let call = format!("deleting service '{service}'");
        let mut request = self.client.delete(self.service_url(service));
        if purge {
            request = request.query(&[("option", "purge")]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| ManagerError::downstream(&call, e))?;
        expect_ok(&call, &response)
    }
}
