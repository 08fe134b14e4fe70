//! HTTP client of the configuration storage service.

use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{expect_ok, http_client, ConfigService};
use crate::config::EndpointConfig;
use crate::error::{ManagerError, ManagerResult};
use crate::model::ServiceConfigs;

/// Talks to `{base}/{api}/{id}`.
#[derive(Debug, Clone)]
pub struct HttpConfigService {
    client: reqwest::Client,
    base_url: String,
    api: String,
}

impl HttpConfigService {
    pub fn new(endpoint: &EndpointConfig, api: &str) -> ManagerResult<Self> {
        Ok(Self {
            client: http_client(endpoint.timeout_secs)?,
            base_url: endpoint.url.trim_end_matches('/').to_owned(),
            api: api.to_owned(),
        })
    }

    /// A client with default reqwest settings.
    pub fn with_url(base_url: &str, api: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            api: api.to_owned(),
        }
    }

    fn url(&self, id: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api, id)
    }
}

#[async_trait]
impl ConfigService for HttpConfigService {
    #[instrument(skip(self, configs))]
    async fn put_configs(&self, id: &str, configs: &ServiceConfigs) -> ManagerResult<()> {
        let call = format!("storing configs of '{id}'");
        let response = self
            .client
            .put(self.url(id))
            .json(configs)
            .send()
            .await
            .map_err(|e| ManagerError::downstream(&call, e))?;
        expect_ok(&call, &response)?;
        debug!(services = configs.len(), "configs stored");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_configs(&self, id: &str) -> ManagerResult<ServiceConfigs> {
        let call = format!("retrieving configs of '{id}'");
        let response = self
            .client
            .get(self.url(id))
            .send()
            .await
            .map_err(|e| ManagerError::downstream(&call, e))?;
        expect_ok(&call, &response)?;
        response
            .json::<ServiceConfigs>()
            .await
            .map_err(|e| ManagerError::downstream(&call, e))
    }

    #[instrument(skip(self))]
    async fn delete_configs(&self, id: &str) -> ManagerResult<()> {
        let call = format!("removing configs of '{id}'");
        let response = self
            .client
            .delete(self.url(id))
            .send()
            .await
            .map_err(|e| ManagerError::downstream(&call, e))?;
        expect_ok(&call, &response)
    }
}
