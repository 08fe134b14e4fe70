use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info};
use worker_framework::{WorkerClient, WorkerRegistry};

use crate::api;
use crate::clients::{HttpConfigService, HttpDeploymentService};
use crate::config::{KindConfig, ManagerConfig, StoreBackend};
use crate::error::ManagerResult;
use crate::model::{Component, Module, ResourceKind};
use crate::service::{KindBackends, KindSettings, ResourceService};
use crate::store::{FileStore, MemoryStore, ResourceStore};

/// How long `shutdown` waits for running workflows to release their slots.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// The running manager: the worker registry plus one service per enabled kind.
///
/// `ManagerSystem` is responsible for:
/// - **Lifecycle Management**: starting and stopping the worker registry
/// - **Dependency Wiring**: giving each kind its store, clients and settings
///
/// # Example
///
/// ```ignore
/// let config = ManagerConfig::load()?;
/// let system = ManagerSystem::new(&config)?;
///
/// axum::serve(listener, system.router().into_make_service()).await?;
///
/// system.shutdown().await?;
/// ```
pub struct ManagerSystem {
    /// Client of the worker registry shared by both kinds.
    pub workers: WorkerClient,

    pub modules: Option<Arc<ResourceService<Module>>>,

    pub components: Option<Arc<ResourceService<Component>>>,

    registry_handle: JoinHandle<()>,
}

impl ManagerSystem {
    /// Builds the system with HTTP clients and the configured store backend.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &ManagerConfig) -> ManagerResult<Self> {
        let modules = if config.modules.enabled {
            Some(http_backends::<Module>(config, &config.modules)?)
        } else {
            None
        };
        let components = if config.components.enabled {
            Some(http_backends::<Component>(config, &config.components)?)
        } else {
            None
        };
        Ok(Self::with_backends(config, modules, components))
    }

    /// Builds the system around the given backends. A kind without backends
    /// is disabled whatever the configuration says.
    pub fn with_backends(
        config: &ManagerConfig,
        modules: Option<KindBackends>,
        components: Option<KindBackends>,
    ) -> Self {
        let (registry, workers) = WorkerRegistry::new();
        let registry_handle = tokio::spawn(registry.run());

        let gateway_local_ip = config.identity.gateway_local_ip.clone();
        let modules = modules.map(|backends| {
            Arc::new(ResourceService::<Module>::new(
                backends,
                workers.clone(),
                settings(&config.modules, &gateway_local_ip),
            ))
        });
        let components = components.map(|backends| {
            Arc::new(ResourceService::<Component>::new(
                backends,
                workers.clone(),
                settings(&config.components, &gateway_local_ip),
            ))
        });

        info!(
            modules = modules.is_some(),
            components = components.is_some(),
            "manager system started"
        );

        Self {
            workers,
            modules,
            components,
            registry_handle,
        }
    }

    /// The HTTP API of all enabled kinds.
    pub fn router(&self) -> api::App {
        api::app(
            self.modules.clone(),
            self.components.clone(),
            self.workers.clone(),
        )
    }

    /// Gracefully shuts down the system.
    ///
    /// Dropping the services and the registry client closes the registry's
    /// channel once every running workflow has released its slot. Routers
    /// returned by [`router`](Self::router) hold clients too and must be
    /// dropped first.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down manager system...");

        drop(self.modules);
        drop(self.components);
        drop(self.workers);

        match tokio::time::timeout(SHUTDOWN_GRACE, self.registry_handle).await {
            Ok(Ok(())) => {
                info!("Manager system shut down cleanly");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = %e, "Worker registry failed");
                Err(format!("worker registry failed: {e}"))
            }
            Err(_) => {
                error!("Workers still busy after shutdown grace period");
                Err("workers still busy after shutdown grace period".to_owned())
            }
        }
    }
}

fn settings(kind: &KindConfig, gateway_local_ip: &Option<String>) -> KindSettings {
    KindSettings {
        reserved_id: kind.reserved_id.clone(),
        gateway_local_ip: gateway_local_ip.clone(),
        policy: kind.teardown(),
    }
}

fn http_backends<K: ResourceKind>(
    config: &ManagerConfig,
    kind: &KindConfig,
) -> ManagerResult<KindBackends> {
    let store: Arc<dyn ResourceStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::open(config.store.path.join(K::COLLECTION))?),
    };

    Ok(KindBackends {
        config: Arc::new(HttpConfigService::new(&config.config_storage, &kind.config_api)?),
        deployment: Arc::new(HttpDeploymentService::new(
            &config.deployment,
            &kind.deployment_api,
        )?),
        store,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;

    #[tokio::test]
    async fn test_disabled_kind_has_no_service() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ManagerConfig::default();
        config.components.enabled = false;
        config.store = StoreConfig {
            backend: StoreBackend::File,
            path: dir.path().to_path_buf(),
        };

        let system = ManagerSystem::new(&config).unwrap();
        assert!(system.modules.is_some());
        assert!(system.components.is_none());
        assert!(dir.path().join("modules").is_dir());
        assert!(!dir.path().join("components").exists());

        system.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_router_clients() {
        let mut config = ManagerConfig::default();
        config.store.backend = StoreBackend::Memory;

        let system = ManagerSystem::new(&config).unwrap();
        let router = system.router();
        drop(router);

        system.shutdown().await.unwrap();
    }
}
