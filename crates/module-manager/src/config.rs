//! Layered configuration.
//!
//! Layers, later ones win:
//!
//! 1. built-in defaults
//! 2. a TOML file (`manager.toml` unless `MODULE_MANAGER_CONFIG` names another)
//! 3. `MODULE_MANAGER_*` environment variables, `__` separating sections,
//!    e.g. `MODULE_MANAGER_DEPLOYMENT__URL`
//! 4. the identity variables `MODULE_ID`, `COMPONENT_ID` and `GATEWAY_LOCAL_IP`

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::error::{ManagerError, ManagerResult};
use crate::model::TeardownPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "manager.toml";
pub const CONFIG_FILE_VAR: &str = "MODULE_MANAGER_CONFIG";
pub const ENV_PREFIX: &str = "MODULE_MANAGER_";

/// Identity variables and the configuration keys they populate.
const IDENTITY_VARS: [(&str, &str); 3] = [
    ("MODULE_ID", "modules.reserved_id"),
    ("COMPONENT_ID", "components.reserved_id"),
    ("GATEWAY_LOCAL_IP", "identity.gateway_local_ip"),
];

/// Top-level configuration of the manager process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagerConfig {
    pub server: ServerConfig,
    pub config_storage: EndpointConfig,
    pub deployment: EndpointConfig,
    pub store: StoreConfig,
    pub identity: IdentityConfig,
    pub logger: LoggerConfig,
    pub modules: KindConfig,
    pub components: KindConfig,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            config_storage: EndpointConfig::new("http://configuration-storage"),
            deployment: EndpointConfig::new("http://deployment-management"),
            store: StoreConfig::default(),
            identity: IdentityConfig::default(),
            logger: LoggerConfig::default(),
            modules: KindConfig::default(),
            components: KindConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080),
        }
    }
}

/// Base URL and request timeout of a downstream HTTP service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Root directory of the file store; each kind gets a subdirectory.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            path: PathBuf::from("./data"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Handed to every activated service as `GATEWAY_LOCAL_IP`.
    pub gateway_local_ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

/// Settings of one resource kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindConfig {
    pub enabled: bool,
    /// The manager's own id for this kind; definitions using it are refused.
    pub reserved_id: Option<String>,
    pub config_api: String,
    pub deployment_api: String,
    pub delete_on_deactivate: bool,
    pub purge_on_remove: bool,
}

impl Default for KindConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reserved_id: None,
            config_api: "configs".to_owned(),
            deployment_api: "deployments".to_owned(),
            delete_on_deactivate: false,
            purge_on_remove: false,
        }
    }
}

impl KindConfig {
    pub fn teardown(&self) -> TeardownPolicy {
        TeardownPolicy {
            delete_on_deactivate: self.delete_on_deactivate,
            purge_on_remove: self.purge_on_remove,
        }
    }
}

impl ManagerConfig {
    /// Loads the configuration from the process environment.
    pub fn load() -> ManagerResult<Self> {
        let path = std::env::var(CONFIG_FILE_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_owned());
        Self::from_file(path)
    }

    /// Loads the configuration using `path` as the file layer.
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn from_file(path: impl AsRef<Path>) -> ManagerResult<Self> {
        let figment = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let figment = with_identity(figment, |var| std::env::var(var).ok());

        figment
            .extract()
            .map_err(|e| ManagerError::Config(e.to_string()))
    }

    /// Parses the configuration from a TOML string on top of the defaults.
    pub fn parse(content: &str) -> ManagerResult<Self> {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::string(content))
            .extract()
            .map_err(|e| ManagerError::Config(e.to_string()))
    }
}

fn with_identity(mut figment: Figment, lookup: impl Fn(&str) -> Option<String>) -> Figment {
    for (var, key) in IDENTITY_VARS {
        if let Some(value) = lookup(var) {
            figment = figment.merge(Serialized::default(key, value));
        }
    }
    figment
}
