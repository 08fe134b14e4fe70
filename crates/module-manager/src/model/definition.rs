//! Parsing of submitted resource definitions.
//!
//! A definition carries the resource metadata plus one full configuration
//! per service, each with its own `hash`:
//!
//! ```json
//! {
//!   "id": "m1", "name": "X", "description": "d", "hash": "abc",
//!   "services": { "svcA": { "hash": "h1", "image": "x" } }
//! }
//! ```
//!
//! [`normalize`] splits it into the slim [`ResourceDocument`] kept locally
//! and the hash-free configurations forwarded to the config storage service.

use serde_json::{Map, Value};

use crate::error::{ManagerError, ManagerResult};
use crate::model::document::{ResourceDocument, ResourceState, ServiceHash, ServiceHashes};

/// Service name to configuration, in submission order.
pub type ServiceConfigs = Map<String, Value>;

/// Result of [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDefinition {
    pub id: String,
    /// Slim document in state `inactive`.
    pub document: ResourceDocument,
    pub configs: ServiceConfigs,
}

/// Splits a submitted definition into its slim document and service configs.
pub fn normalize(definition: Value) -> ManagerResult<NormalizedDefinition> {
    let Value::Object(mut fields) = definition else {
        return Err(ManagerError::validation("definition must be a JSON object"));
    };

    let id = required_string(&fields, "id", "id")?;
    let name = required_string(&fields, "name", "name")?;
    let description = required_string(&fields, "description", "description")?;
    let hash = required_string(&fields, "hash", "hash")?;

    let services = match fields.remove("services") {
        Some(Value::Object(services)) => services,
        Some(_) => return Err(wrong_type("services", "an object")),
        None => return Err(missing("services")),
    };

    let mut hashes = ServiceHashes::default();
    let mut configs = ServiceConfigs::new();
    for (service, config) in services {
        let path = format!("services.{service}");
        let Value::Object(config) = config else {
            return Err(wrong_type(&path, "an object"));
        };
        let hash = required_string(&config, "hash", &format!("{path}.hash"))?;

        // Rebuilt rather than removed in place to keep the remaining field order.
        let config: Map<String, Value> = config.into_iter().filter(|(key, _)| key != "hash").collect();

        hashes.insert(service.clone(), ServiceHash { hash });
        configs.insert(service, Value::Object(config));
    }

    Ok(NormalizedDefinition {
        id,
        document: ResourceDocument {
            name,
            description,
            hash,
            services: hashes,
            state: ResourceState::Inactive,
        },
        configs,
    })
}

fn required_string(fields: &Map<String, Value>, key: &str, path: &str) -> ManagerResult<String> {
    match fields.get(key) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(wrong_type(path, "a string")),
        None => Err(missing(path)),
    }
}

fn missing(path: &str) -> ManagerError {
    ManagerError::validation(format!("missing key '{path}'"))
}

fn wrong_type(path: &str, expected: &str) -> ManagerError {
    ManagerError::validation(format!("'{path}' must be {expected}"))
}
