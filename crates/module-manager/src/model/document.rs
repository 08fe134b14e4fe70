//! The durable record kept for each resource.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ManagerError, ManagerResult};

/// Lifecycle state of a stored resource. Removal deletes the document, so
/// there is no stored `removed` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceState {
    Inactive,
    Active,
}

impl ResourceState {
    pub fn parse(value: &str) -> ManagerResult<Self> {
        match value {
            "inactive" => Ok(Self::Inactive),
            "active" => Ok(Self::Active),
            other => Err(ManagerError::validation(format!("unknown state '{other}'"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHash {
    pub hash: String,
}

/// Service hashes in submission order.
///
/// Serialised as a JSON object; deactivation and removal walk the services
/// in the order they were submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ServiceHashes(Vec<(String, ServiceHash)>);

impl ServiceHashes {
    /// Adds `service`, replacing an earlier entry of the same name in place.
    pub fn insert(&mut self, service: String, hash: ServiceHash) {
        match self.0.iter_mut().find(|(name, _)| *name == service) {
            Some(entry) => entry.1 = hash,
            None => self.0.push((service, hash)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ServiceHash)> for ServiceHashes {
    fn from_iter<I: IntoIterator<Item = (String, ServiceHash)>>(iter: I) -> Self {
        let mut hashes = Self::default();
        for (service, hash) in iter {
            hashes.insert(service, hash);
        }
        hashes
    }
}

impl TryFrom<Map<String, Value>> for ServiceHashes {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        map.into_iter()
            .map(|(service, value)| Ok((service, serde_json::from_value(value)?)))
            .collect()
    }
}

impl From<ServiceHashes> for Map<String, Value> {
    fn from(hashes: ServiceHashes) -> Self {
        hashes
            .0
            .into_iter()
            .map(|(service, hash)| {
                let mut entry = Map::new();
                entry.insert("hash".to_owned(), Value::from(hash.hash));
                (service, Value::Object(entry))
            })
            .collect()
    }
}

/// Slim document stored under the resource id.
///
/// The id is the store key and is not part of the document. Full service
/// configurations live in the config storage service; only their hashes
/// are kept here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDocument {
    pub name: String,
    pub description: String,
    pub hash: String,
    pub services: ServiceHashes,
    pub state: ResourceState,
}

impl ResourceDocument {
    pub fn is_active(&self) -> bool {
        self.state == ResourceState::Active
    }

    /// Returns the same document in `state`.
    pub fn with_state(mut self, state: ResourceState) -> Self {
        self.state = state;
        self
    }
}
