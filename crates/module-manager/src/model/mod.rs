//! Data model: resource kinds, stored documents and submitted definitions.

pub mod definition;
pub mod document;
pub mod kind;

pub use definition::{normalize, NormalizedDefinition, ServiceConfigs};
pub use document::{ResourceDocument, ResourceState, ServiceHash, ServiceHashes};
pub use kind::{Component, Module, ResourceKind, TeardownPolicy, GATEWAY_LOCAL_IP_VAR};
