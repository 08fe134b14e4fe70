//! # Module Manager
//!
//! Drives modules and components through their lifecycle on a deployment
//! management service, keeping their service configurations in a
//! configuration storage service and their slim documents in a local store.
//!
//! ## Core Components
//!
//! - **[orchestrator]**: the activate, deactivate and remove workflows
//! - **[service]**: request-level checks, then one workflow per resource at a
//!   time on a [`worker_framework::Worker`]
//! - **[model]**: resource kinds, documents and definition parsing
//! - **[clients]**: the config storage and deployment service clients
//! - **[store]**: memory and file backed document stores
//! - **[api]**: the axum router
//! - **[lifecycle]**: wiring and shutdown of the whole process
//!
//! ## Testing
//!
//! With the `testing` feature, [`clients::fake`] provides in-memory
//! stand-ins for both downstream services.

pub mod api;
pub mod clients;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod orchestrator;
pub mod service;
pub mod store;

pub use config::ManagerConfig;
pub use error::{ManagerError, ManagerResult};
pub use lifecycle::ManagerSystem;
pub use model::{Component, Module, ResourceDocument, ResourceKind, ResourceState};
pub use orchestrator::Orchestrator;
pub use service::{KindBackends, ResourceService, Transition};
