//! # Process lifecycle
//!
//! [`ManagerSystem`] wires the worker registry, the stores, the downstream
//! clients and the per-kind services together, and shuts them down again.
//!
//! ## Graceful Shutdown
//!
//! 1. **Stop serving** - the HTTP server drains and drops its router
//! 2. **Drop all clients** - the services and the registry client go away
//! 3. **Workflows finish** - each running worker releases its slot and drops
//!    its sender
//! 4. **Registry stops** - its channel closes and `run` returns
//!
//! Tracing is set up by
//! [`worker_framework::tracing::setup_tracing`] before the system is built.

pub mod manager_system;

pub use manager_system::ManagerSystem;
