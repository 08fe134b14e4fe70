//! # Worker Framework
//!
//! This crate provides per-key exclusivity for background tasks: at most one
//! task may run under a given worker name at any time, and the caller that
//! starts a task never waits for it to finish.
//!
//! ## Architecture Overview
//!
//! The framework follows the actor pattern and separates three layers:
//!
//! 1. **Registry** ([`WorkerRegistry`]) - a single Tokio task that owns the set
//!    of busy names and processes acquire/release/list messages sequentially
//! 2. **Interface** ([`WorkerClient`]) - a cloneable handle used to acquire slots
//! 3. **Guard** ([`Worker`]) - the slot itself; it runs one task in the
//!    background and releases the name when dropped
//!
//! Because the busy set lives inside one task there is no lock around it, and
//! because acquire and release share one FIFO channel a release is always
//! visible to every acquire sent after it.
//!
//! ## Example
//!
//! ```rust
//! use worker_framework::{FrameworkError, WorkerRegistry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (registry, client) = WorkerRegistry::new();
//!     let registry_handle = tokio::spawn(registry.run());
//!
//!     let worker = client.acquire("worker-m1").await.unwrap();
//!     let handle = worker.run(async {
//!         // talk to remote services here
//!         Ok::<(), String>(())
//!     });
//!
//!     // The caller is free to continue; await only to observe completion.
//!     handle.await.unwrap();
//!     assert!(client.busy().await.unwrap().is_empty());
//!
//!     drop(client);
//!     registry_handle.await.unwrap();
//! }
//! ```
//!
//! ## Failure Semantics
//!
//! A task that returns `Err` or panics is logged and its slot is released all
//! the same. A slot that is acquired but never used is released when the
//! guard goes out of scope.
//!
//! ## Testing
//!
//! The [`mock`] module provides a [`MockRegistry`](mock::MockRegistry) with
//! fluent `grant`/`reject` expectations for testing code that acquires workers.

pub mod client;
pub mod error;
pub mod message;
pub mod mock;
pub mod registry;
pub mod tracing;
pub mod worker;

// Re-export core types for convenience
pub use client::WorkerClient;
pub use error::FrameworkError;
pub use message::{BusyWorker, Response, WorkerRequest};
pub use registry::WorkerRegistry;
pub use worker::Worker;
