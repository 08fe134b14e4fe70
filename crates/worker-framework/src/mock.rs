//! # Mock Registry & Testing Guide
//!
//! Code that acquires workers (request handlers, services) usually wants to
//! test its *busy* path without arranging a real long-running task. The
//! helpers here replace the registry with something the test controls.
//!
//! | Feature | MockRegistry | Real registry |
//! |---------|--------------|---------------|
//! | **Busy path** | `expect_acquire(..).reject()` | needs an in-flight task |
//! | **Determinism** | 100% | subject to scheduler |
//! | **Release tracking** | `released()` | `busy()` listing |
//!
//! ## Fluent expectations
//!
//! ```rust
//! use worker_framework::mock::MockRegistry;
//! use worker_framework::FrameworkError;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockRegistry::new();
//!     mock.expect_acquire("worker-m1").grant();
//!     mock.expect_acquire("worker-m1").reject();
//!
//!     let client = mock.client();
//!     let worker = client.acquire("worker-m1").await.unwrap();
//!     let busy = client.acquire("worker-m1").await;
//!     assert!(matches!(busy, Err(FrameworkError::WorkerBusy(_))));
//!
//!     worker.run(async { Ok::<(), String>(()) }).await.unwrap();
//!     mock.verify();
//! }
//! ```
//!
//! ## Raw channel
//!
//! [`create_mock_registry`] hands back the receiver so a test can answer each
//! request itself, see [`expect_acquire`].

use crate::client::WorkerClient;
use crate::error::FrameworkError;
use crate::message::{Response, WorkerRequest};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// An expected `acquire` and the answer to give.
struct Expectation {
    name: String,
    grant: bool,
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    released: Vec<String>,
}

/// A registry stand-in driven by expectations.
///
/// Expectations are matched in order. An `acquire` for a different name than
/// the next expectation, or with no expectation left, panics the background
/// task, which surfaces in the test as a `RegistryDropped` error.
pub struct MockRegistry {
    client: WorkerClient,
    state: Arc<Mutex<MockState>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRegistry {
    /// Creates a mock registry with no expectations.
    pub fn new() -> Self {
        let (client, mut receiver) = create_mock_registry();
        let state = Arc::new(Mutex::new(MockState::default()));
        let state_clone = state.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                match request {
                    WorkerRequest::Acquire {
                        name, respond_to, ..
                    } => {
                        let expectation = state_clone.lock().unwrap().expectations.pop_front();
                        match expectation {
                            Some(exp) if exp.name == name => {
                                let response = if exp.grant {
                                    Ok(())
                                } else {
                                    Err(FrameworkError::WorkerBusy(name))
                                };
                                let _ = respond_to.send(response);
                            }
                            Some(exp) => panic!(
                                "Unexpected acquire for '{}', expected '{}'",
                                name, exp.name
                            ),
                            None => panic!("Unexpected acquire for '{}'", name),
                        }
                    }
                    WorkerRequest::Release { name, .. } => {
                        state_clone.lock().unwrap().released.push(name);
                    }
                    WorkerRequest::ListBusy { respond_to } => {
                        let _ = respond_to.send(Ok(Vec::new()));
                    }
                }
            }
        });

        Self {
            client,
            state,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> WorkerClient {
        self.client.clone()
    }

    /// Expects an `acquire` for `name`.
    pub fn expect_acquire(&self, name: impl Into<String>) -> AcquireExpectationBuilder {
        AcquireExpectationBuilder {
            name: name.into(),
            state: self.state.clone(),
        }
    }

    /// Names released so far, in release order.
    ///
    /// Releases arrive asynchronously; await the task's handle first.
    pub fn released(&self) -> Vec<String> {
        self.state.lock().unwrap().released.clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let state = self.state.lock().unwrap();
        if !state.expectations.is_empty() {
            panic!(
                "Not all expectations were met. {} remaining",
                state.expectations.len()
            );
        }
    }
}

/// Builder for `acquire` expectations.
pub struct AcquireExpectationBuilder {
    name: String,
    state: Arc<Mutex<MockState>>,
}

impl AcquireExpectationBuilder {
    /// Grants the slot.
    pub fn grant(self) {
        self.push(true);
    }

    /// Rejects the acquisition as busy.
    pub fn reject(self) {
        self.push(false);
    }

    fn push(self, grant: bool) {
        self.state.lock().unwrap().expectations.push_back(Expectation {
            name: self.name,
            grant,
        });
    }
}

/// Creates a client wired to a receiver owned by the test.
pub fn create_mock_registry() -> (WorkerClient, mpsc::UnboundedReceiver<WorkerRequest>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (WorkerClient::new(sender), receiver)
}

/// Waits for the next `Acquire` request, skipping releases and listings.
pub async fn expect_acquire(
    receiver: &mut mpsc::UnboundedReceiver<WorkerRequest>,
) -> Option<(String, Response<()>)> {
    while let Some(request) = receiver.recv().await {
        if let WorkerRequest::Acquire {
            name, respond_to, ..
        } = request
        {
            return Some((name, respond_to));
        }
    }
    None
}

/// Waits for the next `Release` request and returns its worker name.
pub async fn expect_release(
    receiver: &mut mpsc::UnboundedReceiver<WorkerRequest>,
) -> Option<String> {
    while let Some(request) = receiver.recv().await {
        if let WorkerRequest::Release { name, .. } = request {
            return Some(name);
        }
    }
    None
}
