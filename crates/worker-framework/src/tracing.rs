//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the `tracing-subscriber` formatter used by the
//! binaries built on this framework.
//!
//! - **Structured logging** with the `tracing` crate
//! - **Configurable log levels** via the `RUST_LOG` environment variable,
//!   falling back to the directive passed by the caller
//! - **Compact format**: targets are hidden, spans are shown inline
//!
//! ## What Gets Traced
//!
//! - **Registry lifecycle**: startup and shutdown with the number of busy workers
//! - **Slots**: acquisitions, rejections (`Busy`), releases and how long a slot was held
//! - **Workers**: `starting`, `finished`, `task failed` and `task panicked`
//!
//! ```bash
//! RUST_LOG=info cargo run     # worker start/finish only
//! RUST_LOG=debug cargo run    # every acquire and release
//! ```

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber.
///
/// `default_directive` is used when `RUST_LOG` is unset or invalid, e.g.
/// `"info"`. Calling this twice is harmless; the second call is ignored.
pub fn setup_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}
