//! Observability for aerodoc
//!
//! Structured logging goes through `tracing`. Each log line names a typed
//! `Event` in its `event` field so that output can be filtered by event
//! regardless of wording.
//!
//! # Usage
//!
//! ```ignore
//! use aerodoc::observability::{init_logging, Event};
//!
//! init_logging("info");
//! tracing::info!(event = %Event::SchemasLoaded, count = 3, "schemas loaded");
//! ```

mod events;

pub use events::Event;

use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Calling this more
/// than once keeps the first subscriber.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
