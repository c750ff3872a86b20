//! Texpatch - texture replacement for binary asset containers
//!
//! This is the library crate behind the `texpatch` binary. It loads a
//! container, swaps named texture records for external images and writes the
//! result back with a backup or as a separate copy.

pub mod catalog;
pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod matcher;
pub mod patch;

pub use error::{PatchError, RecordError};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber
pub fn init_logging() {
    let installed = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "texpatch=info,texpatch_lib=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();

    match installed {
        Ok(()) => tracing::debug!("Logging initialized"),
        Err(e) => tracing::debug!("Keeping existing subscriber: {}", e),
    }
}
