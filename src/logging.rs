//! Logging setup for host binaries that embed this kernel.
//!
//! The kernel itself only ever logs through the [`log`] facade macros (`log::trace!`,
//! `log::debug!`, `log::warn!`), so it works whether or not a subscriber has been installed.
//! [`init_tracing`] is an optional convenience for a host binary that wants structured,
//! `EnvFilter`-driven output.

use tracing_subscriber::{fmt::Layer, prelude::*, registry::Registry, EnvFilter};

/// Install a global `tracing` subscriber reading its filter from `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"info"`) when the environment variable isn't set.
///
/// Idempotent only in the sense that `tracing`'s own global-default guard is: calling this twice
/// in the same process will return an error from the underlying `set_global_default`, which is
/// ignored here since a second install is a caller bug, not a kernel concern.
pub fn init_tracing(default_filter: &str) {
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = Registry::default().with(filter_layer).with(Layer::default());

    // Ignore the error: a host binary that already installed its own subscriber takes priority.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
