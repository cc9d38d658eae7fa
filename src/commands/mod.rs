//! CLI command implementations for reloadable.
//!
//! - [`watch`] - Run a service in the foreground, reloading on change
//! - [`validate`] - Check a service file and its resources

pub mod validate;
pub mod watch;

/// Initialize stdout logging.
///
/// `RUST_LOG` overrides the default `info` filter.
pub fn init_logging(json: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
