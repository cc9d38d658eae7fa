//! Run a service in the foreground.
//!
//! The component is the merged table of every TOML resource listed in the
//! service file. Each newly published version is logged until Ctrl+C.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use reloadable::config::ServiceConfig;
use reloadable::merge::MergedTomlBuilder;
use reloadable::service::ReloadableService;

use super::init_logging;

/// How often the command checks for a newly published version to report.
const STATUS_CHECK_INTERVAL: Duration = Duration::from_millis(250);

type TomlService = ReloadableService<toml::Table>;

/// Watch a service until interrupted.
///
/// # Errors
///
/// Returns an error if the service file is unreadable or invalid, or if the
/// initial build fails with `fail_fast` enabled.
pub async fn execute(path: &Path, poll_interval_ms: Option<u64>, json: bool) -> Result<()> {
    init_logging(json);

    let mut config = ServiceConfig::load_from(path)?;
    if let Some(ms) = poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    let validation = config.validate()?;
    for warning in &validation.warnings {
        warn!("{warning}");
    }

    let builder = MergedTomlBuilder::new().with_profiles(config.profiles.iter().cloned());
    let service: Arc<TomlService> = Arc::new(ReloadableService::from_config(&config, builder));
    service
        .start()
        .with_context(|| format!("Failed to start service '{}'", config.id))?;

    if config.poll_interval_ms == 0 {
        info!(service = %config.id, "Polling disabled, serving the initial build only");
    }
    info!(service = %config.id, "Watching for changes, press Ctrl+C to stop");

    let mut reported = 0;
    if service.status().generation > 0 {
        reported = report(&service, json)?;
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(STATUS_CHECK_INTERVAL);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl+C")?;
                break;
            }
            _ = ticker.tick() => {
                if service.status().generation != reported {
                    reported = report(&service, json)?;
                }
            }
        }
    }

    info!(service = %config.id, "Shutting down");
    service.stop();
    Ok(())
}

/// Log the published version. Returns the generation reported.
fn report(service: &TomlService, json: bool) -> Result<u64> {
    let status = service.status();
    match service.pin() {
        Ok(table) => {
            let keys: Vec<&str> = table.keys().map(String::as_str).collect();
            info!(
                service = %service.id(),
                generation = table.generation(),
                keys = ?keys,
                "Serving configuration"
            );
        },
        Err(e) => warn!(service = %service.id(), error = %e, "No configuration to report"),
    }

    if json {
        println!("{}", serde_json::to_string(&status)?);
    }
    Ok(status.generation)
}
