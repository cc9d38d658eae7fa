//! Validate a service file and trial-build its component.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;

use reloadable::builder::ComponentBuilder;
use reloadable::config::ServiceConfig;
use reloadable::merge::MergedTomlBuilder;
use reloadable::resource::{ConfigResource, FileResource};

/// Check the service file, then build the component once without starting
/// a service.
///
/// # Errors
///
/// Returns an error if validation fails or the trial build is rejected.
pub fn execute(path: &Path) -> Result<()> {
    let config = ServiceConfig::load_from(path)?;
    let validation = config.validate()?;

    println!("Service '{}' ({})", config.id, path.display());
    println!("  fail_fast:        {}", config.fail_fast);
    println!("  poll_interval_ms: {}", config.poll_interval_ms);
    if !config.profiles.is_empty() {
        println!("  profiles:         {}", config.profiles.join(", "));
    }

    let resources: Vec<Arc<dyn ConfigResource>> = config
        .resource_paths()
        .into_iter()
        .map(|path| Arc::new(FileResource::new(path)) as Arc<dyn ConfigResource>)
        .collect();
    for resource in &resources {
        println!("  resource:         {}", resource.description());
    }

    if validation.has_warnings() {
        println!("\nWarnings:");
        for warning in &validation.warnings {
            println!("  - {warning}");
        }
    }

    let table = MergedTomlBuilder::new()
        .with_profiles(config.profiles.iter().cloned())
        .build(&resources)
        .with_context(|| format!("Trial build of '{}' failed", config.id))?;

    println!("\nOK: component builds with {} top-level keys", table.len());
    Ok(())
}
