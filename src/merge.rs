//! Component builder that merges TOML resources into one table.
//!
//! Resources are parsed in order and deep-merged: nested tables merge key by
//! key, any other value is replaced by the later resource. A top-level
//! `[profile.<name>]` table is overlaid last when `<name>` is an active
//! profile and dropped otherwise.

use std::sync::Arc;

use anyhow::Context;
use toml::{Table, Value};
use tracing::debug;

use crate::builder::ComponentBuilder;
use crate::resource::ConfigResource;

const PROFILE_KEY: &str = "profile";

/// Builds a [`toml::Table`] from every configured resource.
#[derive(Debug, Clone, Default)]
pub struct MergedTomlBuilder {
    profiles: Vec<String>,
}

impl MergedTomlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate profiles, applied in the given order.
    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles.extend(profiles.into_iter().map(Into::into));
        self
    }
}

impl ComponentBuilder<Table> for MergedTomlBuilder {
    fn build(&self, resources: &[Arc<dyn ConfigResource>]) -> anyhow::Result<Table> {
        let mut merged = Table::new();
        let mut overlays = Table::new();

        for resource in resources {
            let content = resource.read_to_string()?;
            let mut table: Table = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", resource.description()))?;

            if let Some(profiles) = table.remove(PROFILE_KEY) {
                let Value::Table(profiles) = profiles else {
                    anyhow::bail!("'{PROFILE_KEY}' in {} must be a table", resource.description());
                };
                merge_tables(&mut overlays, profiles);
            }
            merge_tables(&mut merged, table);
        }

        for profile in &self.profiles {
            match overlays.remove(profile) {
                Some(Value::Table(overlay)) => {
                    debug!(profile = %profile, keys = overlay.len(), "Applying profile overlay");
                    merge_tables(&mut merged, overlay);
                },
                Some(_) => anyhow::bail!("profile '{profile}' must be a table"),
                None => {},
            }
        }

        Ok(merged)
    }
}

fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match value {
            Value::Table(incoming) => match base.get_mut(&key) {
                Some(Value::Table(existing)) => merge_tables(existing, incoming),
                _ => {
                    base.insert(key, Value::Table(incoming));
                },
            },
            value => {
                base.insert(key, value);
            },
        }
    }
}
