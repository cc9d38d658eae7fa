//! Service file loading and validation.
//!
//! A service file describes one reloadable service:
//!
//! ```toml
//! id = "attribute-resolver"
//! resources = ["conf/resolver.toml", "conf/overrides.toml"]
//! fail_fast = true
//! poll_interval_ms = 300000
//! profiles = ["prod"]
//! ```
//!
//! Relative resource paths are resolved against the directory holding the
//! service file.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Non-fatal warnings that should be logged but don't prevent operation.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Returns true if there are any warnings.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Settings for one reloadable service.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    pub id: String,
    #[serde(default)]
    pub resources: Vec<PathBuf>,
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
    /// Zero disables polling.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

fn default_fail_fast() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    constants::DEFAULT_POLL_INTERVAL_MS
}

impl ServiceConfig {
    /// Create a config with default settings and no resources.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resources: Vec::new(),
            fail_fast: default_fail_fast(),
            poll_interval_ms: default_poll_interval_ms(),
            profiles: Vec::new(),
            base_dir: None,
        }
    }

    /// Load `reloadable.toml` from the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(constants::DEFAULT_SERVICE_FILE)
    }

    /// Load a service file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read (IO error)
    /// - The file contains invalid TOML syntax
    /// - Required fields are missing, unknown, or have invalid types
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read service file: {}", path.display()))?;

        let mut config: ServiceConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse service file: {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);

        Ok(config)
    }

    /// Resource paths, with relative paths resolved against the service file.
    pub fn resource_paths(&self) -> Vec<PathBuf> {
        self.resources
            .iter()
            .map(|resource| match &self.base_dir {
                Some(base) if resource.is_relative() => base.join(resource),
                _ => resource.clone(),
            })
            .collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Validate the service settings.
    ///
    /// Returns a `ValidationResult` containing any non-fatal warnings.
    ///
    /// # Errors
    ///
    /// Returns an error listing every problem found:
    /// - Empty or malformed service id
    /// - Empty resource paths or profile names
    /// - Resource paths that exist but are not files
    pub fn validate(&self) -> Result<ValidationResult> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Service id
        if self.id.trim().is_empty() {
            errors.push("id cannot be empty".to_string());
        } else if self.id.chars().any(char::is_whitespace) {
            errors.push(format!("id cannot contain whitespace (got: '{}')", self.id));
        }

        // 2. Resources
        if self.resources.is_empty() {
            warnings.push(
                "No resources configured\n  \
                 The component will be built once and never reloaded"
                    .to_string(),
            );
        }

        let mut seen = BTreeSet::new();
        for (resource, path) in self.resources.iter().zip(self.resource_paths()) {
            if resource.as_os_str().is_empty() {
                errors.push("resource path cannot be empty".to_string());
                continue;
            }
            if !seen.insert(path.clone()) {
                warnings.push(format!("Resource listed more than once: {}", path.display()));
            }
            if !path.exists() {
                let consequence = if self.fail_fast {
                    "start will fail until it is created"
                } else {
                    "the service will run without a component until it is created"
                };
                warnings.push(format!("Resource does not exist: {}\n  {consequence}", path.display()));
            } else if !path.is_file() {
                errors.push(format!("Resource is not a file: {}", path.display()));
            }
        }

        // 3. Polling
        if self.poll_interval_ms > 0 && self.poll_interval_ms < constants::MIN_RECOMMENDED_POLL_INTERVAL_MS {
            warnings.push(format!(
                "poll_interval_ms {} is very low (< {})\n  \
                 Every poll fingerprints all resources; consider a longer interval",
                self.poll_interval_ms,
                constants::MIN_RECOMMENDED_POLL_INTERVAL_MS
            ));
        }

        // 4. Profiles
        if self.profiles.iter().any(|p| p.trim().is_empty()) {
            errors.push("profile names cannot be empty".to_string());
        }

        if !errors.is_empty() {
            anyhow::bail!(
                "Service validation failed:\n  - {}",
                errors.join("\n  - ")
            );
        }

        Ok(ValidationResult { warnings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_config() {
        let config: ServiceConfig = toml::from_str(r#"id = "resolver""#).unwrap();
        assert_eq!(config.id, "resolver");
        assert!(config.resources.is_empty());
        assert!(config.fail_fast);
        assert_eq!(config.poll_interval_ms, constants::DEFAULT_POLL_INTERVAL_MS);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
id = "resolver"
resources = ["a.toml", "/etc/b.toml"]
fail_fast = false
poll_interval_ms = 1000
profiles = ["prod", "eu"]
"#;
        let config: ServiceConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.resources.len(), 2);
        assert!(!config.fail_fast);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.profiles, vec!["prod", "eu"]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<ServiceConfig, _> = toml::from_str("id = \"x\"\npoll = 5");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_resolves_relative_resources() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("service.toml");
        fs::write(&path, "id = \"resolver\"\nresources = [\"a.toml\", \"/abs/b.toml\"]\n").unwrap();

        let config = ServiceConfig::load_from(&path).unwrap();
        assert_eq!(
            config.resource_paths(),
            vec![dir.path().join("a.toml"), PathBuf::from("/abs/b.toml")]
        );
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = ServiceConfig::load_from("/nonexistent/service.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read service file"));
    }

    #[test]
    fn test_load_from_invalid_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("service.toml");
        fs::write(&path, "id = ").unwrap();

        let err = ServiceConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse service file"));
    }

    #[test]
    fn test_validate_valid_config() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.toml"), "x = 1").unwrap();
        let path = dir.path().join("service.toml");
        fs::write(&path, "id = \"resolver\"\nresources = [\"a.toml\"]\n").unwrap();

        let result = ServiceConfig::load_from(&path).unwrap().validate().unwrap();
        assert!(!result.has_warnings(), "{:?}", result.warnings);
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = ServiceConfig::new("bad id");
        config.resources = vec![PathBuf::new()];
        config.profiles = vec![" ".to_string()];

        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("whitespace"));
        assert!(msg.contains("resource path cannot be empty"));
        assert!(msg.contains("profile names"));
    }

    #[test]
    fn test_validate_empty_id() {
        assert!(ServiceConfig::new("").validate().is_err());
    }

    #[test]
    fn test_validate_directory_resource_is_error() {
        let dir = TempDir::new().unwrap();
        let mut config = ServiceConfig::new("resolver");
        config.resources = vec![dir.path().to_path_buf()];

        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("not a file"));
    }

    #[test]
    fn test_validate_warnings() {
        let mut config = ServiceConfig::new("resolver");
        assert!(config.validate().unwrap().has_warnings());

        config.resources = vec![PathBuf::from("/nonexistent/a.toml"), PathBuf::from("/nonexistent/a.toml")];
        config.poll_interval_ms = 10;
        let warnings = config.validate().unwrap().warnings;
        assert!(warnings.iter().any(|w| w.contains("does not exist")));
        assert!(warnings.iter().any(|w| w.contains("more than once")));
        assert!(warnings.iter().any(|w| w.contains("very low")));
    }

    #[test]
    fn test_zero_poll_interval_is_not_a_warning() {
        let dir = TempDir::new().unwrap();
        let resource = dir.path().join("a.toml");
        fs::write(&resource, "").unwrap();

        let mut config = ServiceConfig::new("resolver");
        config.resources = vec![resource];
        config.poll_interval_ms = 0;
        assert!(!config.validate().unwrap().has_warnings());
    }
}
