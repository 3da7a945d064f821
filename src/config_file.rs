//! Runtime configuration for a build pass.
//!
//! Saved and loaded as JSON. Every field has a default, so a config file only
//! needs the values it changes; command line flags override the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::engine::DEFAULT_BUILD_FILE;
use crate::facts::FactTable;
use crate::transport::join_root;

/// Where configs come from, where the task list goes, and which facts apply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Base location of configuration documents (empty = working directory)
    pub config_server: String,
    /// Path of the first document's directory under the server
    pub config_root_path: String,
    /// Document name every root provides
    pub build_file: String,
    /// Output task list
    pub task_list: PathBuf,
    /// Keep an existing task list instead of purging it
    pub preserve_tasks: bool,
    /// Default registry view for registry actions
    pub use_reg_64: bool,
    /// JSON fact table layered over detected facts
    pub facts_file: Option<PathBuf>,
    /// Inline fact overrides, applied last
    pub facts: BTreeMap<String, String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            config_server: String::new(),
            config_root_path: "/".to_string(),
            build_file: DEFAULT_BUILD_FILE.to_string(),
            task_list: PathBuf::from("task_list.yaml"),
            preserve_tasks: false,
            use_reg_64: true,
            facts_file: None,
            facts: BTreeMap::new(),
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        debug!("Loaded build configuration from {:?}", path.as_ref());
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let build_file = self.build_file.trim();
        if build_file.is_empty() {
            anyhow::bail!("Build file name must be specified");
        }
        if build_file.contains('/') || build_file.contains('\\') {
            anyhow::bail!("Build file must be a file name, not a path: {}", build_file);
        }

        if self.task_list.as_os_str().is_empty() {
            anyhow::bail!("Task list path must be specified");
        }

        if let Some(name) = self.facts.keys().find(|k| k.trim().is_empty()) {
            anyhow::bail!("Fact names cannot be empty (got {:?})", name);
        }

        Ok(())
    }

    /// Root the first document is read from
    pub fn initial_root(&self) -> String {
        join_root(&self.config_server, &self.config_root_path)
    }

    /// Purge the old task list unless it is preserved.
    ///
    /// Returns true when a build is needed, i.e. no task list remains.
    pub fn prepare_task_list(&self) -> Result<bool> {
        debug!("Using task list at {:?}", self.task_list);
        if self.task_list.exists() {
            if self.preserve_tasks {
                info!("Preserving existing task list {:?}", self.task_list);
                return Ok(false);
            }
            debug!("Purging old task list");
            fs::remove_file(&self.task_list).with_context(|| {
                format!("Failed to remove old task list {:?}", self.task_list)
            })?;
        }
        Ok(true)
    }

    /// Detected facts, overlaid with the fact file and then inline overrides
    pub fn fact_table(&self) -> Result<FactTable> {
        let mut table = FactTable::detect();
        if let Some(path) = &self.facts_file {
            table.merge(FactTable::load_from_file(path)?);
        }
        for (name, value) in &self.facts {
            table.set(name.as_str(), value.as_str());
        }
        Ok(table)
    }
}

/// Parse a `KEY=VALUE` fact override
pub fn parse_fact(raw: &str) -> Result<(String, String)> {
    let (key, value) = raw
        .split_once('=')
        .with_context(|| format!("Fact override must be KEY=VALUE, got {:?}", raw))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Fact override has an empty name: {:?}", raw);
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::FactSource;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_build_config_default() {
        let config = BuildConfig::default();
        assert_eq!(config.build_file, "build.yaml");
        assert!(config.use_reg_64);
        assert!(!config.preserve_tasks);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_initial_root() {
        let mut config = BuildConfig::default();
        assert_eq!(config.initial_root(), "");

        config.config_server = "https://glazier.example.com".to_string();
        config.config_root_path = "/win10".to_string();
        assert_eq!(config.initial_root(), "https://glazier.example.com/win10");

        config.config_server = "/srv/configs/".to_string();
        config.config_root_path = "/".to_string();
        assert_eq!(config.initial_root(), "/srv/configs/");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let mut config = BuildConfig::default();
        config.config_server = "/srv/configs".to_string();
        config.preserve_tasks = true;
        config.facts.insert("os_code".to_string(), "win10".to_string());

        let file = NamedTempFile::new().unwrap();
        config.save_to_file(file.path()).unwrap();
        let loaded = BuildConfig::load_from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"config_root_path": "win11"}}"#).unwrap();

        let config = BuildConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.config_root_path, "win11");
        assert_eq!(config.build_file, "build.yaml");
        assert!(config.use_reg_64);
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(BuildConfig::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = BuildConfig::load_from_file("/nonexistent/autobuild.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read configuration"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = BuildConfig::default();
        config.build_file = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = BuildConfig::default();
        config.build_file = "sub/build.yaml".to_string();
        assert!(config.validate().is_err());

        let mut config = BuildConfig::default();
        config.task_list = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fact_table_layers() {
        let mut facts_file = NamedTempFile::new().unwrap();
        write!(facts_file, r#"{{"os_code": "win7", "device_id": ["A", "B"]}}"#).unwrap();

        let mut config = BuildConfig::default();
        config.facts_file = Some(facts_file.path().to_path_buf());
        config.facts.insert("os_code".to_string(), "win10".to_string());

        let table = config.fact_table().unwrap();
        assert!(table.lookup("os_code", "win10").unwrap());
        assert!(!table.lookup("os_code", "win7").unwrap());
        assert!(table.lookup("device_id", "b").unwrap());
        // Detected facts are always present
        assert!(table.get("firmware").is_some());
    }

    #[test]
    fn test_prepare_task_list_purges_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BuildConfig::default();
        config.task_list = dir.path().join("task_list.yaml");

        // Nothing there yet
        assert!(config.prepare_task_list().unwrap());

        fs::write(&config.task_list, "- data: {Old: []}\n").unwrap();
        assert!(config.prepare_task_list().unwrap());
        assert!(!config.task_list.exists());
    }

    #[test]
    fn test_prepare_task_list_preserves_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BuildConfig::default();
        config.task_list = dir.path().join("task_list.yaml");
        config.preserve_tasks = true;

        assert!(config.prepare_task_list().unwrap());

        fs::write(&config.task_list, "- data: {Old: []}\n").unwrap();
        assert!(!config.prepare_task_list().unwrap());
        assert!(config.task_list.exists());
    }

    #[test]
    fn test_parse_fact() {
        assert_eq!(
            parse_fact("os_code=win10").unwrap(),
            ("os_code".to_string(), "win10".to_string())
        );
        assert_eq!(
            parse_fact("model = HP Z640 = rev2").unwrap(),
            ("model".to_string(), "HP Z640 = rev2".to_string())
        );
        assert!(parse_fact("os_code").is_err());
        assert!(parse_fact("=win10").is_err());
    }
}
