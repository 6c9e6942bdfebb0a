//! Editor configuration
//!
//! Loaded from `trellis.config.json` in the working directory. Every field
//! has a default, so a missing file or a partial file is fine.

use crate::errors::EditorResult;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_NAME: &str = "trellis.config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Debounce before a deselect takes effect
    #[serde(default = "default_deselect_delay")]
    pub deselect_delay_ms: u64,

    /// Delay before a popover's click-outside listener is armed
    #[serde(default = "default_click_outside_delay")]
    pub click_outside_delay_ms: u64,

    /// Attribute carrying a block's identifier
    #[serde(default = "default_id_attribute")]
    pub id_attribute: String,

    /// Attribute carrying a block's markup version
    #[serde(default = "default_version_attribute")]
    pub version_attribute: String,

    /// Selectors for host-editor scaffolding nodes that are never blocks
    #[serde(default = "default_scaffolding")]
    pub scaffolding: Vec<String>,

    /// Answer given by the headless host to confirmation prompts
    #[serde(default)]
    pub confirm_deletes: ConfirmPolicy,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmPolicy {
    Accept,
    #[default]
    Decline,
}

fn default_deselect_delay() -> u64 {
    100
}

fn default_click_outside_delay() -> u64 {
    10
}

fn default_id_attribute() -> String {
    "data-block-id".to_string()
}

fn default_version_attribute() -> String {
    "data-block-version".to_string()
}

fn default_scaffolding() -> Vec<String> {
    vec!["[data-mce-bogus]".to_string(), ".mce-offscreen-selection".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults
    pub fn load(cwd: impl AsRef<Path>) -> EditorResult<Self> {
        let config_path = cwd.as_ref().join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn deselect_delay(&self) -> Duration {
        Duration::from_millis(self.deselect_delay_ms)
    }

    pub fn click_outside_delay(&self) -> Duration {
        Duration::from_millis(self.click_outside_delay_ms)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            deselect_delay_ms: default_deselect_delay(),
            click_outside_delay_ms: default_click_outside_delay(),
            id_attribute: default_id_attribute(),
            version_attribute: default_version_attribute(),
            scaffolding: default_scaffolding(),
            confirm_deletes: ConfirmPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "deselectDelayMs": 250,
            "idAttribute": "data-id",
            "confirmDeletes": "accept"
        }"#;

        let config: EditorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.deselect_delay(), Duration::from_millis(250));
        assert_eq!(config.id_attribute, "data-id");
        assert_eq!(config.confirm_deletes, ConfirmPolicy::Accept);
        assert_eq!(config.click_outside_delay_ms, 10);
        assert_eq!(config.scaffolding, default_scaffolding());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn test_load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{ "logLevel": "debug" }"#).unwrap();

        let config = EditorConfig::load(dir.path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.version_attribute, "data-block-version");
    }
}
