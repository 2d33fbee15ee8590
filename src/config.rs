//! Configuration for the session orchestration core
//!
//! Holds the identifiers every session is built from (default voice, default
//! scenario, the navigation tool) together with the behavioral flags sent to
//! the engine. The configuration is immutable once handed to the orchestrator.

use crate::error::{Result, RouletteError};
use crate::session::SessionFlags;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Language model every session runs on
pub const DEFAULT_LLM_ID: &str = "21892bb9-9809-4b6f-8c3e-e40093069f04";

/// Voice used when a persona carries none
pub const DEFAULT_VOICE_ID: &str = "21892bb9-9809-4b6f-8c3e-e40093069f04";

/// Scenario/tool definition used when a persona carries none
pub const DEFAULT_SCENARIO_ID: &str = "43a9d484-dd12-4aad-9bbd-a8ad54a73fbb";

/// Tool definition that lets the remote persona request a persona switch
pub const NAVIGATION_TOOL_ID: &str = "27cd9fa6-4eec-404a-8c4d-0d98276f65d4";

/// Top-level configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouletteConfig {
    /// Language model identifier
    pub llm_id: String,

    /// Voice override applied when a persona has no voice of its own
    pub default_voice_id: String,

    /// Scenario applied when a persona has no scenario of its own
    pub default_scenario_id: String,

    /// Persona-switching tool, always included in the tool definitions
    pub navigation_tool_id: String,

    /// Behavioral flags sent with every session
    pub flags: SessionFlags,

    /// Capacity of the orchestrator event channel
    pub event_buffer_size: usize,
}

impl Default for RouletteConfig {
    fn default() -> Self {
        Self {
            llm_id: DEFAULT_LLM_ID.to_string(),
            default_voice_id: DEFAULT_VOICE_ID.to_string(),
            default_scenario_id: DEFAULT_SCENARIO_ID.to_string(),
            navigation_tool_id: NAVIGATION_TOOL_ID.to_string(),
            flags: SessionFlags::default(),
            event_buffer_size: 100,
        }
    }
}

impl RouletteConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    ///
    /// Missing fields fall back to their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RouletteError::ConfigError(format!("{}: {}", path.display(), e))
        })?;

        let config: RouletteConfig = toml::from_str(&content).map_err(|e| {
            RouletteError::ConfigError(format!("{}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise use the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Per-user configuration file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("persona-roulette").join("config.toml"))
    }

    /// Set the default voice id
    pub fn with_default_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.default_voice_id = voice_id.into();
        self
    }

    /// Set the default scenario id
    pub fn with_default_scenario(mut self, scenario_id: impl Into<String>) -> Self {
        self.default_scenario_id = scenario_id.into();
        self
    }

    /// Set the navigation tool id
    pub fn with_navigation_tool(mut self, tool_id: impl Into<String>) -> Self {
        self.navigation_tool_id = tool_id.into();
        self
    }

    /// Set the behavioral flags
    pub fn with_flags(mut self, flags: SessionFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the event channel capacity
    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("llm_id", &self.llm_id),
            ("default_voice_id", &self.default_voice_id),
            ("default_scenario_id", &self.default_scenario_id),
            ("navigation_tool_id", &self.navigation_tool_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(RouletteError::ConfigError(format!("{} must not be blank", name)));
            }
        }

        if self.event_buffer_size == 0 {
            return Err(RouletteError::ConfigError(
                "event_buffer_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RouletteConfig::default();
        assert_eq!(config.default_voice_id, DEFAULT_VOICE_ID);
        assert_eq!(config.navigation_tool_id, NAVIGATION_TOOL_ID);
        assert_eq!(config.event_buffer_size, 100);
        assert!(config.flags.parallel_listening);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = RouletteConfig::new()
            .with_default_voice("voice-x")
            .with_default_scenario("scenario-y")
            .with_event_buffer_size(8);

        assert_eq!(config.default_voice_id, "voice-x");
        assert_eq!(config.default_scenario_id, "scenario-y");
        assert_eq!(config.event_buffer_size, 8);
    }

    #[test]
    fn test_validate_rejects_blank_ids() {
        let config = RouletteConfig::new().with_navigation_tool("  ");
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RouletteError::ConfigError(msg) if msg.contains("navigation_tool_id")));
    }

    #[test]
    fn test_validate_rejects_zero_buffer() {
        let config = RouletteConfig::new().with_event_buffer_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_partial_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
default_voice_id = "voice-from-file"

[flags]
parallel_listening = false
"#
        )
        .unwrap();

        let config = RouletteConfig::load(file.path()).unwrap();
        assert_eq!(config.default_voice_id, "voice-from-file");
        assert_eq!(config.default_scenario_id, DEFAULT_SCENARIO_ID);
        assert!(!config.flags.parallel_listening);
        assert!(config.flags.save_messages, "unset flags keep their defaults");
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = RouletteConfig::load("/nonexistent/persona-roulette.toml").unwrap_err();
        assert!(matches!(err, RouletteError::ConfigError(_)));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let config = RouletteConfig::load_or_default("/nonexistent/persona-roulette.toml").unwrap();
        assert_eq!(config, RouletteConfig::default());
    }
}
