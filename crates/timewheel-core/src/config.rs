//! Configuration loaded from `~/.timewheel/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TimeWheelError};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeWheelConfig {
    #[serde(default)]
    pub wheel: WheelConfig,
    /// Timers scheduled by the `run` command.
    #[serde(default)]
    pub timers: Vec<TimerSpec>,
}

/// Wheel geometry and command channel sizing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelConfig {
    /// Tick granularity in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Number of slots in one rotation.
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,
    /// Capacity of the bounded command channel.
    #[serde(default = "default_command_buffer")]
    pub command_buffer: usize,
}

fn default_interval_ms() -> u64 { 10 }
fn default_slot_count() -> usize { 3600 }
fn default_command_buffer() -> usize { 1024 }

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            slot_count: default_slot_count(),
            command_buffer: default_command_buffer(),
        }
    }
}

impl WheelConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Time for the cursor to make one full pass over all slots.
    pub fn rotation(&self) -> Duration {
        self.interval().saturating_mul(u32::try_from(self.slot_count).unwrap_or(u32::MAX))
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(TimeWheelError::invalid_argument("wheel.interval_ms must be > 0"));
        }
        if self.slot_count == 0 {
            return Err(TimeWheelError::invalid_argument("wheel.slot_count must be > 0"));
        }
        if self.command_buffer == 0 {
            return Err(TimeWheelError::invalid_argument("wheel.command_buffer must be > 0"));
        }
        Ok(())
    }
}

/// A timer declared in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSpec {
    pub name: String,
    pub delay_ms: u64,
    #[serde(default)]
    pub repeat: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl TimerSpec {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl TimeWheelConfig {
    /// Default config location: `~/.timewheel/config.toml`.
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".timewheel").join("config.toml")
    }

    /// Load from the default path, falling back to defaults when the file is absent.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TimeWheelError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.wheel.validate()?;
        let mut names = std::collections::HashSet::new();
        for timer in &self.timers {
            if timer.name.trim().is_empty() {
                return Err(TimeWheelError::config("timer with an empty name"));
            }
            if !names.insert(timer.name.as_str()) {
                return Err(TimeWheelError::config(format!(
                    "duplicate timer name '{}'",
                    timer.name
                )));
            }
            // The wheel ignores zero delays without reporting them.
            if timer.delay_ms == 0 {
                return Err(TimeWheelError::config(format!(
                    "timer '{}' has delay_ms = 0",
                    timer.name
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TimeWheelConfig::default();
        assert_eq!(config.wheel.interval_ms, 10);
        assert_eq!(config.wheel.slot_count, 3600);
        assert_eq!(config.wheel.command_buffer, 1024);
        assert!(config.timers.is_empty());
        assert_eq!(config.wheel.rotation(), Duration::from_secs(36));
    }

    #[test]
    fn test_parse_partial_config() {
        let config = TimeWheelConfig::from_toml_str(
            r#"
            [wheel]
            interval_ms = 50

            [[timers]]
            name = "heartbeat"
            delay_ms = 1000
            repeat = true
            message = "still alive"

            [[timers]]
            name = "once"
            delay_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.wheel.interval(), Duration::from_millis(50));
        assert_eq!(config.wheel.slot_count, 3600);
        assert_eq!(config.timers.len(), 2);
        assert!(config.timers[0].repeat);
        assert_eq!(config.timers[0].message.as_deref(), Some("still alive"));
        assert!(!config.timers[1].repeat);
        assert_eq!(config.timers[1].delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_geometry_rejected() {
        let err = TimeWheelConfig::from_toml_str("[wheel]\ninterval_ms = 0").unwrap_err();
        assert!(matches!(err, TimeWheelError::InvalidArgument(_)));

        let err = TimeWheelConfig::from_toml_str("[wheel]\nslot_count = 0").unwrap_err();
        assert!(matches!(err, TimeWheelError::InvalidArgument(_)));

        let err = TimeWheelConfig::from_toml_str("[wheel]\ncommand_buffer = 0").unwrap_err();
        assert!(matches!(err, TimeWheelError::InvalidArgument(_)));
    }

    #[test]
    fn test_zero_delay_timer_rejected() {
        let err = TimeWheelConfig::from_toml_str(
            "[[timers]]\nname = \"bad\"\ndelay_ms = 0",
        )
        .unwrap_err();
        assert!(matches!(err, TimeWheelError::Config(_)));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn test_timer_names_checked() {
        let err = TimeWheelConfig::from_toml_str(
            "[[timers]]\nname = \"tick\"\ndelay_ms = 10\n\n[[timers]]\nname = \"tick\"\ndelay_ms = 20",
        )
        .unwrap_err();
        assert!(matches!(err, TimeWheelError::Config(_)));
        assert!(err.to_string().contains("duplicate timer name 'tick'"));

        let err = TimeWheelConfig::from_toml_str("[[timers]]\nname = \" \"\ndelay_ms = 10").unwrap_err();
        assert!(matches!(err, TimeWheelError::Config(_)));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = TimeWheelConfig::default();
        config.wheel.slot_count = 64;
        config.timers.push(TimerSpec {
            name: "tick".into(),
            delay_ms: 100,
            repeat: true,
            message: None,
        });
        config.save_to(&path).unwrap();

        let loaded = TimeWheelConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TimeWheelConfig::load_from(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, TimeWheelError::ConfigNotFound(_)));
    }
}
