//! Client configuration
//!
//! Loaded from `config.toml` in the platform config directory
//! (`ProjectDirs::from("dev", "vmeet", "vmeet")`) or an explicit path.
//! Every field has a default, so a missing file is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::follow_me::PinRetryPolicy;
use crate::models::Role;

/// Default relay port
pub const DEFAULT_PORT: u16 = 7341;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub participant: ParticipantConfig,
    pub follow_me: FollowMeConfig,
    pub relay: RelayConfig,
    /// Fallback log filter when `RUST_LOG` is unset
    pub log_level: LogLevel,
}

/// Identity of the local participant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticipantConfig {
    pub display_name: String,
    pub email: Option<String>,
    /// Stable statistics id; generated per run when unset
    pub stats_id: Option<String>,
    pub role: Role,
    /// This client is a recorder and keeps its own participant order
    pub recorder: bool,
}

impl Default for ParticipantConfig {
    fn default() -> Self {
        Self {
            display_name: "Vmeeter".to_string(),
            email: None,
            stats_id: None,
            role: Role::Participant,
            recorder: false,
        }
    }
}

impl ParticipantConfig {
    pub fn stats_id_or_generate(&self) -> String {
        self.stats_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowMeConfig {
    pub enabled: bool,
    pub chat_only_guest_enabled: bool,
    pub debounce_ms: u64,
    pub late_joiner_resend_ms: u64,
    pub pin_retry_interval_ms: u64,
    pub pin_retry_attempts: u32,
}

impl Default for FollowMeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chat_only_guest_enabled: false,
            debounce_ms: 100,
            late_joiner_resend_ms: 3000,
            pin_retry_interval_ms: 1000,
            pin_retry_attempts: 30,
        }
    }
}

impl FollowMeConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn late_joiner_resend(&self) -> Duration {
        Duration::from_millis(self.late_joiner_resend_ms)
    }

    pub fn pin_retry_policy(&self) -> PinRetryPolicy {
        PinRetryPolicy {
            interval: Duration::from_millis(self.pin_retry_interval_ms),
            max_attempts: self.pin_retry_attempts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub address: String,
    pub port: u16,
    pub token: String,
    pub max_participants: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            token: String::new(),
            max_participants: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "vmeet", "vmeet")
            .ok_or_else(|| Error::Config("Could not determine config directory".into()))?;
        Ok(dirs.config_dir().join(CONFIG_FILE))
    }

    /// Load from `path`, or the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config = Self::parse(&content)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.follow_me.pin_retry_interval_ms == 0 {
            return Err(Error::Config("pin_retry_interval_ms must be positive".into()));
        }
        if self.relay.max_participants == 0 {
            return Err(Error::Config("max_participants must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.follow_me.debounce(), Duration::from_millis(100));
        assert_eq!(config.follow_me.pin_retry_policy(), PinRetryPolicy::default());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::parse(
            r#"
            log_level = "debug"

            [participant]
            display_name = "alice"
            role = "moderator"

            [follow_me]
            enabled = true
            debounce_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.participant.display_name, "alice");
        assert_eq!(config.participant.role, Role::Moderator);
        assert!(config.follow_me.enabled);
        assert_eq!(config.follow_me.debounce_ms, 250);
        assert_eq!(config.follow_me.pin_retry_attempts, 30);
        assert_eq!(config.relay.port, DEFAULT_PORT);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Config::parse("[follow_me]\npin_retry_interval_ms = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::parse("[participant]\nrole = \"owner\""),
            Err(Error::TomlParse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[relay]\nport = 9000\ntoken = \"secret\"").unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.relay.port, 9000);
        assert_eq!(config.relay.token, "secret");
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(&dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_generated_stats_id_is_stable_when_configured() {
        let mut participant = ParticipantConfig::default();
        assert_ne!(participant.stats_id_or_generate(), participant.stats_id_or_generate());
        participant.stats_id = Some("fixed".into());
        assert_eq!(participant.stats_id_or_generate(), "fixed");
    }
}
