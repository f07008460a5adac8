use serde::{Deserialize, Serialize};
use serene_core::{Result, SereneError};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub mod env_substitution;

pub use env_substitution::substitute_env_vars;

pub const DEFAULT_GREETING: &str = "Hello, I'm your guide. I'm here to help you work through challenges using proven CBT techniques. When you're ready, let's begin.";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub portal: PortalSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub paths: PathSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSettings {
    #[serde(default = "default_portal_name")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_greeting")]
    pub greeting: String,
    #[serde(default = "default_reply_delay_min_ms")]
    pub reply_delay_min_ms: u64,
    #[serde(default = "default_reply_delay_max_ms")]
    pub reply_delay_max_ms: u64,
    #[serde(default = "default_exercise_delay_ms")]
    pub exercise_delay_ms: u64,
    /// Conversations longer than this escalate to a structured exercise.
    #[serde(default = "default_exercise_after_messages")]
    pub exercise_after_messages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_file: Option<PathBuf>,
}

impl PortalConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SereneError::ConfigError(format!("Failed to read config file: {}", e)))?;

        debug!("Loaded config file {:?}", path.as_ref());
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let mut raw: serde_json::Value = if yaml.trim().is_empty() {
            serde_json::Value::Object(Default::default())
        } else {
            serde_yaml::from_str(yaml)
                .map_err(|e| SereneError::ConfigError(format!("Failed to parse YAML: {}", e)))?
        };

        substitute_env_vars(&mut raw)?;

        let mut config: PortalConfig = serde_json::from_value(raw)
            .map_err(|e| SereneError::ConfigError(format!("Invalid configuration: {}", e)))?;

        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    fn expand_env_vars(&mut self) {
        if let Ok(data_dir) = env::var("SERENE_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(data_dir);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.portal.name.trim().is_empty() {
            return Err(SereneError::ConfigError("Portal name cannot be empty".into()));
        }
        if self.session.greeting.trim().is_empty() {
            return Err(SereneError::ConfigError("Session greeting cannot be empty".into()));
        }
        if self.session.reply_delay_min_ms > self.session.reply_delay_max_ms {
            return Err(SereneError::ConfigError(format!(
                "reply_delay_min_ms ({}) must not exceed reply_delay_max_ms ({})",
                self.session.reply_delay_min_ms, self.session.reply_delay_max_ms
            )));
        }
        Ok(())
    }

    pub fn journal_path(&self) -> PathBuf {
        self.paths
            .journal_file
            .clone()
            .unwrap_or_else(|| self.paths.data_dir.join("journal.json"))
    }

    pub fn default_config_path() -> PathBuf {
        serene_home().join("serene.yaml")
    }
}

impl SessionSettings {
    /// Settings with every pacing delay set to zero.
    pub fn immediate() -> Self {
        Self {
            reply_delay_min_ms: 0,
            reply_delay_max_ms: 0,
            exercise_delay_ms: 0,
            ..Self::default()
        }
    }

    pub fn exercise_delay(&self) -> Duration {
        Duration::from_millis(self.exercise_delay_ms)
    }
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            name: default_portal_name(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            reply_delay_min_ms: default_reply_delay_min_ms(),
            reply_delay_max_ms: default_reply_delay_max_ms(),
            exercise_delay_ms: default_exercise_delay_ms(),
            exercise_after_messages: default_exercise_after_messages(),
        }
    }
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            journal_file: None,
        }
    }
}

fn default_portal_name() -> String { "SereneMind".to_string() }
fn default_greeting() -> String { DEFAULT_GREETING.to_string() }
fn default_reply_delay_min_ms() -> u64 { 1000 }
fn default_reply_delay_max_ms() -> u64 { 3000 }
fn default_exercise_delay_ms() -> u64 { 1500 }
fn default_exercise_after_messages() -> usize { 4 }

fn serene_home() -> PathBuf {
    env::var("SERENE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(env::var("HOME").unwrap_or_else(|_| ".".to_string())).join(".serene")
        })
}

fn default_data_dir() -> PathBuf {
    env::var("SERENE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| serene_home())
}
