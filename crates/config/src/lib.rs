//! Configuration loading, validation, and management for patchloop.
//!
//! Loads configuration from `~/.patchloop/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.patchloop/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per backend response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub checkpoints: CheckpointConfig,
}

fn default_api_url() -> String {
    "http://127.0.0.1:8080/v1".into()
}
fn default_model() -> String {
    "local".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_true() -> bool {
    true
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "api_key",
                &match self.api_key {
                    Some(_) => "[REDACTED]",
                    None => "None",
                },
            )
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("agent", &self.agent)
            .field("tools", &self.tools)
            .field("checkpoints", &self.checkpoints)
            .finish()
    }
}

/// `[agent]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Upper bound on backend calls per run
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Markdown file (relative to the workspace root) whose contents are
    /// appended to the system prompt when it exists
    #[serde(default = "default_rules_file")]
    pub rules_file: String,

    /// Include tool arguments and results in the session log
    #[serde(default)]
    pub log_tool_calls: bool,

    /// Replaces the built-in system prompt entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt_override: Option<String>,

    /// Replace old messages with a backend-written summary once the
    /// transcript outgrows `max_context_tokens`
    #[serde(default)]
    pub summarize_old_messages: bool,

    /// Estimated transcript size (4 characters per token) that triggers
    /// summarization
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Messages kept verbatim at the end of the transcript when summarizing
    #[serde(default = "default_keep_recent_messages")]
    pub keep_recent_messages: usize,

    /// Named prompts a run can append to its query
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<AgentCommand>,
}

/// A named prompt appended to a query, as `[[agent.commands]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCommand {
    pub name: String,
    pub prompt: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl AgentConfig {
    /// The prompt of the command called `name`.
    pub fn command_prompt(&self, name: &str) -> Option<&str> {
        self.commands
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.prompt.as_str())
    }
}

fn default_max_iterations() -> u32 {
    50
}
fn default_rules_file() -> String {
    "patchloop-rules.md".into()
}
fn default_max_context_tokens() -> usize {
    32_000
}
fn default_keep_recent_messages() -> usize {
    10
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            rules_file: default_rules_file(),
            log_tool_calls: false,
            system_prompt_override: None,
            summarize_old_messages: false,
            max_context_tokens: default_max_context_tokens(),
            keep_recent_messages: default_keep_recent_messages(),
            commands: Vec::new(),
        }
    }
}

/// `[tools]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Built-in tools to register. Empty means all of them.
    #[serde(default)]
    pub enabled: Vec<String>,

    /// Tool output longer than this is truncated
    #[serde(default = "default_max_chars_tool_return")]
    pub max_chars_tool_return: usize,

    /// First words allowed for `run_terminal_command`. Empty means any.
    #[serde(default)]
    pub allowed_commands: Vec<String>,
}

fn default_max_chars_tool_return() -> usize {
    10_000
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            enabled: Vec::new(),
            max_chars_tool_return: default_max_chars_tool_return(),
            allowed_commands: Vec::new(),
        }
    }
}

impl ToolsConfig {
    /// Whether the built-in tool `name` should be registered.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.is_empty() || self.enabled.iter().any(|n| n == name)
    }
}

/// `[checkpoints]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Where shadow repositories live. Defaults to `~/.patchloop/checkpoints`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_dir: Option<PathBuf>,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            storage_dir: None,
        }
    }
}

impl CheckpointConfig {
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("checkpoints"))
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.patchloop/config.toml).
    ///
    /// Environment overrides:
    /// - `PATCHLOOP_API_KEY`, then `OPENAI_API_KEY` (only when the file has no key)
    /// - `PATCHLOOP_API_URL`
    /// - `PATCHLOOP_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup` (injectable for tests).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("PATCHLOOP_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(url) = lookup("PATCHLOOP_API_URL") {
            self.api_url = url;
        }
        if let Some(model) = lookup("PATCHLOOP_MODEL") {
            self.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".patchloop")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.agent.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "agent.max_iterations must be at least 1".into(),
            ));
        }

        if self.agent.keep_recent_messages == 0 {
            return Err(ConfigError::ValidationError(
                "agent.keep_recent_messages must be at least 1".into(),
            ));
        }

        if self.tools.max_chars_tool_return == 0 {
            return Err(ConfigError::ValidationError(
                "tools.max_chars_tool_return must be > 0".into(),
            ));
        }

        if self.api_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("api_url must not be empty".into()));
        }

        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Render the defaults as TOML (for the `config` command).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: default_api_url(),
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: None,
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
            checkpoints: CheckpointConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
