//! Configuration for mailwright.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> environment. Files live at
//! `~/.config/mailwright/config.toml` and `<workspace>/.mailwright/config.toml`.
//! Provider link flags are not part of this file; they are `LINKED_*`
//! entries in the `.env` file, loaded into the process environment.

use crate::error::ConfigError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub llm: LlmConfig,
    pub agent: AgentLimits,
    pub defaults: CommandDefaults,
}

/// File locations, relative to the workspace unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathsConfig {
    pub env_file: PathBuf,
    pub contacts_file: PathBuf,
    pub prompts_dir: PathBuf,
    pub commands_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            env_file: PathBuf::from(".env"),
            contacts_file: PathBuf::from("data/contacts.csv"),
            prompts_dir: PathBuf::from("prompts"),
            commands_dir: PathBuf::from("commands"),
        }
    }
}

impl PathsConfig {
    /// Resolve every path against `workspace`.
    pub fn resolve(&self, workspace: &Path) -> PathsConfig {
        let join = |p: &PathBuf| {
            if p.is_absolute() {
                p.clone()
            } else {
                workspace.join(p)
            }
        };
        PathsConfig {
            env_file: join(&self.env_file),
            contacts_file: join(&self.contacts_file),
            prompts_dir: join(&self.prompts_dir),
            commands_dir: join(&self.commands_dir),
        }
    }
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
    /// Retries after a transport failure.
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_secs: 120,
            max_retries: 2,
        }
    }
}

/// Iteration caps for the main agent and the CRM init sub-agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentLimits {
    pub max_iterations: usize,
    pub init_max_iterations: usize,
}

impl Default for AgentLimits {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            init_max_iterations: 30,
        }
    }
}

/// Defaults shared by the programmatic and slash forms of each command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandDefaults {
    /// Comma-separated domains skipped by contact sync and CRM init.
    pub exclude_domains: String,
}

impl Default for CommandDefaults {
    fn default() -> Self {
        Self {
            exclude_domains: "openonion.ai,connectonion.com".to_string(),
        }
    }
}

fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "mailwright", "mailwright")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

fn workspace_config_path(workspace: &Path) -> PathBuf {
    workspace.join(".mailwright").join("config.toml")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `MAILWRIGHT_`, `__` for nesting)
/// 2. Workspace-local config (`.mailwright/config.toml`)
/// 3. User config (`~/.config/mailwright/config.toml`)
/// 4. Built-in defaults
pub fn load_config(workspace: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(ws) = workspace {
        let ws_config = workspace_config_path(ws);
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // MAILWRIGHT_LLM__MODEL, MAILWRIGHT_PATHS__CONTACTS_FILE, etc.
    figment = figment.merge(Env::prefixed("MAILWRIGHT_").split("__"));

    figment.extract().map_err(|e| ConfigError::Invalid {
        message: e.to_string(),
    })
}

/// Load `KEY=VALUE` pairs from `path` into the process environment.
///
/// A missing file is fine; anything else that prevents reading it is a
/// startup failure.
pub fn load_env_file(path: &Path) -> Result<bool, ConfigError> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(e) => Err(ConfigError::EnvFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}
