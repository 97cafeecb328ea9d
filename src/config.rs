//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.repolens.toml` files, and reading API credentials from the
//! environment.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".repolens.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub models: ModelsConfig,

    /// GitHub API settings.
    #[serde(default)]
    pub github: GithubConfig,

    /// Conversation storage settings.
    #[serde(default)]
    pub session: SessionConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log every model exchange at debug level.
    #[serde(default)]
    pub debug_mode: bool,

    /// Prior conversation messages handed to an agent on each run.
    #[serde(default = "default_history_messages")]
    pub history_messages: usize,

    /// Upper bound on model round-trips within a single agent run.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            debug_mode: false,
            history_messages: default_history_messages(),
            max_tool_iterations: default_max_tool_iterations(),
        }
    }
}

fn default_history_messages() -> usize {
    10
}

fn default_max_tool_iterations() -> usize {
    20
}

/// The two model configurations in use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model for the router and the data agent.
    #[serde(default = "default_primary_model")]
    pub primary: ModelConfig,

    /// Model for the reasoning agent.
    #[serde(default = "default_reasoning_model")]
    pub reasoning: ModelConfig,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_model(),
            reasoning: default_reasoning_model(),
        }
    }
}

fn default_primary_model() -> ModelConfig {
    ModelConfig {
        name: "meta-llama/llama-4-maverick-17b-128e-instruct".to_string(),
        temperature: 0.5,
        ..ModelConfig::default()
    }
}

fn default_reasoning_model() -> ModelConfig {
    ModelConfig {
        name: "qwen-qwq-32b".to_string(),
        temperature: 0.3,
        ..ModelConfig::default()
    }
}

/// LLM endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier sent to the API.
    #[serde(default = "default_model")]
    pub name: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in response.
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds.
    #[serde(default = "default_model_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            max_tokens: None,
            timeout_seconds: default_model_timeout(),
        }
    }
}

fn default_model() -> String {
    "meta-llama/llama-4-maverick-17b-128e-instruct".to_string()
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_model_timeout() -> u64 {
    120
}

/// GitHub REST API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// API root.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_github_timeout")]
    pub timeout_seconds: u64,

    /// Page size for listings and searches.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            timeout_seconds: default_github_timeout(),
            per_page: default_per_page(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_github_timeout() -> u64 {
    30
}

fn default_per_page() -> u32 {
    30
}

/// Conversation storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory where `/export` and `--session` resolve relative names.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".repolens")
}

impl SessionConfig {
    /// Resolve a user-supplied file name against the storage directory.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() || file.components().count() > 1 {
            file.to_path_buf()
        } else {
            self.storage_dir.join(file)
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.primary_model {
            self.models.primary.name = model.clone();
        }
        if let Some(ref model) = args.reasoning_model {
            self.models.reasoning.name = model.clone();
        }
        if let Some(ref url) = args.base_url {
            self.models.primary.base_url = url.clone();
            self.models.reasoning.base_url = url.clone();
        }
        if let Some(ref url) = args.github_api_url {
            self.github.api_url = url.clone();
        }
        if let Some(iterations) = args.max_tool_iterations {
            self.general.max_tool_iterations = iterations;
        }
        if args.verbose {
            self.general.debug_mode = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// API credentials, read once at startup.
#[derive(Clone)]
pub struct Credentials {
    pub groq_api_key: String,
    pub github_token: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("groq_api_key", &mask(&self.groq_api_key))
            .field("github_token", &mask(&self.github_token))
            .finish()
    }
}

impl Credentials {
    pub const GROQ_API_KEY: &'static str = "GROQ_API_KEY";
    pub const GITHUB_ACCESS_TOKEN: &'static str = "GITHUB_ACCESS_TOKEN";

    /// Read both credentials from the process environment.
    ///
    /// A missing or empty variable is an error naming that variable.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => bail!("Missing {} in environment variables", key),
            }
        };

        Ok(Self {
            groq_api_key: read(Self::GROQ_API_KEY)?,
            github_token: read(Self::GITHUB_ACCESS_TOKEN)?,
        })
    }

    /// Same credentials with a different GitHub token.
    pub fn with_github_token(&self, token: &str) -> Self {
        Self {
            groq_api_key: self.groq_api_key.clone(),
            github_token: token.trim().to_string(),
        }
    }
}

/// Show only the first and last four characters of a secret.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
