use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ai::ProviderKind;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local store
    pub database: DatabaseConfig,

    /// Caption platform access
    pub youtube: YoutubeConfig,

    /// LLM vendor settings
    pub ai: AiConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file
    pub path: PathBuf,

    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeConfig {
    /// yt-dlp executable used for metadata and caption listing
    pub yt_dlp_path: String,

    /// Minimum spacing between calls to the platform
    pub rate_limit_interval_ms: u64,

    /// Deadline for a whole fetch request
    pub request_timeout_secs: u64,

    /// Longest video accepted for transcript retrieval
    pub max_duration_secs: u64,

    /// Language used when the caller does not ask for one
    pub default_language: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub provider: ProviderKind,

    pub model: String,

    pub max_tokens: u32,

    pub temperature: f32,

    /// Deadline for a single summarize/extract/answer call
    pub operation_timeout_secs: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_api_key: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_api_key: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = dirs::data_dir()
            .map(|dir| dir.join("transcript-enricher").join("transcripts.db"))
            .unwrap_or_else(|| PathBuf::from("transcripts.db"));

        Self {
            path,
            max_connections: 5,
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            rate_limit_interval_ms: 500,
            request_timeout_secs: 30,
            max_duration_secs: 10 * 60 * 60,
            default_language: "en".to_string(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            model: "gpt-4".to_string(),
            max_tokens: 4000,
            temperature: 0.7,
            operation_timeout_secs: 60,
            openai_api_key: None,
            anthropic_api_key: None,
            google_api_key: None,
        }
    }
}

impl YoutubeConfig {
    pub fn rate_limit_interval(&self) -> Duration {
        Duration::from_millis(self.rate_limit_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl AiConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// API key of the selected provider
    pub fn api_key(&self) -> Option<&str> {
        match self.provider {
            ProviderKind::OpenAi => self.openai_api_key.as_deref(),
            ProviderKind::Anthropic => self.anthropic_api_key.as_deref(),
            ProviderKind::Gemini => self.google_api_key.as_deref(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (or the default location), creating a
    /// default file when none exists, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        let mut config = if config_path.exists() {
            let content = fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            serde_yaml::from_str(&content).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save(&config_path)?;
            tracing::info!("Created default configuration at {}", config_path.display());
            config
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("transcript-enricher").join("config.yaml"))
    }

    /// Overlay settings taken from environment variables
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(provider) = var("AI_PROVIDER") {
            self.ai.provider = provider
                .parse()
                .with_context(|| format!("Invalid AI_PROVIDER {:?}", provider))?;
        }
        if let Some(model) = var("AI_MODEL") {
            self.ai.model = model;
        }
        if let Some(max_tokens) = var("AI_MAX_TOKENS") {
            self.ai.max_tokens = max_tokens
                .trim()
                .parse()
                .with_context(|| format!("Invalid AI_MAX_TOKENS {:?}", max_tokens))?;
        }
        if let Some(temperature) = var("AI_TEMPERATURE") {
            self.ai.temperature = temperature
                .trim()
                .parse()
                .with_context(|| format!("Invalid AI_TEMPERATURE {:?}", temperature))?;
        }
        if let Some(key) = var("OPENAI_API_KEY") {
            self.ai.openai_api_key = Some(key);
        }
        if let Some(key) = var("ANTHROPIC_API_KEY") {
            self.ai.anthropic_api_key = Some(key);
        }
        if let Some(key) = var("GOOGLE_API_KEY") {
            self.ai.google_api_key = Some(key);
        }
        if let Some(path) = var("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            anyhow::bail!("AI temperature must be between 0 and 2, got {}", self.ai.temperature);
        }

        if self.ai.max_tokens == 0 {
            anyhow::bail!("AI max tokens must be greater than 0");
        }

        if self.ai.model.trim().is_empty() {
            anyhow::bail!("AI model must be configured");
        }

        if self.ai.operation_timeout_secs == 0 || self.youtube.request_timeout_secs == 0 {
            anyhow::bail!("Timeouts must be greater than 0");
        }

        if self.youtube.rate_limit_interval_ms == 0 {
            anyhow::bail!("Rate limit interval must be greater than 0");
        }

        if self.youtube.max_duration_secs == 0 {
            anyhow::bail!("Maximum video duration must be greater than 0");
        }

        let language_len = self.youtube.default_language.trim().chars().count();
        if !(2..=5).contains(&language_len) {
            anyhow::bail!(
                "Default language must be 2-5 characters, got {:?}",
                self.youtube.default_language
            );
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max connections must be greater than 0");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        let key_state = |key: &Option<String>| if key.is_some() { "set" } else { "not set" };

        println!("Current Configuration:");
        println!("  Database: {}", self.database.path.display());
        println!("  yt-dlp: {}", self.youtube.yt_dlp_path);
        println!("  Rate Limit Interval: {}ms", self.youtube.rate_limit_interval_ms);
        println!("  Fetch Timeout: {}s", self.youtube.request_timeout_secs);
        println!("  Max Video Duration: {}s", self.youtube.max_duration_secs);
        println!("  Default Language: {}", self.youtube.default_language);
        println!("  AI Provider: {}", self.ai.provider);
        println!("  AI Model: {}", self.ai.model);
        println!("  AI Max Tokens: {}", self.ai.max_tokens);
        println!("  AI Temperature: {}", self.ai.temperature);
        println!("  AI Timeout: {}s", self.ai.operation_timeout_secs);
        println!("  OpenAI Key: {}", key_state(&self.ai.openai_api_key));
        println!("  Anthropic Key: {}", key_state(&self.ai.anthropic_api_key));
        println!("  Google Key: {}", key_state(&self.ai.google_api_key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.youtube.rate_limit_interval(), Duration::from_millis(500));
        assert_eq!(config.youtube.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.youtube.max_duration_secs, 36_000);
        assert_eq!(config.ai.operation_timeout(), Duration::from_secs(60));
        assert_eq!(config.ai.provider, ProviderKind::OpenAi);
        assert_eq!(config.ai.model, "gpt-4");
    }

    #[test]
    fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut created = Config::default();
        created.save(&path).unwrap();
        let content = fs_err::read_to_string(&path).unwrap();
        assert!(content.contains("rate_limit_interval_ms: 500"));
        assert!(!content.contains("api_key"));

        created.youtube.default_language = "de".to_string();
        created.save(&path).unwrap();
        let reloaded: Config = serde_yaml::from_str(&fs_err::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.youtube.default_language, "de");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = serde_yaml::from_str("ai:\n  provider: anthropic\n  model: claude-3-haiku\n").unwrap();
        assert_eq!(config.ai.provider, ProviderKind::Anthropic);
        assert_eq!(config.ai.model, "claude-3-haiku");
        assert_eq!(config.ai.max_tokens, 4000);
        assert_eq!(config.youtube, YoutubeConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("AI_PROVIDER", "gemini"),
                ("AI_MODEL", "gemini-1.5-flash"),
                ("AI_MAX_TOKENS", "2048"),
                ("AI_TEMPERATURE", "0.2"),
                ("GOOGLE_API_KEY", "g-key"),
                ("OPENAI_API_KEY", "  "),
                ("DATABASE_PATH", "/tmp/enricher.db"),
            ]))
            .unwrap();

        assert_eq!(config.ai.provider, ProviderKind::Gemini);
        assert_eq!(config.ai.model, "gemini-1.5-flash");
        assert_eq!(config.ai.max_tokens, 2048);
        assert!((config.ai.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.ai.api_key(), Some("g-key"));
        assert_eq!(config.ai.openai_api_key, None);
        assert_eq!(config.database.path, PathBuf::from("/tmp/enricher.db"));
    }

    #[test]
    fn test_bad_env_values_are_rejected() {
        let mut config = Config::default();
        assert!(config.apply_overrides(env(&[("AI_MAX_TOKENS", "lots")])).is_err());
        assert!(config.apply_overrides(env(&[("AI_PROVIDER", "mystery")])).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.ai.temperature = 2.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ai.max_tokens = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.youtube.default_language = "english".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.ai.operation_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = Config::load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(config.youtube.default_language, "en");
    }
}
