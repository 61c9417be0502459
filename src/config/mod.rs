//! Configuration management.
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `ARXIV_COURIER_*` environment variables (nested
//! keys separated by `__`). Credentials never come from the file; they are
//! read once from the process environment by [`Credentials::from_env`] and
//! handed to each component explicitly.
//!
//! # Configuration File Format
//!
//! ```toml
//! [feed]
//! base_url = "https://export.arxiv.org/rss"
//! categories = ["cs.SD", "eess.AS"]
//! retry = { max_attempts = 10, delay_secs = 300 }
//!
//! [summarizer]
//! endpoint = "https://generativelanguage.googleapis.com/v1beta"
//! model = "gemini-1.5-flash"
//! temperature = 0.0
//! char_budget = 300
//!
//! [publisher]
//! service_url = "https://bsky.social"
//! window_secs = 18000
//! char_limit = 300
//! retry = { max_attempts = 5, delay_secs = 60 }
//!
//! [http]
//! timeout_secs = 30
//! connect_timeout_secs = 10
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::{default_user_agent, RetryPolicy};

/// Prefix for environment overrides, e.g. `ARXIV_COURIER_FEED__CATEGORIES`
pub const ENV_PREFIX: &str = "ARXIV_COURIER";

/// Environment variable holding the posting account handle
pub const HANDLE_VAR: &str = "BSKYBOT";
/// Environment variable holding the posting account app password
pub const PASSWORD_VAR: &str = "BSKYPWD";
/// Environment variable holding the generative-text API key
pub const API_KEY_VAR: &str = "GEMINI_KEY";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed source settings
    pub feed: FeedConfig,

    /// Summarization service settings
    pub summarizer: SummarizerConfig,

    /// Posting service settings
    pub publisher: PublisherConfig,

    /// HTTP client settings shared by all services
    pub http: HttpConfig,
}

impl Config {
    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.categories.iter().all(|c| c.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "feed.categories must name at least one category".to_string(),
            ));
        }
        if self.summarizer.char_budget == 0 {
            return Err(ConfigError::Invalid(
                "summarizer.char_budget must be positive".to_string(),
            ));
        }
        if self.publisher.char_limit == 0 {
            return Err(ConfigError::Invalid(
                "publisher.char_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Retry settings as they appear in the file: attempt cap and fixed delay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.delay_secs))
    }
}

/// Feed source configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// RSS endpoint; categories are appended as one `+`-joined path segment
    pub base_url: String,

    /// Subject categories whose union feed is fetched
    pub categories: Vec<String>,

    /// Fetch retries (10 attempts, 5 minutes apart)
    pub retry: RetrySettings,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://export.arxiv.org/rss".to_string(),
            categories: vec!["cs.SD".to_string(), "eess.AS".to_string()],
            retry: RetrySettings {
                max_attempts: 10,
                delay_secs: 300,
            },
        }
    }
}

/// Summarization service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerConfig {
    /// API root, without the `/models/...` suffix
    pub endpoint: String,

    pub model: String,

    pub temperature: f32,

    /// Maximum summary length in characters
    pub char_budget: usize,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.0,
            char_budget: 300,
        }
    }
}

/// Posting service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// PDS root URL for XRPC calls
    pub service_url: String,

    /// Window the posts are spread across, in seconds
    pub window_secs: u64,

    /// Hard ceiling on the post body, in characters
    pub char_limit: usize,

    /// Per-post retries (5 attempts, 1 minute apart)
    pub retry: RetrySettings,
}

impl PublisherConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            service_url: "https://bsky.social".to_string(),
            window_secs: 5 * 60 * 60,
            char_limit: 300,
            retry: RetrySettings {
                max_attempts: 5,
                delay_secs: 60,
            },
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: default_user_agent(),
        }
    }
}

/// Secrets supplied by the environment
#[derive(Clone)]
pub struct Credentials {
    /// Posting account handle
    pub handle: String,

    /// Posting account app password
    pub app_password: String,

    /// Generative-text API key
    pub api_key: String,
}

impl Credentials {
    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read credentials through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::MissingCredential(name))
        };

        Ok(Self {
            handle: required(HANDLE_VAR)?,
            app_password: required(PASSWORD_VAR)?,
            api_key: required(API_KEY_VAR)?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("handle", &self.handle)
            .field("app_password", &"[REDACTED]")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Missing environment variable: {0}")]
    MissingCredential(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_config_with_env(path, None)
}

/// Like [`load_config`], reading overrides from `env` instead of the process
/// environment when given.
pub fn load_config_with_env(
    path: Option<&Path>,
    env: Option<HashMap<String, String>>,
) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    builder = builder.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("feed.categories")
            .try_parsing(true)
            .source(env),
    );

    let config: Config = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Look for a config file in the working directory, then the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("arxiv-courier.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("arxiv-courier").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.feed.categories, vec!["cs.SD", "eess.AS"]);
        assert_eq!(config.feed.retry.policy(), RetryPolicy::new(10, Duration::from_secs(300)));
        assert_eq!(config.publisher.retry.policy(), RetryPolicy::new(5, Duration::from_secs(60)));
        assert_eq!(config.publisher.window(), Duration::from_secs(5 * 3600));
        assert_eq!(config.summarizer.char_budget, 300);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = load_config_with_env(None, Some(HashMap::new())).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_file_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let toml_content = r#"
[feed]
categories = ["cs.CL"]

[feed.retry]
max_attempts = 3
delay_secs = 1

[summarizer]
model = "gemini-1.5-pro"

[publisher]
window_secs = 3600
"#;

        let mut file = File::create(&path).unwrap();
        file.write_all(toml_content.as_bytes()).unwrap();

        let config = load_config_with_env(Some(&path), Some(HashMap::new())).unwrap();

        assert_eq!(config.feed.categories, vec!["cs.CL"]);
        assert_eq!(config.feed.retry.max_attempts, 3);
        assert_eq!(config.summarizer.model, "gemini-1.5-pro");
        assert_eq!(config.publisher.window_secs, 3600);
        // Untouched keys keep their defaults
        assert_eq!(config.feed.base_url, "https://export.arxiv.org/rss");
        assert_eq!(config.publisher.retry.max_attempts, 5);
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[publisher]\nwindow_secs = 3600\n").unwrap();

        let env = HashMap::from([
            (
                "ARXIV_COURIER_FEED__CATEGORIES".to_string(),
                "cs.LG,stat.ML".to_string(),
            ),
            (
                "ARXIV_COURIER_PUBLISHER__WINDOW_SECS".to_string(),
                "600".to_string(),
            ),
        ]);

        let config = load_config_with_env(Some(&path), Some(env)).unwrap();
        assert_eq!(config.feed.categories, vec!["cs.LG", "stat.ML"]);
        assert_eq!(config.publisher.window_secs, 600);
    }

    #[test]
    fn test_config_file_nonexistent() {
        let path = PathBuf::from("/nonexistent/config.toml");
        let result = load_config_with_env(Some(&path), Some(HashMap::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_config_file_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invalid.toml");
        std::fs::write(&path, "invalid = toml = content").unwrap();

        let result = load_config_with_env(Some(&path), Some(HashMap::new()));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_empty_categories_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[feed]\ncategories = []\n").unwrap();

        let result = load_config_with_env(Some(&path), Some(HashMap::new()));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_credentials_from_lookup() {
        let vars = HashMap::from([
            (HANDLE_VAR, "bot.bsky.social"),
            (PASSWORD_VAR, "app-pass"),
            (API_KEY_VAR, "key-123"),
        ]);
        let creds = Credentials::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.handle, "bot.bsky.social");
        assert_eq!(creds.app_password, "app-pass");
        assert_eq!(creds.api_key, "key-123");

        let debug = format!("{:?}", creds);
        assert!(debug.contains("bot.bsky.social"));
        assert!(!debug.contains("app-pass"));
        assert!(!debug.contains("key-123"));
    }

    #[test]
    fn test_credentials_missing_variable() {
        let vars = HashMap::from([(HANDLE_VAR, "bot.bsky.social"), (PASSWORD_VAR, "")]);
        let result = Credentials::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert!(matches!(
            result,
            Err(ConfigError::MissingCredential(PASSWORD_VAR))
        ));
    }
}
