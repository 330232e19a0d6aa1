//! Layered configuration
//!
//! Loads configuration from:
//! 1. Default values
//! 2. User-level config: ~/.storyboard/storyboard.toml
//! 3. Project-level config: ./.storyboard/storyboard.toml
//!
//! Later files override earlier ones key by key. String values may reference
//! environment variables as `${VAR}` or `${VAR:default}`. Finally
//! `STORYBOARD_STORE` and `STORYBOARD_DATABASE_PATH` override the store
//! section.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use storyboard_checkpoint::{StoreBackend, StoreConfig};
use storyboard_llm::LlmConfig;
use storyboard_workflow::Limits;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

pub const CONFIG_DIR: &str = ".storyboard";
pub const CONFIG_FILE: &str = "storyboard.toml";

pub const ENV_STORE: &str = "STORYBOARD_STORE";
pub const ENV_DATABASE_PATH: &str = "STORYBOARD_DATABASE_PATH";

static ENV_REFERENCE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\$\{([^:}]+)(?::([^}]*))?\}").expect("valid env reference regex")
});

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryboardConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub limits: Limits,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Bound on every generation call, in seconds
    #[serde(default = "default_generation_timeout_secs")]
    pub timeout_secs: u64,

    /// Scene count used when the caller gives none
    #[serde(default = "default_scene_count")]
    pub default_scene_count: usize,

    #[serde(default = "default_max_scene_count")]
    pub max_scene_count: usize,
}

fn default_generation_timeout_secs() -> u64 {
    30
}

fn default_scene_count() -> usize {
    5
}

fn default_max_scene_count() -> usize {
    20
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_generation_timeout_secs(),
            default_scene_count: default_scene_count(),
            max_scene_count: default_max_scene_count(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (compact, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Enable colored output
    #[serde(default = "default_true")]
    pub colored: bool,

    /// Include timestamps
    #[serde(default = "default_true")]
    pub timestamps: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            colored: true,
            timestamps: true,
        }
    }
}

impl StoryboardConfig {
    /// Parse a single TOML document, with `${VAR}` references resolved
    /// against the process environment
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: toml::Table = content.parse().map_err(|e: toml::de::Error| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            message: e.to_string(),
        })?;
        Self::from_table(table, &|name| std::env::var(name).ok())
    }

    fn from_table(table: toml::Table, env: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let mut value = toml::Value::Table(table);
        expand_variables(&mut value, env);
        let config: StoryboardConfig = value
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Invalid(e.to_string()))?;
        Ok(config)
    }

    /// Apply `STORYBOARD_STORE` and `STORYBOARD_DATABASE_PATH`
    pub fn apply_env_overrides(&mut self, env: &dyn Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(backend) = env(ENV_STORE).filter(|v| !v.trim().is_empty()) {
            self.store.backend = backend
                .parse::<StoreBackend>()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        if let Some(path) = env(ENV_DATABASE_PATH).filter(|v| !v.trim().is_empty()) {
            self.store.path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Input limits with the generation scene ceiling applied
    pub fn effective_limits(&self) -> Limits {
        let mut limits = self.limits.clone();
        limits.scene_count_max = limits.scene_count_max.min(self.generation.max_scene_count);
        limits
    }

    /// Check cross-section consistency; the LLM section is validated when
    /// the provider is built
    pub fn validate(&self) -> Result<()> {
        if self.generation.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "generation.timeout_secs must be greater than 0".to_string(),
            ));
        }

        let limits = self.effective_limits();
        if limits.scene_count_min == 0 || limits.scene_count_min > limits.scene_count_max {
            return Err(ConfigError::Invalid(format!(
                "Scene count range {}-{} is empty",
                limits.scene_count_min, limits.scene_count_max
            )));
        }
        if limits.max_projects == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_projects must be at least 1".to_string(),
            ));
        }
        if limits.summary_min > limits.summary_max {
            return Err(ConfigError::Invalid(format!(
                "limits.summary_min ({}) exceeds limits.summary_max ({})",
                limits.summary_min, limits.summary_max
            )));
        }
        limits
            .validate_scene_count(self.generation.default_scene_count)
            .map_err(|e| ConfigError::Invalid(format!("generation.default_scene_count: {}", e)))?;
        Ok(())
    }
}

/// Configuration loader that handles both user and project configs
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    project_config_path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            user_config_path: dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE)),
            project_config_path: std::env::current_dir()
                .ok()
                .map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE)),
        }
    }

    /// Loader over explicit files; `None` skips that layer
    pub fn with_paths(user: Option<PathBuf>, project: Option<PathBuf>) -> Self {
        Self {
            user_config_path: user,
            project_config_path: project,
        }
    }

    pub fn user_config_path(&self) -> Option<&Path> {
        self.user_config_path.as_deref()
    }

    pub fn project_config_path(&self) -> Option<&Path> {
        self.project_config_path.as_deref()
    }

    /// Load with the process environment
    pub async fn load(&self) -> Result<StoryboardConfig> {
        self.load_with_env(&|name| std::env::var(name).ok()).await
    }

    /// Load with an explicit environment lookup
    pub async fn load_with_env(&self, env: &dyn Fn(&str) -> Option<String>) -> Result<StoryboardConfig> {
        info!("Loading configuration with defaults");
        let mut merged = toml::Table::new();

        for path in [&self.user_config_path, &self.project_config_path].into_iter().flatten() {
            match load_table(path).await? {
                Some(layer) => {
                    debug!(path = %path.display(), "Loaded config layer");
                    deep_merge(&mut merged, layer);
                }
                None => debug!(path = %path.display(), "Config file not found, skipping"),
            }
        }

        let mut config = StoryboardConfig::from_table(merged, env)?;
        config.apply_env_overrides(env)?;
        config.validate()?;

        info!(backend = %config.store.backend, "Configuration loaded successfully");
        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Read one TOML layer; a missing file is `None`
async fn load_table(path: &Path) -> Result<Option<toml::Table>> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    content
        .parse::<toml::Table>()
        .map(Some)
        .map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

/// Merge `other` into `base`; tables merge recursively, anything else is
/// replaced
fn deep_merge(base: &mut toml::Table, other: toml::Table) {
    for (key, value) in other {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn expand_variables(value: &mut toml::Value, env: &dyn Fn(&str) -> Option<String>) {
    match value {
        toml::Value::String(s) => {
            if let Some(expanded) = expand_env_in_string(s, env) {
                *s = expanded;
            }
        }
        toml::Value::Table(table) => {
            for (_, v) in table.iter_mut() {
                expand_variables(v, env);
            }
        }
        toml::Value::Array(items) => {
            for item in items.iter_mut() {
                expand_variables(item, env);
            }
        }
        _ => {}
    }
}

/// `${VAR}` and `${VAR:default}`; an unset variable without a default
/// expands to the empty string
fn expand_env_in_string(s: &str, env: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    if !s.contains("${") {
        return None;
    }

    let expanded = ENV_REFERENCE.replace_all(s, |caps: &regex::Captures<'_>| {
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        env(&caps[1]).unwrap_or_else(|| default.to_string())
    });
    Some(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoryboardConfig::default();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.generation.timeout(), Duration::from_secs(30));
        assert_eq!(config.generation.default_scene_count, 5);
        assert_eq!(config.limits.title_max, 50);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "compact");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config = StoryboardConfig::from_toml_str(
            r#"
            [store]
            backend = "sqlite"

            [llm]
            model = "gpt-4o-mini"
            "#,
        )
        .unwrap();

        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.path, PathBuf::from("data/storyboard.db"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_retries, 3);
        assert_eq!(config.generation, GenerationConfig::default());
    }

    #[test]
    fn test_expand_env_references() {
        let env = env_of(&[("API_KEY", "sk-test"), ("HOST", "example.com")]);
        assert_eq!(expand_env_in_string("plain", &env), None);
        assert_eq!(expand_env_in_string("${API_KEY}", &env).unwrap(), "sk-test");
        assert_eq!(
            expand_env_in_string("https://${HOST}/v1", &env).unwrap(),
            "https://example.com/v1"
        );
        assert_eq!(expand_env_in_string("${MISSING:fallback}", &env).unwrap(), "fallback");
        assert_eq!(expand_env_in_string("${MISSING}", &env).unwrap(), "");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = StoryboardConfig::default();
        let env = env_of(&[(ENV_STORE, "sqlite"), (ENV_DATABASE_PATH, "/tmp/boards.db")]);
        config.apply_env_overrides(&env).unwrap();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.store.path, PathBuf::from("/tmp/boards.db"));

        let bad = env_of(&[(ENV_STORE, "redis")]);
        assert!(matches!(
            config.apply_env_overrides(&bad),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_validate_rejects_inconsistent_counts() {
        let mut config = StoryboardConfig::default();
        config.generation.max_scene_count = 3;
        assert_eq!(config.effective_limits().scene_count_max, 3);
        assert!(config.validate().is_err());

        config.generation.default_scene_count = 3;
        assert!(config.validate().is_ok());

        config.generation.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_provider_and_project_limits_from_toml() {
        let config = StoryboardConfig::from_toml_str(
            r#"
            [llm]
            provider = "gemini"
            api_key = "key"

            [limits]
            max_projects = 10
            scene_description_max = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.provider, storyboard_llm::Provider::Gemini);
        assert_eq!(config.llm.effective_model(), "gemini-pro");
        assert_eq!(config.limits.max_projects, 10);
        assert_eq!(config.limits.scene_description_max, 500);
        assert_eq!(config.limits.title_max, 50);
        assert!(config.validate().is_ok());

        let mut config = config;
        config.limits.max_projects = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deep_merge_keeps_untouched_keys() {
        let mut base: toml::Table = "[llm]\nmodel = \"a\"\ntemperature = 0.2\n".parse().unwrap();
        let other: toml::Table = "[llm]\nmodel = \"b\"\n[store]\nbackend = \"sqlite\"\n".parse().unwrap();
        deep_merge(&mut base, other);

        assert_eq!(base["llm"]["model"].as_str(), Some("b"));
        assert_eq!(base["llm"]["temperature"].as_float(), Some(0.2));
        assert_eq!(base["store"]["backend"].as_str(), Some("sqlite"));
    }

    #[tokio::test]
    async fn test_loader_layers_project_over_user() {
        let temp_dir = TempDir::new().unwrap();
        let user = temp_dir.path().join("user.toml");
        let project = temp_dir.path().join("project.toml");

        fs::write(
            &user,
            r#"
            [llm]
            api_key = "${TEST_KEY}"
            model = "user-model"

            [generation]
            timeout_secs = 45
            "#,
        )
        .await
        .unwrap();
        fs::write(
            &project,
            r#"
            [llm]
            model = "project-model"
            "#,
        )
        .await
        .unwrap();

        let loader = ConfigLoader::with_paths(Some(user), Some(project));
        let config = loader
            .load_with_env(&env_of(&[("TEST_KEY", "sk-layered")]))
            .await
            .unwrap();

        assert_eq!(config.llm.model, "project-model");
        assert_eq!(config.llm.api_key, "sk-layered");
        assert_eq!(config.generation.timeout_secs, 45);
    }

    #[tokio::test]
    async fn test_loader_without_files_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::with_paths(Some(temp_dir.path().join("missing.toml")), None);
        let config = loader.load_with_env(&env_of(&[])).await.unwrap();
        assert_eq!(config, StoryboardConfig::default());
    }

    #[tokio::test]
    async fn test_loader_reports_malformed_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[store\nbackend = ").await.unwrap();

        let loader = ConfigLoader::with_paths(None, Some(path));
        assert!(matches!(
            loader.load_with_env(&env_of(&[])).await,
            Err(ConfigError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn test_env_override_beats_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storyboard.toml");
        fs::write(&path, "[store]\nbackend = \"sqlite\"\npath = \"a.db\"\n").await.unwrap();

        let loader = ConfigLoader::with_paths(None, Some(path));
        let config = loader
            .load_with_env(&env_of(&[(ENV_STORE, "memory")]))
            .await
            .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.path, PathBuf::from("a.db"));
    }
}
