use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// An explicit object passed into constructors; there is no process-wide
/// settings singleton, so tests can run several isolated instances.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub docascode: DocascodeConfig,
    #[serde(default)]
    pub embeddings: EmbeddingsConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// Storage layout configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DocascodeConfig {
    /// Base data directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory holding serialized knowledge graph JSON files.
    #[serde(default = "default_graphs_dir")]
    pub graphs_dir: PathBuf,
    /// Directory holding document templates.
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
    /// Output directory for exported procedure documents.
    #[serde(default = "default_generated_dir")]
    pub generated_dir: PathBuf,
    /// Output directory for cross-linked reference pages.
    #[serde(default = "default_reference_dir")]
    pub reference_dir: PathBuf,
    /// SQLite file backing the document index.
    #[serde(default = "default_index_db_path")]
    pub index_db_path: PathBuf,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Embeddings configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

/// Document search configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_min_score")]
    pub min_score: f32,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_http_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default = "default_authless")]
    pub authless: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_graphs_dir() -> PathBuf {
    PathBuf::from("data/graphs")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_generated_dir() -> PathBuf {
    PathBuf::from("site_docs/generated")
}

fn default_reference_dir() -> PathBuf {
    PathBuf::from("site_docs/reference")
}

fn default_index_db_path() -> PathBuf {
    PathBuf::from("data/indices/documents.db")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_dimensions() -> usize {
    1536
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_limit() -> usize {
    10
}

fn default_min_score() -> f32 {
    0.0
}

fn default_http_enabled() -> bool {
    false
}

fn default_http_port() -> u16 {
    8080
}

fn default_http_api_key_env() -> String {
    "DOCASCODE_API_KEY".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    // Default empty — set allowed_origins in config.toml for production
    vec![]
}

fn default_authless() -> bool {
    false
}

impl Default for DocascodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            graphs_dir: default_graphs_dir(),
            templates_dir: default_templates_dir(),
            generated_dir: default_generated_dir(),
            reference_dir: default_reference_dir(),
            index_db_path: default_index_db_path(),
            log_level: default_log_level(),
        }
    }
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            api_key_env: default_api_key_env(),
            dimensions: default_dimensions(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            min_score: default_min_score(),
        }
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            port: default_http_port(),
            api_key_env: default_http_api_key_env(),
            allowed_origins: default_allowed_origins(),
            authless: default_authless(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docascode: DocascodeConfig::default(),
            embeddings: EmbeddingsConfig::default(),
            search: SearchConfig::default(),
            http_server: HttpServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in DOCASCODE_CONFIG environment variable
    /// 2. ./config.toml in current directory
    ///
    /// A missing config file is not an error: every setting has a default, so
    /// an absent file yields the default configuration.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("DOCASCODE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config = if config_path.exists() {
            let config_str = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
            toml::from_str::<Config>(&config_str).context("Failed to parse config.toml")?
        } else {
            Config::default()
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.embeddings.dimensions == 0 {
            anyhow::bail!("embeddings.dimensions must be greater than 0");
        }

        if self.search.default_limit == 0 {
            anyhow::bail!("search.default_limit must be greater than 0");
        }

        if self.search.min_score < 0.0 || self.search.min_score > 1.0 {
            anyhow::bail!("search.min_score must be between 0.0 and 1.0");
        }

        Ok(())
    }

    /// Create all configured data directories if they do not exist
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [
            &self.docascode.data_dir,
            &self.docascode.graphs_dir,
            &self.docascode.templates_dir,
            &self.docascode.generated_dir,
            &self.docascode.reference_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        if let Some(parent) = self.docascode.index_db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Get the graphs directory
    pub fn graphs_dir(&self) -> &Path {
        &self.docascode.graphs_dir
    }

    /// Get the templates directory
    pub fn templates_dir(&self) -> &Path {
        &self.docascode.templates_dir
    }

    /// Get the document index database path
    pub fn index_db_path(&self) -> &Path {
        &self.docascode.index_db_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Serialize config tests that mutate process-wide env so they don't race.
    static CONFIG_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn with_config_env(config_path: &std::path::Path, f: impl FnOnce()) {
        let original = std::env::var("DOCASCODE_CONFIG").ok();
        std::env::set_var("DOCASCODE_CONFIG", config_path.to_str().unwrap());
        f();
        std::env::remove_var("DOCASCODE_CONFIG");
        if let Some(val) = original {
            std::env::set_var("DOCASCODE_CONFIG", val);
        }
    }

    #[test]
    fn test_config_load_success() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_content = r#"
[docascode]
data_dir = "data"
graphs_dir = "data/graphs"
log_level = "debug"

[embeddings]
model = "text-embedding-3-small"
dimensions = 1536

[search]
default_limit = 5
min_score = 0.25
"#;
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, config_content).unwrap();
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_ok(), "Config::load() failed: {:?}", config.err());
            let config = config.unwrap();
            assert_eq!(config.docascode.log_level, "debug");
            assert_eq!(config.search.default_limit, 5);
            assert_eq!(config.embeddings.dimensions, 1536);
            // Unspecified sections fall back to defaults
            assert_eq!(config.http_server.port, 8080);
        });
    }

    #[test]
    fn test_config_missing_file_uses_defaults() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("does_not_exist.toml");
        with_config_env(&config_path, || {
            let config = Config::load().unwrap();
            assert_eq!(config.docascode.graphs_dir, PathBuf::from("data/graphs"));
            assert_eq!(config.embeddings.model, "text-embedding-3-small");
        });
    }

    #[test]
    fn test_config_invalid_min_score() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let config_content = r#"
[search]
min_score = 1.5
"#;
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, config_content).unwrap();
        with_config_env(&config_path, || {
            let config = Config::load();
            assert!(config.is_err());
            assert!(config.unwrap_err().to_string().contains("min_score"));
        });
    }

    #[test]
    fn test_ensure_directories() {
        let _lock = CONFIG_TEST_LOCK.lock().unwrap();
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.docascode.data_dir = temp_dir.path().join("data");
        config.docascode.graphs_dir = temp_dir.path().join("data/graphs");
        config.docascode.templates_dir = temp_dir.path().join("templates");
        config.docascode.generated_dir = temp_dir.path().join("out/generated");
        config.docascode.reference_dir = temp_dir.path().join("out/reference");
        config.docascode.index_db_path = temp_dir.path().join("data/indices/documents.db");

        config.ensure_directories().unwrap();

        assert!(config.docascode.graphs_dir.is_dir());
        assert!(config.docascode.reference_dir.is_dir());
        assert!(config.docascode.index_db_path.parent().unwrap().is_dir());
    }
}
