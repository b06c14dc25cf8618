// Configuration loading and parsing (config/whosthat.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Name of the single config file, both under `config/` and `defaults/`.
pub const CONFIG_FILE_NAME: &str = "whosthat.toml";

/// Database file name used when `[database].path` is not set.
pub const DEFAULT_DB_FILE_NAME: &str = "whosthat.db";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub round: RoundConfig,
    /// Resolved database location (absolute or relative to the base dir).
    pub db_path: PathBuf,
}

// ---------------------------------------------------------------------------
// whosthat.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire whosthat.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    catalog: CatalogConfig,
    round: RoundConfig,
    #[serde(default)]
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Endpoint prefix; entities are fetched from `{base_url}/{id}`.
    pub base_url: String,
    /// Upper bound of the id range. Ids are drawn uniformly from `1..=max_id`.
    pub max_id: u32,
    pub timeout_secs: u64,
}

impl CatalogConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoundConfig {
    /// Pause between a correct guess and the next round.
    pub advance_delay_ms: u64,
}

impl RoundConfig {
    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "https://pokeapi.co/api/v2/pokemon".to_string(),
            max_id: 151,
            timeout_secs: 10,
        }
    }
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            advance_delay_ms: 2500,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/whosthat.toml` relative to
/// the given `base_dir`.
///
/// Does not touch `defaults/`; see `load_config` for that.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_path = base_dir.join("config").join(CONFIG_FILE_NAME);
    let text = read_file(&config_path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    let db_path = match file.database.path {
        Some(p) if !p.trim().is_empty() => base_dir.join(p.trim()),
        _ => default_db_path(base_dir),
    };

    let config = Config {
        catalog: file.catalog,
        round: file.round,
        db_path,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy `defaults/whosthat.toml` to `config/whosthat.toml` unless the latter
/// already exists. Returns whether a copy was made.
pub fn ensure_config_file(base_dir: &Path) -> Result<bool, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE_NAME);
    if target.exists() {
        return Ok(false);
    }

    let source = base_dir.join("defaults").join(CONFIG_FILE_NAME);
    let copy_err = |what: &str, path: &Path, e: std::io::Error| ConfigError::DefaultsCopyError {
        message: format!("{what} {}: {e}", path.display()),
    };

    let content = match std::fs::read(&source) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "no config/{name} and no defaults/{name} in {}",
                    base_dir.display(),
                    name = CONFIG_FILE_NAME
                ),
            });
        }
        Err(e) => return Err(copy_err("failed to read", &source, e)),
    };

    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| copy_err("failed to create", dir, e))?;
    }

    // create_new: never clobber a file that appeared since the exists() check.
    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut file) => {
            std::io::Write::write_all(&mut file, &content)
                .map_err(|e| copy_err("failed to write", &target, e))?;
            info!("Copied default config to {}", target.display());
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(copy_err("failed to create", &target, e)),
    }
}

/// Load config relative to `base_dir`, copying the default file first when
/// no config exists yet.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_file(base_dir)?;
    load_config_from(base_dir)
}

/// Platform data directory (e.g. `~/.local/share/whosthat/whosthat.db`), or
/// `base_dir/whosthat.db` when no home directory can be determined.
pub fn default_db_path(base_dir: &Path) -> PathBuf {
    match directories::ProjectDirs::from("", "", "whosthat") {
        Some(dirs) => dirs.data_dir().join(DEFAULT_DB_FILE_NAME),
        None => base_dir.join(DEFAULT_DB_FILE_NAME),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let base_url = config.catalog.base_url.trim();
    if base_url.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "catalog.base_url".into(),
            message: "must not be empty".into(),
        });
    }
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "catalog.base_url".into(),
            message: format!("must be an http(s) URL, got {base_url}"),
        });
    }

    let numeric_fields: &[(&str, u64)] = &[
        ("catalog.max_id", u64::from(config.catalog.max_id)),
        ("catalog.timeout_secs", config.catalog.timeout_secs),
        ("round.advance_delay_ms", config.round.advance_delay_ms),
    ];
    for (name, val) in numeric_fields {
        if *val == 0 {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: "must be > 0".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
