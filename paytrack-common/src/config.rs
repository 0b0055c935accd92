//! Configuration loading and root folder resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority, supplied by the binary)
//! 2. Environment variable (`PAYTRACK_*`)
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file never stops startup: the service logs a
//! warning and continues with compiled defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming an explicit TOML config file
pub const CONFIG_ENV_VAR: &str = "PAYTRACK_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "PAYTRACK_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "paytrack.db";

/// Compiled defaults used when neither CLI, ENV nor TOML supply a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub host: String,
    pub port: u16,
    pub max_upload_bytes: u64,
    pub default_region: String,
    pub default_currency: String,
    pub poll_interval_ms: u64,
    pub event_bus_capacity: usize,
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        Self {
            root_folder: default_root_folder(),
            host: "127.0.0.1".to_string(),
            port: 5760,
            max_upload_bytes: 10 * 1024 * 1024,
            default_region: "IN".to_string(),
            default_currency: "INR".to_string(),
            poll_interval_ms: 2000,
            event_bus_capacity: 100,
            log_level: "info".to_string(),
        }
    }
}

/// `[logging]` table of the TOML config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "paytrack_intake=debug,info"
    #[serde(default)]
    pub level: Option<String>,
}

/// On-disk TOML configuration. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub root_folder: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub max_upload_bytes: Option<u64>,
    /// CORS origins allowed to call the API; empty means any origin
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub default_region: Option<String>,
    #[serde(default)]
    pub default_currency: Option<String>,
    /// Remote contract parser endpoint; the in-process parser is used when unset
    #[serde(default)]
    pub parser_url: Option<String>,
    /// Client polling interval for job status
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    #[serde(default)]
    pub event_bus_capacity: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Read and parse a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Load the config file named by [`config_file_path`], falling back to
    /// defaults (with a warning) when it is absent or invalid
    pub fn load_or_default() -> Self {
        let Some(path) = config_file_path() else {
            debug!("No config directory available, using compiled defaults");
            return Self::default();
        };

        if !path.exists() {
            debug!("Config file {} not found, using compiled defaults", path.display());
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

/// Location of the TOML config file: `PAYTRACK_CONFIG`, else
/// `<config dir>/paytrack/paytrack.toml`
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("paytrack").join("paytrack.toml"))
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("paytrack"))
        .unwrap_or_else(|| PathBuf::from("./paytrack_data"))
}

/// Resolves the root folder holding the database, uploads and generated
/// documents
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<String>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    /// Command-line override (priority 1)
    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    /// TOML `root_folder` value (priority 3)
    pub fn with_toml(mut self, config: &TomlConfig) -> Self {
        self.toml_root = config.root_folder.clone();
        self
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            debug!(module = %self.module_name, "Root folder from command line");
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
            if !path.trim().is_empty() {
                debug!(module = %self.module_name, "Root folder from {}", ROOT_FOLDER_ENV_VAR);
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &self.toml_root {
            debug!(module = %self.module_name, "Root folder from TOML config");
            return PathBuf::from(path);
        }

        CompiledDefaults::for_current_platform().root_folder
    }
}

/// Creates the root folder layout on first start
pub struct RootFolderInitializer {
    root_folder: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root_folder: PathBuf) -> Self {
        Self { root_folder }
    }

    pub fn root_folder(&self) -> &Path {
        &self.root_folder
    }

    /// Create root, `uploads/` and `outputs/` if missing
    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root_folder)?;
        std::fs::create_dir_all(self.uploads_dir())?;
        std::fs::create_dir_all(self.outputs_dir())?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root_folder.join(DATABASE_FILE)
    }

    /// Stored contract uploads
    pub fn uploads_dir(&self) -> PathBuf {
        self.root_folder.join("uploads")
    }

    /// Generated payslips and tax summaries
    pub fn outputs_dir(&self) -> PathBuf {
        self.root_folder.join("outputs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_is_all_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config, TomlConfig::default());
    }

    #[test]
    fn test_toml_fields_parse() {
        let config = TomlConfig::from_toml_str(
            r#"
            port = 6001
            parser_url = "http://parser.local/parse"
            allowed_origins = ["http://localhost:5173"]

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, Some(6001));
        assert_eq!(config.parser_url.as_deref(), Some("http://parser.local/parse"));
        assert_eq!(config.allowed_origins, vec!["http://localhost:5173".to_string()]);
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("port = \"not a number\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_initializer_layout() {
        let init = RootFolderInitializer::new(PathBuf::from("/srv/paytrack"));
        assert_eq!(init.database_path(), PathBuf::from("/srv/paytrack/paytrack.db"));
        assert_eq!(init.uploads_dir(), PathBuf::from("/srv/paytrack/uploads"));
        assert_eq!(init.outputs_dir(), PathBuf::from("/srv/paytrack/outputs"));
    }
}
