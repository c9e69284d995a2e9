//! Configuration module for the photo transfer tool
//!
//! Supports loading configuration from a TOML file.
//! Configuration is stored in a standard location:
//! - Windows: %APPDATA%\photo_transfer\config.toml
//! - Linux: ~/.config/photo_transfer/config.toml
//! - macOS: ~/Library/Application Support/photo_transfer/config.toml

use crate::core::copier::CopyFailurePolicy;
use crate::core::naming::{builtin_camera_models, CameraModel, CameraModelTable, NamingMode};
use crate::core::photo::DateRange;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Application name used for config directory
const APP_NAME: &str = "photo_transfer";

/// Default config file name
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config files checked in the current directory, in order
const LOCAL_CONFIG_FILES: [&str; 2] = ["./config.toml", "./photo_transfer.toml"];

/// Get the standard configuration directory for the application.
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_NAME))
}

/// Get the standard configuration file path.
pub fn get_config_path() -> Option<PathBuf> {
    get_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Ensure the configuration directory exists.
pub fn ensure_config_dir() -> Result<PathBuf, ConfigError> {
    let config_dir = get_config_dir().ok_or(ConfigError::ConfigDirNotFound)?;

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)
            .map_err(|e| ConfigError::WriteError(config_dir.clone(), e.to_string()))?;
    }

    Ok(config_dir)
}

/// Initialize the configuration file if it doesn't exist.
///
/// Returns the path to the config file.
pub fn init_config() -> Result<PathBuf, ConfigError> {
    let config_dir = ensure_config_dir()?;
    let config_path = config_dir.join(CONFIG_FILE_NAME);

    if !config_path.exists() {
        fs::write(&config_path, Config::generate_default_config())
            .map_err(|e| ConfigError::WriteError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

/// Open the configuration file in the default application.
pub fn open_config_in_editor() -> Result<PathBuf, ConfigError> {
    let config_path = init_config()?;

    #[cfg(target_os = "windows")]
    {
        std::process::Command::new("cmd")
            .args(["/C", "start", "", config_path.to_str().unwrap_or("")])
            .spawn()
            .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;
    }

    #[cfg(target_os = "macos")]
    {
        std::process::Command::new("open")
            .arg(&config_path)
            .spawn()
            .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;
    }

    #[cfg(target_os = "linux")]
    {
        std::process::Command::new("xdg-open")
            .arg(&config_path)
            .spawn()
            .map_err(|e| ConfigError::OpenError(config_path.clone(), e.to_string()))?;
    }

    Ok(config_path)
}

// =============================================================================
// Configuration sections
// =============================================================================

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transfer settings and last-used values
    pub transfer: TransferConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Camera model to file name suffix table, in lookup order
    pub camera_models: Vec<CameraModel>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transfer: TransferConfig::default(),
            logging: LoggingConfig::default(),
            camera_models: builtin_camera_models(),
        }
    }
}

/// Transfer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Directory searched for photos
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<PathBuf>,

    /// Directory photos are copied into
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_dir: Option<PathBuf>,

    /// First day of the range (YYYY-MM-DD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    /// Last day of the range, inclusive (YYYY-MM-DD)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    /// Keep the original file name instead of IMG_<timestamp>
    pub keep_original_name: bool,

    /// isolate: continue after a failed copy; abort: stop at the first one
    pub copy_failure_policy: CopyFailurePolicy,

    /// Write the values of a successful transfer back to the config file
    pub remember_last_run: bool,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            target_dir: None,
            start_date: None,
            end_date: None,
            keep_original_name: false,
            copy_failure_policy: CopyFailurePolicy::Isolate,
            remember_last_run: true,
        }
    }
}

impl TransferConfig {
    pub fn naming(&self) -> NamingMode {
        NamingMode::from_keep_original(self.keep_original_name)
    }

    /// Remember the folders and dates of a successful run
    pub fn remember(&mut self, source_dir: &Path, target_dir: &Path, range: &DateRange) {
        self.source_dir = Some(source_dir.to_path_buf());
        self.target_dir = Some(target_dir.to_path_buf());
        self.start_date = Some(range.start());
        self.end_date = Some(range.end());
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log to file
    pub log_to_file: bool,

    /// Log file path
    pub log_file: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: PathBuf::from("./photo_transfer.log"),
        }
    }
}

impl Config {
    /// Camera model table built from the configured entries
    pub fn camera_table(&self) -> CameraModelTable {
        CameraModelTable::new(self.camera_models.clone())
    }

    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(path.to_path_buf(), e.to_string()))?;

        toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))
    }

    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./config.toml
    /// 2. ./photo_transfer.toml
    /// 3. The standard config location
    ///
    /// If no config file is found, returns default configuration.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::find_existing_config() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Get the path where the config file is (or would be) located.
    pub fn get_active_config_path() -> PathBuf {
        Self::find_existing_config()
            .or_else(get_config_path)
            .unwrap_or_else(|| PathBuf::from(LOCAL_CONFIG_FILES[0]))
    }

    fn find_existing_config() -> Option<PathBuf> {
        LOCAL_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .chain(get_config_path())
            .find(|path| path.exists())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteError(parent.to_path_buf(), e.to_string()))?;
            }
        }

        fs::write(path, content).map_err(|e| ConfigError::WriteError(path.to_path_buf(), e.to_string()))
    }

    /// Generate a default config file with comments
    pub fn generate_default_config() -> String {
        include_str!("../../config.example.toml").to_string()
    }
}

/// Configuration error types
#[derive(Debug)]
pub enum ConfigError {
    /// Configuration file was not found at the specified path
    FileNotFound(PathBuf),
    /// Failed to read the configuration file
    ReadError(PathBuf, String),
    /// Failed to parse the configuration file (invalid TOML)
    ParseError(PathBuf, String),
    /// Failed to serialize configuration to TOML
    SerializeError(String),
    /// Failed to write configuration file
    WriteError(PathBuf, String),
    /// Could not determine config directory
    ConfigDirNotFound,
    /// Failed to open config file in editor
    OpenError(PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => {
                write!(f, "Configuration file not found: {}", path.display())
            }
            ConfigError::ReadError(path, err) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), err)
            }
            ConfigError::ParseError(path, err) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), err)
            }
            ConfigError::SerializeError(err) => {
                write!(f, "Failed to serialize configuration: {}", err)
            }
            ConfigError::WriteError(path, err) => {
                write!(f, "Failed to write config file '{}': {}", path.display(), err)
            }
            ConfigError::ConfigDirNotFound => {
                write!(f, "Could not determine configuration directory")
            }
            ConfigError::OpenError(path, err) => {
                write!(f, "Failed to open config file '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.logging.level, "info");
        assert!(config.transfer.remember_last_run);
        assert_eq!(config.transfer.copy_failure_policy, CopyFailurePolicy::Isolate);
        assert_eq!(config.camera_table().len(), 9);
        assert_eq!(config.transfer.naming(), NamingMode::Normalized);
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(&Config::generate_default_config()).unwrap();
        assert_eq!(config.camera_models, builtin_camera_models());
        assert_eq!(config.transfer.copy_failure_policy, CopyFailurePolicy::Isolate);
        assert!(!config.transfer.keep_original_name);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [transfer]
            keep_original_name = true
            copy_failure_policy = "abort"
            start_date = "2020-06-01"
            "#,
        )
        .unwrap();
        assert_eq!(config.transfer.naming(), NamingMode::KeepOriginal);
        assert_eq!(config.transfer.copy_failure_policy, CopyFailurePolicy::Abort);
        assert_eq!(
            config.transfer.start_date,
            NaiveDate::from_ymd_opt(2020, 6, 1)
        );
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.camera_models.len(), 9);
    }

    #[test]
    fn test_custom_camera_models_replace_builtin() {
        let config: Config = toml::from_str(
            r#"
            [[camera_models]]
            pattern = "Pixel 7"
            suffix = "P7"
            "#,
        )
        .unwrap();
        let table = config.camera_table();
        assert_eq!(table.len(), 1);
        assert_eq!(table.suffix_for(Some("Google Pixel 7")), "P7");
    }

    #[test]
    fn test_save_and_load_remembered_run() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2021, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 31).unwrap(),
        )
        .unwrap();

        let mut config = Config::default();
        config.transfer.remember(Path::new("/photos/in"), Path::new("/photos/out"), &range);
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert!(!loaded.transfer.keep_original_name);
        assert_eq!(loaded.transfer.end_date, NaiveDate::from_ymd_opt(2021, 3, 31));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[transfer\nnope").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }
}
