//! Configuration file handling for car-scanner.
//!
//! Loads configuration from `<config dir>/car-scanner/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::camera::{CaptureConstraints, FacingMode, Resolution};
use crate::payload::{ImageCodec, DEFAULT_JPEG_QUALITY, DEFAULT_MAX_DIMENSION};
use crate::recognition::{API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::scan::ScanSettings;

/// Written by `config init`. Must parse to `Config::default()`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# car-scanner configuration

[camera]
# Camera device index (see `car-scanner list-cameras`)
device = 0
# "environment" (rear) or "user" (front)
facing = "environment"
# Requested resolution; the device may pick the closest it supports
width = 1920
height = 1080
fps = 30
# Mirror horizontally
mirror = false
# Serve this still image instead of a real camera
# replay = "/path/to/car.jpg"

[codec]
# JPEG quality for everything sent to the service (1-100)
jpeg_quality = 80
# Longest edge after downscaling
max_dimension = 1920

[recognition]
base_url = "http://127.0.0.1:8080"
# Environment variable holding the API key
api_key_env = "CAR_SCANNER_API_KEY"
timeout_secs = 10
# Answer with a canned result instead of calling the service
mock = false
"#;

/// Configuration file structure for car-scanner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub codec: CodecConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub device: u32,
    pub facing: FacingMode,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub mirror: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replay: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        let constraints = CaptureConstraints::default();
        Self {
            device: constraints.device_index,
            facing: constraints.facing,
            width: constraints.resolution.width,
            height: constraints.resolution.height,
            fps: constraints.fps,
            mirror: constraints.mirror,
            replay: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub jpeg_quality: u8,
    pub max_dimension: u32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    pub base_url: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub mock: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: API_KEY_ENV.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            mock: false,
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// An explicit path must exist. Without one, the default location is
    /// tried and a missing file yields the defaults. Either way the result
    /// is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                Self::read(path)?
            }
            None => {
                let path = default_path();
                if path.exists() {
                    Self::read(&path)?
                } else {
                    log::debug!("no config at {}, using defaults", path.display());
                    Config::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.codec.jpeg_quality) {
            return Err(ConfigError::invalid(
                "codec.jpeg_quality",
                format!("must be between 1 and 100, got {}", self.codec.jpeg_quality),
            ));
        }
        if self.codec.max_dimension == 0 {
            return Err(ConfigError::invalid("codec.max_dimension", "must be greater than 0"));
        }
        if self.recognition.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "recognition.timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.recognition.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("recognition.base_url", "must not be empty"));
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(ConfigError::invalid(
                "camera.width/height",
                "resolution must be greater than 0",
            ));
        }
        if self.camera.fps == 0 {
            return Err(ConfigError::invalid("camera.fps", "must be greater than 0"));
        }
        Ok(())
    }

    pub fn constraints(&self) -> CaptureConstraints {
        CaptureConstraints {
            device_index: self.camera.device,
            facing: self.camera.facing,
            resolution: Resolution {
                width: self.camera.width,
                height: self.camera.height,
            },
            fps: self.camera.fps,
            mirror: self.camera.mirror,
        }
    }

    pub fn codec(&self) -> ImageCodec {
        ImageCodec::new(self.codec.jpeg_quality, self.codec.max_dimension)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.recognition.timeout_secs)
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            constraints: self.constraints(),
            timeout: self.timeout(),
        }
    }

    /// Effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::SerializeError)
    }
}

/// Write the default config file to `path`, creating parent directories.
/// Refuses to overwrite an existing file.
pub fn init(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Err(ConfigError::AlreadyExists(path.to_path_buf()));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    std::fs::write(path, DEFAULT_CONFIG_TOML).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    SerializeError(toml::ser::Error),
    NotFound(PathBuf),
    AlreadyExists(PathBuf),
    Invalid {
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to access config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::SerializeError(source) => {
                write!(f, "Failed to serialize config: {}", source)
            }
            ConfigError::NotFound(path) => {
                write!(f, "Config file not found: {}", path.display())
            }
            ConfigError::AlreadyExists(path) => {
                write!(f, "Config file already exists: {}", path.display())
            }
            ConfigError::Invalid { field, reason } => {
                write!(f, "Invalid config value for {}: {}", field, reason)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::SerializeError(source) => Some(source),
            _ => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("car-scanner")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_template_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.codec.jpeg_quality, 80);
        assert_eq!(config.codec.max_dimension, 1920);
        assert_eq!(config.recognition.timeout_secs, 10);
        assert_eq!(config.recognition.api_key_env, "CAR_SCANNER_API_KEY");
        assert_eq!(config.camera.facing, FacingMode::Environment);
        assert!(!config.recognition.mock);
        assert!(config.camera.replay.is_none());
    }

    #[test]
    fn test_load_partial_file() {
        let file = write_config(
            r#"
[camera]
facing = "user"
mirror = true

[recognition]
mock = true
"#,
        );
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.camera.facing, FacingMode::User);
        assert!(config.camera.mirror);
        assert_eq!(config.camera.width, 1920);
        assert!(config.recognition.mock);
        assert_eq!(config.codec, CodecConfig::default());
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing)).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_malformed_file() {
        let file = write_config("[codec\njpeg_quality = ");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().starts_with("Failed to parse config file"));
    }

    #[test]
    fn test_validate_quality_range() {
        let file = write_config("[codec]\njpeg_quality = 0\n");
        let err = Config::load(Some(file.path())).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "codec.jpeg_quality",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.recognition.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_zero_fps() {
        let mut config = Config::default();
        config.camera.fps = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid config value for camera.fps: must be greater than 0"
        );
    }

    #[test]
    fn test_scan_settings_from_config() {
        let mut config = Config::default();
        config.camera.device = 2;
        config.camera.width = 1280;
        config.camera.height = 720;
        config.recognition.timeout_secs = 4;

        let settings = config.scan_settings();
        assert_eq!(settings.constraints.device_index, 2);
        assert_eq!(settings.constraints.resolution, Resolution::HD);
        assert_eq!(settings.timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_to_toml_round_trips() {
        let mut config = Config::default();
        config.camera.replay = Some(PathBuf::from("/tmp/car.jpg"));
        let text = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), DEFAULT_CONFIG_TOML);

        let err = init(&path).unwrap_err();
        assert!(matches!(err, ConfigError::AlreadyExists(_)));
    }

    #[test]
    fn test_default_path_ends_with_app_dir() {
        let path = default_path();
        assert!(path.ends_with("car-scanner/config.toml"));
    }
}
