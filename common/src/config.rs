use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub slack: Option<SlackConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Snapshot endpoint returning one encoded image per GET (`http` mode).
    pub url: Option<String>,
    /// Folder of still images replayed in name order (`directory` mode).
    pub directory: Option<PathBuf>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Clockwise rotation in degrees, applied after resizing.
    #[serde(default = "default_rotate")]
    pub rotate: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_replay_interval_ms")]
    pub replay_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_brightness_threshold")]
    pub brightness_threshold: f64,
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_cooldown_delay_secs")]
    pub cooldown_delay_secs: f64,
    #[serde(default = "default_selection_rank")]
    pub selection_rank: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            brightness_threshold: default_brightness_threshold(),
            buffer_capacity: default_buffer_capacity(),
            cooldown_delay_secs: default_cooldown_delay_secs(),
            selection_rank: default_selection_rank(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_true")]
    pub enable_local_save: bool,
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    #[serde(default)]
    pub enable_remote_upload: bool,
    #[serde(default)]
    pub enable_preview: bool,
    #[serde(default = "default_preview_path")]
    pub preview_path: PathBuf,
    #[serde(default)]
    pub enable_histogram: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            enable_local_save: true,
            images_dir: default_images_dir(),
            enable_remote_upload: false,
            enable_preview: false,
            preview_path: default_preview_path(),
            enable_histogram: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    pub token: String,
    pub channel_id: String,
    #[serde(default = "default_slack_comment")]
    pub comment: String,
    #[serde(default = "default_slack_upload_url")]
    pub upload_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFile(path.display().to_string(), e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the detector cannot run with. The selection rank is
    /// not checked here; an out-of-range rank fails each selection attempt.
    fn validate(&self) -> Result<(), ConfigError> {
        let camera = &self.camera;
        match camera.mode.as_str() {
            "http" if camera.url.is_none() => {
                return Err(ConfigError::Invalid("camera.url is required in http mode".into()))
            }
            "directory" if camera.directory.is_none() => {
                return Err(ConfigError::Invalid(
                    "camera.directory is required in directory mode".into(),
                ))
            }
            "http" | "directory" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "unknown camera.mode '{other}', expected 'http' or 'directory'"
                )))
            }
        }
        if camera.width == 0 || camera.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "camera resolution must be non-zero, got {}x{}",
                camera.width, camera.height
            )));
        }
        if !matches!(camera.rotate, 0 | 90 | 180 | 270) {
            return Err(ConfigError::Invalid(format!(
                "camera.rotate must be 0, 90, 180 or 270, got {}",
                camera.rotate
            )));
        }
        if camera.timeout_secs == 0 {
            return Err(ConfigError::Invalid("camera.timeout_secs must be at least 1".into()));
        }
        if self.detector.buffer_capacity == 0 {
            return Err(ConfigError::Invalid("detector.buffer_capacity must be at least 1".into()));
        }
        if !(self.detector.cooldown_delay_secs >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "detector.cooldown_delay_secs must be >= 0, got {}",
                self.detector.cooldown_delay_secs
            )));
        }
        if self.output.enable_remote_upload && self.slack.is_none() {
            return Err(ConfigError::Invalid(
                "output.enable_remote_upload requires a [slack] section".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    ReadFile(String, std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// Default value functions
fn default_mode() -> String {
    "http".into()
}
fn default_width() -> u32 {
    320
}
fn default_height() -> u32 {
    240
}
fn default_rotate() -> u32 {
    270
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_replay_interval_ms() -> u64 {
    500
}
fn default_brightness_threshold() -> f64 {
    50.0
}
fn default_buffer_capacity() -> usize {
    30
}
fn default_cooldown_delay_secs() -> f64 {
    3.0
}
fn default_selection_rank() -> usize {
    2
}
fn default_true() -> bool {
    true
}
fn default_images_dir() -> PathBuf {
    PathBuf::from("images")
}
fn default_preview_path() -> PathBuf {
    PathBuf::from("preview.jpg")
}
fn default_slack_comment() -> String {
    "Here is what's in the fridge now.".into()
}
fn default_slack_upload_url() -> String {
    "https://slack.com/api/files.upload".into()
}
fn default_log_level() -> String {
    "info".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [camera]
        url = "http://fridge-cam.local:8080/frame"
    "#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.camera.mode, "http");
        assert_eq!((config.camera.width, config.camera.height), (320, 240));
        assert_eq!(config.camera.rotate, 270);
        assert_eq!(config.detector.buffer_capacity, 30);
        assert_eq!(config.detector.selection_rank, 2);
        assert!(config.output.enable_local_save);
        assert!(!config.output.enable_remote_upload);
        assert!(config.slack.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn full_config_parses() {
        let config = Config::from_toml(
            r#"
            [camera]
            mode = "directory"
            directory = "/var/lib/fridger/replay"
            width = 640
            height = 480
            rotate = 0

            [detector]
            brightness_threshold = 72.5
            buffer_capacity = 10
            cooldown_delay_secs = 1.5
            selection_rank = 3

            [output]
            enable_local_save = false
            enable_remote_upload = true
            enable_histogram = true

            [slack]
            token = "xoxb-test"
            channel_id = "C0123"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.camera.directory.as_deref(), Some(Path::new("/var/lib/fridger/replay")));
        assert_eq!(config.detector.brightness_threshold, 72.5);
        assert_eq!(config.detector.cooldown_delay_secs, 1.5);
        let slack = config.slack.unwrap();
        assert_eq!(slack.upload_url, "https://slack.com/api/files.upload");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn out_of_range_rank_is_accepted_at_load() {
        let config = Config::from_toml(
            r#"
            [camera]
            url = "http://cam/frame"
            [detector]
            buffer_capacity = 3
            selection_rank = 7
            "#,
        )
        .unwrap();
        assert_eq!(config.detector.selection_rank, 7);
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = Config::from_toml(
            r#"
            [camera]
            url = "http://cam/frame"
            [detector]
            buffer_capacity = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = Config::from_toml(
            r#"
            [camera]
            url = "http://cam/frame"
            timeout_secs = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn rejects_upload_without_slack_section() {
        let err = Config::from_toml(
            r#"
            [camera]
            url = "http://cam/frame"
            [output]
            enable_remote_upload = true
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("[slack]"));
    }

    #[test]
    fn rejects_odd_rotation_and_missing_source() {
        let bad_rotate = Config::from_toml(
            r#"
            [camera]
            url = "http://cam/frame"
            rotate = 45
            "#,
        );
        assert!(bad_rotate.is_err());

        let no_dir = Config::from_toml(
            r#"
            [camera]
            mode = "directory"
            "#,
        );
        assert!(no_dir.is_err());
    }

    #[test]
    fn parse_error_is_reported() {
        assert!(matches!(
            Config::from_toml("[camera"),
            Err(ConfigError::Parse(_))
        ));
    }
}
