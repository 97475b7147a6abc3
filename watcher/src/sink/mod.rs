pub mod local;
pub mod slack;

use std::io::Cursor;

use fridger_common::config::Config;
use fridger_common::frame::Frame;
use image::codecs::jpeg::JpegEncoder;
use tracing::{info, warn};

pub use local::LocalSaver;
pub use slack::SlackUploader;

const JPEG_QUALITY: u8 = 90;

/// Receives the frame chosen at the end of a cooldown. Called at most once
/// per cooldown cycle.
pub trait FrameSink {
    async fn on_frame_selected(&self, frame: &Frame) -> Result<(), SinkError>;
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to create directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    #[error("failed to encode JPEG: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write {0}: {1}")]
    Write(String, std::io::Error),
    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upload rejected: {0}")]
    Rejected(String),
}

/// Every downstream collaborator enabled in `[output]`.
pub struct Sinks {
    local: Option<LocalSaver>,
    slack: Option<SlackUploader>,
}

impl Sinks {
    pub fn from_config(config: &Config) -> Result<Self, SinkError> {
        let local = config
            .output
            .enable_local_save
            .then(|| LocalSaver::new(config.output.images_dir.clone()));
        let slack = match (&config.slack, config.output.enable_remote_upload) {
            (Some(slack), true) => Some(SlackUploader::new(slack.clone())?),
            _ => None,
        };
        info!(
            local_save = local.is_some(),
            remote_upload = slack.is_some(),
            "configured frame sinks"
        );
        Ok(Self { local, slack })
    }
}

impl FrameSink for Sinks {
    /// Runs each enabled sink even if an earlier one failed, and reports the
    /// first failure.
    async fn on_frame_selected(&self, frame: &Frame) -> Result<(), SinkError> {
        let mut first_error = None;

        if let Some(local) = &self.local {
            if let Err(e) = local.on_frame_selected(frame).await {
                warn!(error = %e, "local save failed");
                first_error.get_or_insert(e);
            }
        }
        if let Some(slack) = &self.slack {
            if let Err(e) = slack.on_frame_selected(frame).await {
                warn!(error = %e, "remote upload failed");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

pub fn encode_jpeg(frame: &Frame) -> Result<Vec<u8>, SinkError> {
    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&frame.image)?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::{Rgb, RgbImage};

    #[test]
    fn encodes_decodable_jpeg() {
        let frame = Frame::new(RgbImage::from_pixel(16, 8, Rgb([120, 130, 140])), Utc::now());
        let jpeg = encode_jpeg(&frame).unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn upload_only_built_when_enabled() {
        let config = Config::from_toml(
            r#"
            [camera]
            url = "http://cam/frame"
            [output]
            enable_local_save = false
            enable_remote_upload = false
            [slack]
            token = "xoxb-test"
            channel_id = "C0123"
            "#,
        )
        .unwrap();
        let sinks = Sinks::from_config(&config).unwrap();
        assert!(sinks.local.is_none());
        assert!(sinks.slack.is_none());
    }

    #[tokio::test]
    async fn no_sinks_is_ok() {
        let sinks = Sinks {
            local: None,
            slack: None,
        };
        let frame = Frame::new(RgbImage::new(1, 1), Utc::now());
        assert!(sinks.on_frame_selected(&frame).await.is_ok());
    }

    #[tokio::test]
    async fn failing_upload_does_not_skip_local_save() {
        let dir = std::env::temp_dir().join(format!("fridger-sinks-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let sinks = Sinks {
            local: Some(LocalSaver::new(dir.clone())),
            // Nothing listens on port 9 of localhost.
            slack: Some(
                SlackUploader::new(fridger_common::config::SlackConfig {
                    token: "xoxb-test".into(),
                    channel_id: "C0123".into(),
                    comment: "test".into(),
                    upload_url: "http://127.0.0.1:9/api/files.upload".into(),
                })
                .unwrap(),
            ),
        };
        let frame = Frame::new(RgbImage::from_pixel(4, 4, Rgb([1, 2, 3])), Utc::now());

        let result = sinks.on_frame_selected(&frame).await;
        assert!(matches!(result, Err(SinkError::Http(_))));
        assert!(dir.join(frame.snapshot_file_name()).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
