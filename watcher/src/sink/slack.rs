use std::time::Duration;

use fridger_common::config::SlackConfig;
use fridger_common::frame::Frame;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{encode_jpeg, FrameSink, SinkError};

#[derive(Debug, Deserialize)]
struct UploadResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts selected frames to a Slack channel through `files.upload`.
pub struct SlackUploader {
    client: reqwest::Client,
    config: SlackConfig,
}

impl SlackUploader {
    pub fn new(config: SlackConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }
}

impl FrameSink for SlackUploader {
    async fn on_frame_selected(&self, frame: &Frame) -> Result<(), SinkError> {
        let title = frame.snapshot_file_name();
        let jpeg = encode_jpeg(frame)?;
        let size = jpeg.len();

        let part = Part::bytes(jpeg)
            .file_name(title.clone())
            .mime_str("image/jpeg")?;
        let form = Form::new().part("file", part);

        debug!(title, size, url = self.config.upload_url, "uploading selected frame");
        let resp = self
            .client
            .post(&self.config.upload_url)
            .query(&[
                ("token", self.config.token.as_str()),
                ("channels", self.config.channel_id.as_str()),
                ("initial_comment", self.config.comment.as_str()),
                ("title", title.as_str()),
            ])
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        match serde_json::from_str::<UploadResponse>(&body) {
            Ok(parsed) if parsed.ok => {
                info!(title, size, "posted selected frame to Slack");
                Ok(())
            }
            Ok(parsed) => {
                warn!(title, status = status.as_u16(), body, "Slack rejected upload");
                Err(SinkError::Rejected(
                    parsed.error.unwrap_or_else(|| "unknown error".into()),
                ))
            }
            Err(e) => {
                warn!(title, status = status.as_u16(), body, "unexpected Slack response");
                Err(SinkError::Rejected(format!("HTTP {status}: {e}")))
            }
        }
    }
}
