use std::time::Duration;

use chrono::Utc;
use fridger_common::config::CameraConfig;
use fridger_common::frame::Frame;
use tracing::debug;

use super::{prepare_image, CaptureError, FrameSource};

/// Fetches a single encoded still per capture from a camera snapshot
/// endpoint (e.g. `http://fridge-cam.local:8080/frame`).
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
    camera: CameraConfig,
    seq: u64,
}

impl HttpSnapshotSource {
    pub fn new(url: &str, camera: CameraConfig) -> Result<Self, CaptureError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(camera.timeout_secs))
            .timeout(Duration::from_secs(camera.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            camera,
            seq: 0,
        })
    }
}

impl FrameSource for HttpSnapshotSource {
    async fn capture(&mut self) -> Result<Frame, CaptureError> {
        let resp = self.client.get(&self.url).send().await?;
        if !resp.status().is_success() {
            return Err(CaptureError::HttpStatus(resp.status().as_u16()));
        }
        let body = resp.bytes().await?;
        let captured_at = Utc::now();

        let decoded = image::load_from_memory(&body)?;
        let image = prepare_image(decoded, &self.camera);

        self.seq += 1;
        debug!(
            seq = self.seq,
            bytes = body.len(),
            width = image.width(),
            height = image.height(),
            "captured frame"
        );
        Ok(Frame::new(image, captured_at))
    }
}
