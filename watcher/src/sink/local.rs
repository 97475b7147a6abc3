use std::path::PathBuf;

use fridger_common::frame::Frame;
use tracing::info;

use super::{encode_jpeg, FrameSink, SinkError};

/// Writes selected frames as JPEG files into a local directory, creating it
/// on first use.
pub struct LocalSaver {
    dir: PathBuf,
}

impl LocalSaver {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl FrameSink for LocalSaver {
    async fn on_frame_selected(&self, frame: &Frame) -> Result<(), SinkError> {
        if !tokio::fs::try_exists(&self.dir).await.unwrap_or(false) {
            tokio::fs::create_dir_all(&self.dir)
                .await
                .map_err(|e| SinkError::CreateDir(self.dir.display().to_string(), e))?;
            info!(dir = %self.dir.display(), "created images directory");
        }

        let path = self.dir.join(frame.snapshot_file_name());
        let jpeg = encode_jpeg(frame)?;
        let size = jpeg.len();
        tokio::fs::write(&path, jpeg)
            .await
            .map_err(|e| SinkError::Write(path.display().to_string(), e))?;

        info!(path = %path.display(), size, "saved selected frame");
        Ok(())
    }
}
