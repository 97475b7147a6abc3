use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeDelta, Utc};
use fridger_common::config::CameraConfig;
use fridger_common::frame::Frame;
use tracing::{debug, info};

use super::{prepare_image, CaptureError, FrameSource};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

/// Replays still images from a folder in file-name order.
///
/// Capture timestamps are synthetic: the first frame is stamped with the
/// time the source was opened and each following frame `replay_interval_ms`
/// later, so cooldown timing does not depend on decode speed.
pub struct DirectorySource {
    files: Vec<PathBuf>,
    next: usize,
    camera: CameraConfig,
    started_at: DateTime<Utc>,
}

impl DirectorySource {
    pub fn open(dir: &Path, camera: CameraConfig) -> Result<Self, CaptureError> {
        let entries =
            std::fs::read_dir(dir).map_err(|e| CaptureError::Io(dir.display().to_string(), e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| CaptureError::Io(dir.display().to_string(), e))?
                .path();
            if is_image(&path) {
                files.push(path);
            }
        }
        files.sort();

        info!(dir = %dir.display(), frames = files.len(), "replaying frames from directory");
        Ok(Self::from_files(files, camera, Utc::now()))
    }

    fn from_files(files: Vec<PathBuf>, camera: CameraConfig, started_at: DateTime<Utc>) -> Self {
        Self {
            files,
            next: 0,
            camera,
            started_at,
        }
    }

    fn timestamp(&self, index: usize) -> DateTime<Utc> {
        let offset_ms = self.camera.replay_interval_ms.saturating_mul(index as u64);
        self.started_at + TimeDelta::milliseconds(offset_ms.min(i64::MAX as u64) as i64)
    }
}

impl FrameSource for DirectorySource {
    async fn capture(&mut self) -> Result<Frame, CaptureError> {
        let index = self.next;
        let path = self.files.get(index).cloned().ok_or(CaptureError::Exhausted)?;
        self.next += 1;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CaptureError::Io(path.display().to_string(), e))?;
        let image = prepare_image(image::load_from_memory(&bytes)?, &self.camera);

        debug!(path = %path.display(), index, "replayed frame");
        Ok(Frame::new(image, self.timestamp(index)))
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn camera() -> CameraConfig {
        CameraConfig {
            mode: "directory".into(),
            url: None,
            directory: None,
            width: 4,
            height: 4,
            rotate: 0,
            timeout_secs: 1,
            replay_interval_ms: 250,
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("fridger-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn filters_image_extensions() {
        assert!(is_image(Path::new("a/frame_001.JPG")));
        assert!(is_image(Path::new("frame.png")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("no_extension")));
    }

    #[tokio::test]
    async fn replays_in_name_order_then_exhausts() {
        let dir = scratch_dir("replay");
        RgbImage::from_pixel(8, 8, Rgb([200, 200, 200]))
            .save(dir.join("b.png"))
            .unwrap();
        RgbImage::from_pixel(8, 8, Rgb([10, 10, 10]))
            .save(dir.join("a.png"))
            .unwrap();
        std::fs::write(dir.join("readme.txt"), "ignored").unwrap();

        let mut source = DirectorySource::open(&dir, camera()).unwrap();
        let first = source.capture().await.unwrap();
        let second = source.capture().await.unwrap();

        assert_eq!(first.image.dimensions(), (4, 4));
        assert_eq!(first.image.get_pixel(0, 0).0, [10, 10, 10]);
        assert_eq!(second.image.get_pixel(0, 0).0, [200, 200, 200]);
        assert_eq!(
            (second.captured_at - first.captured_at).num_milliseconds(),
            250
        );
        assert!(matches!(source.capture().await, Err(CaptureError::Exhausted)));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let missing = std::env::temp_dir().join("fridger-does-not-exist-7c1e");
        assert!(matches!(
            DirectorySource::open(&missing, camera()),
            Err(CaptureError::Io(..))
        ));
    }
}
