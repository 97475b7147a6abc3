pub mod directory;
pub mod http;

use fridger_common::config::CameraConfig;
use fridger_common::frame::Frame;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};

pub use directory::DirectorySource;
pub use http::HttpSnapshotSource;

/// Produces one frame per call. A call may take as long as the camera
/// needs; the control loop waits for it.
pub trait FrameSource {
    async fn capture(&mut self) -> Result<Frame, CaptureError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("camera request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("camera returned HTTP status {0}")]
    HttpStatus(u16),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to read {0}: {1}")]
    Io(String, std::io::Error),
    #[error("no more frames to replay")]
    Exhausted,
}

/// The source selected by `camera.mode`.
pub enum CameraSource {
    Http(HttpSnapshotSource),
    Directory(DirectorySource),
}

impl CameraSource {
    pub fn from_config(camera: &CameraConfig) -> Result<Self, CaptureError> {
        match (camera.mode.as_str(), &camera.url, &camera.directory) {
            ("directory", _, Some(dir)) => {
                Ok(Self::Directory(DirectorySource::open(dir, camera.clone())?))
            }
            (_, Some(url), _) => Ok(Self::Http(HttpSnapshotSource::new(url, camera.clone())?)),
            _ => Err(CaptureError::Io(
                camera.mode.clone(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no camera url or directory"),
            )),
        }
    }
}

impl FrameSource for CameraSource {
    async fn capture(&mut self) -> Result<Frame, CaptureError> {
        match self {
            Self::Http(source) => source.capture().await,
            Self::Directory(source) => source.capture().await,
        }
    }
}

/// Resize to the configured capture resolution, then rotate clockwise.
pub fn prepare_image(image: DynamicImage, camera: &CameraConfig) -> RgbImage {
    let resized = if image.width() == camera.width && image.height() == camera.height {
        image
    } else {
        image.resize_exact(camera.width, camera.height, FilterType::Triangle)
    };
    let rotated = match camera.rotate {
        90 => resized.rotate90(),
        180 => resized.rotate180(),
        270 => resized.rotate270(),
        _ => resized,
    };
    rotated.to_rgb8()
}
