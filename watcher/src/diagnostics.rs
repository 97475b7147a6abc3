use std::io::Cursor;
use std::path::{Path, PathBuf};

use fridger_common::config::OutputConfig;
use fridger_common::frame::Frame;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use tracing::{debug, warn};

const NUM_BINS: usize = 256;
const PREVIEW_QUALITY: u8 = 75;
const CHANNELS: [&str; 3] = ["r", "g", "b"];

/// Per-cycle preview and histogram output. Failures here are logged and
/// never reach the detector.
pub struct Diagnostics {
    preview_path: Option<PathBuf>,
    histogram: bool,
}

impl Diagnostics {
    pub fn from_config(output: &OutputConfig) -> Self {
        Self {
            preview_path: output.enable_preview.then(|| output.preview_path.clone()),
            histogram: output.enable_histogram,
        }
    }

    pub async fn inspect(&self, frame: &Frame) {
        if let Some(path) = &self.preview_path {
            if let Err(e) = write_preview(path, frame).await {
                warn!(path = %path.display(), error = %e, "failed to write preview");
            }
        }

        if self.histogram {
            for (name, hist) in CHANNELS.iter().zip(channel_histograms(&frame.image).iter()) {
                let (peak_bin, peak_count) = peak(hist);
                debug!(
                    channel = *name,
                    mean = format!("{:.2}", histogram_mean(hist)),
                    peak_bin,
                    peak_count,
                    "channel histogram"
                );
            }
        }
    }
}

async fn write_preview(path: &Path, frame: &Frame) -> Result<(), DiagnosticsError> {
    let mut jpeg = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut jpeg, PREVIEW_QUALITY).encode_image(&frame.image)?;
    tokio::fs::write(path, jpeg.into_inner()).await?;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
enum DiagnosticsError {
    #[error("failed to encode preview: {0}")]
    Encode(#[from] image::ImageError),
    #[error("failed to write preview: {0}")]
    Write(#[from] std::io::Error),
}

/// 256-bin histogram for each of the R, G and B channels.
pub fn channel_histograms(image: &RgbImage) -> [[u64; NUM_BINS]; 3] {
    let mut hists = [[0u64; NUM_BINS]; 3];
    for pixel in image.pixels() {
        for (c, &value) in pixel.0.iter().enumerate() {
            hists[c][value as usize] += 1;
        }
    }
    hists
}

fn histogram_mean(hist: &[u64; NUM_BINS]) -> f64 {
    let total: u64 = hist.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let weighted: u64 = hist.iter().enumerate().map(|(v, &n)| v as u64 * n).sum();
    weighted as f64 / total as f64
}

fn peak(hist: &[u64; NUM_BINS]) -> (usize, u64) {
    hist.iter()
        .enumerate()
        .max_by_key(|&(_, &n)| n)
        .map(|(bin, &n)| (bin, n))
        .unwrap_or((0, 0))
}
