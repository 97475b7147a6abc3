use chrono::{DateTime, Local, Utc};
use image::RgbImage;

/// A decoded camera frame with its capture timestamp.
///
/// Frames are never mutated after capture. Ownership moves from the source
/// into the detector's buffer and, if chosen, out to the sinks.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(image: RgbImage, captured_at: DateTime<Utc>) -> Self {
        Self { image, captured_at }
    }

    pub fn captured_at_ms(&self) -> i64 {
        self.captured_at.timestamp_millis()
    }

    /// File name for an archived snapshot, in local time with microseconds.
    /// e.g. "fridger_2026-02-18-09-30-00_123456.jpg"
    pub fn snapshot_file_name(&self) -> String {
        let local = self.captured_at.with_timezone(&Local);
        format!("fridger_{}.jpg", local.format("%Y-%m-%d-%H-%M-%S_%6f"))
    }
}
