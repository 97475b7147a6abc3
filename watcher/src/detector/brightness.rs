use image::RgbImage;

/// Door state inferred from a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Open,
    Closed,
}

impl DoorState {
    pub fn is_open(self) -> bool {
        self == DoorState::Open
    }
}

/// Fixed-threshold brightness classifier.
///
/// A frame is `Open` iff its mean sample value is strictly greater than the
/// threshold. There is no hysteresis: a scene hovering around the threshold
/// flips state from one frame to the next.
#[derive(Debug, Clone, Copy)]
pub struct BrightnessClassifier {
    threshold: f64,
}

impl BrightnessClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    #[allow(dead_code)]
    pub fn classify(&self, image: &RgbImage) -> DoorState {
        self.classify_mean(mean_brightness(image))
    }

    pub fn classify_mean(&self, mean: f64) -> DoorState {
        if mean > self.threshold {
            DoorState::Open
        } else {
            DoorState::Closed
        }
    }
}

/// Mean over every color sample of the image (all channels of all pixels).
/// An empty image has mean 0.
pub fn mean_brightness(image: &RgbImage) -> f64 {
    let samples = image.as_raw();
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples.iter().map(|&s| s as u64).sum();
    sum as f64 / samples.len() as f64
}
