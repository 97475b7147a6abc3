use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use fridger_common::config::DetectorConfig;
use fridger_common::frame::Frame;
use tracing::{debug, info, warn};

use super::brightness::{mean_brightness, BrightnessClassifier, DoorState};
use super::buffer::FrameBuffer;

/// Door edge observed in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Opened,
    Closed,
}

/// Result of feeding one frame to the state machine.
#[derive(Debug)]
pub struct CycleOutcome {
    pub brightness: f64,
    pub door: DoorState,
    pub transition: Option<Transition>,
    /// Set when the cooldown fired this cycle and a frame could be picked.
    pub selected: Option<Frame>,
}

/// Door detection, open-interval buffering and post-close selection.
///
/// The conceptual states are derived from `door` and `closed_at`:
/// - accumulating: door open, every frame goes into the buffer
/// - idle: door closed and no pending close
/// - cooling down: `closed_at` is set, whatever the door is doing now
///
/// The cooldown is armed on every Open→Closed edge and is not cancelled by a
/// reopen; it fires relative to the close that armed it. Firing always
/// empties the buffer, whether or not a frame could be selected.
pub struct DoorStateMachine {
    classifier: BrightnessClassifier,
    buffer: FrameBuffer,
    door: DoorState,
    closed_at: Option<DateTime<Utc>>,
    cooldown_delay_secs: f64,
    selection_rank: usize,
}

impl DoorStateMachine {
    pub fn new(config: &DetectorConfig) -> Self {
        Self {
            classifier: BrightnessClassifier::new(config.brightness_threshold),
            buffer: FrameBuffer::new(config.buffer_capacity),
            door: DoorState::Closed,
            closed_at: None,
            cooldown_delay_secs: config.cooldown_delay_secs,
            selection_rank: config.selection_rank,
        }
    }

    /// Process one captured frame. This is the only entry point that
    /// mutates detector state.
    pub fn observe(&mut self, frame: Frame) -> CycleOutcome {
        let now = frame.captured_at;
        let previous = self.door;
        let brightness = mean_brightness(&frame.image);
        let door = self.classifier.classify_mean(brightness);
        self.door = door;

        debug!(
            brightness = format!("{:.2}", brightness),
            threshold = self.classifier.threshold(),
            open = door.is_open(),
            ts = frame.captured_at_ms(),
            "classified frame"
        );

        let mut transition = None;
        if door == DoorState::Open && previous == DoorState::Closed {
            info!(brightness, ts = frame.captured_at_ms(), "door opened");
            transition = Some(Transition::Opened);
        }

        if door.is_open() {
            self.buffer.push(frame);
        }

        if door == DoorState::Closed && previous == DoorState::Open {
            info!(
                brightness,
                buffered = self.buffer.len(),
                "door closed, cooldown armed"
            );
            self.closed_at = Some(now);
            transition = Some(Transition::Closed);
        }

        let selected = match self.closed_at {
            Some(closed_at) if elapsed_secs(closed_at, now) > self.cooldown_delay_secs => {
                self.closed_at = None;
                self.select(closed_at)
            }
            _ => None,
        };

        CycleOutcome {
            brightness,
            door,
            transition,
            selected,
        }
    }

    fn select(&mut self, closed_at: DateTime<Utc>) -> Option<Frame> {
        let rank = self.selection_rank;
        let mut buffer = ClearOnDrop(&mut self.buffer);
        let buffered = buffer.len();

        match buffer.pop_rank_from_latest(rank) {
            Ok(frame) => {
                info!(
                    rank,
                    buffered,
                    closed_at_ms = closed_at.timestamp_millis(),
                    selected_ts = frame.captured_at_ms(),
                    "cooldown elapsed, selected frame"
                );
                Some(frame)
            }
            Err(e) => {
                warn!(error = %e, rank, buffered, "cooldown elapsed, no frame selected");
                None
            }
        }
    }

    pub fn door(&self) -> DoorState {
        self.door
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Clears the wrapped buffer when dropped, on every exit path of a
/// selection attempt.
struct ClearOnDrop<'a>(&'a mut FrameBuffer);

impl Deref for ClearOnDrop<'_> {
    type Target = FrameBuffer;

    fn deref(&self) -> &FrameBuffer {
        &*self.0
    }
}

impl DerefMut for ClearOnDrop<'_> {
    fn deref_mut(&mut self) -> &mut FrameBuffer {
        &mut *self.0
    }
}

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.clear();
        debug!("cleared frame buffer");
    }
}

fn elapsed_secs(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let delta = to - from;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_milliseconds() as f64 / 1_000.0,
    }
}
