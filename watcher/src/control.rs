use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fridger_common::config::DetectorConfig;
use tracing::{debug, info, warn};

use crate::detector::DoorStateMachine;
use crate::diagnostics::Diagnostics;
use crate::sink::FrameSink;
use crate::source::{CaptureError, FrameSource};

/// Cooperative stop request shared between the signal handler and the loop.
///
/// Setting it never interrupts a capture or a selection in progress; the
/// loop notices it before starting the next iteration.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        if !self.0.swap(true, Ordering::Relaxed) {
            info!("stop requested");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub selections: u64,
    pub downstream_failures: u64,
}

/// One iteration per captured frame until `stop` is set or capture fails.
///
/// Detector state lives only for the duration of this call.
pub async fn run_control_loop<S, K>(
    source: &mut S,
    sink: &K,
    diagnostics: &Diagnostics,
    detector_config: &DetectorConfig,
    stop: &StopFlag,
) -> Result<LoopStats, CaptureError>
where
    S: FrameSource,
    K: FrameSink,
{
    let mut state_machine = DoorStateMachine::new(detector_config);
    let mut stats = LoopStats::default();

    while !stop.is_stopped() {
        let frame = source.capture().await?;
        stats.frames += 1;

        diagnostics.inspect(&frame).await;

        let outcome = state_machine.observe(frame);
        if let Some(transition) = outcome.transition {
            debug!(
                ?transition,
                brightness = format!("{:.2}", outcome.brightness),
                door_open = outcome.door.is_open(),
                buffered = state_machine.buffered(),
                "door transition"
            );
        }
        if let Some(selected) = outcome.selected {
            stats.selections += 1;
            if let Err(e) = sink.on_frame_selected(&selected).await {
                stats.downstream_failures += 1;
                warn!(error = %e, ts = selected.captured_at_ms(), "downstream failed for selected frame");
            }
        }

        if stats.frames % 100 == 0 {
            debug!(
                frames = stats.frames,
                selections = stats.selections,
                buffered = state_machine.buffered(),
                door_open = state_machine.door().is_open(),
                cooling_down = state_machine.closed_at().is_some(),
                "frames processed"
            );
        }
    }

    info!(
        frames = stats.frames,
        selections = stats.selections,
        downstream_failures = stats.downstream_failures,
        "control loop stopped"
    );
    Ok(stats)
}
