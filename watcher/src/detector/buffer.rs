use std::collections::VecDeque;

use fridger_common::frame::Frame;
use tracing::debug;

/// Fixed-capacity FIFO of frames captured while the door is open.
///
/// Pushing onto a full buffer evicts the oldest frame first, so the buffer
/// always holds the `capacity` most recent frames in capture order.
#[derive(Debug)]
pub struct FrameBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl FrameBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, frame: Frame) {
        if self.frames.len() >= self.capacity {
            if let Some(evicted) = self.frames.pop_front() {
                debug!(evicted_ts = evicted.captured_at_ms(), "buffer full, evicted oldest frame");
            }
        }
        self.frames.push_back(frame);
    }

    /// Remove and return the frame `rank` positions from the tail
    /// (`rank == 1` is the most recent). Every frame newer than the returned
    /// one is discarded.
    ///
    /// Valid ranks are `1..=capacity - 1`.
    pub fn pop_rank_from_latest(&mut self, rank: usize) -> Result<Frame, SelectionError> {
        if rank < 1 || rank > self.capacity.saturating_sub(1) {
            return Err(SelectionError::InvalidRank {
                rank,
                capacity: self.capacity,
            });
        }
        if self.frames.len() < rank {
            return Err(SelectionError::InsufficientFrames {
                rank,
                available: self.frames.len(),
            });
        }
        self.frames.truncate(self.frames.len() - (rank - 1));
        self.frames
            .pop_back()
            .ok_or(SelectionError::InsufficientFrames { rank, available: 0 })
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[allow(dead_code)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("invalid rank {rank}: must be between 1 and {max} for a buffer of {capacity}", max = .capacity.saturating_sub(1))]
    InvalidRank { rank: usize, capacity: usize },
    #[error("not enough buffered frames for rank {rank}: only {available} available")]
    InsufficientFrames { rank: usize, available: usize },
}
