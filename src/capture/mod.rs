//! Frame Source Layer
//!
//! The camera itself lives outside this crate. The frame source pushes
//! frames into a [`LatestFrameSlot`], which implements keep-only-latest
//! backpressure: a frame that arrives while the worker is busy replaces
//! the undelivered one, and the replaced frame is released immediately.

pub mod frame;

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use self::frame::Frame;

/// Result of offering a frame to the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// The slot was empty, the frame is waiting for the worker
    Accepted,
    /// An undelivered frame was dropped in favour of this one
    Superseded,
    /// The slot is closed, the frame was released without processing
    Closed,
}

#[derive(Default)]
struct SlotState {
    frame: Option<Frame>,
    closed: bool,
}

/// Single-slot hand-off between the frame source and the analysis worker
#[derive(Default)]
pub struct LatestFrameSlot {
    state: Mutex<SlotState>,
    available: Condvar,
}

impl LatestFrameSlot {
    /// Create an empty, open slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a frame from the frame source
    pub fn offer(&self, frame: Frame) -> OfferOutcome {
        let (outcome, dropped) = {
            let mut state = self.state.lock();
            if state.closed {
                (OfferOutcome::Closed, Some(frame))
            } else {
                match state.frame.replace(frame) {
                    Some(previous) => (OfferOutcome::Superseded, Some(previous)),
                    None => (OfferOutcome::Accepted, None),
                }
            }
        };
        self.available.notify_one();

        // Released outside the lock so a release hook may call back into the source
        if let Some(frame) = dropped {
            trace!("Releasing frame {:?} without analysis", frame.dimensions());
            drop(frame);
        }

        outcome
    }

    /// Block until a frame is available. Returns `None` once the slot is
    /// closed and drained.
    pub fn take(&self) -> Option<Frame> {
        let mut state = self.state.lock();
        loop {
            if let Some(frame) = state.frame.take() {
                return Some(frame);
            }
            if state.closed {
                return None;
            }
            self.available.wait(&mut state);
        }
    }

    /// Non-blocking variant of [`take`](Self::take)
    pub fn try_take(&self) -> Option<Frame> {
        self.state.lock().frame.take()
    }

    /// Close the slot; any pending frame is released and the worker wakes up
    pub fn close(&self) {
        let pending = {
            let mut state = self.state.lock();
            state.closed = true;
            state.frame.take()
        };
        self.available.notify_all();
        drop(pending);
    }
}
