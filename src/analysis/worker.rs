//! Analysis worker
//!
//! One dedicated thread takes the latest frame from the slot and runs it
//! through the vision pipeline. The worker owns the recognizer session, so
//! the recognizer is never touched from two threads. A failing or
//! panicking frame is logged and dropped and the worker moves on.

use crossbeam_channel::{Receiver, Sender};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::capture::frame::Frame;
use crate::capture::{LatestFrameSlot, OfferOutcome};
use crate::error::FrameError;
use crate::shared::{DisplayUpdate, SharedRuntimeState};
use crate::vision::{GateDecision, RecognizerSession, VisionPipeline};

/// Handle to the running worker thread
pub struct AnalysisWorker {
    slot: Arc<LatestFrameSlot>,
    state: SharedRuntimeState,
    handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    /// Start the worker. The recognizer session arrives later on `sessions`.
    pub fn spawn(
        pipeline: VisionPipeline,
        sessions: Receiver<RecognizerSession>,
        display: Sender<DisplayUpdate>,
        state: SharedRuntimeState,
    ) -> Self {
        let slot = Arc::new(LatestFrameSlot::new());

        let handle = {
            let slot = slot.clone();
            let state = state.clone();
            std::thread::spawn(move || {
                info!("Analysis worker starting ({:?} path)", pipeline.mode());
                run_loop(&pipeline, &slot, &sessions, &display, &state);
                info!("Analysis worker exiting");
            })
        };

        Self {
            slot,
            state,
            handle: Some(handle),
        }
    }

    /// Hand a frame to the worker, replacing any frame it has not picked up yet
    pub fn submit(&self, frame: Frame) -> OfferOutcome {
        let outcome = self.slot.offer(frame);

        let mut state = self.state.write();
        state.frames_received += 1;
        if outcome == OfferOutcome::Superseded {
            state.frames_superseded += 1;
        }
        outcome
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stop accepting frames, wait for the current one and release the recognizer
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.slot.close();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Analysis worker thread panicked");
            }
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    pipeline: &VisionPipeline,
    slot: &LatestFrameSlot,
    sessions: &Receiver<RecognizerSession>,
    display: &Sender<DisplayUpdate>,
    state: &SharedRuntimeState,
) {
    let mut session: Option<RecognizerSession> = None;

    while let Some(frame) = slot.take() {
        if session.is_none() {
            session = sessions.try_recv().ok();
        }

        let Some(active) = session.as_mut() else {
            drop(frame);
            let err = FrameError::RecognizerUninitialized;
            debug!("Skipping frame: {}", err);
            state.write().record_skipped(&err);
            continue;
        };

        let waited = frame.timestamp().elapsed();

        // The frame moves into the closure so it is released on unwind too
        let result = panic::catch_unwind(AssertUnwindSafe(|| pipeline.process(frame, active)));

        match result {
            Ok(Ok(outcome)) => {
                let confidence = outcome.decision.confidence();
                let forwarded = outcome.decision.passed();
                debug!(
                    "Frame done in {} ms (waited {:?}), confidence {}",
                    outcome.processing_time_ms, waited, confidence
                );
                state
                    .write()
                    .record_processed(confidence, forwarded, outcome.processing_time_ms);

                if let GateDecision::Forward(recognized) = outcome.decision {
                    let update = DisplayUpdate {
                        text: recognized.text,
                        confidence: recognized.confidence,
                    };
                    if display.send(update).is_err() {
                        debug!("Display receiver dropped, result discarded");
                    }
                } else {
                    debug!("Result suppressed at confidence {}", confidence);
                }
            }
            Ok(Err(e)) => {
                warn!("Frame skipped ({}): {}", e.kind(), e);
                state.write().record_skipped(&e);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!("Frame processing panicked: {}", message);
                state.write().record_failure("panic", message);
            }
        }
    }

    if let Some(session) = session.or_else(|| sessions.try_recv().ok()) {
        session.shutdown();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
