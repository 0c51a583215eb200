//! Application Coordinator
//!
//! Wires the recognizer setup thread, the analysis worker and the display
//! channel together. The host pushes frames in with
//! [`submit_frame`](OcrApp::submit_frame) and reads recognized text from
//! [`display`](OcrApp::display).

use anyhow::Result;
use crossbeam_channel::{bounded, unbounded, Receiver};
use std::thread::JoinHandle;
use tracing::info;

use crate::analysis::{spawn_setup, AnalysisWorker, RecognizerFactory};
use crate::capture::frame::Frame;
use crate::capture::OfferOutcome;
use crate::config::AppConfig;
use crate::shared::{DisplayUpdate, RuntimeState, SetupStatus, SharedRuntimeState};
use crate::storage::LanguageDataStore;
use crate::vision::{ConfidenceGate, PipelineMode, VisionPipeline};

/// Main application coordinator
pub struct OcrApp {
    /// Runtime statistics shared with the background threads
    state: SharedRuntimeState,
    /// Channel the worker sends gated results on
    display_rx: Receiver<DisplayUpdate>,
    worker: Option<AnalysisWorker>,
    setup_handle: Option<JoinHandle<()>>,
}

impl OcrApp {
    /// Start with language data under the configured (or platform) data directory
    pub fn start(config: AppConfig, factory: RecognizerFactory) -> Result<Self> {
        let store = match &config.recognizer.data_dir {
            Some(root) => LanguageDataStore::with_root(root.clone()),
            None => LanguageDataStore::new()?,
        };
        Self::with_store(config, store, factory)
    }

    /// Start with an explicit language data store
    pub fn with_store(
        config: AppConfig,
        store: LanguageDataStore,
        factory: RecognizerFactory,
    ) -> Result<Self> {
        config.validate()?;

        let state = RuntimeState::shared();
        let (session_tx, session_rx) = bounded(1);
        let (display_tx, display_rx) = unbounded();

        let pipeline = VisionPipeline::new(
            config.pipeline.clone(),
            ConfidenceGate::new(config.recognizer.confidence_threshold),
        );
        let mode = pipeline.mode();

        let worker = AnalysisWorker::spawn(pipeline, session_rx, display_tx, state.clone());
        let setup_handle = spawn_setup(
            factory,
            store,
            config.recognizer.clone(),
            state.clone(),
            session_tx,
        );

        info!(
            "Live OCR started ({:?} path, confidence > {})",
            mode, config.recognizer.confidence_threshold
        );

        Ok(Self {
            state,
            display_rx,
            worker: Some(worker),
            setup_handle: Some(setup_handle),
        })
    }

    /// Hand a captured frame to the worker
    pub fn submit_frame(&self, frame: Frame) -> OfferOutcome {
        match &self.worker {
            Some(worker) => worker.submit(frame),
            None => OfferOutcome::Closed,
        }
    }

    /// Gated recognition results, in frame order
    pub fn display(&self) -> &Receiver<DisplayUpdate> {
        &self.display_rx
    }

    /// Whether the recognizer finished setup
    pub fn is_ready(&self) -> bool {
        self.state.read().is_ready()
    }

    pub fn setup_status(&self) -> SetupStatus {
        self.state.read().setup.clone()
    }

    /// Get current runtime state
    pub fn state(&self) -> SharedRuntimeState {
        self.state.clone()
    }

    /// Stop the worker and release the recognizer
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.shutdown();
        }
        // A setup still running finds the worker gone and drops its session
        if let Some(handle) = self.setup_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for OcrApp {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Name of the path a config selects, for status output
pub fn describe_mode(config: &AppConfig) -> &'static str {
    match PipelineMode::from_settings(&config.pipeline) {
        PipelineMode::Fast => "fast",
        PipelineMode::Accurate => "accurate",
    }
}
