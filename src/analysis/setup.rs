//! One-shot recognizer setup
//!
//! Installs the language data if needed and initializes a recognizer on a
//! background thread. The ready session is handed to the worker over a
//! channel and the shared ready flag is raised; until then the worker skips
//! frames.

use anyhow::{Context, Result};
use crossbeam_channel::Sender;
use std::thread::JoinHandle;
use tracing::{error, info, warn};

use crate::config::RecognizerSettings;
use crate::shared::{SetupStatus, SharedRuntimeState};
use crate::storage::LanguageDataStore;
use crate::vision::{Recognizer, RecognizerSession};

/// Builds a fresh, uninitialized recognizer for each setup attempt
pub type RecognizerFactory = Box<dyn Fn() -> Box<dyn Recognizer> + Send>;

/// Install language data and initialize a recognizer, retrying up to
/// `settings.setup_attempts` times
pub fn run_setup(
    factory: &dyn Fn() -> Box<dyn Recognizer>,
    store: &LanguageDataStore,
    settings: &RecognizerSettings,
) -> Result<RecognizerSession> {
    let attempts = settings.setup_attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match setup_once(factory, store, settings) {
            Ok(session) => return Ok(session),
            Err(e) => {
                warn!("Recognizer setup attempt {}/{} failed: {:#}", attempt, attempts, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Recognizer setup was not attempted")))
}

fn setup_once(
    factory: &dyn Fn() -> Box<dyn Recognizer>,
    store: &LanguageDataStore,
    settings: &RecognizerSettings,
) -> Result<RecognizerSession> {
    let data_path = store
        .ensure_language(&settings.assets_dir, &settings.language)
        .context("Failed to install language data")?;

    let mut session = RecognizerSession::new(factory());
    session
        .initialize(&data_path, &settings.language)
        .context("Failed to initialize recognizer")?;
    Ok(session)
}

/// Run setup on its own thread. On success the session goes to `ready_tx`
/// and the runtime state switches to [`SetupStatus::Ready`].
pub fn spawn_setup(
    factory: RecognizerFactory,
    store: LanguageDataStore,
    settings: RecognizerSettings,
    state: SharedRuntimeState,
    ready_tx: Sender<RecognizerSession>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        info!("Recognizer setup starting ({})", settings.language);

        match run_setup(factory.as_ref(), &store, &settings) {
            Ok(session) => {
                // Fails only when the worker is already gone; the session
                // is dropped and shut down with the error
                if ready_tx.send(session).is_err() {
                    warn!("Analysis worker exited before the recognizer was ready");
                    return;
                }
                state.write().setup = SetupStatus::Ready;
                info!("Recognizer ready");
            }
            Err(e) => {
                error!("Recognizer setup failed: {:#}", e);
                state.write().setup = SetupStatus::Failed(format!("{:#}", e));
            }
        }
    })
}
