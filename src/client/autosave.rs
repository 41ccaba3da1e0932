use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::agent_state::AgentState;
use super::error::ClientError;
use super::platform::LocalStorage;

pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(5);

pub const CONTENT_KEY: &str = "notepad_content";
pub const FILENAME_KEY: &str = "notepad_filename";
pub const DOCUMENT_ID_KEY: &str = "notepad_document_id";

/// Persist the buffer if it has unsaved changes. Returns whether anything
/// was written.
pub fn autosave_once(state: &AgentState, storage: &dyn LocalStorage) -> Result<bool, ClientError> {
    let document = state.document();
    if document.saved {
        return Ok(false);
    }
    storage.set(CONTENT_KEY, &document.content)?;
    storage.set(FILENAME_KEY, &document.filename)?;
    // An unbound buffer must not be rejoined to whatever was shared before
    match state.document_id() {
        Some(document_id) => storage.set(DOCUMENT_ID_KEY, &document_id.to_string())?,
        None => storage.remove(DOCUMENT_ID_KEY)?,
    }
    Ok(true)
}

/// Load the last auto-saved buffer into `state`
pub fn restore(state: &mut AgentState, storage: &dyn LocalStorage) -> Result<(), ClientError> {
    let content = storage.get(CONTENT_KEY)?;
    let filename = storage.get(FILENAME_KEY)?;
    let document_id = storage.get(DOCUMENT_ID_KEY)?.and_then(|raw| match raw.trim().parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("Ignoring stored document id {:?}", raw);
            None
        }
    });
    state.restore(content, filename, document_id);
    Ok(())
}

/// Run `autosave_once` every `interval` until the handle is aborted
pub fn spawn_autosave(
    state: Arc<Mutex<AgentState>>,
    storage: Arc<dyn LocalStorage>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let state = state.lock().await;
            match autosave_once(&state, storage.as_ref()) {
                Ok(true) => debug!("Auto-saved {}", state.document().filename),
                Ok(false) => {}
                Err(e) => warn!("Auto-save failed: {}", e),
            }
        }
    })
}
