use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::agent_state::{AgentEvent, AgentState, ConnectionState};
use super::autosave::{self, spawn_autosave};
use super::editor::{EditorDocument, DEFAULT_FILENAME};
use super::error::ClientError;
use super::identity::Participant;
use super::platform::{FsTextFiles, LocalStorage, TextFiles};
use super::roster::PresenceEntry;
use crate::clients::DocsApiClient;
use crate::models::{Cursor, Document, NewDocument, ReceivedMessage, SendMessage};

/// Client side of the relay: one WebSocket connection, an optimistic local
/// buffer and the roster of other participants.
///
/// Inbound frames are applied by a background reader task; observers follow
/// along through [`SyncAgent::subscribe`]. A dropped connection is not
/// retried; call [`SyncAgent::reconnect`].
pub struct SyncAgent {
    url: String,
    state: Arc<Mutex<AgentState>>,
    /// Bumped per connection so a stale reader cannot close a newer one
    epoch: Arc<AtomicU64>,
    outgoing: Option<mpsc::UnboundedSender<String>>,
    reader: Option<JoinHandle<()>>,
    autosave: Option<JoinHandle<()>>,
    events: broadcast::Sender<AgentEvent>,
    storage: Option<Arc<dyn LocalStorage>>,
    files: Arc<dyn TextFiles>,
    api: Option<DocsApiClient>,
}

impl SyncAgent {
    /// `url` is the relay's WebSocket endpoint, e.g. `ws://localhost:3000/ws`
    pub fn new(url: impl Into<String>, identity: Participant) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            url: url.into(),
            state: Arc::new(Mutex::new(AgentState::new(identity))),
            epoch: Arc::new(AtomicU64::new(0)),
            outgoing: None,
            reader: None,
            autosave: None,
            events,
            storage: None,
            files: Arc::new(FsTextFiles),
            api: None,
        }
    }

    /// Use `storage` for auto-save and restore whatever it already holds
    pub async fn with_storage(mut self, storage: Arc<dyn LocalStorage>) -> Result<Self, ClientError> {
        autosave::restore(&mut *self.state.lock().await, storage.as_ref())?;
        self.storage = Some(storage);
        Ok(self)
    }

    pub fn with_api(mut self, api: DocsApiClient) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_files(mut self, files: Arc<dyn TextFiles>) -> Self {
        self.files = files;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    /// Open the connection. A restored or previously bound document is
    /// joined as soon as the socket is up.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        let shared = self.state.clone();
        let mine = {
            let mut state = shared.lock().await;
            state.on_connecting();
            self.epoch.fetch_add(1, Ordering::SeqCst) + 1
        };

        let ws_stream = match connect_async(self.url.as_str()).await {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                let mut state = shared.lock().await;
                if self.epoch.load(Ordering::SeqCst) == mine {
                    state.on_closed();
                }
                warn!("Failed to connect to {}: {}", self.url, e);
                return Err(e.into());
            }
        };
        info!("Connected to {}", self.url);

        let (mut writer, mut reader) = ws_stream.split();

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
        tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                if let Err(e) = writer.send(Message::text(frame)).await {
                    debug!("WebSocket write failed: {}", e);
                    return;
                }
            }
            // Sender dropped: the agent closed or reconnected
            let _ = writer.send(Message::Close(None)).await;
        });

        self.outgoing = Some(out_tx);

        // Open before the reader exists, so a socket that dies at once ends Closed
        let result = {
            let mut state = shared.lock().await;
            let join = state.on_open();
            let _ = self.events.send(AgentEvent::Connected);
            match join {
                Some(join) => self.push(join),
                None => Ok(()),
            }
        };

        let reader_state = shared.clone();
        let events = self.events.clone();
        let epoch = self.epoch.clone();
        let reader_task = tokio::spawn(async move {
            while let Some(incoming) = reader.next().await {
                match incoming {
                    Ok(Message::Text(text)) => {
                        let msg: SendMessage = match serde_json::from_str(text.as_str()) {
                            Ok(msg) => msg,
                            Err(e) => {
                                warn!("Ignoring unreadable frame: {}", e);
                                continue;
                            }
                        };
                        let event = reader_state.lock().await.apply(msg);
                        if let Some(event) = event {
                            let _ = events.send(event);
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("WebSocket read error: {}", e);
                        break;
                    }
                }
            }

            let mut state = reader_state.lock().await;
            if epoch.load(Ordering::SeqCst) == mine {
                state.on_closed();
                let _ = events.send(AgentEvent::Disconnected);
                info!("Connection closed");
            }
        });

        if let Some(previous) = self.reader.replace(reader_task) {
            previous.abort();
        }
        result
    }

    /// Drop the current connection, open a new one and rejoin the bound
    /// document
    pub async fn reconnect(&mut self) -> Result<(), ClientError> {
        self.close().await;
        self.connect().await
    }

    /// Close the connection. Local state and the binding are kept.
    pub async fn close(&mut self) {
        let shared = self.state.clone();
        let mut state = shared.lock().await;
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.outgoing = None;
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if state.connection() != ConnectionState::Closed {
            state.on_closed();
            let _ = self.events.send(AgentEvent::Disconnected);
        }
    }

    pub async fn connection_state(&self) -> ConnectionState {
        self.state.lock().await.connection()
    }

    pub async fn is_connected(&self) -> bool {
        self.state.lock().await.is_connected()
    }

    /// Bind to an existing document id and join it when connected
    pub async fn open_document(&self, document_id: i64) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        if let Some(join) = state.bind(document_id) {
            self.push(join)?;
        }
        Ok(())
    }

    /// Create a document through the HTTP API, then bind and join it
    pub async fn create_document(
        &self,
        filename: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<Document, ClientError> {
        let api = self.api.as_ref().ok_or(ClientError::NoApi)?;
        let document = api
            .create(&NewDocument {
                filename: filename.into(),
                content: content.into(),
                last_modified: Utc::now().to_rfc3339(),
            })
            .await?;
        info!("Created document {} ({})", document.id, document.filename);
        self.open_document(document.id).await?;
        Ok(document)
    }

    pub async fn list_documents(&self) -> Result<Vec<Document>, ClientError> {
        let api = self.api.as_ref().ok_or(ClientError::NoApi)?;
        api.list().await
    }

    /// Local edit: applied at once, pushed when connected and bound
    pub async fn edit(&self, content: impl Into<String>, cursor: Option<Cursor>) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        if let Some(update) = state.local_edit(content.into(), cursor) {
            self.push(update)?;
        }
        Ok(())
    }

    pub async fn move_cursor(&self, cursor: Cursor) -> Result<(), ClientError> {
        let mut state = self.state.lock().await;
        if let Some(info) = state.cursor_moved(cursor) {
            self.push(info)?;
        }
        Ok(())
    }

    /// Replace the buffer with a text file from disk
    pub async fn import_file(&self, path: &Path) -> Result<(), ClientError> {
        let content = self.files.read_text(path).await?;
        let mut state = self.state.lock().await;
        if let Some(update) = state.load_file(file_name(path), content) {
            self.push(update)?;
        }
        Ok(())
    }

    /// Write the buffer to `path` and mark it saved under that name
    pub async fn export_file(&self, path: &Path) -> Result<(), ClientError> {
        let content = self.state.lock().await.document().content.clone();
        self.files.write_text(path, &content).await?;
        self.state.lock().await.mark_saved(file_name(path));
        Ok(())
    }

    pub async fn new_document(&self) {
        self.state.lock().await.new_document();
    }

    pub async fn snapshot(&self) -> EditorDocument {
        self.state.lock().await.document().clone()
    }

    pub async fn document_id(&self) -> Option<i64> {
        self.state.lock().await.document_id()
    }

    pub async fn roster(&self) -> Vec<PresenceEntry> {
        self.state.lock().await.roster().entries()
    }

    /// Start periodic auto-save. Returns false when no storage is configured.
    pub fn start_autosave(&mut self, interval: Duration) -> bool {
        let Some(storage) = self.storage.clone() else {
            return false;
        };
        if let Some(previous) = self.autosave.replace(spawn_autosave(self.state.clone(), storage, interval)) {
            previous.abort();
        }
        true
    }

    /// Auto-save right now, e.g. before shutdown
    pub async fn save_local(&self) -> Result<bool, ClientError> {
        let Some(storage) = self.storage.as_ref() else {
            return Ok(false);
        };
        let state = self.state.lock().await;
        autosave::autosave_once(&state, storage.as_ref())
    }

    /// Queue a frame for the writer task. Callers hold the state lock so
    /// frames leave in the order the state produced them.
    fn push(&self, frame: ReceivedMessage) -> Result<(), ClientError> {
        let text = serde_json::to_string(&frame)?;
        match &self.outgoing {
            Some(tx) if tx.send(text).is_ok() => {}
            _ => debug!("Connection gone, frame kept local"),
        }
        Ok(())
    }
}

impl Drop for SyncAgent {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(autosave) = self.autosave.take() {
            autosave.abort();
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::platform::MemoryStorage;

    #[test]
    fn file_name_falls_back_to_default() {
        assert_eq!(file_name(Path::new("/tmp/notes.txt")), "notes.txt");
        assert_eq!(file_name(Path::new("/")), DEFAULT_FILENAME);
    }

    #[tokio::test]
    async fn offline_agent_keeps_edits_local() {
        let agent = SyncAgent::new("ws://127.0.0.1:9/ws", Participant::new("Ada"));
        agent.open_document(1).await.unwrap();
        agent.edit("offline text", None).await.unwrap();

        let doc = agent.snapshot().await;
        assert_eq!(doc.content, "offline text");
        assert!(!doc.saved);
        assert!(!agent.is_connected().await);
    }

    #[tokio::test]
    async fn failed_connect_leaves_agent_closed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut agent = SyncAgent::new(format!("ws://127.0.0.1:{port}/ws"), Participant::new("Ada"));
        assert!(agent.connect().await.is_err());
        assert_eq!(agent.connection_state().await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn socket_dropped_right_after_handshake_ends_closed() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            drop(ws);
        });

        let mut agent = SyncAgent::new(format!("ws://127.0.0.1:{port}/ws"), Participant::new("Ada"));
        agent.open_document(1).await.unwrap();
        agent.connect().await.unwrap();

        for _ in 0..100 {
            if !agent.is_connected().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(agent.connection_state().await, ConnectionState::Closed);
    }

    #[tokio::test]
    async fn storage_is_restored_on_build() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(autosave::CONTENT_KEY, "left over").unwrap();
        storage.set(autosave::FILENAME_KEY, "draft.txt").unwrap();
        storage.set(autosave::DOCUMENT_ID_KEY, "3").unwrap();

        let agent = SyncAgent::new("ws://127.0.0.1:9/ws", Participant::new("Ada"))
            .with_storage(storage)
            .await
            .unwrap();
        assert_eq!(agent.snapshot().await.filename, "draft.txt");
        assert_eq!(agent.document_id().await, Some(3));
    }

    #[tokio::test]
    async fn export_then_import_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let agent = SyncAgent::new("ws://127.0.0.1:9/ws", Participant::new("Ada"));
        agent.edit("exported", None).await.unwrap();
        agent.export_file(&path).await.unwrap();

        let doc = agent.snapshot().await;
        assert!(doc.saved);
        assert_eq!(doc.filename, "out.txt");

        agent.new_document().await;
        agent.import_file(&path).await.unwrap();
        assert_eq!(agent.snapshot().await.content, "exported");
    }

    #[tokio::test]
    async fn api_calls_need_a_client() {
        let agent = SyncAgent::new("ws://127.0.0.1:9/ws", Participant::new("Ada"));
        assert!(matches!(agent.list_documents().await, Err(ClientError::NoApi)));
        assert!(matches!(agent.create_document("a", "b").await, Err(ClientError::NoApi)));
    }
}
