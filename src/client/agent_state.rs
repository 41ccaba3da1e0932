use tracing::debug;

use super::editor::EditorDocument;
use super::identity::Participant;
use super::roster::Roster;
use crate::models::{Cursor, JoinMessage, ReceivedMessage, SendMessage, UpdateMessage, UserInfoMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// What an inbound frame changed, for whoever renders the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentEvent {
    Connected,
    Disconnected,
    Synced { document_id: i64 },
    RemoteUpdate { document_id: i64 },
    Presence { user_id: String },
    Left { user_id: String },
}

/// Everything the client knows, without any I/O.
///
/// Methods that may need to tell the relay something return the frame to
/// send; `None` means the change stays local.
#[derive(Debug, Clone)]
pub struct AgentState {
    identity: Participant,
    document: EditorDocument,
    document_id: Option<i64>,
    roster: Roster,
    connection: ConnectionState,
}

impl AgentState {
    pub fn new(identity: Participant) -> Self {
        Self {
            identity,
            document: EditorDocument::default(),
            document_id: None,
            roster: Roster::new(),
            connection: ConnectionState::Closed,
        }
    }

    pub fn identity(&self) -> &Participant {
        &self.identity
    }

    pub fn document(&self) -> &EditorDocument {
        &self.document
    }

    pub fn document_id(&self) -> Option<i64> {
        self.document_id
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Open
    }

    /// Put back what auto-save left on the device
    pub fn restore(&mut self, content: Option<String>, filename: Option<String>, document_id: Option<i64>) {
        if let Some(content) = content {
            self.document.content = content;
            if let Some(filename) = filename {
                self.document.filename = filename;
            }
        }
        if document_id.is_some() {
            self.document_id = document_id;
        }
    }

    pub fn on_connecting(&mut self) {
        self.connection = ConnectionState::Connecting;
    }

    /// The socket is up; rejoin the bound document if there is one
    pub fn on_open(&mut self) -> Option<ReceivedMessage> {
        self.connection = ConnectionState::Open;
        self.join_frame()
    }

    pub fn on_closed(&mut self) {
        self.connection = ConnectionState::Closed;
    }

    /// Bind to a document; joins right away when connected
    pub fn bind(&mut self, document_id: i64) -> Option<ReceivedMessage> {
        if self.document_id != Some(document_id) {
            self.roster.clear();
        }
        self.document_id = Some(document_id);
        if self.is_connected() {
            self.join_frame()
        } else {
            None
        }
    }

    /// Apply a frame from the relay. Frames about a document other than the
    /// bound one are stale and ignored.
    pub fn apply(&mut self, msg: SendMessage) -> Option<AgentEvent> {
        match msg {
            SendMessage::Sync(sync) => {
                if self.document_id != Some(sync.document_id) {
                    debug!("Ignoring sync for unbound document {}", sync.document_id);
                    return None;
                }
                self.document.content = sync.content;
                self.document.filename = sync.filename;
                self.document.saved = true;
                Some(AgentEvent::Synced { document_id: sync.document_id })
            }
            SendMessage::Update(update) => {
                if self.document_id != Some(update.document_id) {
                    debug!("Ignoring update for unbound document {}", update.document_id);
                    return None;
                }
                self.document.content = update.content;
                self.document.saved = false;
                if let (Some(user_id), Some(cursor)) = (update.user_id.as_deref(), update.cursor) {
                    self.roster.set_cursor(user_id, cursor);
                }
                Some(AgentEvent::RemoteUpdate { document_id: update.document_id })
            }
            SendMessage::UserInfo(info) => {
                if info.user_id == self.identity.user_id {
                    return None;
                }
                self.roster.upsert(&info.user_id, &info.username, info.cursor);
                Some(AgentEvent::Presence { user_id: info.user_id })
            }
            SendMessage::Leave(leave) => {
                self.roster.remove(&leave.user_id)?;
                Some(AgentEvent::Left { user_id: leave.user_id })
            }
        }
    }

    /// Optimistic local edit
    pub fn local_edit(&mut self, content: String, cursor: Option<Cursor>) -> Option<ReceivedMessage> {
        self.document.content = content;
        self.document.saved = false;
        self.update_frame(cursor)
    }

    pub fn cursor_moved(&mut self, cursor: Cursor) -> Option<ReceivedMessage> {
        if !self.is_connected() || self.document_id.is_none() {
            return None;
        }
        Some(ReceivedMessage::UserInfo(UserInfoMessage {
            user_id: self.identity.user_id.clone(),
            username: self.identity.username.clone(),
            cursor: Some(cursor),
        }))
    }

    /// Replace the buffer with a file opened from disk. The file is the
    /// saved copy, so the buffer is clean, but collaborators still get it.
    pub fn load_file(&mut self, filename: String, content: String) -> Option<ReceivedMessage> {
        self.document.content = content;
        self.document.filename = filename;
        self.document.saved = true;
        self.update_frame(None)
    }

    /// The buffer was written to `filename`
    pub fn mark_saved(&mut self, filename: String) {
        self.document.filename = filename;
        self.document.saved = true;
    }

    /// Fresh empty buffer, not bound to any shared document
    pub fn new_document(&mut self) {
        self.document = EditorDocument::default();
        self.document_id = None;
        self.roster.clear();
    }

    fn join_frame(&self) -> Option<ReceivedMessage> {
        self.document_id.map(|document_id| {
            ReceivedMessage::Join(JoinMessage {
                document_id,
                user_id: self.identity.user_id.clone(),
                username: self.identity.username.clone(),
            })
        })
    }

    fn update_frame(&self, cursor: Option<Cursor>) -> Option<ReceivedMessage> {
        if !self.is_connected() {
            return None;
        }
        self.document_id.map(|document_id| {
            ReceivedMessage::Update(UpdateMessage {
                document_id,
                content: self.document.content.clone(),
                cursor,
                user_id: None,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LeaveMessage, SyncMessage};

    fn me() -> Participant {
        Participant {
            user_id: "me".into(),
            username: "Me".into(),
        }
    }

    fn open_and_bound(document_id: i64) -> AgentState {
        let mut state = AgentState::new(me());
        state.on_open();
        state.bind(document_id);
        state
    }

    #[test]
    fn open_without_document_waits() {
        let mut state = AgentState::new(me());
        assert_eq!(state.connection(), ConnectionState::Closed);
        assert!(state.on_open().is_none());
        assert!(state.is_connected());
    }

    #[test]
    fn open_with_restored_document_joins_immediately() {
        let mut state = AgentState::new(me());
        state.restore(Some("draft".into()), Some("a.txt".into()), Some(4));
        state.on_connecting();
        assert!(!state.is_connected());

        let frame = state.on_open().unwrap();
        assert_eq!(frame, ReceivedMessage::Join(JoinMessage {
            document_id: 4,
            user_id: "me".into(),
            username: "Me".into(),
        }));
        assert_eq!(state.document().content, "draft");
    }

    #[test]
    fn sync_replaces_content_and_marks_clean() {
        let mut state = open_and_bound(1);
        state.local_edit("local".into(), None);
        assert!(!state.document().saved);

        let event = state.apply(SendMessage::Sync(SyncMessage {
            document_id: 1,
            content: "server".into(),
            filename: "shared.txt".into(),
        }));
        assert_eq!(event, Some(AgentEvent::Synced { document_id: 1 }));
        assert_eq!(state.document().content, "server");
        assert_eq!(state.document().filename, "shared.txt");
        assert!(state.document().saved);
    }

    #[test]
    fn remote_update_marks_dirty_and_moves_sender_cursor() {
        let mut state = open_and_bound(1);
        state.apply(SendMessage::UserInfo(UserInfoMessage {
            user_id: "x".into(),
            username: "X".into(),
            cursor: None,
        }));

        state.apply(SendMessage::Update(UpdateMessage {
            document_id: 1,
            content: "theirs".into(),
            cursor: Some(Cursor { line: 2, column: 1 }),
            user_id: Some("x".into()),
        }));
        assert_eq!(state.document().content, "theirs");
        assert!(!state.document().saved);
        assert_eq!(state.roster().get("x").unwrap().cursor, Some(Cursor { line: 2, column: 1 }));
    }

    #[test]
    fn frames_for_other_documents_are_ignored() {
        let mut state = open_and_bound(2);
        let event = state.apply(SendMessage::Update(UpdateMessage {
            document_id: 1,
            content: "stale".into(),
            cursor: None,
            user_id: None,
        }));
        assert!(event.is_none());
        assert_eq!(state.document().content, "");
    }

    #[test]
    fn own_presence_never_enters_roster() {
        let mut state = open_and_bound(1);
        state.apply(SendMessage::UserInfo(UserInfoMessage {
            user_id: "me".into(),
            username: "Me".into(),
            cursor: Some(Cursor { line: 1, column: 1 }),
        }));
        assert!(state.roster().is_empty());
    }

    #[test]
    fn leave_removes_known_participant_only() {
        let mut state = open_and_bound(1);
        state.apply(SendMessage::UserInfo(UserInfoMessage {
            user_id: "x".into(),
            username: "X".into(),
            cursor: None,
        }));
        let leave = |id: &str| SendMessage::Leave(LeaveMessage { user_id: id.into() });
        assert!(state.apply(leave("nobody")).is_none());
        assert_eq!(state.apply(leave("x")), Some(AgentEvent::Left { user_id: "x".into() }));
        assert!(state.roster().is_empty());
    }

    #[test]
    fn offline_or_unbound_edits_stay_local() {
        let mut unbound = AgentState::new(me());
        unbound.on_open();
        assert!(unbound.local_edit("a".into(), None).is_none());

        let mut offline = AgentState::new(me());
        offline.bind(1);
        assert!(offline.local_edit("b".into(), None).is_none());
        assert_eq!(offline.document().content, "b");

        let mut dropped = open_and_bound(1);
        dropped.on_closed();
        assert!(dropped.local_edit("c".into(), None).is_none());
        assert!(dropped.cursor_moved(Cursor { line: 1, column: 2 }).is_none());
    }

    #[test]
    fn connected_edit_pushes_whole_document() {
        let mut state = open_and_bound(1);
        let frame = state.local_edit("hello".into(), Some(Cursor { line: 1, column: 6 }));
        assert_eq!(frame, Some(ReceivedMessage::Update(UpdateMessage {
            document_id: 1,
            content: "hello".into(),
            cursor: Some(Cursor { line: 1, column: 6 }),
            user_id: None,
        })));
    }

    #[test]
    fn load_file_is_clean_but_still_shared() {
        let mut state = open_and_bound(1);
        let frame = state.load_file("todo.txt".into(), "buy milk".into());
        assert!(matches!(frame, Some(ReceivedMessage::Update(u)) if u.content == "buy milk"));
        assert!(state.document().saved);
        assert_eq!(state.document().filename, "todo.txt");
    }

    #[test]
    fn new_document_unbinds() {
        let mut state = open_and_bound(1);
        state.local_edit("text".into(), None);
        state.new_document();
        assert_eq!(state.document_id(), None);
        assert_eq!(state.document(), &EditorDocument::default());
    }
}
