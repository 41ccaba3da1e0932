use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex, MutexGuard, OwnedMutexGuard};
use tracing::{debug, error};
use uuid::Uuid;

use crate::models::SendMessage;

pub type ConnectionId = Uuid;

/// Per-connection outbound queue of serialized frames, drained in order by
/// the connection's writer task.
pub type Outbound = mpsc::UnboundedSender<String>;

/// Identity a participant announced on join or user_info
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Peer {
    pub user_id: String,
    pub username: String,
}

struct Session {
    document_id: Option<i64>,
    peer: Option<Peer>,
    outbound: Outbound,
}

/// What was left of a session when its connection went away
#[derive(Debug)]
pub struct DepartedSession {
    pub document_id: Option<i64>,
    pub peer: Option<Peer>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub connections: usize,
    pub joined: usize,
    pub open_documents: usize,
}

/// Live connections and the document each one is editing.
///
/// Session bookkeeping goes through [`SessionRegistry::lock`], held only for
/// in-memory work. Store I/O for a document runs under
/// [`SessionRegistry::lock_document`] instead, so a slow store call on one
/// document never stalls another. Callers that need both take the document
/// lock first.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<ConnectionId, Session>>,
    documents: StdMutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            documents: StdMutex::new(HashMap::new()),
        }
    }

    pub async fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            sessions: self.sessions.lock().await,
        }
    }

    /// Serialize joins and updates on one document. Different documents
    /// never contend.
    pub async fn lock_document(&self, document_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
            // Entries nobody holds or waits on
            documents.retain(|_, lock| Arc::strong_count(lock) > 1);
            documents.entry(document_id).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        lock.lock_owned().await
    }

    /// Register a freshly opened, not yet joined connection
    pub async fn connect(&self, connection_id: ConnectionId, outbound: Outbound) {
        self.lock().await.connect(connection_id, outbound);
    }

    pub async fn stats(&self) -> RegistryStats {
        self.lock().await.stats()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RegistryGuard<'a> {
    sessions: MutexGuard<'a, HashMap<ConnectionId, Session>>,
}

impl RegistryGuard<'_> {
    pub fn connect(&mut self, connection_id: ConnectionId, outbound: Outbound) {
        self.sessions.insert(connection_id, Session {
            document_id: None,
            peer: None,
            outbound,
        });
    }

    /// Bind a connection to `document_id`, replacing any earlier binding.
    /// Returns false if the connection is not registered.
    pub fn join(&mut self, connection_id: ConnectionId, document_id: i64, peer: Peer) -> bool {
        match self.sessions.get_mut(&connection_id) {
            Some(session) => {
                session.document_id = Some(document_id);
                session.peer = Some(peer);
                true
            }
            None => false,
        }
    }

    pub fn set_peer(&mut self, connection_id: ConnectionId, peer: Peer) {
        if let Some(session) = self.sessions.get_mut(&connection_id) {
            session.peer = Some(peer);
        }
    }

    pub fn remove(&mut self, connection_id: ConnectionId) -> Option<DepartedSession> {
        self.sessions.remove(&connection_id).map(|session| DepartedSession {
            document_id: session.document_id,
            peer: session.peer,
        })
    }

    pub fn document_of(&self, connection_id: ConnectionId) -> Option<i64> {
        self.sessions.get(&connection_id).and_then(|s| s.document_id)
    }

    pub fn peer_of(&self, connection_id: ConnectionId) -> Option<Peer> {
        self.sessions.get(&connection_id).and_then(|s| s.peer.clone())
    }

    /// Queue a frame for one connection. False if it is gone.
    pub fn send_to(&self, connection_id: ConnectionId, msg: &SendMessage) -> bool {
        let Some(frame) = encode(msg) else {
            return false;
        };
        match self.sessions.get(&connection_id) {
            Some(session) => session.outbound.send(frame).is_ok(),
            None => false,
        }
    }

    /// Queue a frame for every session joined to `document_id` except
    /// `except`. Peers whose queue is closed are skipped. Returns the number
    /// of sessions the frame was queued for.
    pub fn broadcast_to_document(&self, document_id: i64, except: Option<ConnectionId>, msg: &SendMessage) -> usize {
        let Some(frame) = encode(msg) else {
            return 0;
        };
        let mut delivered = 0;
        for (id, session) in self.sessions.iter() {
            if Some(*id) == except || session.document_id != Some(document_id) {
                continue;
            }
            if session.outbound.send(frame.clone()).is_ok() {
                delivered += 1;
            } else {
                debug!("Skipping closed connection {} during broadcast", id);
            }
        }
        delivered
    }

    pub fn stats(&self) -> RegistryStats {
        let joined: Vec<i64> = self.sessions.values().filter_map(|s| s.document_id).collect();
        RegistryStats {
            connections: self.sessions.len(),
            joined: joined.len(),
            open_documents: joined.into_iter().collect::<HashSet<_>>().len(),
        }
    }
}

fn encode(msg: &SendMessage) -> Option<String> {
    match serde_json::to_string(msg) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!("Failed to serialize outbound message: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LeaveMessage;

    fn peer(name: &str) -> Peer {
        Peer {
            user_id: format!("id-{name}"),
            username: name.to_string(),
        }
    }

    fn leave(user: &str) -> SendMessage {
        SendMessage::Leave(LeaveMessage { user_id: user.into() })
    }

    #[tokio::test]
    async fn broadcast_skips_sender_and_other_documents() {
        let registry = SessionRegistry::new();
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let (tx_c, mut rx_c) = mpsc::unbounded_channel();

        let mut guard = registry.lock().await;
        guard.connect(a, tx_a);
        guard.connect(b, tx_b);
        guard.connect(c, tx_c);
        assert!(guard.join(a, 1, peer("a")));
        assert!(guard.join(b, 1, peer("b")));
        assert!(guard.join(c, 2, peer("c")));

        assert_eq!(guard.broadcast_to_document(1, Some(a), &leave("x")), 1);
        drop(guard);

        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().unwrap().contains("\"leave\""));
        assert!(rx_c.try_recv().is_err());
    }

    #[tokio::test]
    async fn rejoin_moves_session_to_new_document() {
        let registry = SessionRegistry::new();
        let a = Uuid::new_v4();
        let (tx, _rx) = mpsc::unbounded_channel();
        registry.connect(a, tx).await;

        let mut guard = registry.lock().await;
        assert_eq!(guard.document_of(a), None);
        guard.join(a, 1, peer("a"));
        guard.join(a, 5, peer("a"));
        assert_eq!(guard.document_of(a), Some(5));
        assert_eq!(guard.broadcast_to_document(1, None, &leave("x")), 0);
    }

    #[tokio::test]
    async fn document_locks_are_independent() {
        let registry = SessionRegistry::new();
        let held = registry.lock_document(1).await;

        let other = tokio::time::timeout(std::time::Duration::from_millis(100), registry.lock_document(2)).await;
        assert!(other.is_ok());
        let same = tokio::time::timeout(std::time::Duration::from_millis(50), registry.lock_document(1)).await;
        assert!(same.is_err());

        drop(held);
        drop(other);
        let again = tokio::time::timeout(std::time::Duration::from_millis(100), registry.lock_document(1)).await;
        assert!(again.is_ok());
    }

    #[tokio::test]
    async fn join_of_unknown_connection_is_refused() {
        let registry = SessionRegistry::new();
        assert!(!registry.lock().await.join(Uuid::new_v4(), 1, peer("ghost")));
    }

    #[tokio::test]
    async fn closed_peers_are_skipped() {
        let registry = SessionRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        let mut guard = registry.lock().await;
        guard.connect(a, tx_a);
        guard.connect(b, tx_b);
        guard.join(a, 9, peer("a"));
        guard.join(b, 9, peer("b"));
        drop(rx_a);

        assert_eq!(guard.broadcast_to_document(9, None, &leave("x")), 1);
        assert!(!guard.send_to(a, &leave("x")));
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn remove_returns_binding_and_updates_stats() {
        let registry = SessionRegistry::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        registry.connect(a, tx_a).await;
        registry.connect(b, tx_b).await;
        registry.lock().await.join(a, 3, peer("a"));

        assert_eq!(registry.stats().await, RegistryStats {
            connections: 2,
            joined: 1,
            open_documents: 1,
        });

        let departed = registry.lock().await.remove(a).unwrap();
        assert_eq!(departed.document_id, Some(3));
        assert_eq!(departed.peer, Some(peer("a")));
        assert!(registry.lock().await.remove(a).is_none());
        assert_eq!(registry.stats().await.connections, 1);
    }
}
