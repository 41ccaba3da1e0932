//! Client side of the relay: local editor state, presence roster, auto-save
//! and the WebSocket sync agent.

pub mod agent;
pub mod agent_state;
pub mod autosave;
pub mod editor;
pub mod error;
pub mod identity;
pub mod platform;
pub mod roster;

pub use agent::SyncAgent;
pub use agent_state::{AgentEvent, AgentState, ConnectionState};
pub use autosave::AUTOSAVE_INTERVAL;
pub use editor::{cursor_position, EditorDocument};
pub use error::ClientError;
pub use identity::Participant;
pub use platform::{DirStorage, FsTextFiles, LocalStorage, MemoryStorage, TextFiles};
pub use roster::{PresenceEntry, Roster};
