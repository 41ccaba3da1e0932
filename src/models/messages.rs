use serde::{Deserialize, Serialize};

/// 1-based caret position inside a document
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub line: u32,
    pub column: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub document_id: i64,
    pub user_id: String,
    pub username: String,
}

/// Whole-document update. `user_id` is stamped by the server on fan-out.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMessage {
    pub document_id: i64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoMessage {
    pub user_id: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMessage {
    pub document_id: i64,
    pub content: String,
    pub filename: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LeaveMessage {
    pub user_id: String,
}

/// Frames a client sends to the relay
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ReceivedMessage {
    #[serde(rename = "join")]
    Join(JoinMessage),
    #[serde(rename = "update")]
    Update(UpdateMessage),
    #[serde(rename = "user_info")]
    UserInfo(UserInfoMessage),
}

/// Frames the relay sends to a client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum SendMessage {
    #[serde(rename = "sync")]
    Sync(SyncMessage),
    #[serde(rename = "update")]
    Update(UpdateMessage),
    #[serde(rename = "user_info")]
    UserInfo(UserInfoMessage),
    #[serde(rename = "leave")]
    Leave(LeaveMessage),
}
