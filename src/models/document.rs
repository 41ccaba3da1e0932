use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// A persisted document record
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: i64,
    pub filename: String,
    pub content: String,
    pub last_modified: String,
}

/// Request body for creating a document. All fields are required.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewDocument {
    pub filename: String,
    pub content: String,
    pub last_modified: String,
}

/// Partial update of a document. Absent fields keep their stored value;
/// an explicit `null` is rejected.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// Only runs for fields that appear in the body, so `null` reaches `T`
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl Document {
    pub fn from_new(id: i64, new_doc: NewDocument) -> Self {
        Self {
            id,
            filename: new_doc.filename,
            content: new_doc.content,
            last_modified: new_doc.last_modified,
        }
    }

    /// Merge the provided fields of `patch` into this record.
    pub fn apply(&mut self, patch: DocumentPatch) {
        if let Some(filename) = patch.filename {
            self.filename = filename;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(last_modified) = patch.last_modified {
            self.last_modified = last_modified;
        }
    }
}

impl DocumentPatch {
    /// Patch written by the sync path on every accepted edit
    pub fn content_now(content: impl Into<String>) -> Self {
        Self {
            filename: None,
            content: Some(content.into()),
            last_modified: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}
