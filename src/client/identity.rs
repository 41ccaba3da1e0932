use uuid::Uuid;

/// Who this client is for the lifetime of the process
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Participant {
    pub user_id: String,
    pub username: String,
}

impl Participant {
    /// Mint a fresh opaque user id
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            user_id: Uuid::new_v4().to_string(),
            username: username.into(),
        }
    }
}
