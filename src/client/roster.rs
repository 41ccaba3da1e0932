use std::collections::HashMap;

use crate::models::Cursor;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresenceEntry {
    pub user_id: String,
    pub username: String,
    pub cursor: Option<Cursor>,
}

/// Other participants seen on the current document, keyed by user id.
///
/// Entries are never pruned when a peer's connection drops unless the relay
/// sends departure notices.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    entries: HashMap<String, PresenceEntry>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new participant, or for a known one overwrite the cursor.
    /// A known participant's username is left as first seen.
    pub fn upsert(&mut self, user_id: &str, username: &str, cursor: Option<Cursor>) {
        match self.entries.get_mut(user_id) {
            Some(entry) => {
                if cursor.is_some() {
                    entry.cursor = cursor;
                }
            }
            None => {
                self.entries.insert(user_id.to_string(), PresenceEntry {
                    user_id: user_id.to_string(),
                    username: username.to_string(),
                    cursor,
                });
            }
        }
    }

    /// Move a known participant's cursor; unknown ids are ignored
    pub fn set_cursor(&mut self, user_id: &str, cursor: Cursor) {
        if let Some(entry) = self.entries.get_mut(user_id) {
            entry.cursor = Some(cursor);
        }
    }

    pub fn remove(&mut self, user_id: &str) -> Option<PresenceEntry> {
        self.entries.remove(user_id)
    }

    pub fn get(&self, user_id: &str) -> Option<&PresenceEntry> {
        self.entries.get(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries ordered by username for display
    pub fn entries(&self) -> Vec<PresenceEntry> {
        let mut list: Vec<_> = self.entries.values().cloned().collect();
        list.sort_by(|a, b| a.username.cmp(&b.username).then_with(|| a.user_id.cmp(&b.user_id)));
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_inserts_then_only_moves_cursor() {
        let mut roster = Roster::new();
        roster.upsert("u1", "Ada", None);
        roster.upsert("u1", "Renamed", Some(Cursor { line: 3, column: 7 }));

        let entry = roster.get("u1").unwrap();
        assert_eq!(entry.username, "Ada");
        assert_eq!(entry.cursor, Some(Cursor { line: 3, column: 7 }));

        roster.upsert("u1", "Ada", None);
        assert_eq!(roster.get("u1").unwrap().cursor, Some(Cursor { line: 3, column: 7 }));
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn entries_sorted_and_removable() {
        let mut roster = Roster::new();
        roster.upsert("b", "Zed", None);
        roster.upsert("a", "Amy", None);
        let names: Vec<_> = roster.entries().into_iter().map(|e| e.username).collect();
        assert_eq!(names, vec!["Amy", "Zed"]);

        assert!(roster.remove("b").is_some());
        assert!(roster.remove("b").is_none());
        roster.set_cursor("ghost", Cursor { line: 1, column: 1 });
        assert_eq!(roster.len(), 1);
    }
}
