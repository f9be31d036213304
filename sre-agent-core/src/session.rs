//! Per-user conversation persistence: one JSON file per user under a storage
//! directory. Writes replace the whole record via a temp file and rename, so a
//! failed write leaves the previous record intact.
//!
//! There is no locking. Concurrent appends for the same user race and the last
//! writer wins; callers that need stronger guarantees must serialize access
//! themselves.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info};

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Session {
    fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            messages: Vec::new(),
            config: Map::new(),
        }
    }
}

pub struct SessionStore {
    storage_path: PathBuf,
}

impl SessionStore {
    pub fn new(storage_path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let storage_path = storage_path.as_ref().to_path_buf();
        fs::create_dir_all(&storage_path)?;
        info!("session store initialized at {}", storage_path.display());
        Ok(Self { storage_path })
    }

    /// Storage key derivation: keep only alphanumerics, `_` and `-`, dropping
    /// everything else. Distinct user ids that sanitize to the same key share
    /// a session file.
    fn session_file(&self, user_id: &str) -> PathBuf {
        let safe: String = user_id
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        self.storage_path.join(format!("{safe}.json"))
    }

    /// Load a persisted session. Missing records and unreadable records both
    /// come back as `None`; the latter is logged.
    pub fn load_session(&self, user_id: &str) -> Option<Session> {
        let path = self.session_file(user_id);
        if !path.exists() {
            debug!("no existing session for user {user_id}");
            return None;
        }

        match self.read_session(&path) {
            Ok(session) => {
                debug!("loaded session for user {user_id}");
                Some(session)
            }
            Err(err) => {
                error!("error loading session for user {user_id}: {err}");
                None
            }
        }
    }

    fn read_session(&self, path: &Path) -> Result<Session, SessionError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist the whole session, replacing any previous record. Returns false
    /// on failure, leaving the previous record untouched.
    pub fn save_session(&self, session: &Session) -> bool {
        match self.write_session(session) {
            Ok(()) => {
                debug!("saved session for user {}", session.user_id);
                true
            }
            Err(err) => {
                error!("error saving session for user {}: {err}", session.user_id);
                false
            }
        }
    }

    fn write_session(&self, session: &Session) -> Result<(), SessionError> {
        let path = self.session_file(&session.user_id);
        let json = serde_json::to_string_pretty(session)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Create and persist an empty session, overwriting any existing record.
    pub fn create_session(&self, user_id: &str) -> Session {
        let session = Session::empty(user_id);
        self.save_session(&session);
        info!("created new session for user {user_id}");
        session
    }

    pub fn get_or_create_session(&self, user_id: &str) -> Session {
        match self.load_session(user_id) {
            Some(session) => session,
            None => self.create_session(user_id),
        }
    }

    /// Append a message and persist. Role is an uninterpreted caller-supplied
    /// string. Returns the updated session.
    pub fn add_message(&self, user_id: &str, role: &str, content: &str) -> Session {
        let mut session = self.get_or_create_session(user_id);
        session.messages.push(SessionMessage {
            role: role.to_string(),
            content: content.to_string(),
        });
        self.save_session(&session);
        session
    }

    pub fn get_messages(&self, user_id: &str) -> Vec<SessionMessage> {
        self.get_or_create_session(user_id).messages
    }

    /// Delete the persisted record. Clearing a nonexistent session is success.
    pub fn clear_session(&self, user_id: &str) -> bool {
        let path = self.session_file(user_id);
        if !path.exists() {
            return true;
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("cleared session for user {user_id}");
                true
            }
            Err(err) => {
                error!("error clearing session for user {user_id}: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, SessionStore) {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn append_and_list_round_trip() {
        let (_dir, store) = store();

        store.add_message("u1", "user", "hi");
        let messages = store.get_messages("u1");
        assert_eq!(
            messages,
            vec![SessionMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }]
        );

        store.add_message("u1", "assistant", "hello");
        let messages = store.get_messages("u1");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hi");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn load_missing_session_is_none() {
        let (_dir, store) = store();
        assert!(store.load_session("nobody").is_none());
    }

    #[test]
    fn create_overwrites_existing_record() {
        let (_dir, store) = store();
        store.add_message("u1", "user", "hi");
        let fresh = store.create_session("u1");
        assert!(fresh.messages.is_empty());
        assert!(store.get_messages("u1").is_empty());
    }

    #[test]
    fn clear_then_list_recreates_empty_session() {
        let (_dir, store) = store();
        store.add_message("u1", "user", "hi");

        assert!(store.clear_session("u1"));
        assert!(store.get_messages("u1").is_empty());
    }

    #[test]
    fn clear_nonexistent_session_reports_success() {
        let (_dir, store) = store();
        assert!(store.clear_session("never-created"));
    }

    #[test]
    fn sanitized_ids_collide_and_share_a_session() {
        // "a!b" and "a?b" both sanitize to "ab". Current behavior: they
        // silently share one record.
        let (_dir, store) = store();
        store.add_message("a!b", "user", "hi");

        let messages = store.get_messages("a?b");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "hi");
    }

    #[test]
    fn roles_are_uninterpreted() {
        let (_dir, store) = store();
        let session = store.add_message("u1", "anything-goes", "x");
        assert_eq!(session.messages[0].role, "anything-goes");
    }

    #[test]
    fn persisted_shape_matches_contract() {
        let (dir, store) = store();
        store.add_message("u1", "user", "hi");

        let content = fs::read_to_string(dir.path().join("u1.json")).unwrap();
        let value: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["user_id"], "u1");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hi");
        assert!(value["config"].as_object().unwrap().is_empty());
    }
}
