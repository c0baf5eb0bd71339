//! Bounded per-session conversation memory.
//!
//! Each session keeps at most the last `max_history` user/assistant
//! exchanges (2 × `max_history` entries); older entries are evicted
//! oldest-first. Sessions live in process memory only — restarting the
//! host drops them, which is acceptable because answers never depend on
//! memory for correctness, only for conversational continuity.

use std::collections::HashMap;
use std::sync::Mutex;

use coursepilot_core::config::SessionConfig;
use coursepilot_core::types::Role;

/// One remembered turn.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub role: Role,
    pub content: String,
}

/// Thread-safe store of bounded conversation histories.
pub struct SessionStore {
    max_entries: usize,
    sessions: Mutex<HashMap<String, Vec<Entry>>>,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            max_entries: config.max_history * 2,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new empty session and return its id.
    pub fn create_session(&self) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions.lock().unwrap().insert(id.clone(), Vec::new());
        tracing::debug!(session_id = %id, "session created");
        id
    }

    /// Record one completed user/assistant exchange. An unknown session id
    /// is created implicitly so callers can manage ids themselves.
    pub fn append_exchange(&self, session_id: &str, user: &str, assistant: &str) {
        let mut sessions = self.sessions.lock().unwrap();
        let history = sessions.entry(session_id.to_string()).or_default();
        history.push(Entry { role: Role::User, content: user.to_string() });
        history.push(Entry { role: Role::Assistant, content: assistant.to_string() });
        if history.len() > self.max_entries {
            let excess = history.len() - self.max_entries;
            history.drain(..excess);
        }
    }

    /// A session's remembered turns, oldest first.
    pub fn history(&self, session_id: &str) -> Vec<Entry> {
        self.sessions
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Render a session's history as prompt text, one `Role: content`
    /// line per entry. `None` when the session is unknown or empty.
    pub fn history_text(&self, session_id: &str) -> Option<String> {
        let history = self.history(session_id);
        if history.is_empty() {
            return None;
        }
        let lines: Vec<String> = history
            .iter()
            .map(|e| {
                let label = match e.role {
                    Role::Assistant => "Assistant",
                    _ => "User",
                };
                format!("{}: {}", label, e.content)
            })
            .collect();
        Some(lines.join("\n"))
    }

    /// Drop a session's history entirely.
    pub fn clear_session(&self, session_id: &str) {
        self.sessions.lock().unwrap().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(&SessionConfig::default())
    }

    #[test]
    fn test_create_session_is_empty() {
        let store = store();
        let id = store.create_session();
        assert!(store.history_text(&id).is_none());
    }

    #[test]
    fn test_history_renders_role_labels() {
        let store = store();
        let id = store.create_session();
        store.append_exchange(&id, "What is MCP?", "A protocol for tool use.");
        assert_eq!(
            store.history_text(&id).unwrap(),
            "User: What is MCP?\nAssistant: A protocol for tool use."
        );
    }

    #[test]
    fn test_history_evicts_oldest_beyond_cap() {
        // max_history = 2 keeps at most 4 entries
        let store = SessionStore::new(&SessionConfig { max_history: 2 });
        let id = store.create_session();
        store.append_exchange(&id, "q1", "a1");
        store.append_exchange(&id, "q2", "a2");
        store.append_exchange(&id, "q3", "a3");
        let text = store.history_text(&id).unwrap();
        assert!(!text.contains("q1"));
        assert_eq!(text, "User: q2\nAssistant: a2\nUser: q3\nAssistant: a3");
    }

    #[test]
    fn test_entry_count_stays_even_and_capped() {
        let store = SessionStore::new(&SessionConfig { max_history: 2 });
        let id = store.create_session();
        for i in 0..20 {
            store.append_exchange(&id, &format!("q{i}"), &format!("a{i}"));
            let history = store.history(&id);
            assert_eq!(history.len() % 2, 0);
            assert!(history.len() <= 4);
        }
        assert_eq!(store.history(&id)[0].role, Role::User);
        assert_eq!(store.history(&id)[0].content, "q18");
    }

    #[test]
    fn test_unknown_session_created_implicitly() {
        let store = store();
        store.append_exchange("external-id", "hello", "hi");
        assert_eq!(
            store.history_text("external-id").unwrap(),
            "User: hello\nAssistant: hi"
        );
    }

    #[test]
    fn test_clear_session_forgets_history() {
        let store = store();
        let id = store.create_session();
        store.append_exchange(&id, "q", "a");
        store.clear_session(&id);
        assert!(store.history_text(&id).is_none());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = store();
        let a = store.create_session();
        let b = store.create_session();
        store.append_exchange(&a, "only in a", "yes");
        assert!(store.history_text(&b).is_none());
        assert!(store.history_text(&a).unwrap().contains("only in a"));
    }
}
