//! Session-scoped conversation state.
//!
//! The store is an append-only sequence of messages, seeded with an
//! assistant greeting so a session always has something to render. The
//! only destructive transition is `clear`, which replaces the whole
//! transcript with a fresh greeting.

use crate::message::{Message, Role};
use crate::sources::Source;

pub const GREETING: &str = "Hello! I'm your research assistant. I can help you search the web, \
     find academic papers, and browse Wikipedia. What would you like to explore today?";

pub const CLEARED_GREETING: &str =
    "Chat cleared! How can I assist you with your research today?";

#[derive(Debug, Clone)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    /// Create a store seeded with the initial assistant greeting.
    pub fn new() -> Self {
        Self {
            messages: vec![Message::assistant(GREETING)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>, sources: Vec<Source>) {
        self.messages
            .push(Message::assistant_with_sources(content, sources));
    }

    /// Replace the transcript with a single fresh greeting.
    pub fn clear(&mut self) {
        self.messages = vec![Message::assistant(CLEARED_GREETING)];
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn latest(&self) -> &Message {
        // Never empty: new() and clear() both seed a greeting.
        self.messages.last().unwrap()
    }

    /// True when the newest message is from the user and an assistant
    /// reply has not been produced yet.
    pub fn awaiting_reply(&self) -> bool {
        self.latest().role == Role::User
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceKind;

    #[test]
    fn test_new_store_seeds_greeting() {
        let store = ConversationStore::new();
        assert_eq!(store.len(), 1);
        assert_eq!(store.latest().role, Role::Assistant);
        assert_eq!(store.latest().content, GREETING);
        assert!(store.latest().sources.is_empty());
    }

    #[test]
    fn test_awaiting_reply_tracks_latest_role() {
        let mut store = ConversationStore::new();
        assert!(!store.awaiting_reply());
        store.push_user("What is Rust?");
        assert!(store.awaiting_reply());
        store.push_assistant("A systems language.", Vec::new());
        assert!(!store.awaiting_reply());
    }

    #[test]
    fn test_clear_resets_to_single_greeting() {
        let mut store = ConversationStore::new();
        store.push_user("question");
        store.push_assistant(
            "answer",
            vec![Source::new("Web Source", "https://example.com", SourceKind::Web)],
        );
        store.clear();
        assert_eq!(store.len(), 1);
        assert_eq!(store.latest().role, Role::Assistant);
        assert_eq!(store.latest().content, CLEARED_GREETING);
        assert!(store.latest().sources.is_empty());
    }

    #[test]
    fn test_push_assistant_attaches_sources() {
        let mut store = ConversationStore::new();
        store.push_user("find papers");
        let sources = vec![Source::new(
            "arXiv Academic Paper",
            "https://arxiv.org/abs/1234",
            SourceKind::Academic,
        )];
        store.push_assistant("See https://arxiv.org/abs/1234", sources.clone());
        assert_eq!(store.latest().sources, sources);
    }
}
