//! In-memory conversation registry.
//!
//! The map lock is held only to look up or insert an entry. Each
//! conversation sits behind its own async mutex, which the assistant holds
//! for the whole turn (including the backend call), so turns on one
//! identifier are serialised while different identifiers never wait on
//! each other.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::Mutex;

use juris_context_core::conversation::Conversation;

pub type ConversationHandle = Arc<Mutex<Conversation>>;

#[derive(Debug, Default)]
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, ConversationHandle>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<ConversationHandle> {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Return the conversation for `id`, creating it with `create` if absent.
    pub fn get_or_create<F>(&self, id: &str, create: F) -> ConversationHandle
    where
        F: FnOnce() -> Conversation,
    {
        if let Some(handle) = self.get(id) {
            return handle;
        }
        let mut map = self
            .conversations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        map.entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(create())))
            .clone()
    }

    pub fn len(&self) -> usize {
        self.conversations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use juris_context_core::conversation::Admission;
    use juris_context_core::Language;

    fn fresh(id: &str) -> Conversation {
        Conversation::new(id, "prompt", Language::French, Utc::now())
    }

    #[tokio::test]
    async fn same_id_shares_one_conversation() {
        let store = ConversationStore::new();
        let a = store.get_or_create("c1", || fresh("c1"));
        let b = store.get_or_create("c1", || panic!("must not create twice"));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len(), 1);

        a.lock().await.commit_exchange(
            Admission::Continued,
            "prompt",
            Language::French,
            "question",
            "réponse",
            Utc::now(),
        );
        assert_eq!(b.lock().await.messages().len(), 3);
    }

    #[tokio::test]
    async fn different_ids_do_not_block_each_other() {
        let store = ConversationStore::new();
        let a = store.get_or_create("a", || fresh("a"));
        let _held = a.lock().await;

        let b = store.get_or_create("b", || fresh("b"));
        let guard = tokio::time::timeout(std::time::Duration::from_millis(100), b.lock()).await;
        assert!(guard.is_ok());
    }
}
