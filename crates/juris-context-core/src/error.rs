//! Error kinds surfaced by the core.
//!
//! Indexing problems ([`IndexError`]) are absorbed by callers and logged;
//! they only ever degrade retrieval to "no context". Conversation and
//! backend problems ([`ChatError`]) propagate so the caller can render a
//! distinct message for each kind.

use thiserror::Error;

/// Reasons an index could not be built. Never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// The corpus produced no documents with extractable text.
    #[error("no documents to index")]
    NoDocuments,

    /// Every term was removed by tokenisation or stopword filtering.
    #[error("vocabulary is empty after filtering {documents} documents")]
    EmptyVocabulary { documents: usize },
}

/// Errors returned by the chat path.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The conversation was deactivated; a new identifier is required.
    #[error("conversation '{conversation_id}' has ended, start a new conversation")]
    ConversationExpired { conversation_id: String },

    /// The request itself is unusable (empty message, empty identifier).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The model backend failed. Nothing was committed to the transcript.
    #[error("model backend failed: {0}")]
    Backend(String),
}
