//! The assistant service.
//!
//! [`Assistant`] owns every process-scoped collaborator (retrieval engine,
//! response cache, conversation store, language detector, prompt templates
//! and chat backend) and runs one chat turn end to end:
//!
//! ```text
//! detect language ─▶ admit turn ─▶ cache lookup ─┬─ hit ──────────────────────────┐
//!                                                └─ miss ─▶ retrieve ─▶ enrich ─▶ backend ─▶ cache set
//!                                                                                   │
//!                                                         commit user + reply ◀─────┘
//! ```
//!
//! Nothing is stored until the backend has answered: the user turn, the
//! reply, an inactivity reset and the activity timestamp are committed
//! together. A backend failure leaves the conversation exactly as it was.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use juris_context_core::cache::{cache_key, ResponseCache};
use juris_context_core::conversation::{Admission, Conversation};
use juris_context_core::language::{
    DetectionStrategy, LanguageDetector, MarkerDetector, ScriptDetector,
};
use juris_context_core::transcript::{enrich, PromptTemplates};
use juris_context_core::{ChatError, Document, Language, Message};

use crate::backend::ChatBackend;
use crate::config::{Config, LanguageConfig};
use crate::conversations::ConversationStore;
use crate::engine::ContextEngine;

/// Result of one answered chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub conversation_id: String,
    /// Fresh identifier for this reply, referenced by feedback.
    pub message_id: String,
    pub response: String,
    pub language: Language,
    /// Served from the response cache without calling the backend.
    pub cached: bool,
    /// The conversation had been idle too long and was reset by this turn.
    pub reset: bool,
    /// Labels of the documents the context was built from.
    pub sources: Vec<String>,
}

/// Build the detector selected in `[language]`.
pub fn build_detector(config: &LanguageConfig) -> Result<Box<dyn LanguageDetector>> {
    let fallback = config.default_language()?;
    let detector: Box<dyn LanguageDetector> = match config.strategy()? {
        DetectionStrategy::Script => Box::new(ScriptDetector::new(fallback)),
        DetectionStrategy::Markers => {
            let mut detector = MarkerDetector::new(fallback);
            if !config.markers.is_empty() {
                detector = detector.with_markers(&config.markers);
            }
            detector.threshold = config.marker_threshold;
            Box::new(detector)
        }
    };
    Ok(detector)
}

pub struct Assistant {
    engine: ContextEngine,
    cache: ResponseCache,
    cache_key_window: usize,
    conversations: ConversationStore,
    detector: Box<dyn LanguageDetector>,
    templates: PromptTemplates,
    backend: Arc<dyn ChatBackend>,
    inactivity_timeout: Duration,
}

impl Assistant {
    pub fn new(config: &Config, backend: Arc<dyn ChatBackend>) -> Result<Self> {
        let secs = config.conversation.inactivity_timeout_secs;
        let inactivity_timeout = Duration::try_seconds(secs)
            .with_context(|| format!("inactivity timeout of {} seconds is out of range", secs))?;
        Ok(Self {
            engine: ContextEngine::new(config),
            cache: ResponseCache::new(config.cache.capacity),
            cache_key_window: config.cache.key_window,
            conversations: ConversationStore::new(),
            detector: build_detector(&config.language)?,
            templates: PromptTemplates::default(),
            backend,
            inactivity_timeout,
        })
    }

    pub fn engine(&self) -> &ContextEngine {
        &self.engine
    }

    pub fn conversations(&self) -> &ConversationStore {
        &self.conversations
    }

    pub fn templates(&self) -> &PromptTemplates {
        &self.templates
    }

    /// Index `documents` directly. Cached replies are dropped since they may
    /// rest on the previous corpus.
    pub fn index(&self, documents: Vec<Document>) -> usize {
        let count = self.engine.index_documents(documents);
        self.cache_clear();
        count
    }

    /// Rescan the corpus directory and rebuild the index.
    pub fn reindex(&self) -> Result<usize> {
        let count = self.engine.reindex()?;
        self.cache_clear();
        Ok(count)
    }

    pub fn retrieve_context(&self, query: &str, max_chars: usize) -> String {
        self.engine.retrieve_context(query, max_chars)
    }

    /// Enriched copy of `transcript` with `query` appended as the new user
    /// turn. `transcript` itself is left untouched.
    pub fn augment_transcript(
        &self,
        transcript: &[Message],
        query: &str,
        context: &str,
        language: Language,
    ) -> Vec<Message> {
        let mut turns = transcript.to_vec();
        turns.push(Message::user(query));
        enrich(&turns, context, language, &self.templates)
    }

    pub fn cache_get(&self, key: &str) -> Option<String> {
        self.cache.get(key)
    }

    pub fn cache_set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.cache.set(key, value)
    }

    pub fn cache_clear(&self) {
        self.cache.clear()
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn detect_language(&self, text: &str) -> Language {
        self.detector.detect(text)
    }

    pub async fn chat(&self, conversation_id: &str, message: &str) -> Result<ChatReply, ChatError> {
        self.chat_at(conversation_id, message, Utc::now()).await
    }

    /// [`Assistant::chat`] with an explicit clock reading.
    pub async fn chat_at(
        &self,
        conversation_id: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<ChatReply, ChatError> {
        let conversation_id = conversation_id.trim();
        if conversation_id.is_empty() {
            return Err(ChatError::InvalidRequest(
                "conversation_id must not be empty".to_string(),
            ));
        }
        if message.trim().is_empty() {
            return Err(ChatError::InvalidRequest(
                "message must not be empty".to_string(),
            ));
        }

        let language = self.detect_language(message);
        let handle = self.conversations.get_or_create(conversation_id, || {
            Conversation::new(
                conversation_id,
                self.templates.system_prompt(language),
                language,
                now,
            )
        });
        let mut conversation = handle.lock().await;

        let admission = conversation.admit(now, self.inactivity_timeout)?;
        let system_prompt = self.templates.system_prompt(language);
        if admission == Admission::Reset {
            info!(
                conversation_id,
                "conversation idle past timeout, answering on a fresh transcript"
            );
        }
        let transcript = conversation.transcript_for(admission, system_prompt);

        let key = cache_key(message, &transcript, self.cache_key_window);
        let (response, cached, sources) = match self.cache.get(&key) {
            Some(hit) => (hit, true, Vec::new()),
            None => {
                let retrieval = self.engine.retrieve(message);
                let enriched =
                    self.augment_transcript(&transcript, message, &retrieval.context, language);
                let reply = self.backend.complete(&enriched).await.map_err(|e| {
                    warn!(
                        conversation_id,
                        backend = self.backend.name(),
                        error = %e,
                        "backend call failed, conversation left unchanged"
                    );
                    ChatError::Backend(e.to_string())
                })?;
                self.cache.set(key, reply.clone());
                let sources = retrieval.results.into_iter().map(|r| r.label).collect();
                (reply, false, sources)
            }
        };

        conversation.commit_exchange(
            admission,
            system_prompt,
            language,
            message,
            response.clone(),
            now,
        );

        info!(
            conversation_id,
            language = %language,
            cached,
            turns = conversation.messages().len(),
            "chat turn answered"
        );

        Ok(ChatReply {
            conversation_id: conversation_id.to_string(),
            message_id: Uuid::new_v4().to_string(),
            response,
            language,
            cached,
            reset: admission == Admission::Reset,
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendError;
    use async_trait::async_trait;
    use juris_context_core::Role;

    struct Echo;

    #[async_trait]
    impl ChatBackend for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, messages: &[Message]) -> Result<String, BackendError> {
            Ok(format!("turns={}", messages.len()))
        }
    }

    fn assistant() -> Assistant {
        Assistant::new(&Config::default(), Arc::new(Echo)).unwrap()
    }

    #[test]
    fn augment_appends_enriched_user_turn() {
        let assistant = assistant();
        let transcript = vec![Message::system("prompt")];
        let out = assistant.augment_transcript(&transcript, "Quel préavis ?", "", Language::French);
        assert_eq!(transcript.len(), 1);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].role, Role::User);
        assert!(out[1].content.starts_with("Quel préavis ?"));
        assert!(out[1].content.contains("Réponds en français."));
    }

    #[test]
    fn detector_follows_config() {
        let mut config = LanguageConfig::default();
        assert_eq!(build_detector(&config).unwrap().name(), "script");

        config.strategy = "markers".to_string();
        config.markers = vec!["wesh".to_string(), "barsha".to_string()];
        let detector = build_detector(&config).unwrap();
        assert_eq!(detector.detect("wesh barsha"), Language::Tunisian);
        assert_eq!(detector.detect("chneya kifech"), Language::French);
    }

    #[test]
    fn out_of_range_timeout_is_rejected() {
        let mut config = Config::default();
        config.conversation.inactivity_timeout_secs = i64::MAX;
        assert!(Assistant::new(&config, Arc::new(Echo)).is_err());
    }

    #[tokio::test]
    async fn rejects_empty_input() {
        let assistant = assistant();
        let err = assistant.chat("c1", "   ").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidRequest(_)));
        let err = assistant.chat("", "bonjour").await.unwrap_err();
        assert!(matches!(err, ChatError::InvalidRequest(_)));
        assert!(assistant.conversations().is_empty());
    }

    #[tokio::test]
    async fn stored_transcript_is_not_enriched() {
        let assistant = assistant();
        let reply = assistant.chat("c1", "Quel est le préavis ?").await.unwrap();
        assert_eq!(reply.response, "turns=2");
        assert!(!reply.cached);

        let handle = assistant.conversations().get("c1").unwrap();
        let conversation = handle.lock().await;
        assert_eq!(conversation.messages().len(), 3);
        assert_eq!(conversation.messages()[1].content, "Quel est le préavis ?");
    }
}
