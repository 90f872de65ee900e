//! Conversation state.
//!
//! ```text
//! CREATED ──▶ ACTIVE ──(turn after > timeout idle)──▶ EXPIRED
//! ```
//!
//! The turn that discovers the inactivity is answered on a transcript reset
//! to the system prompt of the then-current language. Once that turn is
//! committed the conversation is expired and every later turn is rejected
//! with [`ChatError::ConversationExpired`]. There is no way back to ACTIVE.
//!
//! Admission is a read-only check. Nothing about a turn, the reset
//! included, is stored until [`Conversation::commit_exchange`] runs.
//!
//! Time is passed in by the caller so the state machine stays testable.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::error::ChatError;
use crate::models::{Language, Message};

pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: i64 = 3600;

/// Outcome of [`Conversation::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Admission {
    /// The conversation is active and within the inactivity window.
    Continued,
    /// The conversation has been idle too long. The turn runs on a fresh
    /// transcript and expires the conversation when committed.
    Reset,
}

#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    id: String,
    messages: Vec<Message>,
    active: bool,
    language: Language,
    last_activity: DateTime<Utc>,
}

impl Conversation {
    pub fn new(
        id: impl Into<String>,
        system_prompt: impl Into<String>,
        language: Language,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            messages: vec![Message::system(system_prompt)],
            active: true,
            language,
            last_activity: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The stored, un-enriched transcript.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Gate an incoming turn without touching any state.
    pub fn admit(&self, now: DateTime<Utc>, timeout: Duration) -> Result<Admission, ChatError> {
        if !self.active {
            return Err(ChatError::ConversationExpired {
                conversation_id: self.id.clone(),
            });
        }
        if now - self.last_activity > timeout {
            Ok(Admission::Reset)
        } else {
            Ok(Admission::Continued)
        }
    }

    /// Transcript the admitted turn is answered on. For a reset this is just
    /// `system_prompt`; the stored transcript is left alone either way.
    pub fn transcript_for(&self, admission: Admission, system_prompt: &str) -> Vec<Message> {
        match admission {
            Admission::Continued => self.messages.clone(),
            Admission::Reset => vec![Message::system(system_prompt)],
        }
    }

    /// Store one answered exchange. The user text is stored un-enriched.
    ///
    /// A [`Admission::Reset`] replaces the transcript with `system_prompt`
    /// first and expires the conversation.
    pub fn commit_exchange(
        &mut self,
        admission: Admission,
        system_prompt: &str,
        language: Language,
        user_text: impl Into<String>,
        reply: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        if admission == Admission::Reset {
            self.messages = vec![Message::system(system_prompt)];
            self.active = false;
        }
        self.language = language;
        self.messages.push(Message::user(user_text));
        self.messages.push(Message::assistant(reply));
        self.last_activity = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::TimeZone;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn timeout() -> Duration {
        Duration::seconds(DEFAULT_INACTIVITY_TIMEOUT_SECS)
    }

    fn commit(conv: &mut Conversation, admission: Admission, prompt: &str, at: i64) {
        conv.commit_exchange(admission, prompt, Language::French, "q", "r", t(at));
    }

    #[test]
    fn new_conversation_is_active_with_system_turn() {
        let conv = Conversation::new("c1", "prompt", Language::French, t(0));
        assert!(conv.is_active());
        assert_eq!(conv.messages(), &[Message::system("prompt")]);
    }

    #[test]
    fn turn_within_window_continues() {
        let mut conv = Conversation::new("c1", "prompt", Language::French, t(0));
        let admission = conv.admit(t(3600), timeout()).unwrap();
        assert_eq!(admission, Admission::Continued);
        assert_eq!(conv.last_activity(), t(0));

        commit(&mut conv, admission, "prompt", 3600);
        assert!(conv.is_active());
        assert_eq!(conv.last_activity(), t(3600));
    }

    #[test]
    fn admit_after_timeout_plans_reset_without_applying_it() {
        let mut conv = Conversation::new("c1", "old prompt", Language::French, t(0));
        commit(&mut conv, Admission::Continued, "old prompt", 10);

        let admission = conv.admit(t(10 + 3601), timeout()).unwrap();
        assert_eq!(admission, Admission::Reset);
        assert!(conv.is_active());
        assert_eq!(conv.messages().len(), 3);
        assert_eq!(conv.last_activity(), t(10));
        assert_eq!(
            conv.transcript_for(admission, "nouveau prompt"),
            vec![Message::system("nouveau prompt")]
        );
    }

    #[test]
    fn committed_reset_replaces_transcript_and_expires() {
        let mut conv = Conversation::new("c1", "old prompt", Language::French, t(0));
        commit(&mut conv, Admission::Continued, "old prompt", 10);

        let admission = conv.admit(t(10 + 3601), timeout()).unwrap();
        conv.commit_exchange(
            admission,
            "new prompt",
            Language::English,
            "q2",
            "r2",
            t(3611),
        );
        assert!(!conv.is_active());
        assert_eq!(conv.language(), Language::English);
        let contents: Vec<&str> = conv.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["new prompt", "q2", "r2"]);

        let err = conv.admit(t(3612), timeout()).unwrap_err();
        assert!(matches!(
            err,
            ChatError::ConversationExpired { ref conversation_id } if conversation_id == "c1"
        ));
    }

    #[test]
    fn commit_appends_user_then_assistant() {
        let mut conv = Conversation::new("c1", "prompt", Language::French, t(0));
        conv.commit_exchange(
            Admission::Continued,
            "prompt",
            Language::French,
            "question",
            "réponse",
            t(5),
        );
        let roles: Vec<Role> = conv.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(conv.messages()[1].content, "question");
    }
}
