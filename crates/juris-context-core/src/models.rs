//! Core data models shared by the index, the ranker and the conversation layer.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A corpus document after text extraction.
///
/// Documents are immutable once indexed; a re-index replaces the whole set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Stable identifier, usually the path relative to the corpus root.
    pub id: String,
    /// Where the text came from (file path or URL).
    pub source: String,
    /// Full extracted text.
    pub text: String,
    /// Length of `text` in characters.
    pub char_len: usize,
}

impl Document {
    pub fn new(id: impl Into<String>, source: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let char_len = text.chars().count();
        Self {
            id: id.into(),
            source: source.into(),
            text,
            char_len,
        }
    }

    /// Short human label for context headers: the file name of `source`.
    pub fn label(&self) -> String {
        Path::new(&self.source)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source.clone())
    }
}

/// One ranked hit returned by [`crate::search::search`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    /// Position of the document in the indexed set.
    pub position: usize,
    /// Document identifier.
    pub document_id: String,
    /// Document source path.
    pub source: String,
    /// File-name label used in context headers.
    pub label: String,
    /// Cosine similarity in `(0.0, 1.0]`.
    pub score: f64,
    /// Leading excerpt of the document text, capped in characters.
    pub excerpt: String,
}

/// Speaker of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged transcript turn, in the shape chat-completion APIs expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Language tags produced by the detectors and used to pick templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    French,
    English,
    Arabic,
    Tunisian,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::French => "french",
            Language::English => "english",
            Language::Arabic => "arabic",
            Language::Tunisian => "tunisian",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "french" | "fr" => Ok(Language::French),
            "english" | "en" => Ok(Language::English),
            "arabic" | "ar" => Ok(Language::Arabic),
            "tunisian" | "aeb" => Ok(Language::Tunisian),
            other => Err(format!(
                "unknown language '{}'. Use french, english, arabic or tunisian.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_counts_chars_not_bytes() {
        let doc = Document::new("a", "/corpus/a.txt", "حق");
        assert_eq!(doc.char_len, 2);
        assert_eq!(doc.label(), "a.txt");
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("salut")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"salut"}"#);
    }

    #[test]
    fn language_parses_tags_and_codes() {
        assert_eq!("French".parse::<Language>().unwrap(), Language::French);
        assert_eq!("ar".parse::<Language>().unwrap(), Language::Arabic);
        assert!("klingon".parse::<Language>().is_err());
    }
}
