//! # juris-context core
//!
//! The retrieval-augmented context engine behind the `juris` assistant:
//! TF-IDF corpus index, relevance ranking, bounded context assembly, an
//! LRU response cache, transcript enrichment and language detection.
//!
//! This crate has no tokio, filesystem or network dependencies. Text
//! extraction, corpus scanning, the model backend and the HTTP surface
//! live in the `juris-context` app crate.
//!
//! ```text
//! query ─▶ language ─▶ cache? ─▶ index.search ─▶ assemble ─▶ enrich ─▶ backend
//! ```

pub mod cache;
pub mod context;
pub mod conversation;
pub mod error;
pub mod index;
pub mod language;
pub mod models;
pub mod search;
pub mod transcript;

pub use error::{ChatError, IndexError};
pub use models::{Document, Language, Message, RankedResult, Role};
