//! # juris-context
//!
//! A retrieval-augmented legal assistant. Questions are answered by an
//! OpenAI-compatible chat model, with context drawn from a local corpus of
//! legal documents (PDF, DOCX, text) through a TF-IDF index.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────────┐
//! │ Corpus dir  │──▶│   Extract    │──▶│  TF-IDF snapshot │
//! │ PDF/DOCX/TXT│   │ pdf/zip/xml  │   │  (core crate)    │
//! └─────────────┘   └──────────────┘   └────────┬─────────┘
//!                                               │
//!                ┌──────────────────────────────┤
//!                ▼                              ▼
//!          ┌──────────┐    ┌───────────┐   ┌──────────┐
//!          │   CLI    │    │ Assistant │──▶│ Backend  │
//!          │ (juris)  │    │ cache/lang│   │ (OpenAI  │
//!          └──────────┘    └─────┬─────┘   │  compat) │
//!                                ▼         └──────────┘
//!                           ┌──────────┐
//!                           │   HTTP   │
//!                           └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! juris index                               # scan and index the corpus
//! juris search "bail commercial" --limit 5
//! juris detect "chneya el 9anoun ?" --strategy markers
//! juris chat demo "Quel est le délai de préavis ?"
//! juris serve                               # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF, DOCX and plain-text extraction |
//! | [`connector_fs`] | Corpus directory scanner |
//! | [`engine`] | Indexing, ranking and context assembly |
//! | [`backend`] | Chat-completion backend |
//! | [`conversations`] | Per-conversation state registry |
//! | [`assistant`] | End-to-end chat turn |
//! | [`feedback`] | CSV feedback log |
//! | [`server`] | HTTP server |
//! | [`telemetry`] | Logging setup |

pub mod assistant;
pub mod backend;
pub mod config;
pub mod connector_fs;
pub mod conversations;
pub mod engine;
pub mod extract;
pub mod feedback;
pub mod server;
pub mod telemetry;
