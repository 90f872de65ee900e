//! Append-only feedback log.
//!
//! One CSV row per rating: `timestamp,conversation_id,message_id,rating,comment`.
//! The header is written when the file is created. Commas, quotes and
//! newlines in comments are handled by CSV quoting.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

pub const HEADER: [&str; 5] = [
    "timestamp",
    "conversation_id",
    "message_id",
    "rating",
    "comment",
];

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
    #[error("{0} must not be empty")]
    MissingField(&'static str),
    #[error("failed to write feedback log: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write feedback log: {0}")]
    Csv(#[from] csv::Error),
    #[error("feedback writer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Feedback {
    pub conversation_id: String,
    pub message_id: String,
    pub rating: u8,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Feedback {
    pub fn validate(&self) -> Result<(), FeedbackError> {
        if !(1..=5).contains(&self.rating) {
            return Err(FeedbackError::InvalidRating(self.rating));
        }
        if self.conversation_id.trim().is_empty() {
            return Err(FeedbackError::MissingField("conversation_id"));
        }
        if self.message_id.trim().is_empty() {
            return Err(FeedbackError::MissingField("message_id"));
        }
        Ok(())
    }
}

/// Serialised writer for the feedback CSV.
#[derive(Debug)]
pub struct FeedbackLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record(&self, feedback: &Feedback) -> Result<(), FeedbackError> {
        self.record_at(feedback, Utc::now()).await
    }

    pub async fn record_at(
        &self,
        feedback: &Feedback,
        at: DateTime<Utc>,
    ) -> Result<(), FeedbackError> {
        feedback.validate()?;
        let row = [
            at.to_rfc3339_opts(SecondsFormat::Secs, true),
            feedback.conversation_id.clone(),
            feedback.message_id.clone(),
            feedback.rating.to_string(),
            feedback.comment.clone().unwrap_or_default(),
        ];

        let _guard = self.lock.lock().await;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || append_row(&path, &row)).await??;

        info!(
            conversation_id = %feedback.conversation_id,
            message_id = %feedback.message_id,
            rating = feedback.rating,
            "feedback recorded"
        );
        Ok(())
    }
}

fn append_row(path: &Path, row: &[String; 5]) -> Result<(), FeedbackError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let is_new = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if is_new {
        writer.write_record(HEADER)?;
    }
    writer.write_record(row)?;
    writer.flush()?;
    Ok(())
}
