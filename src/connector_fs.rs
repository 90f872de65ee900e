//! Filesystem corpus scanner.
//!
//! Walks `[corpus].root`, applies the include/exclude globs to each path
//! relative to the root, and extracts text from every match. Files whose
//! extraction fails, or that yield only whitespace, are logged and skipped.
//! A missing root is logged and treated as an empty corpus.
//! Documents come back sorted by relative path so repeated scans of an
//! unchanged tree feed the index in the same order.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use juris_context_core::Document;

use crate::config::CorpusConfig;
use crate::extract::TextExtractor;

pub fn scan_corpus(config: &CorpusConfig, extractor: &dyn TextExtractor) -> Result<Vec<Document>> {
    let root = &config.root;
    if !root.is_dir() {
        warn!(root = %root.display(), "corpus root not found, no documents to index");
        return Ok(Vec::new());
    }

    let include_set = build_globset(&config.include_globs)?;
    let mut excludes = vec!["**/.git/**".to_string(), "**/.*".to_string()];
    excludes.extend(config.exclude_globs.iter().cloned());
    let exclude_set = build_globset(&excludes)?;

    let mut documents = Vec::new();
    let mut skipped = 0usize;

    for entry in WalkDir::new(root).follow_links(config.follow_symlinks) {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
            continue;
        }
        if !extractor.supports(path) {
            debug!(path = %rel_str, "no extractor for file, skipping");
            continue;
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(path = %rel_str, error = %e, "failed to read corpus file, skipping");
                skipped += 1;
                continue;
            }
        };

        match extractor.extract(path, &bytes) {
            Ok(text) if text.trim().is_empty() => {
                warn!(path = %rel_str, "no text extracted, skipping");
                skipped += 1;
            }
            Ok(text) => {
                documents.push(Document::new(
                    rel_str,
                    path.to_string_lossy().to_string(),
                    text,
                ));
            }
            Err(e) => {
                warn!(path = %rel_str, error = %e, "text extraction failed, skipping");
                skipped += 1;
            }
        }
    }

    documents.sort_by(|a, b| a.id.cmp(&b.id));
    info!(
        root = %root.display(),
        documents = documents.len(),
        skipped,
        "corpus scanned"
    );
    Ok(documents)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("Invalid glob: {}", pattern))?);
    }
    Ok(builder.build()?)
}
