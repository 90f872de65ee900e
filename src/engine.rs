//! Retrieval engine: corpus scanning, indexing, ranking and context assembly.
//!
//! Owns the [`CorpusIndex`] and everything needed to turn a query into a
//! bounded context string. It has no notion of conversations or of the
//! model backend, so the CLI retrieval commands use it on its own.

use anyhow::Result;
use tracing::{debug, info};

use juris_context_core::context::ContextAssembler;
use juris_context_core::index::{CorpusIndex, IndexParams};
use juris_context_core::search::SearchParams;
use juris_context_core::{Document, RankedResult};

use crate::config::{Config, CorpusConfig};
use crate::connector_fs::scan_corpus;
use crate::extract::{FileExtractor, TextExtractor};

/// Ranked hits for one query together with the context assembled from them.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    pub results: Vec<RankedResult>,
    pub context: String,
}

pub struct ContextEngine {
    index: CorpusIndex,
    corpus: CorpusConfig,
    extractor: Box<dyn TextExtractor>,
    search_params: SearchParams,
    assembler: ContextAssembler,
    max_context_chars: usize,
}

impl ContextEngine {
    pub fn new(config: &Config) -> Self {
        let retrieval = &config.retrieval;
        let params = IndexParams {
            max_df_ratio: retrieval.max_df_ratio,
            min_df: retrieval.min_df,
            ..IndexParams::default()
        };
        let assembler = ContextAssembler {
            min_fragment_chars: retrieval.min_fragment_chars,
            ..ContextAssembler::default()
        };
        Self {
            index: CorpusIndex::new(params),
            corpus: config.corpus.clone(),
            extractor: Box::new(FileExtractor),
            search_params: SearchParams {
                top_k: retrieval.top_k,
                excerpt_chars: retrieval.excerpt_chars,
            },
            assembler,
            max_context_chars: retrieval.max_context_chars,
        }
    }

    /// Fit the index on `documents`. Returns the number indexed; `0` leaves
    /// the index unavailable and retrieval returns no context.
    pub fn index_documents(&self, documents: Vec<Document>) -> usize {
        self.index.rebuild(documents)
    }

    /// Scan the configured corpus directory and rebuild the index from it.
    pub fn reindex(&self) -> Result<usize> {
        let documents = scan_corpus(&self.corpus, self.extractor.as_ref())?;
        Ok(self.index_documents(documents))
    }

    pub fn index(&self) -> &CorpusIndex {
        &self.index
    }

    pub fn document_count(&self) -> usize {
        self.index.snapshot().map(|s| s.len()).unwrap_or(0)
    }

    /// Rank documents for `query`. `limit` overrides the configured top-k.
    pub fn search(&self, query: &str, limit: Option<usize>) -> Vec<RankedResult> {
        let params = SearchParams {
            top_k: limit.unwrap_or(self.search_params.top_k),
            ..self.search_params
        };
        self.index.search(query, &params)
    }

    /// Context for `query`, at most `max_chars` characters. Empty means no
    /// relevant document was found or no index is available.
    pub fn retrieve_context(&self, query: &str, max_chars: usize) -> String {
        let results = self.search(query, None);
        self.assembler.assemble(&results, max_chars)
    }

    /// Search and assemble with the configured context budget.
    pub fn retrieve(&self, query: &str) -> Retrieval {
        let results = self.search(query, None);
        let context = self.assembler.assemble(&results, self.max_context_chars);
        if results.is_empty() {
            debug!("no relevant documents for query");
        } else {
            info!(
                hits = results.len(),
                top_score = results[0].score,
                context_chars = context.chars().count(),
                "context retrieved"
            );
        }
        Retrieval { results, context }
    }

    pub fn max_context_chars(&self) -> usize {
        self.max_context_chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn engine_for(root: &std::path::Path) -> ContextEngine {
        let mut config = Config::default();
        config.corpus.root = root.to_path_buf();
        ContextEngine::new(&config)
    }

    #[test]
    fn retrieval_is_empty_before_indexing() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_for(tmp.path());
        assert!(engine.search("bail", None).is_empty());
        assert_eq!(engine.retrieve_context("bail", 4000), "");
        assert_eq!(engine.document_count(), 0);
    }

    #[test]
    fn reindex_reads_corpus_and_retrieves() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("bail.txt"),
            "Le bail commercial. Le bail est conclu pour neuf ans. Résiliation du bail.",
        )
        .unwrap();
        fs::write(
            tmp.path().join("habitation.txt"),
            "Le bail d'habitation et le montant du loyer.",
        )
        .unwrap();
        fs::write(
            tmp.path().join("travail.txt"),
            "Le contrat de travail. Le loyer du logement de fonction.",
        )
        .unwrap();

        let engine = engine_for(tmp.path());
        assert_eq!(engine.reindex().unwrap(), 3);

        let hits = engine.search("bail", Some(5));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].label, "bail.txt");
        assert!(hits[0].score > hits[1].score);
        assert!(hits.iter().all(|h| h.score > 0.0));

        let retrieval = engine.retrieve("bail");
        assert!(retrieval.context.contains("Document 1 (bail.txt"));
        assert!(retrieval.context.chars().count() <= engine.max_context_chars());
    }

    #[test]
    fn empty_corpus_leaves_index_unavailable() {
        let tmp = TempDir::new().unwrap();
        let engine = engine_for(tmp.path());
        assert_eq!(engine.reindex().unwrap(), 0);
        assert!(!engine.index().is_built());
    }

    #[test]
    fn missing_root_drops_previous_index() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("corpus");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("bail.txt"), "Le bail commercial est conclu pour neuf ans.").unwrap();

        let engine = engine_for(&root);
        assert_eq!(engine.reindex().unwrap(), 1);
        assert!(engine.index().is_built());

        fs::remove_dir_all(&root).unwrap();
        assert_eq!(engine.reindex().unwrap(), 0);
        assert!(!engine.index().is_built());
        assert_eq!(engine.retrieve_context("bail", 4000), "");
    }
}
