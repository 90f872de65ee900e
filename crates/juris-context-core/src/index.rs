//! TF-IDF corpus index.
//!
//! An [`IndexSnapshot`] is the fitted, immutable state: vocabulary, idf
//! weights and one L2-normalised sparse vector per document. Queries are
//! projected through the snapshot that was fitted on the corpus; nothing
//! here ever refits on a query.
//!
//! [`CorpusIndex`] is the swappable "current index" reference. Rebuilds fit
//! a new snapshot outside the lock and replace the reference in one write,
//! so readers either see the old snapshot or the new one, never a mix.
//!
//! # Weighting
//!
//! 1. Lowercase, split on anything that is not alphanumeric or `_`, keep
//!    tokens of two or more characters, drop stopwords.
//! 2. Document frequency cutoffs: drop terms present in more than
//!    `max_df_ratio × n` documents or in fewer than `min_df` documents.
//!    If that leaves nothing (tiny corpora), refit without cutoffs.
//! 3. `idf(t) = ln((1 + n) / (1 + df(t))) + 1`, `weight = tf × idf`.
//! 4. L2-normalise, so cosine similarity is a sparse dot product.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use crate::error::IndexError;
use crate::models::Document;

/// Stopwords for French legal text.
pub const FRENCH_STOPWORDS: &[&str] = &[
    "a", "à", "au", "aux", "avec", "ce", "ces", "dans", "de", "des", "du", "elle", "en", "et",
    "eux", "il", "ils", "je", "la", "le", "les", "leur", "lui", "ma", "mais", "me", "même", "mes",
    "moi", "mon", "ni", "notre", "nous", "ou", "par", "pas", "pour", "qu", "que", "qui", "s",
    "sa", "se", "si", "son", "sur", "ta", "te", "tes", "toi", "ton", "tu", "un", "une", "votre",
    "vous", "c", "d", "j", "l", "m", "n", "t", "y", "est", "été", "étée", "étées", "étés",
    "étant", "suis", "es", "sommes", "êtes", "sont", "serai", "seras", "sera", "serons", "serez",
    "seront", "serais", "serait", "serions", "seriez", "seraient", "étais", "était", "étions",
    "étiez", "étaient", "fus", "fut", "fûmes", "fûtes", "furent", "sois", "soit", "soyons",
    "soyez", "soient", "fusse", "fusses", "fût", "fussions", "fussiez", "fussent",
];

pub const DEFAULT_MAX_DF_RATIO: f64 = 0.85;
pub const DEFAULT_MIN_DF: usize = 2;

/// Column-sorted sparse vector: `(column, weight)`.
pub type SparseVector = Vec<(usize, f64)>;

/// Parameters fixed at fit time.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexParams {
    /// Terms in more than this share of documents are dropped.
    pub max_df_ratio: f64,
    /// Terms in fewer than this many documents are dropped.
    pub min_df: usize,
    pub stopwords: BTreeSet<String>,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            max_df_ratio: DEFAULT_MAX_DF_RATIO,
            min_df: DEFAULT_MIN_DF,
            stopwords: FRENCH_STOPWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Lowercased tokens of two or more word characters.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().nth(1).is_some())
        .map(str::to_lowercase)
}

fn term_counts(text: &str, stopwords: &BTreeSet<String>) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        if stopwords.contains(&token) {
            continue;
        }
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Fitted TF-IDF state over one document set.
#[derive(Debug)]
pub struct IndexSnapshot {
    documents: Vec<Document>,
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
    vectors: Vec<SparseVector>,
    params: IndexParams,
    pruned: bool,
}

impl IndexSnapshot {
    /// Fit the vocabulary and weights on `documents`.
    pub fn fit(documents: Vec<Document>, params: IndexParams) -> Result<Self, IndexError> {
        if documents.is_empty() {
            return Err(IndexError::NoDocuments);
        }

        let counts: Vec<HashMap<String, usize>> = documents
            .iter()
            .map(|d| term_counts(&d.text, &params.stopwords))
            .collect();

        let mut doc_freq: BTreeMap<&str, usize> = BTreeMap::new();
        for c in &counts {
            for term in c.keys() {
                *doc_freq.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n = documents.len();
        let max_doc_count = params.max_df_ratio * n as f64;
        let kept: Vec<(&str, usize)> = doc_freq
            .iter()
            .filter(|(_, df)| **df as f64 <= max_doc_count && **df >= params.min_df)
            .map(|(t, &df)| (*t, df))
            .collect();

        let (terms, pruned) = if kept.is_empty() && !doc_freq.is_empty() {
            warn!(
                documents = n,
                terms = doc_freq.len(),
                max_df_ratio = params.max_df_ratio,
                min_df = params.min_df,
                "frequency cutoffs removed every term, fitting without cutoffs"
            );
            let all: Vec<(&str, usize)> = doc_freq.iter().map(|(t, &df)| (*t, df)).collect();
            (all, false)
        } else {
            (kept, true)
        };

        if terms.is_empty() {
            return Err(IndexError::EmptyVocabulary { documents: n });
        }

        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(terms.len());
        for (column, (term, df)) in terms.iter().enumerate() {
            vocabulary.insert(term.to_string(), column);
            idf.push(((1.0 + n as f64) / (1.0 + *df as f64)).ln() + 1.0);
        }

        let vectors = counts
            .iter()
            .map(|c| weigh(c, &vocabulary, &idf))
            .collect();

        Ok(Self {
            documents,
            vocabulary,
            idf,
            vectors,
            params,
            pruned,
        })
    }

    /// Project free text into the fitted space. Unknown terms are dropped.
    pub fn project(&self, text: &str) -> SparseVector {
        let counts = term_counts(text, &self.params.stopwords);
        weigh(&counts, &self.vocabulary, &self.idf)
    }

    /// Cosine similarity between a projected query and document `position`.
    pub fn similarity(&self, query: &SparseVector, position: usize) -> f64 {
        match self.vectors.get(position) {
            Some(doc) => sparse_dot(query, doc).clamp(0.0, 1.0),
            None => 0.0,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn contains_term(&self, term: &str) -> bool {
        self.vocabulary.contains_key(term)
    }

    /// Whether the frequency cutoffs were applied (false after the tiny-corpus fallback).
    pub fn is_pruned(&self) -> bool {
        self.pruned
    }
}

fn weigh(
    counts: &HashMap<String, usize>,
    vocabulary: &BTreeMap<String, usize>,
    idf: &[f64],
) -> SparseVector {
    let mut vector: SparseVector = counts
        .iter()
        .filter_map(|(term, &tf)| {
            vocabulary
                .get(term)
                .map(|&column| (column, tf as f64 * idf[column]))
        })
        .collect();
    vector.sort_by_key(|(column, _)| *column);

    let norm = vector.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in vector.iter_mut() {
            *w /= norm;
        }
    }
    vector
}

fn sparse_dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (mut i, mut j) = (0, 0);
    let mut dot = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    dot
}

/// The current index reference, shared between readers and the rebuilder.
///
/// Either holds no snapshot ("not built") or a snapshot fitted on one
/// complete document set.
#[derive(Debug, Default)]
pub struct CorpusIndex {
    params: IndexParams,
    current: RwLock<Option<Arc<IndexSnapshot>>>,
}

impl CorpusIndex {
    pub fn new(params: IndexParams) -> Self {
        Self {
            params,
            current: RwLock::new(None),
        }
    }

    /// Refit on `documents` and swap the result in. Returns the number of
    /// documents indexed; `0` means the index is now unavailable.
    pub fn rebuild(&self, documents: Vec<Document>) -> usize {
        let fitted = IndexSnapshot::fit(documents, self.params.clone());
        let (next, count) = match fitted {
            Ok(snapshot) => {
                info!(
                    documents = snapshot.len(),
                    vocabulary = snapshot.vocabulary_len(),
                    pruned = snapshot.is_pruned(),
                    "corpus index built"
                );
                let count = snapshot.len();
                (Some(Arc::new(snapshot)), count)
            }
            Err(e) => {
                warn!(error = %e, "corpus index unavailable, retrieval will return no context");
                (None, 0)
            }
        };
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = next;
        count
    }

    /// The snapshot in effect right now, if any. Holding the `Arc` keeps
    /// it alive across a concurrent rebuild.
    pub fn snapshot(&self) -> Option<Arc<IndexSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_built(&self) -> bool {
        self.snapshot().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str) -> Document {
        Document::new(id, format!("/corpus/{}.txt", id), text)
    }

    #[test]
    fn tokenize_lowercases_and_drops_single_chars() {
        let tokens: Vec<String> = tokenize("Le Bail d'habitation, art. 3 — L'ARTICLE_12").collect();
        assert_eq!(
            tokens,
            vec!["le", "bail", "habitation", "art", "article_12"]
        );
    }

    #[test]
    fn tokenize_keeps_arabic_and_digits() {
        let tokens: Vec<String> = tokenize("شنية 3la 7a9").collect();
        assert_eq!(tokens, vec!["شنية", "3la", "7a9"]);
    }

    #[test]
    fn fit_rejects_empty_corpus() {
        let err = IndexSnapshot::fit(Vec::new(), IndexParams::default()).unwrap_err();
        assert_eq!(err, IndexError::NoDocuments);
    }

    #[test]
    fn fit_rejects_stopword_only_corpus() {
        let err = IndexSnapshot::fit(vec![doc("a", "le la les de des")], IndexParams::default())
            .unwrap_err();
        assert_eq!(err, IndexError::EmptyVocabulary { documents: 1 });
    }

    #[test]
    fn cutoffs_drop_rare_and_ubiquitous_terms() {
        let docs = vec![
            doc("a", "contrat bail loyer commun"),
            doc("b", "contrat travail salaire commun"),
            doc("c", "bail travail divorce commun"),
            doc("d", "pension salaire commun"),
        ];
        let snap = IndexSnapshot::fit(docs, IndexParams::default()).unwrap();
        assert!(snap.is_pruned());
        // in 4/4 documents > 0.85 × 4
        assert!(!snap.contains_term("commun"));
        // in 1 document < min_df
        assert!(!snap.contains_term("divorce"));
        assert!(snap.contains_term("bail"));
        assert!(snap.contains_term("salaire"));
    }

    #[test]
    fn tiny_corpus_falls_back_to_unpruned_vocabulary() {
        let docs = vec![doc("a", "bail bail loyer"), doc("b", "salaire travail")];
        let snap = IndexSnapshot::fit(docs, IndexParams::default()).unwrap();
        assert!(!snap.is_pruned());
        assert!(snap.contains_term("bail"));
        assert_eq!(snap.vocabulary_len(), 4);
    }

    #[test]
    fn stopwords_never_enter_vocabulary() {
        let docs = vec![doc("a", "le bail est résilié"), doc("b", "le contrat est nul")];
        let snap = IndexSnapshot::fit(docs, IndexParams::default()).unwrap();
        assert!(!snap.contains_term("le"));
        assert!(!snap.contains_term("est"));
    }

    #[test]
    fn projection_ignores_unknown_terms() {
        let docs = vec![doc("a", "bail loyer"), doc("b", "salaire travail")];
        let snap = IndexSnapshot::fit(docs, IndexParams::default()).unwrap();
        assert!(snap.project("zzz inconnu").is_empty());
        let q = snap.project("bail inconnu");
        assert_eq!(q.len(), 1);
        assert!((q[0].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn document_vectors_are_unit_length() {
        let docs = vec![doc("a", "bail loyer loyer"), doc("b", "salaire travail")];
        let snap = IndexSnapshot::fit(docs, IndexParams::default()).unwrap();
        let q = snap.project("bail loyer loyer");
        let self_sim = snap.similarity(&q, 0);
        assert!((self_sim - 1.0).abs() < 1e-9);
        assert_eq!(snap.similarity(&q, 1), 0.0);
        assert_eq!(snap.similarity(&q, 99), 0.0);
    }

    #[test]
    fn rebuild_swaps_and_failed_rebuild_clears() {
        let index = CorpusIndex::new(IndexParams::default());
        assert!(!index.is_built());

        let held = {
            assert_eq!(index.rebuild(vec![doc("a", "bail"), doc("b", "salaire")]), 2);
            index.snapshot().unwrap()
        };

        assert_eq!(index.rebuild(Vec::new()), 0);
        assert!(!index.is_built());
        // a reader that captured the old snapshot keeps using it
        assert_eq!(held.len(), 2);
    }
}
