//! Bounded context assembly.
//!
//! Turns ranked results into one labelled text block that never exceeds a
//! character budget. Greedy and order-preserving: sections are appended in
//! rank order; the first section that does not fit is either truncated (if
//! at least `min_fragment_chars` of its excerpt still fit) or dropped
//! together with everything after it.

use crate::models::RankedResult;

pub const DEFAULT_MAX_CONTEXT_CHARS: usize = 4000;
pub const DEFAULT_MIN_FRAGMENT_CHARS: usize = 100;
pub const DEFAULT_PREAMBLE: &str = "Informations juridiques pertinentes :\n\n";

const SECTION_SEPARATOR: &str = "\n\n";
const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextAssembler {
    /// Opening label, emitted once before the first section.
    pub preamble: String,
    /// Smallest excerpt fragment worth emitting when truncating.
    pub min_fragment_chars: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE.to_string(),
            min_fragment_chars: DEFAULT_MIN_FRAGMENT_CHARS,
        }
    }
}

impl ContextAssembler {
    /// Build the context block. `""` means no context is available.
    ///
    /// The returned string is at most `max_chars` characters long.
    pub fn assemble(&self, results: &[RankedResult], max_chars: usize) -> String {
        if results.is_empty() {
            return String::new();
        }

        let mut out = self.preamble.clone();
        let mut used = out.chars().count();
        let separator_len = SECTION_SEPARATOR.chars().count();
        let ellipsis_len = ELLIPSIS.chars().count();
        let mut sections = 0usize;

        for (i, result) in results.iter().enumerate() {
            if used >= max_chars {
                break;
            }

            let header = section_header(i + 1, result);
            let header_len = header.chars().count();
            let excerpt_len = result.excerpt.chars().count();

            if used + header_len + excerpt_len + separator_len <= max_chars {
                out.push_str(&header);
                out.push_str(&result.excerpt);
                out.push_str(SECTION_SEPARATOR);
                used += header_len + excerpt_len + separator_len;
                sections += 1;
                continue;
            }

            let available =
                max_chars.saturating_sub(used + header_len + separator_len + ellipsis_len);
            if available < self.min_fragment_chars.max(1) {
                break;
            }

            out.push_str(&header);
            out.extend(result.excerpt.chars().take(available));
            out.push_str(ELLIPSIS);
            out.push_str(SECTION_SEPARATOR);
            sections += 1;
            break;
        }

        if sections == 0 {
            return String::new();
        }
        out
    }
}

fn section_header(index: usize, result: &RankedResult) -> String {
    format!(
        "Document {} ({}, score: {:.2}):\n",
        index, result.label, result.score
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, score: f64, excerpt: &str) -> RankedResult {
        RankedResult {
            position: 0,
            document_id: label.to_string(),
            source: format!("/corpus/{}", label),
            label: label.to_string(),
            score,
            excerpt: excerpt.to_string(),
        }
    }

    #[test]
    fn empty_results_give_empty_context() {
        let assembler = ContextAssembler::default();
        assert_eq!(assembler.assemble(&[], 4000), "");
        assert_eq!(assembler.assemble(&[], 0), "");
    }

    #[test]
    fn sections_are_labelled_in_rank_order() {
        let assembler = ContextAssembler::default();
        let ctx = assembler.assemble(
            &[
                result("code_travail.pdf", 0.8123, "Article 14: préavis."),
                result("coc.pdf", 0.4, "Article 242: contrats."),
            ],
            4000,
        );
        assert!(ctx.starts_with(DEFAULT_PREAMBLE));
        let first = ctx.find("Document 1 (code_travail.pdf, score: 0.81):\nArticle 14").unwrap();
        let second = ctx.find("Document 2 (coc.pdf, score: 0.40):\nArticle 242").unwrap();
        assert!(first < second);
    }

    #[test]
    fn overflowing_section_is_truncated_within_budget() {
        let assembler = ContextAssembler::default();
        let long = "x".repeat(1000);
        let results = vec![result("a.pdf", 0.9, &long), result("b.pdf", 0.5, &long)];
        let ctx = assembler.assemble(&results, 1500);
        assert!(ctx.chars().count() <= 1500);
        assert!(ctx.contains("Document 2 (b.pdf"));
        assert!(ctx.trim_end().ends_with("..."));
    }

    #[test]
    fn fragment_below_minimum_stops_assembly() {
        let assembler = ContextAssembler::default();
        let long = "y".repeat(1000);
        let results = vec![result("a.pdf", 0.9, &long), result("b.pdf", 0.5, &long)];
        // room for the first section plus fewer than 100 chars of the second
        let budget = DEFAULT_PREAMBLE.chars().count() + 1100;
        let ctx = assembler.assemble(&results, budget);
        assert!(ctx.contains("Document 1"));
        assert!(!ctx.contains("Document 2"));
        assert!(ctx.chars().count() <= budget);
    }

    #[test]
    fn budget_smaller_than_preamble_gives_empty() {
        let assembler = ContextAssembler::default();
        let ctx = assembler.assemble(&[result("a.pdf", 0.9, "texte")], 10);
        assert_eq!(ctx, "");
    }

    #[test]
    fn output_never_exceeds_budget() {
        let assembler = ContextAssembler::default();
        let results: Vec<RankedResult> = (0..3)
            .map(|i| result(&format!("doc{}.pdf", i), 0.3, &"حق ".repeat(400)))
            .collect();
        for budget in [0, 1, 50, 150, 200, 500, 1234, 2500, 4000, 10_000] {
            let ctx = assembler.assemble(&results, budget);
            assert!(
                ctx.chars().count() <= budget,
                "budget {} exceeded: {}",
                budget,
                ctx.chars().count()
            );
        }
    }
}
