//! Heuristic language detection.
//!
//! Two independent strategies, selected by [`DetectionStrategy`]:
//!
//! | Strategy | Signal | Detected |
//! |----------|--------|----------|
//! | [`ScriptDetector`] | any Arabic-script code point | `arabic` |
//! | [`MarkerDetector`] | ≥ 2 distinct Tunisian dialect markers | `tunisian` |
//!
//! Both fall back to a configured default and never fail.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::index::tokenize;
use crate::models::Language;

/// Tunisian dialect markers, Latin (arabizi) and Arabic script.
pub const TUNISIAN_MARKERS: &[&str] = &[
    "chneya", "شنية", "kifech", "كيفاش", "3la", "على", "fi", "في", "enti", "انتي", "ena", "انا",
    "mte3", "متاع", "barcha", "برشا", "yezzi", "يزي", "tawa", "توا", "chkoun", "شكون", "waqteh",
    "وقتاه", "lahna", "لهنا", "fama", "فما", "mech", "مش", "bellehi", "بالهي", "ya3tik", "يعطيك",
    "sahbi", "صاحبي", "3andi", "عندي", "9oli", "قولي", "7aja", "حاجة", "3lech", "علاش", "chnowa",
    "شنوة", "bech", "باش", "ma3neha", "معناها", "khalini", "خليني", "na3ref", "نعرف", "lazem",
    "لازم", "mawjoud", "موجود", "9anoun", "قانون", "7a9", "حق", "chghol", "شغل",
];

pub const DEFAULT_MARKER_THRESHOLD: usize = 2;

/// Classifies free text into one of the configured [`Language`] tags.
pub trait LanguageDetector: Send + Sync {
    /// Strategy name, as used in configuration.
    fn name(&self) -> &'static str;

    fn detect(&self, text: &str) -> Language;
}

/// Arabic-script presence detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptDetector {
    pub detected: Language,
    pub fallback: Language,
}

impl ScriptDetector {
    pub fn new(fallback: Language) -> Self {
        Self {
            detected: Language::Arabic,
            fallback,
        }
    }
}

impl Default for ScriptDetector {
    fn default() -> Self {
        Self::new(Language::French)
    }
}

/// Arabic, Arabic Supplement, Arabic Extended-A and the presentation forms.
pub fn is_arabic_char(c: char) -> bool {
    matches!(
        c,
        '\u{0600}'..='\u{06FF}'
            | '\u{0750}'..='\u{077F}'
            | '\u{08A0}'..='\u{08FF}'
            | '\u{FB50}'..='\u{FDFF}'
            | '\u{FE70}'..='\u{FEFF}'
    )
}

impl LanguageDetector for ScriptDetector {
    fn name(&self) -> &'static str {
        "script"
    }

    fn detect(&self, text: &str) -> Language {
        if text.chars().any(is_arabic_char) {
            self.detected
        } else {
            self.fallback
        }
    }
}

/// Lexical marker-count detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerDetector {
    pub markers: BTreeSet<String>,
    /// Distinct markers needed to report `detected`.
    pub threshold: usize,
    pub detected: Language,
    pub fallback: Language,
}

impl MarkerDetector {
    pub fn new(fallback: Language) -> Self {
        Self {
            markers: TUNISIAN_MARKERS.iter().map(|m| m.to_lowercase()).collect(),
            threshold: DEFAULT_MARKER_THRESHOLD,
            detected: Language::Tunisian,
            fallback,
        }
    }

    /// Replace the marker list. Markers are case-folded.
    pub fn with_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.markers = markers
            .into_iter()
            .map(|m| m.as_ref().trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        self
    }

    /// Distinct markers present in `text`, in marker order.
    pub fn matched_markers(&self, text: &str) -> Vec<String> {
        let tokens: BTreeSet<String> = tokenize(text).collect();
        self.markers
            .iter()
            .filter(|m| tokens.contains(*m))
            .cloned()
            .collect()
    }
}

impl Default for MarkerDetector {
    fn default() -> Self {
        Self::new(Language::French)
    }
}

impl LanguageDetector for MarkerDetector {
    fn name(&self) -> &'static str {
        "markers"
    }

    fn detect(&self, text: &str) -> Language {
        if self.matched_markers(text).len() >= self.threshold.max(1) {
            self.detected
        } else {
            self.fallback
        }
    }
}

/// Named detection policy, selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionStrategy {
    Script,
    Markers,
}

impl fmt::Display for DetectionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionStrategy::Script => f.write_str("script"),
            DetectionStrategy::Markers => f.write_str("markers"),
        }
    }
}

impl FromStr for DetectionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "script" => Ok(DetectionStrategy::Script),
            "markers" | "marker" => Ok(DetectionStrategy::Markers),
            other => Err(format!(
                "unknown detection strategy '{}'. Use script or markers.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_detector_defaults_without_arabic() {
        let detector = ScriptDetector::new(Language::English);
        assert_eq!(detector.detect("Hello, how are you?"), Language::English);
        assert_eq!(detector.detect(""), Language::English);
    }

    #[test]
    fn script_detector_flags_arabic() {
        let detector = ScriptDetector::default();
        assert_eq!(detector.detect("شنية الحكاية"), Language::Arabic);
        assert_eq!(detector.detect("mon bail, شنية ?"), Language::Arabic);
    }

    #[test]
    fn marker_detector_registers_arabic_marker() {
        let detector = MarkerDetector::default();
        let matched = detector.matched_markers("شنية الحكاية");
        assert!(matched.contains(&"شنية".to_string()));
    }

    #[test]
    fn marker_detector_needs_two_distinct_markers() {
        let detector = MarkerDetector::default();
        assert_eq!(detector.detect("Chneya el 9anoun ?"), Language::Tunisian);
        assert_eq!(detector.detect("chneya chneya chneya"), Language::French);
        assert_eq!(
            detector.detect("Quel est le délai de préavis ?"),
            Language::French
        );
    }

    #[test]
    fn marker_detector_matches_whole_tokens() {
        let detector = MarkerDetector::default();
        // "fi" and "ena" appear inside French words but are not tokens here
        assert!(detector.matched_markers("la confiance du bénéficiaire").is_empty());
    }

    #[test]
    fn custom_markers_are_case_folded() {
        let detector = MarkerDetector::default().with_markers(["Wesh", "BARSHA", " "]);
        assert_eq!(detector.markers.len(), 2);
        assert_eq!(detector.detect("wesh barsha"), Language::Tunisian);
    }

    #[test]
    fn strategy_parses_and_displays() {
        let strategy: DetectionStrategy = "Markers".parse().unwrap();
        assert_eq!(strategy, DetectionStrategy::Markers);
        assert_eq!(
            "script".parse::<DetectionStrategy>().unwrap().to_string(),
            "script"
        );
        assert!("vibes".parse::<DetectionStrategy>().is_err());
    }
}
