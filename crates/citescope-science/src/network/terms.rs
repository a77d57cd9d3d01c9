use std::collections::HashMap;
use std::sync::Arc;

use citescope_core::NO_ABSTRACT;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::network::stopwords::is_stop_word;

pub const DEFAULT_KEY_TERMS: usize = 10;

static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{L}[\p{L}\p{N}'\-]*|\p{N}+(?:[.,]\p{N}+)*").expect("valid regex"));

/// Coarse part-of-speech classes the extractor cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOfSpeech {
    Noun,
    ProperNoun,
    Adjective,
    Verb,
    Adverb,
    Number,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedToken {
    pub text: String,
    pub pos: PartOfSpeech,
    pub lemma: String,
    pub is_stop: bool,
}

/// Linguistic annotation backend. Load once, then share across calls.
pub trait LinguisticAnnotator: Send + Sync {
    fn annotate(&self, text: &str) -> Vec<AnnotatedToken>;
}

// ─── RuleBasedAnnotator ───────────────────────────────────────────────────────

/// Dependency-free annotator: regex tokenizer, suffix-driven POS guesses and
/// plural-stripping lemmas.
#[derive(Debug, Clone, Default)]
pub struct RuleBasedAnnotator;

const ADJECTIVE_SUFFIXES: &[&str] = &[
    "able", "ible", "al", "ful", "ic", "ical", "ive", "less", "ous", "ary", "ish", "ian",
];
const VERB_SUFFIXES: &[&str] = &["ing", "ed", "ize", "ise", "ify"];

impl RuleBasedAnnotator {
    pub fn new() -> Self {
        Self
    }

    fn tag(word: &str, sentence_start: bool) -> PartOfSpeech {
        let first = word.chars().next().unwrap_or_default();
        if first.is_numeric() {
            return PartOfSpeech::Number;
        }
        if is_stop_word(word) {
            return PartOfSpeech::Other;
        }
        if first.is_uppercase() && !sentence_start {
            return PartOfSpeech::ProperNoun;
        }
        let lower = word.to_lowercase();
        if lower.len() > 4 && lower.ends_with("ly") {
            return PartOfSpeech::Adverb;
        }
        if lower.len() > 5 && ADJECTIVE_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            return PartOfSpeech::Adjective;
        }
        if lower.len() > 5 && VERB_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            return PartOfSpeech::Verb;
        }
        PartOfSpeech::Noun
    }

    fn lemmatize(word: &str) -> String {
        let lower = word.to_lowercase();
        if lower.len() > 4 && lower.ends_with("ies") {
            return format!("{}y", &lower[..lower.len() - 3]);
        }
        if lower.len() > 4
            && (lower.ends_with("sses") || lower.ends_with("xes") || lower.ends_with("ches"))
        {
            return lower[..lower.len() - 2].to_string();
        }
        if lower.len() > 3
            && lower.ends_with('s')
            && !["ss", "us", "is", "as"].iter().any(|s| lower.ends_with(s))
        {
            return lower[..lower.len() - 1].to_string();
        }
        lower
    }
}

impl LinguisticAnnotator for RuleBasedAnnotator {
    fn annotate(&self, text: &str) -> Vec<AnnotatedToken> {
        let mut tokens = Vec::new();
        let mut sentence_start = true;
        let mut last_end = 0;

        for m in WORD_RE.find_iter(text) {
            let gap = &text[last_end..m.start()];
            if gap.contains(['.', '!', '?', ':']) {
                sentence_start = true;
            }
            last_end = m.end();

            let word = m.as_str().trim_end_matches(['\'', '-']);
            if word.is_empty() {
                continue;
            }
            let pos = Self::tag(word, sentence_start);
            tokens.push(AnnotatedToken {
                text: word.to_string(),
                pos,
                lemma: if pos == PartOfSpeech::ProperNoun {
                    word.to_string()
                } else {
                    Self::lemmatize(word)
                },
                is_stop: is_stop_word(word),
            });
            sentence_start = false;
        }
        tokens
    }
}

// ─── KeyTermExtractor ─────────────────────────────────────────────────────────

/// Ranks nouns, proper nouns and adjectives by frequency.
#[derive(Clone)]
pub struct KeyTermExtractor {
    annotator: Arc<dyn LinguisticAnnotator>,
}

impl KeyTermExtractor {
    pub fn new(annotator: Arc<dyn LinguisticAnnotator>) -> Self {
        Self { annotator }
    }

    /// Up to `n` lower-cased lemmas, most frequent first; ties keep the order
    /// of first occurrence.
    pub fn extract_terms(&self, text: &str, n: usize) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() || text == NO_ABSTRACT || n == 0 {
            return Vec::new();
        }

        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let kept = self.annotator.annotate(text).into_iter().filter(|t| {
            matches!(
                t.pos,
                PartOfSpeech::Noun | PartOfSpeech::ProperNoun | PartOfSpeech::Adjective
            ) && !t.is_stop
        });
        for (order, token) in kept.enumerate() {
            let term = token.lemma.to_lowercase();
            if term.is_empty() {
                continue;
            }
            counts.entry(term).or_insert((0, order)).0 += 1;
        }

        let mut ranked: Vec<(String, (usize, usize))> = counts.into_iter().collect();
        ranked.sort_by(|(_, (ca, fa)), (_, (cb, fb))| cb.cmp(ca).then(fa.cmp(fb)));
        ranked.into_iter().take(n).map(|(term, _)| term).collect()
    }
}

impl Default for KeyTermExtractor {
    fn default() -> Self {
        Self::new(Arc::new(RuleBasedAnnotator::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAnnotator(Vec<AnnotatedToken>);

    impl LinguisticAnnotator for FixedAnnotator {
        fn annotate(&self, _text: &str) -> Vec<AnnotatedToken> {
            self.0.clone()
        }
    }

    fn tok(lemma: &str, pos: PartOfSpeech, is_stop: bool) -> AnnotatedToken {
        AnnotatedToken {
            text: lemma.to_string(),
            pos,
            lemma: lemma.to_string(),
            is_stop,
        }
    }

    #[test]
    fn empty_and_sentinel_text_yield_nothing() {
        let ex = KeyTermExtractor::default();
        assert!(ex.extract_terms("", 10).is_empty());
        assert!(ex.extract_terms("   ", 10).is_empty());
        assert!(ex.extract_terms(NO_ABSTRACT, 10).is_empty());
    }

    #[test]
    fn ranks_by_frequency_then_first_occurrence() {
        let ex = KeyTermExtractor::new(Arc::new(FixedAnnotator(vec![
            tok("Fish", PartOfSpeech::ProperNoun, false),
            tok("stock", PartOfSpeech::Noun, false),
            tok("run", PartOfSpeech::Verb, false),
            tok("marine", PartOfSpeech::Adjective, false),
            tok("stock", PartOfSpeech::Noun, false),
            tok("other", PartOfSpeech::Adjective, true),
            tok("marine", PartOfSpeech::Adjective, false),
            tok("quota", PartOfSpeech::Noun, false),
        ])));

        assert_eq!(
            ex.extract_terms("ignored", 10),
            vec!["stock", "marine", "fish", "quota"]
        );
        assert_eq!(ex.extract_terms("ignored", 2), vec!["stock", "marine"]);
    }

    #[test]
    fn rule_based_annotator_tags_and_lemmatizes() {
        let tokens = RuleBasedAnnotator::new().annotate("The fisheries of Norway are historical.");
        let by_text = |t: &str| tokens.iter().find(|tok| tok.text == t).unwrap().clone();

        assert!(by_text("The").is_stop);
        assert_eq!(by_text("fisheries").lemma, "fishery");
        assert_eq!(by_text("fisheries").pos, PartOfSpeech::Noun);
        assert_eq!(by_text("Norway").pos, PartOfSpeech::ProperNoun);
        assert_eq!(by_text("historical").pos, PartOfSpeech::Adjective);
    }

    #[test]
    fn default_extractor_end_to_end() {
        let ex = KeyTermExtractor::default();
        let terms = ex.extract_terms(
            "Citation networks. Citation networks link papers through references.",
            3,
        );
        assert_eq!(terms[0], "citation");
        assert_eq!(terms[1], "network");
        assert!(terms.len() <= 3);
    }
}
