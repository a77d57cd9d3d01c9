pub mod builder;
pub mod stopwords;
pub mod terms;
pub mod tfidf;

pub use builder::{NetworkBuilder, WorkText};
pub use terms::{
    AnnotatedToken, DEFAULT_KEY_TERMS, KeyTermExtractor, LinguisticAnnotator, PartOfSpeech,
    RuleBasedAnnotator,
};
pub use tfidf::{SimilarityCache, SimilarityMatrix};
