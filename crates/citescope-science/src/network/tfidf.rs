use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::network::stopwords::is_stop_word;

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").expect("valid regex"));

/// Sparse row: term index -> weight, L2-normalized.
pub type SparseVector = BTreeMap<usize, f64>;

/// TF-IDF vectors over a fitted vocabulary.
#[derive(Debug, Clone, Default)]
pub struct TfIdfMatrix {
    pub vocabulary: Vec<String>,
    pub rows: Vec<SparseVector>,
}

/// Lower-cased `\b\w\w+\b` tokens with English stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !is_stop_word(t))
        .map(ToOwned::to_owned)
        .collect()
}

/// Raw counts times smoothed idf `ln((1 + n) / (1 + df)) + 1`, rows L2-normalized.
pub fn vectorize<S: AsRef<str>>(texts: &[S]) -> TfIdfMatrix {
    let docs: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t.as_ref())).collect();

    let mut index: HashMap<String, usize> = HashMap::new();
    let mut vocabulary = Vec::new();
    let mut counts: Vec<HashMap<usize, usize>> = Vec::with_capacity(docs.len());
    for doc in &docs {
        let mut tf = HashMap::new();
        for token in doc {
            let id = *index.entry(token.clone()).or_insert_with(|| {
                vocabulary.push(token.clone());
                vocabulary.len() - 1
            });
            *tf.entry(id).or_insert(0) += 1;
        }
        counts.push(tf);
    }

    let mut df = vec![0usize; vocabulary.len()];
    for tf in &counts {
        for id in tf.keys() {
            df[*id] += 1;
        }
    }

    let n = docs.len() as f64;
    let idf: Vec<f64> = df
        .iter()
        .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
        .collect();

    let rows = counts
        .into_iter()
        .map(|tf| {
            let mut row: SparseVector = tf
                .into_iter()
                .map(|(id, c)| (id, c as f64 * idf[id]))
                .collect();
            let norm = row.values().map(|w| w * w).sum::<f64>().sqrt();
            if norm > 0.0 {
                row.values_mut().for_each(|w| *w /= norm);
            }
            row
        })
        .collect();

    TfIdfMatrix { vocabulary, rows }
}

fn dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(id, w)| large.get(id).map(|v| w * v))
        .sum()
}

// ─── SimilarityMatrix ─────────────────────────────────────────────────────────

/// Dense symmetric cosine-similarity matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    /// Empty for fewer than two texts. The diagonal is exactly 1.0 for every
    /// text with at least one non-stop-word token and 0.0 otherwise.
    pub fn compute<S: AsRef<str>>(texts: &[S]) -> Self {
        if texts.len() < 2 {
            return Self::default();
        }

        let tfidf = vectorize(texts);
        let size = tfidf.rows.len();
        let mut values = vec![0.0; size * size];
        for i in 0..size {
            values[i * size + i] = if tfidf.rows[i].is_empty() { 0.0 } else { 1.0 };
            for j in (i + 1)..size {
                let sim = dot(&tfidf.rows[i], &tfidf.rows[j]).clamp(0.0, 1.0);
                values[i * size + j] = sim;
                values[j * size + i] = sim;
            }
        }
        Self { size, values }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }
}

// ─── SimilarityCache ──────────────────────────────────────────────────────────

/// Memoizes the last computed matrix, keyed by a hash of the ordered texts
/// together with their count.
#[derive(Debug, Default)]
pub struct SimilarityCache {
    entry: Option<(u64, usize, Arc<SimilarityMatrix>)>,
    hits: usize,
}

fn texts_key<S: AsRef<str>>(texts: &[S]) -> u64 {
    let mut hasher = DefaultHasher::new();
    texts.len().hash(&mut hasher);
    for text in texts {
        text.as_ref().hash(&mut hasher);
    }
    hasher.finish()
}

impl SimilarityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute<S: AsRef<str>>(&mut self, texts: &[S]) -> Arc<SimilarityMatrix> {
        let key = texts_key(texts);
        if let Some((cached_key, cached_len, matrix)) = &self.entry
            && *cached_key == key
            && *cached_len == texts.len()
            && matrix.len() == texts.len()
        {
            self.hits += 1;
            return Arc::clone(matrix);
        }
        let matrix = Arc::new(SimilarityMatrix::compute(texts));
        self.entry = Some((key, texts.len(), Arc::clone(&matrix)));
        matrix
    }

    pub fn invalidate(&mut self) {
        self.entry = None;
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}
