use std::collections::HashSet;

use citescope_core::{
    CitescopeError, NO_TITLE, NetworkEdge, NetworkNode, RecordStore, SimilarityNetwork,
    StoredRecord,
};

use crate::error::Result;
use crate::network::terms::{DEFAULT_KEY_TERMS, KeyTermExtractor};
use crate::network::tfidf::SimilarityCache;

/// One input document for the network.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkText {
    pub id: String,
    pub title: String,
    pub text: String,
}

impl WorkText {
    pub fn new(id: impl Into<String>, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            text: text.into(),
        }
    }
}

impl From<&StoredRecord> for WorkText {
    fn from(stored: &StoredRecord) -> Self {
        let record = &stored.record;
        Self::new(record.id.clone(), record.title.clone(), record.text())
    }
}

/// Builds text-similarity networks; keeps the last similarity matrix memoized.
pub struct NetworkBuilder {
    extractor: KeyTermExtractor,
    key_terms: usize,
    cache: SimilarityCache,
}

impl NetworkBuilder {
    pub fn new(extractor: KeyTermExtractor) -> Self {
        Self {
            extractor,
            key_terms: DEFAULT_KEY_TERMS,
            cache: SimilarityCache::new(),
        }
    }

    pub fn with_key_terms(mut self, n: usize) -> Self {
        self.key_terms = n;
        self
    }

    pub fn cache(&self) -> &SimilarityCache {
        &self.cache
    }

    pub fn invalidate_cache(&mut self) {
        self.cache.invalidate();
    }

    /// One node per distinct id (first occurrence wins) and one edge per
    /// unordered pair whose similarity is strictly positive.
    pub fn build(&mut self, works: &[WorkText]) -> SimilarityNetwork {
        let mut seen = HashSet::new();
        let works: Vec<&WorkText> = works.iter().filter(|w| seen.insert(w.id.as_str())).collect();

        let nodes = works
            .iter()
            .map(|w| NetworkNode {
                id: w.id.clone(),
                title: if w.title.is_empty() {
                    NO_TITLE.to_string()
                } else {
                    w.title.clone()
                },
                key_terms: self.extractor.extract_terms(&w.text, self.key_terms),
            })
            .collect();

        let texts: Vec<&str> = works.iter().map(|w| w.text.as_str()).collect();
        let matrix = self.cache.get_or_compute(&texts);

        let mut edges = Vec::new();
        for i in 0..matrix.len() {
            for j in (i + 1)..matrix.len() {
                let weight = matrix.get(i, j);
                if weight > 0.0 {
                    edges.push(NetworkEdge {
                        source: works[i].id.clone(),
                        target: works[j].id.clone(),
                        weight,
                    });
                }
            }
        }

        tracing::info!(nodes = works.len(), edges = edges.len(), "network built");
        SimilarityNetwork { nodes, edges }
    }

    /// Network over the seed (depth 0) plus depth `depth`, or every depth in
    /// `1..=depth` when `include_deeper` is set.
    ///
    /// Missing partitions are skipped with a warning; an empty selection is
    /// `CitescopeError::NoRecords`.
    pub fn build_from_store<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        depth: u32,
        include_deeper: bool,
    ) -> Result<SimilarityNetwork> {
        let mut wanted = vec![0];
        if include_deeper {
            wanted.extend(1..=depth);
        } else if depth > 0 {
            wanted.push(depth);
        }

        let mut works = Vec::new();
        for d in wanted {
            match store.list_depth(d) {
                Ok(records) => {
                    tracing::debug!(depth = d, records = records.len(), "loaded partition");
                    works.extend(records.iter().map(WorkText::from));
                }
                Err(CitescopeError::DirectoryNotFound(dir)) => {
                    tracing::warn!(depth = d, "no records partition at {dir}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        if works.is_empty() {
            return Err(CitescopeError::NoRecords(store.location()).into());
        }
        Ok(self.build(&works))
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new(KeyTermExtractor::default())
    }
}

#[cfg(test)]
mod tests {
    use citescope_core::{JsonRecordStore, MemoryRecordStore, WorkRecord};
    use tempfile::TempDir;

    use super::*;
    use crate::error::ScienceError;

    fn texts() -> Vec<WorkText> {
        vec![
            WorkText::new("W1", "Citation graphs", "citation graph crawling depth"),
            WorkText::new("W2", "Graph similarity", "similarity of citation graph nodes"),
            WorkText::new("W3", "Fisheries", "marine fisheries stock assessment"),
        ]
    }

    #[test]
    fn edges_are_positive_and_unique_pairs() {
        let net = NetworkBuilder::default().build(&texts());

        assert_eq!(net.nodes.len(), 3);
        assert_eq!(net.edges.len(), 1);
        let mut pairs = HashSet::new();
        for e in &net.edges {
            assert!(e.weight > 0.0);
            assert_ne!(e.source, e.target);
            let key = if e.source < e.target {
                (e.source.clone(), e.target.clone())
            } else {
                (e.target.clone(), e.source.clone())
            };
            assert!(pairs.insert(key));
        }
        assert!(net.weight("W2", "W1").is_some());
        assert!(net.weight("W1", "W3").is_none());
    }

    #[test]
    fn single_text_gives_node_without_edges() {
        let net = NetworkBuilder::default().build(&texts()[..1]);
        assert_eq!(net.nodes.len(), 1);
        assert!(net.edges.is_empty());
        assert!(net.node("W1").unwrap().key_terms.contains(&"citation".to_string()));
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let mut input = texts();
        input.push(WorkText::new("W1", "Other", "something else entirely"));
        let net = NetworkBuilder::default().build(&input);
        assert_eq!(net.nodes.len(), 3);
        assert_eq!(net.node("W1").unwrap().title, "Citation graphs");
    }

    #[test]
    fn repeated_build_hits_cache() {
        let mut builder = NetworkBuilder::default();
        let first = builder.build(&texts());
        let second = builder.build(&texts());
        assert_eq!(first, second);
        assert_eq!(builder.cache().hits(), 1);
    }

    fn stored(store: &MemoryRecordStore, depth: u32, id: &str, title: &str, abstract_text: &str) {
        let mut r = WorkRecord::new(id);
        r.title = title.to_string();
        r.abstract_text = abstract_text.to_string();
        store.put(depth, &r).unwrap();
    }

    #[test]
    fn build_from_store_selects_depths() {
        let store = MemoryRecordStore::new();
        stored(&store, 0, "S", "Citation crawling", "graph of references");
        stored(&store, 1, "A", "Reference graphs", "citation graph");
        stored(&store, 2, "B", "Deep crawl", "citation depth");

        let mut builder = NetworkBuilder::default();
        let only_two = builder.build_from_store(&store, 2, false).unwrap();
        let ids: Vec<_> = only_two.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["S", "B"]);

        let all = builder.build_from_store(&store, 2, true).unwrap();
        assert_eq!(all.nodes.len(), 3);

        let seed_only = builder.build_from_store(&store, 0, false).unwrap();
        assert_eq!(seed_only.nodes.len(), 1);
        assert!(seed_only.edges.is_empty());
    }

    #[test]
    fn missing_partition_is_skipped() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path());
        store.put(0, &WorkRecord::new("https://openalex.org/W1")).unwrap();

        let net = NetworkBuilder::default().build_from_store(&store, 3, false).unwrap();
        assert_eq!(net.nodes.len(), 1);
        assert_eq!(net.nodes[0].title, NO_TITLE);
        assert!(net.nodes[0].key_terms.is_empty());
    }

    #[test]
    fn no_records_anywhere_names_the_location() {
        let dir = TempDir::new().unwrap();
        let store = JsonRecordStore::new(dir.path().join("records"));

        let err = NetworkBuilder::default()
            .build_from_store(&store, 1, true)
            .unwrap_err();
        assert!(matches!(err, ScienceError::Storage(CitescopeError::NoRecords(_))));
        assert!(err.to_string().contains("records"));
    }
}
