use serde::{Deserialize, Serialize};

/// Text-similarity network over a set of works.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityNetwork {
    pub nodes: Vec<NetworkNode>,
    pub edges: Vec<NetworkEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub key_terms: Vec<String>,
}

/// Undirected weighted edge. `source != target` and `weight > 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

impl SimilarityNetwork {
    pub fn node(&self, id: &str) -> Option<&NetworkNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Weight of the edge between `a` and `b` in either direction.
    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        self.edges
            .iter()
            .find(|e| (e.source == a && e.target == b) || (e.source == b && e.target == a))
            .map(|e| e.weight)
    }
}
