use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::models::SimilarityNetwork;

/// Write the network as pretty JSON, creating parent directories.
pub fn save_network(path: &Path, network: &SimilarityNetwork) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(network)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn load_network(path: &Path) -> Result<SimilarityNetwork> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NetworkEdge, NetworkNode};
    use tempfile::TempDir;

    #[test]
    fn test_save_network_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results/network_results_depth_1.json");
        let network = SimilarityNetwork {
            nodes: vec![NetworkNode {
                id: "W1".to_string(),
                title: "One".to_string(),
                key_terms: vec!["graph".to_string()],
            }],
            edges: vec![NetworkEdge {
                source: "W1".to_string(),
                target: "W2".to_string(),
                weight: 0.25,
            }],
        };

        save_network(&path, &network).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["nodes"][0]["key_terms"][0], "graph");
        assert_eq!(raw["edges"][0]["weight"], 0.25);
        assert_eq!(load_network(&path).unwrap(), network);
    }
}
