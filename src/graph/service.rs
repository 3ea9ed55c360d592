//! Graph query/update service: validated operations over graph files.
//!
//! Every operation loads a fresh store from the backing file, applies the
//! operation, and (for mutations) persists the whole graph back. Nothing is
//! cached between calls, so independent tool invocations always observe the
//! file's current contents. The load-mutate-save cycle takes no lock:
//! single writer only. Concurrent writers to the same graph file can clobber
//! each other's changes.

use std::path::{Path, PathBuf};

use crate::error::{DocascodeError, Result};
use crate::graph::{
    Direction, EdgeRelation, GraphEdge, GraphNode, GraphStatistics, GraphStore, NodeType,
};

/// Service handle bound to a directory of graph JSON files.
#[derive(Debug, Clone)]
pub struct GraphService {
    graphs_dir: PathBuf,
}

impl GraphService {
    pub fn new(graphs_dir: impl Into<PathBuf>) -> Self {
        Self {
            graphs_dir: graphs_dir.into(),
        }
    }

    pub fn graph_path(&self, graph_file: &str) -> PathBuf {
        self.graphs_dir.join(graph_file)
    }

    /// Load a graph file into a fresh store.
    pub fn load(&self, graph_file: &str) -> Result<GraphStore> {
        let path = self.graph_path(graph_file);
        if !path.exists() {
            return Err(DocascodeError::GraphFileNotFound(graph_file.to_string()));
        }
        let mut store = GraphStore::new();
        store.load_from_file(&path)?;
        Ok(store)
    }

    fn save(&self, store: &GraphStore, graph_file: &str) -> Result<()> {
        store.save_to_file(&self.graph_path(graph_file))
    }

    /// Write a store to a graph file (used by seeding).
    pub fn write(&self, store: &GraphStore, graph_file: &str) -> Result<PathBuf> {
        self.save(store, graph_file)?;
        Ok(self.graph_path(graph_file))
    }

    // --- Query operations (read-only, no persistence) ---

    pub fn get_node(&self, graph_file: &str, node_id: &str) -> Result<GraphNode> {
        let store = self.load(graph_file)?;
        store
            .get_node(node_id)
            .ok_or_else(|| DocascodeError::NodeNotFound(node_id.to_string()))
    }

    pub fn get_neighbors(
        &self,
        graph_file: &str,
        node_id: &str,
        relation: Option<EdgeRelation>,
        direction: Direction,
    ) -> Result<Vec<GraphNode>> {
        let store = self.load(graph_file)?;
        if !store.has_node(node_id) {
            return Err(DocascodeError::NodeNotFound(node_id.to_string()));
        }
        Ok(store
            .get_neighbors(node_id, relation, direction)
            .iter()
            .filter_map(|id| store.get_node(id))
            .collect())
    }

    pub fn get_nodes_by_type(&self, graph_file: &str, node_type: NodeType) -> Result<Vec<GraphNode>> {
        let store = self.load(graph_file)?;
        Ok(store.get_nodes_by_type(node_type))
    }

    pub fn find_path(
        &self,
        graph_file: &str,
        start: &str,
        end: &str,
        max_depth: usize,
    ) -> Result<Vec<GraphNode>> {
        let store = self.load(graph_file)?;
        let path = store.find_path(start, end, max_depth).ok_or_else(|| {
            DocascodeError::PathNotFound(start.to_string(), end.to_string())
        })?;
        Ok(path.iter().filter_map(|id| store.get_node(id)).collect())
    }

    pub fn get_statistics(&self, graph_file: &str) -> Result<GraphStatistics> {
        Ok(self.load(graph_file)?.statistics())
    }

    // --- Update operations (load, mutate, persist whole file) ---

    pub fn add_node(&self, graph_file: &str, node: GraphNode) -> Result<()> {
        let mut store = self.load(graph_file)?;
        let node_id = node.id.clone();
        store.add_node(node);
        self.save(&store, graph_file)?;
        log::info!("Added node {} to {}", node_id, graph_file);
        Ok(())
    }

    pub fn remove_node(&self, graph_file: &str, node_id: &str) -> Result<()> {
        let mut store = self.load(graph_file)?;
        if !store.has_node(node_id) {
            return Err(DocascodeError::NodeNotFound(node_id.to_string()));
        }
        store.remove_node(node_id);
        self.save(&store, graph_file)?;
        log::info!("Removed node {} from {}", node_id, graph_file);
        Ok(())
    }

    /// Add an edge after checking both endpoints exist; the error names the
    /// missing side.
    pub fn add_edge(&self, graph_file: &str, edge: GraphEdge) -> Result<()> {
        let mut store = self.load(graph_file)?;
        if !store.has_node(&edge.source) {
            return Err(DocascodeError::InvalidInput(format!(
                "Source node not found: {}",
                edge.source
            )));
        }
        if !store.has_node(&edge.target) {
            return Err(DocascodeError::InvalidInput(format!(
                "Target node not found: {}",
                edge.target
            )));
        }
        let description = format!("{} --[{}]--> {}", edge.source, edge.relation, edge.target);
        store.add_edge(edge);
        self.save(&store, graph_file)?;
        log::info!("Added edge {} to {}", description, graph_file);
        Ok(())
    }

    pub fn remove_edge(&self, graph_file: &str, source: &str, target: &str) -> Result<()> {
        let mut store = self.load(graph_file)?;
        if !store.has_edge(source, target) {
            return Err(DocascodeError::EdgeNotFound(
                source.to_string(),
                target.to_string(),
            ));
        }
        store.remove_edge(source, target);
        self.save(&store, graph_file)?;
        log::info!("Removed edge {} --> {} from {}", source, target, graph_file);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::sample_underwriting_graph;
    use tempfile::TempDir;

    fn seeded_service() -> (GraphService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let service = GraphService::new(temp_dir.path());
        service
            .write(&sample_underwriting_graph(), "underwriting.json")
            .unwrap();
        (service, temp_dir)
    }

    #[test]
    fn test_missing_graph_file() {
        let temp_dir = TempDir::new().unwrap();
        let service = GraphService::new(temp_dir.path());
        let err = service.get_statistics("missing.json").unwrap_err();
        assert!(matches!(err, DocascodeError::GraphFileNotFound(_)));
    }

    #[test]
    fn test_get_node() {
        let (service, _tmp) = seeded_service();
        let node = service
            .get_node("underwriting.json", "Verify Credit Score")
            .unwrap();
        assert_eq!(node.node_type, NodeType::Process);

        let err = service.get_node("underwriting.json", "Nope").unwrap_err();
        assert!(matches!(err, DocascodeError::NodeNotFound(_)));
    }

    #[test]
    fn test_get_neighbors_filtered() {
        let (service, _tmp) = seeded_service();
        let neighbors = service
            .get_neighbors(
                "underwriting.json",
                "Verify Credit Score",
                Some(EdgeRelation::Requires),
                Direction::Out,
            )
            .unwrap();
        let ids: Vec<&str> = neighbors.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["Credit Bureau API"]);
    }

    #[test]
    fn test_find_path() {
        let (service, _tmp) = seeded_service();
        let path = service
            .find_path("underwriting.json", "Loan Application", "Request Appraisal", 10)
            .unwrap();
        let ids: Vec<&str> = path.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["Loan Application", "Verify Credit Score", "Request Appraisal"]
        );
    }

    #[test]
    fn test_find_path_absent() {
        let (service, _tmp) = seeded_service();
        let err = service
            .find_path("underwriting.json", "Underwriter", "Loan Application", 10)
            .unwrap_err();
        assert!(matches!(err, DocascodeError::PathNotFound(_, _)));
    }

    #[test]
    fn test_add_node_persists() {
        let (service, _tmp) = seeded_service();
        service
            .add_node(
                "underwriting.json",
                GraphNode::new("Flood Zone Review", NodeType::Process),
            )
            .unwrap();
        // Re-load from disk: the mutation survived the round trip
        let node = service
            .get_node("underwriting.json", "Flood Zone Review")
            .unwrap();
        assert_eq!(node.label, "Flood Zone Review");
    }

    #[test]
    fn test_add_edge_validates_endpoints() {
        let (service, _tmp) = seeded_service();
        let err = service
            .add_edge(
                "underwriting.json",
                GraphEdge::new("Loan Application", "Ghost", EdgeRelation::Requires),
            )
            .unwrap_err();
        assert!(err.to_string().contains("Target node not found: Ghost"));

        let err = service
            .add_edge(
                "underwriting.json",
                GraphEdge::new("Phantom", "Loan Application", EdgeRelation::Requires),
            )
            .unwrap_err();
        assert!(err.to_string().contains("Source node not found: Phantom"));
    }

    #[test]
    fn test_remove_edge_persists() {
        let (service, _tmp) = seeded_service();
        service
            .remove_edge("underwriting.json", "Loan Application", "Verify Credit Score")
            .unwrap();
        let stats = service.get_statistics("underwriting.json").unwrap();
        assert_eq!(stats.num_edges, 14);

        let err = service
            .remove_edge("underwriting.json", "Loan Application", "Verify Credit Score")
            .unwrap_err();
        assert!(matches!(err, DocascodeError::EdgeNotFound(_, _)));
    }

    #[test]
    fn test_remove_node_requires_existence() {
        let (service, _tmp) = seeded_service();
        let err = service
            .remove_node("underwriting.json", "Not There")
            .unwrap_err();
        assert!(matches!(err, DocascodeError::NodeNotFound(_)));

        service.remove_node("underwriting.json", "Underwriter").unwrap();
        let stats = service.get_statistics("underwriting.json").unwrap();
        assert_eq!(stats.num_nodes, 15);
    }

    #[test]
    fn test_statistics_on_sample() {
        let (service, _tmp) = seeded_service();
        let stats = service.get_statistics("underwriting.json").unwrap();
        assert_eq!(stats.num_nodes, 16);
        assert_eq!(stats.num_edges, 15);
        assert_eq!(stats.node_types["process"], 6);
        assert_eq!(stats.node_types["system"], 5);
        assert_eq!(stats.node_types["role"], 3);
        assert_eq!(stats.node_types["context"], 2);
    }
}
