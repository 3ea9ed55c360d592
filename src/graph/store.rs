//! In-memory directed graph store.
//!
//! Nodes and adjacency are kept in insertion-ordered maps so that neighbor
//! enumeration, traversal output, and statistics are deterministic across
//! runs for the same graph file.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use crate::error::{DocascodeError, Result};
use crate::graph::{EdgeRelation, GraphEdge, GraphNode, GraphStatistics, KnowledgeGraph, NodeType};

/// Neighbor lookup direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Out,
    In,
    Both,
}

impl std::str::FromStr for Direction {
    type Err = DocascodeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "out" => Ok(Direction::Out),
            "in" => Ok(Direction::In),
            "both" => Ok(Direction::Both),
            other => Err(DocascodeError::InvalidInput(format!(
                "Unknown direction: {} (expected out, in, or both)",
                other
            ))),
        }
    }
}

/// Typed directed graph with relation-labeled edges.
///
/// Logically multigraph-free: at most one edge per ordered (source, target)
/// pair; re-adding an edge overwrites the previous one.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: IndexMap<String, GraphNode>,
    /// source id -> target id -> edge
    out_edges: IndexMap<String, IndexMap<String, GraphEdge>>,
    /// target id -> source ids
    in_edges: IndexMap<String, IndexSet<String>>,
    metadata: Map<String, Value>,
}

impl GraphStore {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a node by id. In-memory only; callers persist
    /// explicitly via [`GraphStore::save_to_file`].
    pub fn add_node(&mut self, node: GraphNode) {
        log::debug!("Added node: {} ({})", node.id, node.node_type);
        self.nodes.insert(node.id.clone(), node);
    }

    /// Insert or overwrite the edge between source and target.
    ///
    /// Silently ignored when either endpoint does not exist; callers that
    /// need a diagnostic validate existence first (see the graph service).
    pub fn add_edge(&mut self, edge: GraphEdge) {
        if !self.nodes.contains_key(&edge.source) || !self.nodes.contains_key(&edge.target) {
            log::debug!(
                "Ignored edge with missing endpoint: {} --> {}",
                edge.source,
                edge.target
            );
            return;
        }
        log::debug!(
            "Added edge: {} --[{}]--> {}",
            edge.source,
            edge.relation,
            edge.target
        );
        self.in_edges
            .entry(edge.target.clone())
            .or_default()
            .insert(edge.source.clone());
        self.out_edges
            .entry(edge.source.clone())
            .or_default()
            .insert(edge.target.clone(), edge);
    }

    /// Remove a node and every edge touching it. No-op if absent.
    pub fn remove_node(&mut self, node_id: &str) {
        if self.nodes.shift_remove(node_id).is_none() {
            return;
        }
        // Outgoing edges: drop the whole adjacency row and unlink reverse entries.
        if let Some(targets) = self.out_edges.shift_remove(node_id) {
            for target in targets.keys() {
                if let Some(sources) = self.in_edges.get_mut(target) {
                    sources.shift_remove(node_id);
                }
            }
        }
        // Incoming edges: unlink from each source's adjacency row.
        if let Some(sources) = self.in_edges.shift_remove(node_id) {
            for source in &sources {
                if let Some(targets) = self.out_edges.get_mut(source) {
                    targets.shift_remove(node_id);
                }
            }
        }
        log::debug!("Removed node: {}", node_id);
    }

    /// Remove the edge between source and target. No-op if absent.
    pub fn remove_edge(&mut self, source: &str, target: &str) {
        let removed = self
            .out_edges
            .get_mut(source)
            .and_then(|targets| targets.shift_remove(target));
        if removed.is_some() {
            if let Some(sources) = self.in_edges.get_mut(target) {
                sources.shift_remove(source);
            }
            log::debug!("Removed edge: {} --> {}", source, target);
        }
    }

    pub fn has_node(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn has_edge(&self, source: &str, target: &str) -> bool {
        self.out_edges
            .get(source)
            .map(|targets| targets.contains_key(target))
            .unwrap_or(false)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.out_edges.values().map(|targets| targets.len()).sum()
    }

    /// Get a node by id as a value copy (not a live reference).
    pub fn get_node(&self, node_id: &str) -> Option<GraphNode> {
        self.nodes.get(node_id).cloned()
    }

    /// Node ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub(crate) fn label_of(&self, node_id: &str) -> Option<&str> {
        self.nodes.get(node_id).map(|n| n.label.as_str())
    }

    pub(crate) fn type_of(&self, node_id: &str) -> Option<NodeType> {
        self.nodes.get(node_id).map(|n| n.node_type)
    }

    /// Outgoing edges of a node, in insertion order.
    pub fn successors(&self, node_id: &str) -> impl Iterator<Item = (&str, &GraphEdge)> {
        self.out_edges
            .get(node_id)
            .into_iter()
            .flat_map(|targets| targets.iter().map(|(id, edge)| (id.as_str(), edge)))
    }

    /// Neighbor node ids, optionally filtered by relation, in the given
    /// direction. "Both" unions successors and predecessors (successors
    /// first); the relation filter applies to the edge on the matching side.
    pub fn get_neighbors(
        &self,
        node_id: &str,
        relation: Option<EdgeRelation>,
        direction: Direction,
    ) -> Vec<String> {
        if !self.nodes.contains_key(node_id) {
            return Vec::new();
        }

        let out = |rel: Option<EdgeRelation>| -> Vec<String> {
            self.successors(node_id)
                .filter(|(_, edge)| rel.map_or(true, |r| edge.relation == r))
                .map(|(id, _)| id.to_string())
                .collect()
        };
        let incoming = |rel: Option<EdgeRelation>| -> Vec<String> {
            self.in_edges
                .get(node_id)
                .into_iter()
                .flat_map(|sources| sources.iter())
                .filter(|source| {
                    rel.map_or(true, |r| {
                        self.out_edges
                            .get(source.as_str())
                            .and_then(|targets| targets.get(node_id))
                            .map(|edge| edge.relation == r)
                            .unwrap_or(false)
                    })
                })
                .map(|s| s.to_string())
                .collect()
        };

        match direction {
            Direction::Out => out(relation),
            Direction::In => incoming(relation),
            Direction::Both => {
                let mut neighbors = out(relation);
                for source in incoming(relation) {
                    if !neighbors.contains(&source) {
                        neighbors.push(source);
                    }
                }
                neighbors
            }
        }
    }

    /// Shortest path by edge count between two nodes.
    ///
    /// Returns `None` when either endpoint is missing, no path exists, or the
    /// shortest path has more than `max_depth` edges.
    pub fn find_path(&self, start: &str, end: &str, max_depth: usize) -> Option<Vec<String>> {
        if !self.nodes.contains_key(start) || !self.nodes.contains_key(end) {
            return None;
        }
        if start == end {
            return Some(vec![start.to_string()]);
        }

        let mut parents: std::collections::HashMap<&str, &str> = std::collections::HashMap::new();
        let mut seen: HashSet<&str> = HashSet::from([start]);
        let mut queue: VecDeque<&str> = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            for (neighbor, _) in self.successors(current) {
                if seen.contains(neighbor) {
                    continue;
                }
                seen.insert(neighbor);
                parents.insert(neighbor, current);
                if neighbor == end {
                    let mut path = vec![end.to_string()];
                    let mut cursor = end;
                    while let Some(&parent) = parents.get(cursor) {
                        path.push(parent.to_string());
                        cursor = parent;
                    }
                    path.reverse();
                    if path.len() > max_depth + 1 {
                        return None;
                    }
                    return Some(path);
                }
                queue.push_back(neighbor);
            }
        }

        None
    }

    /// All nodes of a given type, in insertion order.
    pub fn get_nodes_by_type(&self, node_type: NodeType) -> Vec<GraphNode> {
        self.nodes
            .values()
            .filter(|n| n.node_type == node_type)
            .cloned()
            .collect()
    }

    /// Aggregate statistics including per-type counts and weak connectivity.
    pub fn statistics(&self) -> GraphStatistics {
        let mut node_types = BTreeMap::new();
        for t in NodeType::ALL {
            node_types.insert(t.as_str().to_string(), 0usize);
        }
        for node in self.nodes.values() {
            *node_types.entry(node.node_type.as_str().to_string()).or_insert(0) += 1;
        }

        GraphStatistics {
            num_nodes: self.node_count(),
            num_edges: self.edge_count(),
            node_types,
            is_directed: true,
            is_connected: self.is_weakly_connected(),
        }
    }

    /// Weak connectivity check: BFS over the graph with edge direction
    /// ignored. An empty graph reports false.
    fn is_weakly_connected(&self) -> bool {
        let Some(start) = self.nodes.keys().next() else {
            return false;
        };

        let mut seen: HashSet<&str> = HashSet::from([start.as_str()]);
        let mut queue: VecDeque<&str> = VecDeque::from([start.as_str()]);

        while let Some(current) = queue.pop_front() {
            let forward = self
                .out_edges
                .get(current)
                .into_iter()
                .flat_map(|targets| targets.keys());
            let backward = self
                .in_edges
                .get(current)
                .into_iter()
                .flat_map(|sources| sources.iter());
            for neighbor in forward.chain(backward) {
                if seen.insert(neighbor.as_str()) {
                    queue.push_back(neighbor.as_str());
                }
            }
        }

        seen.len() == self.node_count()
    }

    /// Export to the serializable model.
    pub fn to_model(&self) -> KnowledgeGraph {
        KnowledgeGraph {
            nodes: self.nodes.values().cloned().collect(),
            edges: self
                .out_edges
                .values()
                .flat_map(|targets| targets.values().cloned())
                .collect(),
            metadata: self.metadata.clone(),
        }
    }

    /// Replace the entire graph with the given model (no merge).
    pub fn load_from_model(&mut self, model: KnowledgeGraph) {
        self.nodes.clear();
        self.out_edges.clear();
        self.in_edges.clear();
        let node_count = model.nodes.len();
        let edge_count = model.edges.len();
        for node in model.nodes {
            self.add_node(node);
        }
        for edge in model.edges {
            self.add_edge(edge);
        }
        self.metadata = model.metadata;
        log::info!(
            "Loaded graph with {} nodes and {} edges",
            node_count,
            edge_count
        );
    }

    /// Build a store from a model.
    pub fn from_model(model: KnowledgeGraph) -> Self {
        let mut store = Self::new();
        store.load_from_model(model);
        store
    }

    /// Write the whole graph as JSON, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.to_model())?;
        std::fs::write(path, json)?;
        log::info!("Saved graph to {}", path.display());
        Ok(())
    }

    /// Load a whole graph from JSON, replacing the current contents.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        let data = std::fs::read_to_string(path)?;
        let model: KnowledgeGraph = serde_json::from_str(&data)?;
        self.load_from_model(model);
        log::info!("Loaded graph from {}", path.display());
        Ok(())
    }
}
