//! Knowledge graph module: typed nodes and edges, the in-memory store,
//! context-aware BFS procedure traversal, and step annotation.
//!
//! The graph is the system of record for business procedures: process steps,
//! the systems and roles they involve, and the contexts (jurisdictions,
//! property types, regulations) that scope them. Adding a new regional or
//! regulatory variant is a data change, not a code change.

mod annotate;
pub mod service;
mod store;
mod traversal;

pub use annotate::{annotate_steps, StepAnnotation};
pub use service::GraphService;
pub use store::{Direction, GraphStore};
pub use traversal::{generate_procedure, traverse, ContextFilters};

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DocascodeError;

/// Knowledge graph node types (closed enumeration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Process,
    System,
    Role,
    Regulation,
    Context,
    Document,
    Entity,
    Concept,
}

impl NodeType {
    /// All node types, in a fixed order (used for per-type statistics).
    pub const ALL: [NodeType; 8] = [
        NodeType::Process,
        NodeType::System,
        NodeType::Role,
        NodeType::Regulation,
        NodeType::Context,
        NodeType::Document,
        NodeType::Entity,
        NodeType::Concept,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Process => "process",
            NodeType::System => "system",
            NodeType::Role => "role",
            NodeType::Regulation => "regulation",
            NodeType::Context => "context",
            NodeType::Document => "document",
            NodeType::Entity => "entity",
            NodeType::Concept => "concept",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NodeType {
    type Err = DocascodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| DocascodeError::InvalidInput(format!("Unknown node type: {}", s)))
    }
}

/// Knowledge graph edge relations (closed enumeration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeRelation {
    Requires,
    PerformedBy,
    AppliesTo,
    ConditionalOn,
    Precedes,
    References,
    RelatedTo,
    Contains,
}

impl EdgeRelation {
    pub const ALL: [EdgeRelation; 8] = [
        EdgeRelation::Requires,
        EdgeRelation::PerformedBy,
        EdgeRelation::AppliesTo,
        EdgeRelation::ConditionalOn,
        EdgeRelation::Precedes,
        EdgeRelation::References,
        EdgeRelation::RelatedTo,
        EdgeRelation::Contains,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeRelation::Requires => "requires",
            EdgeRelation::PerformedBy => "performed_by",
            EdgeRelation::AppliesTo => "applies_to",
            EdgeRelation::ConditionalOn => "conditional_on",
            EdgeRelation::Precedes => "precedes",
            EdgeRelation::References => "references",
            EdgeRelation::RelatedTo => "related_to",
            EdgeRelation::Contains => "contains",
        }
    }
}

impl fmt::Display for EdgeRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EdgeRelation {
    type Err = DocascodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EdgeRelation::ALL
            .iter()
            .find(|r| r.as_str() == s)
            .copied()
            .ok_or_else(|| DocascodeError::InvalidInput(format!("Unknown edge relation: {}", s)))
    }
}

/// A knowledge graph node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Unique identifier within a graph.
    pub id: String,
    /// Display name, often equal to the id.
    pub label: String,
    /// Node category; drives inclusion decisions during traversal.
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Open key-value bag.
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl GraphNode {
    /// Convenience constructor with label equal to id and no properties.
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            node_type,
            properties: Map::new(),
        }
    }
}

/// A directed, relation-labeled edge. At most one edge exists per ordered
/// (source, target) pair; re-adding overwrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub relation: EdgeRelation,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl GraphEdge {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: EdgeRelation,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation,
            properties: Map::new(),
        }
    }
}

/// Serialized form of a complete knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Aggregate graph statistics.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStatistics {
    pub num_nodes: usize,
    pub num_edges: usize,
    /// Node count per type; every type key is present, zeros included.
    pub node_types: BTreeMap<String, usize>,
    pub is_directed: bool,
    /// Weak connectivity (edge direction ignored); false on an empty graph.
    pub is_connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_node_type_round_trip() {
        for t in NodeType::ALL {
            assert_eq!(NodeType::from_str(t.as_str()).unwrap(), t);
        }
    }

    #[test]
    fn test_node_type_unknown() {
        let err = NodeType::from_str("workflow").unwrap_err();
        assert!(err.to_string().contains("Unknown node type"));
    }

    #[test]
    fn test_edge_relation_serde_snake_case() {
        let json = serde_json::to_string(&EdgeRelation::ConditionalOn).unwrap();
        assert_eq!(json, "\"conditional_on\"");
        let back: EdgeRelation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, EdgeRelation::ConditionalOn);
    }

    #[test]
    fn test_node_serde_shape() {
        let node = GraphNode::new("Loan Application", NodeType::Process);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["id"], "Loan Application");
        assert_eq!(value["type"], "process");
        let back: GraphNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_node_properties_preserved() {
        let json = r#"{"id":"A","label":"A","type":"context","properties":{"fips":"35"}}"#;
        let node: GraphNode = serde_json::from_str(json).unwrap();
        assert_eq!(node.properties["fips"], "35");
        let round = serde_json::to_string(&node).unwrap();
        let back: GraphNode = serde_json::from_str(&round).unwrap();
        assert_eq!(back, node);
    }
}
