//! Built-in sample knowledge graph: mortgage underwriting.
//!
//! Used by the demo CLI, the `seed` command, and tests. Node types cover
//! process, system, role, and context; edges cover requires, performed_by,
//! applies_to, conditional_on, and precedes.

use crate::graph::{EdgeRelation, GraphEdge, GraphNode, GraphStore, NodeType};

/// Build the underwriting sample graph in memory.
pub fn sample_underwriting_graph() -> GraphStore {
    let mut store = GraphStore::new();

    let nodes = [
        ("Loan Application", NodeType::Process),
        ("Verify Credit Score", NodeType::Process),
        ("Credit Bureau API", NodeType::System),
        ("Underwriter", NodeType::Role),
        ("Request Appraisal", NodeType::Process),
        ("Property Database API", NodeType::System),
        ("Appraiser", NodeType::Role),
        ("Rural Property Appraisal", NodeType::Process),
        ("Rural Property", NodeType::Context),
        ("Special Appraisal Form", NodeType::System),
        ("Check NM Mortgage Rule 12", NodeType::Process),
        ("New Mexico", NodeType::Context),
        ("Regulatory DB", NodeType::System),
        ("Generate Approval Document", NodeType::Process),
        ("Document Gen API", NodeType::System),
        ("Loan Officer", NodeType::Role),
    ];
    for (id, node_type) in nodes {
        store.add_node(GraphNode::new(id, node_type));
    }

    let edges = [
        ("Loan Application", "Verify Credit Score", EdgeRelation::Requires),
        ("Verify Credit Score", "Credit Bureau API", EdgeRelation::Requires),
        ("Verify Credit Score", "Underwriter", EdgeRelation::PerformedBy),
        ("Verify Credit Score", "Request Appraisal", EdgeRelation::Precedes),
        ("Request Appraisal", "Property Database API", EdgeRelation::Requires),
        ("Request Appraisal", "Appraiser", EdgeRelation::PerformedBy),
        (
            "Request Appraisal",
            "Rural Property Appraisal",
            EdgeRelation::ConditionalOn,
        ),
        ("Rural Property Appraisal", "Rural Property", EdgeRelation::AppliesTo),
        (
            "Rural Property Appraisal",
            "Special Appraisal Form",
            EdgeRelation::Requires,
        ),
        ("Loan Application", "Check NM Mortgage Rule 12", EdgeRelation::Requires),
        ("Check NM Mortgage Rule 12", "New Mexico", EdgeRelation::AppliesTo),
        ("Check NM Mortgage Rule 12", "Regulatory DB", EdgeRelation::Requires),
        (
            "Loan Application",
            "Generate Approval Document",
            EdgeRelation::Precedes,
        ),
        ("Generate Approval Document", "Document Gen API", EdgeRelation::Requires),
        ("Generate Approval Document", "Loan Officer", EdgeRelation::PerformedBy),
    ];
    for (source, target, relation) in edges {
        store.add_edge(GraphEdge::new(source, target, relation));
    }

    store
}
