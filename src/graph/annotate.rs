//! Step annotation: role and system hints derived from direct edges.

use serde::Serialize;

use crate::graph::{EdgeRelation, GraphStore, NodeType};

/// Display metadata for one procedure step.
#[derive(Debug, Clone, Serialize)]
pub struct StepAnnotation {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// Responsible role, from a performed_by edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Required system, from a requires edge to a system-type node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
}

impl StepAnnotation {
    /// Short human-readable hint, e.g. "Underwriter — via Credit Bureau API".
    /// Empty when neither role nor system is known.
    pub fn hint(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(role) = &self.role {
            parts.push(role.clone());
        }
        if let Some(system) = &self.system {
            parts.push(format!("via {}", system));
        }
        parts.join(" — ")
    }
}

/// Annotate each step by scanning only its direct outgoing edges.
///
/// At most one role and one system are captured per step; when several edges
/// match, the last one in edge insertion order wins (the scan does not stop
/// early). Steps absent from the graph are skipped.
pub fn annotate_steps(store: &GraphStore, steps: &[String]) -> Vec<StepAnnotation> {
    let mut annotated = Vec::with_capacity(steps.len());

    for step in steps {
        let Some(node) = store.get_node(step) else {
            continue;
        };

        let mut role: Option<String> = None;
        let mut system: Option<String> = None;
        for (neighbor, edge) in store.successors(step) {
            match edge.relation {
                EdgeRelation::PerformedBy => role = Some(neighbor.to_string()),
                EdgeRelation::Requires => {
                    if store.type_of(neighbor) == Some(NodeType::System) {
                        system = Some(neighbor.to_string());
                    }
                }
                _ => {}
            }
        }

        annotated.push(StepAnnotation {
            id: node.id,
            label: node.label,
            node_type: node.node_type,
            role,
            system,
        });
    }

    annotated
}
