//! Context-aware BFS traversal and procedure generation.
//!
//! The traversal walks outgoing edges from a start node and prunes branches
//! whose applicability conditions do not match the caller's context filters.
//! Matching is a case-insensitive substring heuristic (filter value contained
//! in the candidate label), not a rules engine: a short filter value like "a"
//! will match almost any label. This is intentional proof-of-concept
//! behavior; callers that need precision should use exact context node ids.

use std::collections::{BTreeMap, HashSet, VecDeque};

use serde_json::{Map, Value};

use crate::graph::{EdgeRelation, GraphStore, NodeType};

/// Caller-supplied context criteria (e.g. location, property_type).
///
/// Consumed read-only during traversal; never stored on the graph. Values
/// with no usable content (null, empty string, false, zero) are dropped at
/// construction since they can never match a label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextFilters {
    values: BTreeMap<String, String>,
}

impl ContextFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build filters from a JSON object, stringifying scalar values and
    /// dropping entries that cannot match anything.
    pub fn from_json(map: &Map<String, Value>) -> Self {
        let mut filters = Self::new();
        for (key, value) in map {
            match value {
                Value::String(s) if !s.is_empty() => filters.insert(key, s.clone()),
                Value::Number(n) => {
                    if n.as_f64().map_or(false, |f| f != 0.0) {
                        filters.insert(key, n.to_string());
                    }
                }
                Value::Bool(true) => filters.insert(key, "true"),
                _ => {}
            }
        }
        filters
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.values.insert(key.into(), value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Key-value pairs in stable (sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// True when any filter value is contained in the label,
    /// case-insensitively. Empty filters match nothing.
    pub fn matches_label(&self, label: &str) -> bool {
        let label = label.to_lowercase();
        self.values
            .values()
            .any(|value| label.contains(&value.to_lowercase()))
    }

    /// JSON object mirror of the filters, for result envelopes.
    pub fn to_json(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect()
    }
}

/// Breadth-first traversal from `start` with context-aware pruning.
///
/// Returns all visited node ids in first-visited order, each at most once.
/// An absent start node yields an empty sequence; callers wanting a
/// diagnostic check existence first. Nodes deeper than `max_depth` are
/// neither recorded nor expanded. The seen-set guarantees termination on
/// cyclic graphs.
pub fn traverse(
    store: &GraphStore,
    start: &str,
    filters: &ContextFilters,
    max_depth: usize,
) -> Vec<String> {
    if !store.has_node(start) {
        return Vec::new();
    }

    let mut visited: Vec<String> = Vec::new();
    let mut queue: VecDeque<(String, usize)> = VecDeque::new();
    let mut seen: HashSet<String> = HashSet::new();

    queue.push_back((start.to_string(), 0));
    seen.insert(start.to_string());

    while let Some((current, depth)) = queue.pop_front() {
        if depth > max_depth {
            continue;
        }

        visited.push(current.clone());

        for (neighbor, edge) in store.successors(&current) {
            if seen.contains(neighbor) {
                continue;
            }
            if !should_include(store, neighbor, edge.relation, filters) {
                continue;
            }
            seen.insert(neighbor.to_string());
            queue.push_back((neighbor.to_string(), depth + 1));
        }
    }

    visited
}

/// Decide whether a neighbor discovered via `relation` belongs in the
/// traversal under the active filters.
///
/// Rules, checked in order:
/// 1. conditional_on / applies_to targets are included only when some filter
///    value matches the target's label.
/// 2. A process node that declares its own applies_to context edges is
///    included only when some declared context label matches a filter value.
///    A process with no declared contexts is unconditionally eligible.
fn should_include(
    store: &GraphStore,
    node_id: &str,
    relation: EdgeRelation,
    filters: &ContextFilters,
) -> bool {
    if matches!(
        relation,
        EdgeRelation::ConditionalOn | EdgeRelation::AppliesTo
    ) {
        return store
            .label_of(node_id)
            .map(|label| filters.matches_label(label))
            .unwrap_or(false);
    }

    if store.type_of(node_id) == Some(NodeType::Process) {
        let context_labels: Vec<&str> = store
            .successors(node_id)
            .filter(|(_, edge)| edge.relation == EdgeRelation::AppliesTo)
            .filter_map(|(target, _)| store.label_of(target))
            .collect();
        if !context_labels.is_empty() {
            return context_labels
                .iter()
                .any(|label| filters.matches_label(label));
        }
    }

    true
}

/// Generate a procedure: the traversal visit order restricted to
/// process-type nodes.
pub fn generate_procedure(
    store: &GraphStore,
    start: &str,
    filters: &ContextFilters,
    max_depth: usize,
) -> Vec<String> {
    traverse(store, start, filters, max_depth)
        .into_iter()
        .filter(|id| store.type_of(id) == Some(NodeType::Process))
        .collect()
}
