//! Template engine for document generation.
//!
//! Templates are plain files under a configured directory with
//! `{{ placeholder }}` substitution. Placeholders resolve against the
//! caller's context by dot-path, or against an optionally supplied graph
//! through a small helper surface:
//!
//! - `{{ graph.stats }}`
//! - `{{ graph.get_node(Node Id) }}`
//! - `{{ graph.get_neighbors(Node Id) }}` / `{{ graph.get_neighbors(Node Id, relation) }}`
//! - `{{ graph.get_nodes_by_type(process) }}`
//! - `{{ graph.find_path(Start, End) }}`
//!
//! Helper results render as JSON; unresolved placeholders render empty.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde_json::{Map, Value};
use walkdir::WalkDir;

use crate::error::{DocascodeError, Result};
use crate::graph::{Direction, EdgeRelation, GraphStore, NodeType};

const PATH_HELPER_MAX_DEPTH: usize = 10;

/// File-based template engine with graph-aware placeholder helpers.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    templates_dir: PathBuf,
}

impl TemplateEngine {
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
        }
    }

    /// Render a template with context and optional graph data.
    pub fn render(
        &self,
        template_name: &str,
        context: &Map<String, Value>,
        graph: Option<&GraphStore>,
    ) -> Result<String> {
        let template = self.template_content(template_name)?;
        let placeholder = Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("Invalid regex pattern");

        let rendered = placeholder.replace_all(&template, |caps: &regex::Captures<'_>| {
            let expr = caps[1].trim();
            if let Some(helper_expr) = expr.strip_prefix("graph.") {
                match graph {
                    Some(store) => resolve_graph_helper(store, helper_expr),
                    None => {
                        log::debug!("No graph supplied for placeholder: {}", expr);
                        String::new()
                    }
                }
            } else {
                resolve_context_path(context, expr)
            }
        });

        log::debug!("Rendered template: {}", template_name);
        Ok(rendered.into_owned())
    }

    /// List all available templates, relative to the templates directory.
    pub fn list_templates(&self) -> Vec<String> {
        let mut templates: Vec<String> = WalkDir::new(&self.templates_dir)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| !entry.file_name().to_string_lossy().starts_with('.'))
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(&self.templates_dir)
                    .ok()
                    .map(|rel| rel.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        templates.sort();
        templates
    }

    /// Create a new template file, creating parent directories as needed.
    pub fn create_template(&self, template_name: &str, content: &str) -> Result<PathBuf> {
        let template_path = self.templates_dir.join(template_name);
        if let Some(parent) = template_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&template_path, content)?;
        log::info!("Created template: {}", template_name);
        Ok(template_path)
    }

    /// Raw template content.
    pub fn template_content(&self, template_name: &str) -> Result<String> {
        let template_path = self.templates_dir.join(template_name);
        if !template_path.exists() {
            return Err(DocascodeError::TemplateNotFound(template_name.to_string()));
        }
        Ok(std::fs::read_to_string(&template_path)?)
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }
}

/// Walk a dot-path into the context; strings render raw, other values as
/// compact JSON, missing paths as empty.
fn resolve_context_path(context: &Map<String, Value>, expr: &str) -> String {
    let mut segments = expr.split('.');
    let Some(first) = segments.next() else {
        return String::new();
    };
    let mut current = match context.get(first) {
        Some(value) => value,
        None => {
            log::debug!("Unresolved placeholder: {}", expr);
            return String::new();
        }
    };
    for segment in segments {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(value) => current = value,
            None => {
                log::debug!("Unresolved placeholder: {}", expr);
                return String::new();
            }
        }
    }
    render_value(current)
}

/// Resolve a `graph.*` helper expression against the store.
fn resolve_graph_helper(store: &GraphStore, expr: &str) -> String {
    if expr == "stats" {
        return serde_json::to_value(store.statistics())
            .map(|v| v.to_string())
            .unwrap_or_default();
    }

    let Some((helper, args)) = parse_helper_call(expr) else {
        log::debug!("Unknown graph helper: {}", expr);
        return String::new();
    };

    match (helper.as_str(), args.as_slice()) {
        ("get_node", [node_id]) => store
            .get_node(node_id)
            .and_then(|node| serde_json::to_value(node).ok())
            .map(|v| v.to_string())
            .unwrap_or_default(),
        ("get_neighbors", [node_id]) => {
            neighbors_json(store, node_id, None)
        }
        ("get_neighbors", [node_id, relation]) => match relation.parse::<EdgeRelation>() {
            Ok(rel) => neighbors_json(store, node_id, Some(rel)),
            Err(_) => String::new(),
        },
        ("get_nodes_by_type", [node_type]) => match node_type.parse::<NodeType>() {
            Ok(t) => serde_json::to_value(store.get_nodes_by_type(t))
                .map(|v| v.to_string())
                .unwrap_or_default(),
            Err(_) => String::new(),
        },
        ("find_path", [start, end]) => store
            .find_path(start, end, PATH_HELPER_MAX_DEPTH)
            .and_then(|path| serde_json::to_value(path).ok())
            .map(|v| v.to_string())
            .unwrap_or_default(),
        _ => {
            log::debug!("Unknown graph helper: {}", expr);
            String::new()
        }
    }
}

fn neighbors_json(store: &GraphStore, node_id: &str, relation: Option<EdgeRelation>) -> String {
    let neighbors: Vec<_> = store
        .get_neighbors(node_id, relation, Direction::Out)
        .iter()
        .filter_map(|id| store.get_node(id))
        .collect();
    serde_json::to_value(neighbors)
        .map(|v| v.to_string())
        .unwrap_or_default()
}

/// Split `name(arg, arg)` into the helper name and trimmed arguments.
fn parse_helper_call(expr: &str) -> Option<(String, Vec<String>)> {
    let open = expr.find('(')?;
    let close = expr.rfind(')')?;
    if close < open {
        return None;
    }
    let name = expr[..open].trim().to_string();
    let args: Vec<String> = expr[open + 1..close]
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();
    Some((name, args))
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
