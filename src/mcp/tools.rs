//! Tool definitions and handlers.
//!
//! Every handler returns a `{"success": bool, ...}` JSON envelope rendered
//! as text content, with `"error"` set and `is_error` flagged on failure.
//! Validation, not-found, and unsupported-operation conditions all surface
//! through the envelope; nothing escapes past the tool boundary.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::error::Result;
use crate::extract::{extract_entities, DEFAULT_ENTITY_TYPES};
use crate::graph::{
    annotate_steps, generate_procedure, ContextFilters, Direction, EdgeRelation, GraphEdge,
    GraphNode, GraphService, GraphStore, KnowledgeGraph, StepAnnotation,
};
use crate::index::{DocumentIndexer, DocumentMetadata, OpenAiEmbedder};
use crate::mcp::types::{ContentItem, Tool, ToolsCallResult};
use crate::templates::TemplateEngine;
use crate::transform::{DocumentFormat, DocumentTransformer};

/// Get all tool definitions for tools/list
pub fn get_tool_definitions() -> Vec<Tool> {
    vec![
        Tool {
            name: "create_document".to_string(),
            description: "Create a document from a template with context and optional graph data"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "template_name": {
                        "type": "string",
                        "description": "Name of the template file (e.g. 'procedure.md')"
                    },
                    "context": {
                        "type": "object",
                        "description": "Template context variables",
                        "additionalProperties": true
                    },
                    "output_format": {
                        "type": "string",
                        "enum": ["markdown", "html", "json", "text"],
                        "default": "markdown",
                        "description": "Output document format"
                    },
                    "graph_data": {
                        "type": "object",
                        "description": "Optional knowledge graph data (nodes and edges)"
                    }
                },
                "required": ["template_name", "context"]
            }),
        },
        Tool {
            name: "transform_document".to_string(),
            description:
                "Transform a document from one format to another (markdown, html, json, text)"
                    .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "Document content to transform"
                    },
                    "source_format": {
                        "type": "string",
                        "enum": ["markdown", "html", "json", "text", "pdf", "docx"],
                        "description": "Source format"
                    },
                    "target_format": {
                        "type": "string",
                        "enum": ["markdown", "html", "json", "text", "pdf", "docx"],
                        "description": "Target format"
                    },
                    "options": {
                        "type": "object",
                        "description": "Transformation options (e.g. {\"full_document\": true, \"title\": \"My Doc\"})",
                        "additionalProperties": true
                    }
                },
                "required": ["content", "source_format", "target_format"]
            }),
        },
        Tool {
            name: "catalogue_document".to_string(),
            description:
                "Catalogue a document by indexing it with metadata and embeddings for search"
                    .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "Document content to catalogue"
                    },
                    "title": {
                        "type": "string",
                        "description": "Document title"
                    },
                    "format": {
                        "type": "string",
                        "enum": ["markdown", "html", "json", "text"],
                        "default": "markdown",
                        "description": "Document format"
                    },
                    "metadata": {
                        "type": "object",
                        "description": "Optional metadata (author, tags, description, etc.)",
                        "additionalProperties": true
                    },
                    "collection": {
                        "type": "string",
                        "default": "documents",
                        "description": "Collection name"
                    }
                },
                "required": ["content", "title"]
            }),
        },
        Tool {
            name: "search_documents".to_string(),
            description: "Search documents using semantic similarity and metadata filters"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query string"
                    },
                    "collection": {
                        "type": "string",
                        "default": "documents",
                        "description": "Collection name to search in"
                    },
                    "filters": {
                        "type": "object",
                        "description": "Optional metadata filters (e.g. {\"author\": \"John\", \"format\": \"markdown\"})",
                        "additionalProperties": true
                    },
                    "limit": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": 50,
                        "description": "Maximum number of results"
                    },
                    "min_score": {
                        "type": "number",
                        "minimum": 0,
                        "maximum": 1,
                        "description": "Minimum similarity score (0-1)"
                    }
                },
                "required": ["query"]
            }),
        },
        Tool {
            name: "generate_procedure".to_string(),
            description:
                "Generate a context-aware procedure from a knowledge graph by filtered traversal"
                    .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "graph_file": {
                        "type": "string",
                        "description": "Graph JSON file name (relative to the graphs directory)"
                    },
                    "start_node": {
                        "type": "string",
                        "description": "Starting node ID for traversal"
                    },
                    "filters": {
                        "type": "object",
                        "description": "Context filters (e.g. {\"location\": \"New Mexico\", \"property_type\": \"rural\"})",
                        "additionalProperties": true
                    },
                    "max_depth": {
                        "type": "integer",
                        "default": 10,
                        "minimum": 1,
                        "maximum": 50,
                        "description": "Maximum traversal depth"
                    },
                    "output_format": {
                        "type": "string",
                        "enum": ["list", "markdown", "json"],
                        "default": "list",
                        "description": "Output format for the rendered procedure"
                    }
                },
                "required": ["graph_file", "start_node"]
            }),
        },
        Tool {
            name: "query_graph".to_string(),
            description: "Query a knowledge graph for nodes, relationships, and paths".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "graph_file": {
                        "type": "string",
                        "description": "Graph JSON file name"
                    },
                    "operation": {
                        "type": "string",
                        "enum": ["get_node", "get_neighbors", "get_nodes_by_type", "find_path", "get_statistics"],
                        "description": "Operation to perform"
                    },
                    "node_id": {
                        "type": "string",
                        "description": "Node ID for node operations"
                    },
                    "node_type": {
                        "type": "string",
                        "description": "Node type filter (process, system, role, regulation, context, ...)"
                    },
                    "relation": {
                        "type": "string",
                        "description": "Edge relation filter (requires, performed_by, applies_to, ...)"
                    },
                    "direction": {
                        "type": "string",
                        "enum": ["out", "in", "both"],
                        "default": "out",
                        "description": "Neighbor direction"
                    },
                    "start_node": {
                        "type": "string",
                        "description": "Start node for path finding"
                    },
                    "end_node": {
                        "type": "string",
                        "description": "End node for path finding"
                    }
                },
                "required": ["graph_file", "operation"]
            }),
        },
        Tool {
            name: "update_graph".to_string(),
            description: "Update a knowledge graph by adding or removing nodes and edges"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "graph_file": {
                        "type": "string",
                        "description": "Graph JSON file name"
                    },
                    "operation": {
                        "type": "string",
                        "enum": ["add_node", "remove_node", "add_edge", "remove_edge"],
                        "description": "Operation to perform"
                    },
                    "node": {
                        "type": "object",
                        "description": "Node data (id, label, type, properties) for add_node"
                    },
                    "edge": {
                        "type": "object",
                        "description": "Edge data (source, target, relation, properties) for add_edge"
                    },
                    "node_id": {
                        "type": "string",
                        "description": "Node ID for remove_node"
                    },
                    "source": {
                        "type": "string",
                        "description": "Source node ID for remove_edge"
                    },
                    "target": {
                        "type": "string",
                        "description": "Target node ID for remove_edge"
                    }
                },
                "required": ["graph_file", "operation"]
            }),
        },
        Tool {
            name: "extract_entities".to_string(),
            description: "Extract named entities from text content (pattern-based heuristic)"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "Text content to analyze"
                    },
                    "entity_types": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Entity types to extract (PERSON, ORG, LOCATION, DATE, ...)"
                    },
                    "language": {
                        "type": "string",
                        "default": "en",
                        "description": "Language code"
                    }
                },
                "required": ["content"]
            }),
        },
    ]
}

/// Wrap an envelope as MCP text content; `is_error` mirrors a false
/// `success` field.
fn tool_result(value: Value) -> ToolsCallResult {
    let failed = value.get("success").and_then(Value::as_bool) == Some(false);
    let text = serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
    ToolsCallResult {
        content: vec![ContentItem {
            content_type: "text".to_string(),
            text,
        }],
        is_error: failed.then_some(true),
    }
}

/// Parse tool arguments, turning a serde error into a failure envelope.
fn parse_params<T: DeserializeOwned>(
    tool: &str,
    arguments: &Value,
) -> std::result::Result<T, ToolsCallResult> {
    serde_json::from_value(arguments.clone()).map_err(|e| {
        tool_result(json!({
            "success": false,
            "error": format!("Invalid {} params: {}", tool, e),
        }))
    })
}

// --- generate_procedure ---

#[derive(Debug, Deserialize)]
struct GenerateProcedureParams {
    graph_file: String,
    start_node: String,
    #[serde(default)]
    filters: Map<String, Value>,
    #[serde(default = "default_max_depth")]
    max_depth: usize,
    #[serde(default = "default_output_format")]
    output_format: String,
}

fn default_max_depth() -> usize {
    10
}

fn default_output_format() -> String {
    "list".to_string()
}

/// Handle the generate_procedure tool
pub async fn handle_generate_procedure(
    graphs: &GraphService,
    arguments: &Value,
) -> Result<ToolsCallResult> {
    let params: GenerateProcedureParams = match parse_params("generate_procedure", arguments) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    let store = match graphs.load(&params.graph_file) {
        Ok(store) => store,
        Err(e) => {
            return Ok(tool_result(json!({
                "success": false,
                "error": e.to_string(),
                "graph_file": params.graph_file,
            })))
        }
    };

    if !store.has_node(&params.start_node) {
        let available: Vec<&str> = store.node_ids().take(10).collect();
        return Ok(tool_result(json!({
            "success": false,
            "error": format!("Start node not found: {}", params.start_node),
            "available_nodes": available,
        })));
    }

    let filters = ContextFilters::from_json(&params.filters);
    let steps = generate_procedure(&store, &params.start_node, &filters, params.max_depth);
    let annotated = annotate_steps(&store, &steps);

    let content = match params.output_format.as_str() {
        "markdown" => render_markdown(&annotated, &filters),
        "json" => serde_json::to_string_pretty(&json!({
            "procedure": &annotated,
            "filters": filters.to_json(),
            "start_node": params.start_node,
            "num_steps": annotated.len(),
        }))?,
        _ => annotated
            .iter()
            .enumerate()
            .map(|(idx, step)| format!("{}. {}", idx + 1, step.label))
            .collect::<Vec<_>>()
            .join("\n"),
    };

    log::info!(
        "Generated procedure with {} steps from {}",
        annotated.len(),
        params.start_node
    );

    Ok(tool_result(json!({
        "success": true,
        "num_steps": annotated.len(),
        "steps": annotated,
        "content": content,
        "format": params.output_format,
        "filters_applied": filters.to_json(),
        "start_node": params.start_node,
        "graph_stats": store.statistics(),
    })))
}

/// Markdown rendering of an annotated procedure.
fn render_markdown(steps: &[StepAnnotation], filters: &ContextFilters) -> String {
    let context_line = filters
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        "# Generated Procedure\n".to_string(),
        format!("**Context:** {}\n", context_line),
        "## Steps\n".to_string(),
    ];
    for (idx, step) in steps.iter().enumerate() {
        let mut line = format!("{}. **{}**", idx + 1, step.label);
        let mut hints: Vec<String> = Vec::new();
        if let Some(role) = &step.role {
            hints.push(format!("Role: {}", role));
        }
        if let Some(system) = &step.system {
            hints.push(format!("System: {}", system));
        }
        if !hints.is_empty() {
            line.push_str(&format!(" — {}", hints.join(", ")));
        }
        lines.push(line);
    }
    lines.join("\n")
}

// --- query_graph ---

#[derive(Debug, Deserialize)]
struct QueryGraphParams {
    graph_file: String,
    operation: String,
    node_id: Option<String>,
    node_type: Option<String>,
    relation: Option<String>,
    #[serde(default = "default_direction")]
    direction: String,
    start_node: Option<String>,
    end_node: Option<String>,
    #[serde(default = "default_max_depth")]
    max_depth: usize,
}

fn default_direction() -> String {
    "out".to_string()
}

fn node_summary(node: &GraphNode) -> Value {
    json!({"id": node.id, "label": node.label, "type": node.node_type})
}

/// Handle the query_graph tool
pub async fn handle_query_graph(graphs: &GraphService, arguments: &Value) -> Result<ToolsCallResult> {
    let params: QueryGraphParams = match parse_params("query_graph", arguments) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    let fail = |error: String| {
        tool_result(json!({
            "success": false,
            "error": error,
            "graph_file": params.graph_file,
            "operation": params.operation,
        }))
    };

    let result = match params.operation.as_str() {
        "get_node" => {
            let Some(node_id) = params.node_id.as_deref() else {
                return Ok(fail("node_id required for get_node".to_string()));
            };
            match graphs.get_node(&params.graph_file, node_id) {
                Ok(node) => json!({
                    "success": true,
                    "operation": params.operation,
                    "node": node,
                }),
                Err(e) => return Ok(fail(e.to_string())),
            }
        }
        "get_neighbors" => {
            let Some(node_id) = params.node_id.as_deref() else {
                return Ok(fail("node_id required for get_neighbors".to_string()));
            };
            let relation = match params.relation.as_deref() {
                Some(r) => match r.parse::<EdgeRelation>() {
                    Ok(relation) => Some(relation),
                    Err(e) => return Ok(fail(e.to_string())),
                },
                None => None,
            };
            let direction = match params.direction.parse::<Direction>() {
                Ok(direction) => direction,
                Err(e) => return Ok(fail(e.to_string())),
            };
            match graphs.get_neighbors(&params.graph_file, node_id, relation, direction) {
                Ok(neighbors) => json!({
                    "success": true,
                    "operation": params.operation,
                    "node_id": node_id,
                    "relation_filter": params.relation,
                    "num_neighbors": neighbors.len(),
                    "neighbors": neighbors.iter().map(node_summary).collect::<Vec<_>>(),
                }),
                Err(e) => return Ok(fail(e.to_string())),
            }
        }
        "get_nodes_by_type" => {
            let Some(node_type) = params.node_type.as_deref() else {
                return Ok(fail("node_type required for get_nodes_by_type".to_string()));
            };
            let node_type = match node_type.parse::<crate::graph::NodeType>() {
                Ok(t) => t,
                Err(e) => return Ok(fail(e.to_string())),
            };
            match graphs.get_nodes_by_type(&params.graph_file, node_type) {
                Ok(nodes) => json!({
                    "success": true,
                    "operation": params.operation,
                    "node_type": params.node_type,
                    "num_nodes": nodes.len(),
                    "nodes": nodes,
                }),
                Err(e) => return Ok(fail(e.to_string())),
            }
        }
        "find_path" => {
            let (Some(start), Some(end)) = (params.start_node.as_deref(), params.end_node.as_deref())
            else {
                return Ok(fail(
                    "start_node and end_node required for find_path".to_string(),
                ));
            };
            match graphs.find_path(&params.graph_file, start, end, params.max_depth) {
                Ok(path) => json!({
                    "success": true,
                    "operation": params.operation,
                    "start_node": start,
                    "end_node": end,
                    "path_length": path.len(),
                    "path": path.iter().map(node_summary).collect::<Vec<_>>(),
                }),
                Err(e) => return Ok(fail(e.to_string())),
            }
        }
        "get_statistics" => match graphs.get_statistics(&params.graph_file) {
            Ok(stats) => json!({
                "success": true,
                "operation": params.operation,
                "statistics": stats,
            }),
            Err(e) => return Ok(fail(e.to_string())),
        },
        other => {
            return Ok(tool_result(json!({
                "success": false,
                "error": format!("Unknown operation: {}", other),
                "valid_operations": [
                    "get_node",
                    "get_neighbors",
                    "get_nodes_by_type",
                    "find_path",
                    "get_statistics",
                ],
            })))
        }
    };

    Ok(tool_result(result))
}

// --- update_graph ---

#[derive(Debug, Deserialize)]
struct UpdateGraphParams {
    graph_file: String,
    operation: String,
    node: Option<Value>,
    edge: Option<Value>,
    node_id: Option<String>,
    source: Option<String>,
    target: Option<String>,
}

/// Handle the update_graph tool
pub async fn handle_update_graph(
    graphs: &GraphService,
    arguments: &Value,
) -> Result<ToolsCallResult> {
    let params: UpdateGraphParams = match parse_params("update_graph", arguments) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    let fail = |error: String| {
        tool_result(json!({
            "success": false,
            "error": error,
            "graph_file": params.graph_file,
            "operation": params.operation,
        }))
    };

    let result = match params.operation.as_str() {
        "add_node" => {
            let Some(node_value) = params.node.as_ref() else {
                return Ok(fail("node required for add_node".to_string()));
            };
            let has_required = ["id", "label", "type"]
                .iter()
                .all(|key| node_value.get(key).is_some());
            if !has_required {
                return Ok(fail("node must have id, label, and type fields".to_string()));
            }
            let node: GraphNode = match serde_json::from_value(node_value.clone()) {
                Ok(node) => node,
                Err(e) => return Ok(fail(format!("Invalid node: {}", e))),
            };
            let node_id = node.id.clone();
            match graphs.add_node(&params.graph_file, node) {
                Ok(()) => json!({
                    "success": true,
                    "operation": params.operation,
                    "node_id": node_id,
                    "message": format!("Added node: {}", node_id),
                }),
                Err(e) => return Ok(fail(e.to_string())),
            }
        }
        "remove_node" => {
            let Some(node_id) = params.node_id.as_deref() else {
                return Ok(fail("node_id required for remove_node".to_string()));
            };
            match graphs.remove_node(&params.graph_file, node_id) {
                Ok(()) => json!({
                    "success": true,
                    "operation": params.operation,
                    "node_id": node_id,
                    "message": format!("Removed node: {}", node_id),
                }),
                Err(e) => return Ok(fail(e.to_string())),
            }
        }
        "add_edge" => {
            let Some(edge_value) = params.edge.as_ref() else {
                return Ok(fail("edge required for add_edge".to_string()));
            };
            let has_required = ["source", "target", "relation"]
                .iter()
                .all(|key| edge_value.get(key).is_some());
            if !has_required {
                return Ok(fail(
                    "edge must have source, target, and relation fields".to_string(),
                ));
            }
            let edge: GraphEdge = match serde_json::from_value(edge_value.clone()) {
                Ok(edge) => edge,
                Err(e) => return Ok(fail(format!("Invalid edge: {}", e))),
            };
            let description = format!("{} --[{}]--> {}", edge.source, edge.relation, edge.target);
            match graphs.add_edge(&params.graph_file, edge) {
                Ok(()) => json!({
                    "success": true,
                    "operation": params.operation,
                    "edge": description,
                    "message": "Added edge",
                }),
                Err(e) => return Ok(fail(e.to_string())),
            }
        }
        "remove_edge" => {
            let (Some(source), Some(target)) = (params.source.as_deref(), params.target.as_deref())
            else {
                return Ok(fail("source and target required for remove_edge".to_string()));
            };
            match graphs.remove_edge(&params.graph_file, source, target) {
                Ok(()) => json!({
                    "success": true,
                    "operation": params.operation,
                    "edge": format!("{} --> {}", source, target),
                    "message": "Removed edge",
                }),
                Err(e) => return Ok(fail(e.to_string())),
            }
        }
        other => {
            return Ok(tool_result(json!({
                "success": false,
                "error": format!("Unknown operation: {}", other),
                "valid_operations": ["add_node", "remove_node", "add_edge", "remove_edge"],
            })))
        }
    };

    Ok(tool_result(result))
}

// --- transform_document ---

#[derive(Debug, Deserialize)]
struct TransformDocumentParams {
    content: String,
    source_format: String,
    target_format: String,
    #[serde(default)]
    options: Map<String, Value>,
}

/// Handle the transform_document tool
pub async fn handle_transform_document(
    transformer: &DocumentTransformer,
    arguments: &Value,
) -> Result<ToolsCallResult> {
    let params: TransformDocumentParams = match parse_params("transform_document", arguments) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    let fail = |error: String| {
        tool_result(json!({
            "success": false,
            "error": error,
            "source_format": params.source_format,
            "target_format": params.target_format,
        }))
    };

    let source = match DocumentFormat::parse(&params.source_format) {
        Ok(format) => format,
        Err(e) => return Ok(fail(e.to_string())),
    };
    let target = match DocumentFormat::parse(&params.target_format) {
        Ok(format) => format,
        Err(e) => return Ok(fail(e.to_string())),
    };

    match transformer.transform(&params.content, source, target, &params.options) {
        Ok(content) => {
            log::info!("Transformed document: {} -> {}", source, target);
            Ok(tool_result(json!({
                "success": true,
                "content": content,
                "source_format": source,
                "target_format": target,
                "options_used": params.options,
            })))
        }
        Err(e) => Ok(fail(e.to_string())),
    }
}

// --- create_document ---

#[derive(Debug, Deserialize)]
struct CreateDocumentParams {
    template_name: String,
    #[serde(default)]
    context: Map<String, Value>,
    #[serde(default = "default_create_format")]
    output_format: String,
    graph_data: Option<KnowledgeGraph>,
}

fn default_create_format() -> String {
    "markdown".to_string()
}

/// Handle the create_document tool
pub async fn handle_create_document(
    templates: &TemplateEngine,
    transformer: &DocumentTransformer,
    arguments: &Value,
) -> Result<ToolsCallResult> {
    let params: CreateDocumentParams = match parse_params("create_document", arguments) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    let fail = |error: String| {
        tool_result(json!({
            "success": false,
            "error": error,
            "template": params.template_name,
        }))
    };

    let graph = params.graph_data.clone().map(|model| {
        let store = GraphStore::from_model(model);
        log::info!("Loaded graph with {} nodes", store.node_count());
        store
    });

    let mut content =
        match templates.render(&params.template_name, &params.context, graph.as_ref()) {
            Ok(content) => content,
            Err(e) => return Ok(fail(e.to_string())),
        };

    let output_format = match DocumentFormat::parse(&params.output_format) {
        Ok(format) => format,
        Err(e) => return Ok(fail(e.to_string())),
    };
    if output_format != DocumentFormat::Markdown {
        content = match transformer.transform(
            &content,
            DocumentFormat::Markdown,
            output_format,
            &Map::new(),
        ) {
            Ok(content) => content,
            Err(e) => return Ok(fail(e.to_string())),
        };
    }

    log::info!("Created document from template: {}", params.template_name);

    Ok(tool_result(json!({
        "success": true,
        "content": content,
        "format": params.output_format,
        "template": params.template_name,
        "context_keys": params.context.keys().collect::<Vec<_>>(),
    })))
}

// --- catalogue_document ---

#[derive(Debug, Deserialize)]
struct CatalogueDocumentParams {
    content: String,
    title: String,
    #[serde(default = "default_create_format")]
    format: String,
    #[serde(default)]
    metadata: Map<String, Value>,
    #[serde(default = "default_collection")]
    collection: String,
}

fn default_collection() -> String {
    "documents".to_string()
}

/// Handle the catalogue_document tool
pub async fn handle_catalogue_document(
    config: &Config,
    embedder: Arc<OpenAiEmbedder>,
    arguments: &Value,
) -> Result<ToolsCallResult> {
    let params: CatalogueDocumentParams = match parse_params("catalogue_document", arguments) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    let fail = |error: String| {
        tool_result(json!({
            "success": false,
            "error": error,
            "title": params.title,
        }))
    };

    let format = match DocumentFormat::parse(&params.format) {
        Ok(format) => format,
        Err(e) => return Ok(fail(e.to_string())),
    };

    let mut metadata = DocumentMetadata::new(params.title.clone(), format);
    metadata.author = params
        .metadata
        .get("author")
        .and_then(Value::as_str)
        .map(str::to_string);
    metadata.tags = params
        .metadata
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    metadata.description = params
        .metadata
        .get("description")
        .and_then(Value::as_str)
        .map(str::to_string);
    metadata.source_path = params
        .metadata
        .get("source_path")
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(language) = params.metadata.get("language").and_then(Value::as_str) {
        metadata.language = language.to_string();
    }
    metadata.word_count = Some(params.content.split_whitespace().count());

    let word_count = metadata.word_count;
    let indexer = match DocumentIndexer::open(
        config.index_db_path(),
        embedder,
        params.collection.clone(),
    )
    .await
    {
        Ok(indexer) => indexer,
        Err(e) => return Ok(fail(e.to_string())),
    };

    match indexer.add_document(&params.content, metadata).await {
        Ok(document_id) => {
            log::info!("Catalogued document: {} ({})", document_id, params.title);
            Ok(tool_result(json!({
                "success": true,
                "document_id": document_id,
                "title": params.title,
                "format": params.format,
                "collection": params.collection,
                "word_count": word_count,
                "embedding_generated": true,
            })))
        }
        Err(e) => Ok(fail(e.to_string())),
    }
}

// --- search_documents ---

#[derive(Debug, Deserialize)]
struct SearchDocumentsParams {
    query: String,
    #[serde(default = "default_collection")]
    collection: String,
    #[serde(default)]
    filters: Map<String, Value>,
    limit: Option<usize>,
    min_score: Option<f32>,
}

/// Handle the search_documents tool
pub async fn handle_search_documents(
    config: &Config,
    embedder: Arc<OpenAiEmbedder>,
    arguments: &Value,
) -> Result<ToolsCallResult> {
    let params: SearchDocumentsParams = match parse_params("search_documents", arguments) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    let fail = |error: String| {
        tool_result(json!({
            "success": false,
            "error": error,
            "query": params.query,
        }))
    };

    let limit = params.limit.unwrap_or(config.search.default_limit);
    let min_score = params.min_score.unwrap_or(config.search.min_score);

    let indexer = match DocumentIndexer::open(
        config.index_db_path(),
        embedder,
        params.collection.clone(),
    )
    .await
    {
        Ok(indexer) => indexer,
        Err(e) => return Ok(fail(e.to_string())),
    };

    let results = match indexer
        .search(&params.query, &params.filters, limit, min_score)
        .await
    {
        Ok(results) => results,
        Err(e) => return Ok(fail(e.to_string())),
    };

    let results_json: Vec<Value> = results
        .iter()
        .map(|result| {
            json!({
                "document_id": result.document_id,
                "title": result.title,
                "snippet": result.snippet,
                "score": (result.score as f64 * 10000.0).round() / 10000.0,
                "highlights": result.highlights,
                "metadata": {
                    "author": result.metadata.author,
                    "format": result.metadata.format,
                    "tags": result.metadata.tags,
                    "created_at": result.metadata.created_at.to_rfc3339(),
                    "word_count": result.metadata.word_count,
                },
            })
        })
        .collect();

    log::info!(
        "Search '{}' returned {} results",
        params.query,
        results_json.len()
    );

    Ok(tool_result(json!({
        "success": true,
        "query": params.query,
        "num_results": results_json.len(),
        "results": results_json,
        "collection": params.collection,
        "filters_applied": params.filters,
    })))
}

// --- extract_entities ---

#[derive(Debug, Deserialize)]
struct ExtractEntitiesParams {
    content: String,
    entity_types: Option<Vec<String>>,
    #[serde(default = "default_language")]
    language: String,
}

fn default_language() -> String {
    "en".to_string()
}

/// Handle the extract_entities tool
pub async fn handle_extract_entities(arguments: &Value) -> Result<ToolsCallResult> {
    let params: ExtractEntitiesParams = match parse_params("extract_entities", arguments) {
        Ok(p) => p,
        Err(result) => return Ok(result),
    };

    let entity_types = params.entity_types.unwrap_or_else(|| {
        DEFAULT_ENTITY_TYPES
            .iter()
            .map(|t| t.to_string())
            .collect()
    });
    let entities = extract_entities(&params.content);

    Ok(tool_result(json!({
        "success": true,
        "num_entities": entities.len(),
        "entities": entities,
        "entity_types_requested": entity_types,
        "language": params.language,
        "note": "Pattern-based extraction; entity types are not classified",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::sample_underwriting_graph;
    use tempfile::TempDir;

    fn seeded_graphs() -> (GraphService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let graphs = GraphService::new(temp_dir.path());
        graphs
            .write(&sample_underwriting_graph(), "underwriting.json")
            .unwrap();
        (graphs, temp_dir)
    }

    fn envelope_of(result: &ToolsCallResult) -> Value {
        serde_json::from_str(&result.content[0].text).unwrap()
    }

    #[test]
    fn test_tool_definitions_complete() {
        let tools = get_tool_definitions();
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "create_document",
                "transform_document",
                "catalogue_document",
                "search_documents",
                "generate_procedure",
                "query_graph",
                "update_graph",
                "extract_entities",
            ]
        );
        for tool in &tools {
            assert!(tool.input_schema.get("required").is_some(), "{}", tool.name);
        }
    }

    #[tokio::test]
    async fn test_generate_procedure_success() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_generate_procedure(
            &graphs,
            &json!({
                "graph_file": "underwriting.json",
                "start_node": "Loan Application",
                "filters": {"location": "New Mexico", "property_type": "rural"},
                "output_format": "markdown",
            }),
        )
        .await
        .unwrap();
        assert!(result.is_error.is_none());
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["num_steps"], 6);
        assert!(envelope["content"]
            .as_str()
            .unwrap()
            .contains("# Generated Procedure"));
        assert!(envelope["content"].as_str().unwrap().contains("location=New Mexico"));
        assert_eq!(envelope["graph_stats"]["num_nodes"], 16);
        // Role/system hints survive into the step metadata
        let steps = envelope["steps"].as_array().unwrap();
        let verify = steps.iter().find(|s| s["id"] == "Verify Credit Score").unwrap();
        assert_eq!(verify["role"], "Underwriter");
        assert_eq!(verify["system"], "Credit Bureau API");
    }

    #[tokio::test]
    async fn test_generate_procedure_start_node_missing() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_generate_procedure(
            &graphs,
            &json!({"graph_file": "underwriting.json", "start_node": "Nope"}),
        )
        .await
        .unwrap();
        assert_eq!(result.is_error, Some(true));
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"].as_str().unwrap().contains("Start node not found"));
        assert_eq!(envelope["available_nodes"].as_array().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_generate_procedure_graph_file_missing() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_generate_procedure(
            &graphs,
            &json!({"graph_file": "missing.json", "start_node": "Loan Application"}),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"]
            .as_str()
            .unwrap()
            .contains("Graph file not found"));
    }

    #[tokio::test]
    async fn test_generate_procedure_list_format_default() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_generate_procedure(
            &graphs,
            &json!({"graph_file": "underwriting.json", "start_node": "Loan Application"}),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["format"], "list");
        assert!(envelope["content"].as_str().unwrap().starts_with("1. Loan Application"));
    }

    #[tokio::test]
    async fn test_generate_procedure_invalid_params() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_generate_procedure(&graphs, &json!({"start_node": "x"}))
            .await
            .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"].as_str().unwrap().contains("Invalid generate_procedure params"));
    }

    #[tokio::test]
    async fn test_query_graph_get_node() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_query_graph(
            &graphs,
            &json!({
                "graph_file": "underwriting.json",
                "operation": "get_node",
                "node_id": "Underwriter",
            }),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["node"]["type"], "role");
    }

    #[tokio::test]
    async fn test_query_graph_missing_required_arg() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_query_graph(
            &graphs,
            &json!({"graph_file": "underwriting.json", "operation": "get_node"}),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"].as_str().unwrap().contains("node_id required"));
    }

    #[tokio::test]
    async fn test_query_graph_find_path() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_query_graph(
            &graphs,
            &json!({
                "graph_file": "underwriting.json",
                "operation": "find_path",
                "start_node": "Loan Application",
                "end_node": "Request Appraisal",
            }),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["path_length"], 3);
        assert_eq!(envelope["path"][1]["id"], "Verify Credit Score");
    }

    #[tokio::test]
    async fn test_query_graph_unknown_operation() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_query_graph(
            &graphs,
            &json!({"graph_file": "underwriting.json", "operation": "explode"}),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["valid_operations"].is_array());
    }

    #[tokio::test]
    async fn test_query_graph_statistics() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_query_graph(
            &graphs,
            &json!({"graph_file": "underwriting.json", "operation": "get_statistics"}),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["statistics"]["num_nodes"], 16);
        assert_eq!(envelope["statistics"]["num_edges"], 15);
        assert_eq!(envelope["statistics"]["is_directed"], true);
    }

    #[tokio::test]
    async fn test_update_graph_add_node_and_edge() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_update_graph(
            &graphs,
            &json!({
                "graph_file": "underwriting.json",
                "operation": "add_node",
                "node": {"id": "Flood Review", "label": "Flood Review", "type": "process"},
            }),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["message"], "Added node: Flood Review");

        let result = handle_update_graph(
            &graphs,
            &json!({
                "graph_file": "underwriting.json",
                "operation": "add_edge",
                "edge": {"source": "Loan Application", "target": "Flood Review", "relation": "requires"},
            }),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["edge"], "Loan Application --[requires]--> Flood Review");

        // The mutation persisted: the new step is reachable in a fresh load
        let stats = graphs.get_statistics("underwriting.json").unwrap();
        assert_eq!(stats.num_nodes, 17);
        assert_eq!(stats.num_edges, 16);
    }

    #[tokio::test]
    async fn test_update_graph_add_node_missing_fields() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_update_graph(
            &graphs,
            &json!({
                "graph_file": "underwriting.json",
                "operation": "add_node",
                "node": {"id": "No Type"},
            }),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"]
            .as_str()
            .unwrap()
            .contains("node must have id, label, and type fields"));
    }

    #[tokio::test]
    async fn test_update_graph_add_edge_missing_endpoint() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_update_graph(
            &graphs,
            &json!({
                "graph_file": "underwriting.json",
                "operation": "add_edge",
                "edge": {"source": "Loan Application", "target": "Ghost", "relation": "requires"},
            }),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"].as_str().unwrap().contains("Target node not found: Ghost"));
    }

    #[tokio::test]
    async fn test_update_graph_unknown_relation_rejected() {
        let (graphs, _tmp) = seeded_graphs();
        let result = handle_update_graph(
            &graphs,
            &json!({
                "graph_file": "underwriting.json",
                "operation": "add_edge",
                "edge": {"source": "Loan Application", "target": "Underwriter", "relation": "blocks"},
            }),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"].as_str().unwrap().contains("Invalid edge"));
    }

    #[tokio::test]
    async fn test_transform_document_tool() {
        let transformer = DocumentTransformer::new();
        let result = handle_transform_document(
            &transformer,
            &json!({
                "content": "# Hello\n\nThis is **bold**.",
                "source_format": "markdown",
                "target_format": "html",
            }),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], true);
        assert!(envelope["content"].as_str().unwrap().contains("<h1>Hello</h1>"));
        assert_eq!(envelope["source_format"], "markdown");
        assert_eq!(envelope["target_format"], "html");
    }

    #[tokio::test]
    async fn test_transform_document_invalid_format() {
        let transformer = DocumentTransformer::new();
        let result = handle_transform_document(
            &transformer,
            &json!({"content": "x", "source_format": "invalid", "target_format": "html"}),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"].as_str().unwrap().contains("Unknown document format"));
    }

    #[tokio::test]
    async fn test_transform_document_unsupported_pair() {
        let transformer = DocumentTransformer::new();
        let result = handle_transform_document(
            &transformer,
            &json!({"content": "x", "source_format": "pdf", "target_format": "html"}),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"].as_str().unwrap().contains("Unsupported transformation"));
    }

    #[tokio::test]
    async fn test_create_document_tool() {
        let temp_dir = TempDir::new().unwrap();
        let templates = TemplateEngine::new(temp_dir.path());
        templates
            .create_template("summary.md", "# {{ title }}\n\nNodes: {{ graph.stats }}\n")
            .unwrap();
        let transformer = DocumentTransformer::new();
        let graph_data = serde_json::to_value(sample_underwriting_graph().to_model()).unwrap();

        let result = handle_create_document(
            &templates,
            &transformer,
            &json!({
                "template_name": "summary.md",
                "context": {"title": "Underwriting"},
                "graph_data": graph_data,
            }),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], true);
        let content = envelope["content"].as_str().unwrap();
        assert!(content.contains("# Underwriting"));
        assert!(content.contains("\"num_nodes\":16"));
    }

    #[tokio::test]
    async fn test_create_document_template_missing() {
        let temp_dir = TempDir::new().unwrap();
        let templates = TemplateEngine::new(temp_dir.path());
        let transformer = DocumentTransformer::new();
        let result = handle_create_document(
            &templates,
            &transformer,
            &json!({"template_name": "missing.md", "context": {}}),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"].as_str().unwrap().contains("Template not found"));
    }

    #[tokio::test]
    async fn test_create_document_html_output() {
        let temp_dir = TempDir::new().unwrap();
        let templates = TemplateEngine::new(temp_dir.path());
        templates.create_template("t.md", "# {{ title }}\n").unwrap();
        let transformer = DocumentTransformer::new();
        let result = handle_create_document(
            &templates,
            &transformer,
            &json!({
                "template_name": "t.md",
                "context": {"title": "Hi"},
                "output_format": "html",
            }),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], true);
        assert!(envelope["content"].as_str().unwrap().contains("<h1>Hi</h1>"));
    }

    #[tokio::test]
    async fn test_catalogue_document_invalid_format() {
        let config = Config::default();
        let embedder = Arc::new(OpenAiEmbedder::new("k".to_string(), "m".to_string(), 4));
        let result = handle_catalogue_document(
            &config,
            embedder,
            &json!({"content": "x", "title": "T", "format": "rtf"}),
        )
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
        assert!(envelope["error"].as_str().unwrap().contains("Unknown document format"));
    }

    #[tokio::test]
    async fn test_extract_entities_tool() {
        let result = handle_extract_entities(&json!({
            "content": "John Smith from Acme signed in Santa Fe.",
        }))
        .await
        .unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], true);
        assert!(envelope["num_entities"].as_u64().unwrap() >= 2);
        assert_eq!(
            envelope["entity_types_requested"],
            json!(["PERSON", "ORG", "LOCATION", "DATE"])
        );
        let texts: Vec<&str> = envelope["entities"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["text"].as_str().unwrap())
            .collect();
        assert!(texts.contains(&"John Smith"));
        assert!(texts.contains(&"Santa"));
    }

    #[tokio::test]
    async fn test_extract_entities_missing_content() {
        let result = handle_extract_entities(&json!({})).await.unwrap();
        let envelope = envelope_of(&result);
        assert_eq!(envelope["success"], false);
    }
}
