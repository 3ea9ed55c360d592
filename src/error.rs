use thiserror::Error;

/// Main error type for Docascode
#[derive(Error, Debug)]
pub enum DocascodeError {
    /// Document index database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Graph file not found
    #[error("Graph file not found: {0}")]
    GraphFileNotFound(String),

    /// Graph node not found
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Graph edge not found
    #[error("Edge not found: {0} --> {1}")]
    EdgeNotFound(String, String),

    /// No path between two nodes
    #[error("No path found between {0} and {1}")]
    PathNotFound(String, String),

    /// Template not found
    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    /// Document not found in the index
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Embedding API errors
    #[error("Embedding API error: {0}")]
    Embedding(String),

    /// Unsupported operation or format conversion
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),
}

/// Convenient Result type using DocascodeError
pub type Result<T> = std::result::Result<T, DocascodeError>;
