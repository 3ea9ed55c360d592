//! MCP tool-calling layer: JSON-RPC 2.0 types, tool definitions and
//! handlers, and the stdio/HTTP transports.

pub mod http;
pub mod server;
pub mod tools;
pub mod types;

pub use http::HttpMcpServer;
pub use server::McpServer;
