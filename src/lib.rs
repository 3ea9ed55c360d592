pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod graph;
pub mod index;
pub mod mcp;
pub mod query;
pub mod seed;
pub mod templates;
pub mod transform;

pub use config::Config;
pub use error::{DocascodeError, Result};
pub use graph::{generate_procedure, ContextFilters, GraphStore};
