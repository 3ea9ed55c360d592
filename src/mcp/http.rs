//! HTTP transport for the MCP server.
//!
//! A stateless POST endpoint carrying JSON-RPC requests, with bearer-token
//! auth (unless authless mode is enabled) and CORS restricted to the
//! configured origins.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{DocascodeError, Result};
use crate::mcp::server::McpServer;
use crate::mcp::types::{JsonRpcRequest, JsonRpcResponse};

/// HTTP MCP Server wrapper
pub struct HttpMcpServer {
    server: Arc<McpServer>,
    api_key: String,
    allowed_origins: Vec<String>,
}

#[derive(Clone)]
struct AppState {
    server: Arc<McpServer>,
    api_key: String,
}

impl HttpMcpServer {
    /// Create a new HTTP MCP server
    pub fn new(server: McpServer, config: &Config) -> Result<Self> {
        // API key is optional if authless mode is enabled
        let api_key = if config.http_server.authless {
            String::new()
        } else {
            std::env::var(&config.http_server.api_key_env).map_err(|_| {
                DocascodeError::Config(format!(
                    "Environment variable {} not set. Set it or enable authless mode.",
                    config.http_server.api_key_env
                ))
            })?
        };

        Ok(Self {
            server: Arc::new(server),
            api_key,
            allowed_origins: config.http_server.allowed_origins.clone(),
        })
    }

    /// Run the HTTP server on the given port
    pub async fn run(self, port: u16) -> Result<()> {
        let cors = if self.allowed_origins.is_empty() {
            CorsLayer::new().allow_origin(Any).allow_headers(Any).allow_methods(Any)
        } else {
            let origins: Vec<_> = self
                .allowed_origins
                .iter()
                .filter_map(|origin| origin.parse().ok())
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_headers(Any)
                .allow_methods(Any)
        };

        let state = AppState {
            server: self.server,
            api_key: self.api_key,
        };

        let app = Router::new()
            .route("/mcp", post(handle_mcp))
            .route("/health", get(handle_health))
            .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
        log::info!("HTTP MCP server listening on port {}", port);
        axum::serve(listener, app)
            .await
            .map_err(|e| DocascodeError::McpProtocol(format!("HTTP server error: {}", e)))?;
        Ok(())
    }
}

async fn handle_health() -> &'static str {
    "ok"
}

async fn handle_mcp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    if !state.api_key.is_empty() {
        let authorized = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token == state.api_key)
            .unwrap_or(false);
        if !authorized {
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    }

    // HTTP transport is stateless; the initialized flag is per-request
    let mut initialized = false;
    match state.server.process_mcp_request(request, &mut initialized).await {
        Ok(Some(response)) => Json::<JsonRpcResponse>(response).into_response(),
        // Notification: nothing to return
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            log::error!("HTTP MCP request failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
