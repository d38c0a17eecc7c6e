//! Transports for the MCP server.
//!
//! - HTTP: `POST /mcp` carries one JSON-RPC message per request. Responses
//!   come back as JSON; notifications are acknowledged with `202 Accepted`.
//! - stdio: one JSON-RPC message per line on stdin, responses on stdout.
//!
//! Store access is synchronous, so every message is handled on tokio's
//! blocking pool.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eyre::{Context, Result};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{error, info};

use crate::mcp::{INTERNAL_ERROR, JsonRpcResponse, McpServer};

/// Shared state for the HTTP routes.
#[derive(Clone)]
pub struct AppState {
    pub server: Arc<McpServer>,
}

/// Create the axum Router with the MCP endpoint and a health check.
pub fn create_router(server: McpServer) -> Router {
    let state = AppState {
        server: Arc::new(server),
    };

    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn handle_mcp(State(state): State<AppState>, body: String) -> Response {
    match dispatch(state.server.clone(), body).await {
        Ok(Some(resp)) => Json(resp).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            error!(error = ?e, "[MCP] Request handler failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(JsonRpcResponse::error(Value::Null, INTERNAL_ERROR, "Internal error")),
            )
                .into_response()
        }
    }
}

/// Handle one raw message on the blocking pool.
async fn dispatch(server: Arc<McpServer>, raw: String) -> Result<Option<JsonRpcResponse>> {
    tokio::task::spawn_blocking(move || server.handle_message(&raw))
        .await
        .context("MCP handler task panicked")
}

/// Serve MCP over HTTP until Ctrl-C.
pub async fn serve_http(server: McpServer, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "MCP HTTP server listening on /mcp");

    axum::serve(listener, create_router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("MCP HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl-C");
    }
}

/// Serve MCP over the process's stdin/stdout.
pub async fn serve_stdio(server: McpServer) -> Result<()> {
    let reader = tokio::io::BufReader::new(tokio::io::stdin());
    let writer = tokio::io::stdout();

    info!("MCP stdio server running");
    serve_lines(Arc::new(server), reader, writer).await?;
    info!("MCP stdin closed, shutting down");
    Ok(())
}

/// Line-delimited message loop used by the stdio transport.
pub async fn serve_lines<R, W>(server: Arc<McpServer>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read from input")? {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        if let Some(resp) = dispatch(server.clone(), line).await? {
            let mut out = serde_json::to_string(&resp).context("Failed to serialize response")?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await.context("Failed to write response")?;
            writer.flush().await.context("Failed to flush output")?;
        }
    }

    Ok(())
}
