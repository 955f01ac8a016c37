//! MCP tool frontend
//!
//! Exposes `dbg_exec` and `dbg_ask` over the streamable HTTP transport at
//! `/mcp`. Queue failures come back as tool errors (`isError: true`) rather
//! than protocol errors, so clients see the text.

use std::sync::Arc;

use axum::Router;
use rmcp::{
    ErrorData as McpError,
    handler::server::{ServerHandler, tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router,
    transport::streamable_http_server::{
        StreamableHttpService, session::local::LocalSessionManager,
    },
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{BridgeState, control_routes};
use crate::handoff::CommandKind;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ExecParams {
    /// Debugger command to execute (e.g. "kb", "r rax", "!analyze -v")
    pub command: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AskParams {
    /// Natural-language question about the debugging session
    pub query: String,
}

/// MCP server handing tool calls to the queue
#[derive(Clone)]
pub(crate) struct DebuggerMcpServer {
    tool_router: ToolRouter<Self>,
    state: BridgeState,
}

#[tool_router]
impl DebuggerMcpServer {
    pub(crate) fn new(state: BridgeState) -> Self {
        Self {
            tool_router: Self::tool_router(),
            state,
        }
    }

    #[tool(description = "Execute a debugger command and return its raw output")]
    async fn dbg_exec(&self, params: Parameters<ExecParams>) -> Result<CallToolResult, McpError> {
        self.call(CommandKind::RawExec, params.0.command).await
    }

    #[tool(description = "Ask the AI assistant a question about the debugging session")]
    async fn dbg_ask(&self, params: Parameters<AskParams>) -> Result<CallToolResult, McpError> {
        self.call(CommandKind::AssistantAsk, params.0.query).await
    }
}

impl DebuggerMcpServer {
    async fn call(&self, kind: CommandKind, input: String) -> Result<CallToolResult, McpError> {
        if input.is_empty() {
            return Err(McpError::invalid_params(
                format!("missing {}", argument_name(kind)),
                None,
            ));
        }
        match self.state.submit(kind, input).await {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => {
                log::warn!("{kind} tool call failed: {e}");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }
}

#[tool_handler]
impl ServerHandler for DebuggerMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "Debugger bridge: dbg_exec runs a raw debugger command, dbg_ask asks the \
                 assistant attached to the same session"
                    .into(),
            ),
        }
    }
}

fn argument_name(kind: CommandKind) -> &'static str {
    match kind {
        CommandKind::RawExec => "command",
        CommandKind::AssistantAsk => "query",
    }
}

pub(super) fn router(state: BridgeState) -> Router {
    let server = DebuggerMcpServer::new(state.clone());
    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        Default::default(),
    );
    Router::new()
        .nest_service("/mcp", service)
        .merge(control_routes().with_state(state))
}
