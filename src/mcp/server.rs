// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! MCP server over line-delimited JSON-RPC.

use anyhow::{Context, Result, anyhow};
use std::io::{BufRead, Write};
use tracing::{debug, error, info, trace, warn};

use super::types::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_PARAMS, InitializeParams,
    InitializeResult, ListToolsResult, METHOD_NOT_FOUND, Notification, PROTOCOL_VERSION,
    Request, Response, ServerCapabilities, ServerInfo, Tool, ToolsCapability,
};

/// Trait for handling MCP tool calls.
pub trait ToolHandler: Send + Sync {
    /// Returns the list of available tools.
    fn list_tools(&self) -> Vec<Tool>;

    /// Handles a tool call and returns the result.
    ///
    /// # Errors
    ///
    /// An error is reported to the client as an `isError` tool result.
    fn call_tool(&self, name: &str, arguments: Option<serde_json::Value>)
    -> Result<CallToolResult>;
}

/// Usage notes sent to the client on `initialize`.
const INSTRUCTIONS: &str = "All paths are resolved against the workspace root. \
Paths containing '..' or pointing outside the workspace are refused.";

/// MCP server speaking JSON-RPC, one message per line.
pub struct McpServer<H: ToolHandler> {
    handler: H,
    initialized: bool,
}

impl<H: ToolHandler> McpServer<H> {
    /// Creates a server dispatching tool calls to `handler`.
    pub const fn new(handler: H) -> Self {
        Self {
            handler,
            initialized: false,
        }
    }

    /// Whether the client has sent `notifications/initialized`.
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Runs the server on stdin/stdout until stdin closes.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read or stdout cannot be written.
    pub fn run(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        self.serve(stdin.lock(), stdout.lock())
    }

    /// Serves requests read from `input`, writing responses to `output`.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub fn serve(&mut self, input: impl BufRead, mut output: impl Write) -> Result<()> {
        info!("MCP server starting, waiting for requests");

        for line in input.lines() {
            let line = line.context("Failed to read request")?;

            if line.trim().is_empty() {
                continue;
            }

            trace!("Received: {}", line);

            let response = match self.handle_message(&line) {
                Ok(response) => response,
                Err(e) => {
                    error!("Error handling message: {}", e);
                    // Answer only if the message carried an id.
                    serde_json::from_str::<Request>(&line)
                        .ok()
                        .map(|req| Response::error(req.id, INTERNAL_ERROR, e.to_string()))
                }
            };

            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                trace!("Sending: {}", response_json);
                writeln!(output, "{response_json}")?;
                output.flush()?;
            }
        }

        info!("MCP server shutting down (input closed)");
        Ok(())
    }

    fn handle_message(&mut self, line: &str) -> Result<Option<Response>> {
        if let Ok(request) = serde_json::from_str::<Request>(line) {
            return self.handle_request(request).map(Some);
        }

        if let Ok(notification) = serde_json::from_str::<Notification>(line) {
            self.handle_notification(&notification);
            return Ok(None);
        }

        Err(anyhow!(
            "Failed to parse message as request or notification"
        ))
    }

    fn handle_request(&self, request: Request) -> Result<Response> {
        debug!("Handling request: {} (id={:?})", request.method, request.id);

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request),
            "tools/list" => self.handle_tools_list(request),
            "tools/call" => self.handle_tools_call(request),
            "ping" => Ok(Response::success(request.id, serde_json::json!({}))?),
            _ => {
                warn!("Unknown method: {}", request.method);
                Ok(Response::error(
                    request.id,
                    METHOD_NOT_FOUND,
                    format!("Unknown method: {}", request.method),
                ))
            }
        }
    }

    fn handle_notification(&mut self, notification: &Notification) {
        debug!("Handling notification: {}", notification.method);

        match notification.method.as_str() {
            "notifications/initialized" => {
                info!("MCP client initialized");
                self.initialized = true;
            }
            "notifications/cancelled" => {
                debug!("Request cancelled");
            }
            _ => {
                debug!("Ignoring unknown notification: {}", notification.method);
            }
        }
    }

    fn handle_initialize(&self, request: Request) -> Result<Response> {
        let params: InitializeParams = match request.params.map(serde_json::from_value).transpose()
        {
            Ok(Some(params)) => params,
            Ok(None) => {
                return Ok(Response::error(
                    request.id,
                    INVALID_PARAMS,
                    "Missing initialize params",
                ));
            }
            Err(e) => {
                return Ok(Response::error(
                    request.id,
                    INVALID_PARAMS,
                    format!("Invalid initialize params: {e}"),
                ));
            }
        };

        info!(
            "MCP client connecting: {} v{}",
            params.client_info.name,
            params.client_info.version.as_deref().unwrap_or("unknown")
        );
        info!("Protocol version: {}", params.protocol_version);

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: None }),
            },
            server_info: ServerInfo {
                name: "filepeek".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };

        Ok(Response::success(request.id, result)?)
    }

    fn handle_tools_list(&self, request: Request) -> Result<Response> {
        let tools = self.handler.list_tools();
        debug!("Listing {} tools", tools.len());

        Ok(Response::success(request.id, ListToolsResult { tools })?)
    }

    fn handle_tools_call(&self, request: Request) -> Result<Response> {
        let params: CallToolParams = request
            .params
            .map(serde_json::from_value)
            .transpose()
            .context("Invalid tools/call params")?
            .ok_or_else(|| anyhow!("Missing tools/call params"))?;

        debug!("Calling tool: {}", params.name);

        let result = match self.handler.call_tool(&params.name, params.arguments) {
            Ok(result) => result,
            Err(e) => {
                error!("Tool call failed: {}", e);
                CallToolResult::error(e.to_string())
            }
        };
        Ok(Response::success(request.id, result)?)
    }
}
