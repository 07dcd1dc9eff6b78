// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// MCP server implementation over stdin/stdout.
mod server;
/// MCP type definitions and JSON-RPC messages.
mod types;

pub use server::{McpServer, ToolHandler};
pub use types::{
    CallToolParams, CallToolResult, ClientInfo, INTERNAL_ERROR, INVALID_PARAMS, InitializeParams,
    InitializeResult, ListToolsResult, METHOD_NOT_FOUND, Notification, PROTOCOL_VERSION, Request,
    RequestId, Response, ResponseError, ServerCapabilities, ServerInfo, Tool, ToolContent,
    ToolsCapability,
};
