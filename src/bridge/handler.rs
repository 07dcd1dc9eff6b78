// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Bridge handler that maps MCP tool calls to file manager operations.

use anyhow::{Result, anyhow};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Handle;

use super::file_manager::FileManager;
use crate::logger::Logger;
use crate::mcp::{CallToolResult, Tool, ToolHandler};

/// Serves the file tools.
///
/// The MCP server is synchronous and runs on a blocking thread; async file
/// operations are driven through the runtime handle.
pub struct FileToolHandler<L: Logger> {
    pub(super) files: Arc<FileManager<L>>,
    pub(super) runtime: Handle,
}

impl<L: Logger> FileToolHandler<L> {
    /// Creates a handler over `files`, driving async work on `runtime`.
    pub const fn new(files: Arc<FileManager<L>>, runtime: Handle) -> Self {
        Self { files, runtime }
    }
}

impl<L: Logger> ToolHandler for FileToolHandler<L> {
    fn list_tools(&self) -> Vec<Tool> {
        vec![
            Tool {
                name: "read_file".to_string(),
                description: Some(
                    "Read a file inside the workspace. Returns a header line with the file \
                     name, size and modification time, then the content."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Path relative to the workspace root, or an absolute path inside it"
                        }
                    },
                    "required": ["path"]
                }),
            },
            Tool {
                name: "validate_paths".to_string(),
                description: Some(
                    "Check that every path resolves inside the workspace. Fails as a whole \
                     if any path is refused."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "paths": {
                            "type": "array",
                            "items": { "type": "string" }
                        }
                    },
                    "required": ["paths"]
                }),
            },
        ]
    }

    fn call_tool(
        &self,
        name: &str,
        arguments: Option<serde_json::Value>,
    ) -> Result<CallToolResult> {
        match name {
            "read_file" => self.handle_read_file(arguments),
            "validate_paths" => self.handle_validate_paths(arguments),
            _ => Err(anyhow!("Unknown tool: {name}")),
        }
    }
}
