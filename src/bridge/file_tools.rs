// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! File I/O tool handlers: `read_file`, `validate_paths`.
//!
//! Domain failures (refused paths, failed reads) come back as `isError`
//! results carrying the error code; malformed arguments are returned as
//! errors.

use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::fmt::Write;

use super::handler::FileToolHandler;
use crate::logger::Logger;
use crate::mcp::CallToolResult;

/// Input for `read_file`.
#[derive(Debug, Deserialize)]
pub struct ReadFileInput {
    /// Path relative to the workspace root, or absolute inside it.
    pub path: String,
}

/// Input for `validate_paths`.
#[derive(Debug, Deserialize)]
pub struct ValidatePathsInput {
    /// Paths to check.
    pub paths: Vec<String>,
}

fn parse_arguments<T: for<'de> Deserialize<'de>>(
    arguments: Option<serde_json::Value>,
) -> Result<T> {
    serde_json::from_value(arguments.ok_or_else(|| anyhow!("Missing arguments"))?)
        .map_err(|e| anyhow!("Invalid arguments: {e}"))
}

impl<L: Logger> FileToolHandler<L> {
    /// Handles the `read_file` tool call.
    pub(super) fn handle_read_file(
        &self,
        arguments: Option<serde_json::Value>,
    ) -> Result<CallToolResult> {
        let input: ReadFileInput = parse_arguments(arguments)?;

        tracing::debug!("read_file: {}", input.path);

        match self.runtime.block_on(self.files.read_file(&input.path)) {
            Ok(read) => {
                let mut text = String::new();
                let _ = writeln!(
                    text,
                    "{} ({} bytes, modified {})",
                    read.filename,
                    read.file_size,
                    read.last_modified.to_rfc3339()
                );
                text.push('\n');
                text.push_str(&read.content);
                Ok(CallToolResult::text(text))
            }
            Err(e) => Ok(CallToolResult::error(format!("{}: {e}", e.code()))),
        }
    }

    /// Handles the `validate_paths` tool call.
    pub(super) fn handle_validate_paths(
        &self,
        arguments: Option<serde_json::Value>,
    ) -> Result<CallToolResult> {
        let input: ValidatePathsInput = parse_arguments(arguments)?;

        tracing::debug!("validate_paths: {} path(s)", input.paths.len());

        let validator = self.files.validator();
        match self
            .runtime
            .block_on(validator.validate_multiple_paths(&input.paths))
        {
            Ok(validated) => {
                let mut text = String::new();
                for path in &validated {
                    let relative = validator.relative(path);
                    if relative.as_os_str().is_empty() {
                        text.push_str(".\n");
                    } else {
                        let _ = writeln!(text, "{}", relative.display());
                    }
                }
                if text.is_empty() {
                    text = "No paths given".to_string();
                }
                Ok(CallToolResult::text(text))
            }
            Err(e) => Ok(CallToolResult::error(format!("{}: {e}", e.code()))),
        }
    }
}
