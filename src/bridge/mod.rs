// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

/// Validated file reads.
mod file_manager;
/// File I/O tool handlers.
mod file_tools;
/// Maps MCP tool calls to file manager operations.
mod handler;
/// Path validation and security for file I/O tools.
pub mod path_security;

pub use file_manager::{FileError, FileManager, FileReadResult, FileSystemError, FsOperation};
pub use handler::FileToolHandler;
pub use path_security::{PathValidator, ValidateOptions, ValidatedPath, ValidationError};
