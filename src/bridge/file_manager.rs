// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Validated file reads.
//!
//! The file manager is the only component that opens agent-requested files,
//! and it only ever opens paths produced by the [`PathValidator`].

use chrono::{DateTime, Utc};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::io::AsyncReadExt;

use super::path_security::{PathValidator, ValidateOptions, ValidatedPath, ValidationError};
use crate::logger::{Logger, TracingLogger};

/// Filesystem operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOperation {
    /// Reading content or metadata.
    Read,
}

impl fmt::Display for FsOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
        }
    }
}

/// An underlying storage operation failed after validation succeeded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Failed to {operation} file: {message}")]
pub struct FileSystemError {
    /// Which operation failed.
    pub operation: FsOperation,
    /// The underlying error message.
    pub message: String,
}

impl FileSystemError {
    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        "FS_ERROR"
    }

    fn read(err: &std::io::Error) -> Self {
        Self {
            operation: FsOperation::Read,
            message: err.to_string(),
        }
    }
}

/// Failure returned by [`FileManager::read_file`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FileError {
    /// The path was refused.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The path was accepted but the read failed.
    #[error(transparent)]
    FileSystem(#[from] FileSystemError),
}

impl FileError {
    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::FileSystem(e) => e.code(),
        }
    }
}

/// Content and metadata of a validated file.
#[derive(Debug, Clone)]
pub struct FileReadResult {
    /// File content, decoded as UTF-8 with invalid sequences replaced.
    pub content: String,
    /// Canonical path the content was read from.
    pub filepath: ValidatedPath,
    /// Final segment of `filepath`.
    pub filename: String,
    /// Number of bytes read.
    pub file_size: u64,
    /// Modification time reported by the handle the content was read from.
    pub last_modified: DateTime<Utc>,
}

/// Reads files through the path validator.
pub struct FileManager<L: Logger = TracingLogger> {
    validator: Arc<PathValidator>,
    logger: L,
}

impl FileManager<TracingLogger> {
    /// Creates a file manager that logs through `tracing`.
    #[must_use]
    pub const fn with_tracing(validator: Arc<PathValidator>) -> Self {
        Self::new(validator, TracingLogger)
    }
}

impl<L: Logger> FileManager<L> {
    /// Creates a file manager with an explicit logger.
    #[must_use]
    pub const fn new(validator: Arc<PathValidator>, logger: L) -> Self {
        Self { validator, logger }
    }

    /// The validator this manager reads through.
    #[must_use]
    pub fn validator(&self) -> &PathValidator {
        &self.validator
    }

    /// Reads `input_path` after validating it against the workspace root.
    ///
    /// Exactly one event is logged per call: `info` on success, `error` on
    /// failure.
    ///
    /// # Errors
    ///
    /// - [`FileError::Validation`] if the path is refused; the validator's
    ///   error is returned unchanged.
    /// - [`FileError::FileSystem`] if opening, reading, or stat-ing the file
    ///   fails.
    pub async fn read_file(&self, input_path: &str) -> Result<FileReadResult, FileError> {
        let start = Instant::now();

        let filepath = match self
            .validator
            .validate_path(input_path, ValidateOptions::readable())
            .await
        {
            Ok(path) => path,
            Err(e) => {
                self.logger.error(
                    "File validation failed",
                    json!({
                        "inputPath": input_path,
                        "error": e.to_string(),
                        "code": e.code(),
                    }),
                );
                return Err(e.into());
            }
        };

        let (bytes, modified) = match Self::read_handle(&filepath).await {
            Ok(read) => read,
            Err(e) => {
                self.logger.error(
                    "File read failed",
                    json!({
                        "inputPath": input_path,
                        "operation": e.operation.to_string(),
                        "error": &e.message,
                    }),
                );
                return Err(e.into());
            }
        };

        let file_size = bytes.len() as u64;
        let filename = filepath.file_name();
        let duration = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        self.logger.info(
            "File read",
            json!({
                "filepath": filepath.to_string(),
                "fileSize": file_size,
                "duration": duration,
            }),
        );

        Ok(FileReadResult {
            content: String::from_utf8_lossy(&bytes).into_owned(),
            filepath,
            filename,
            file_size,
            last_modified: modified,
        })
    }

    /// Opens the path once and takes content and metadata from that handle,
    /// so a swap of the directory entry after open cannot mix two files.
    async fn read_handle(
        path: &ValidatedPath,
    ) -> Result<(Vec<u8>, DateTime<Utc>), FileSystemError> {
        let mut file = tokio::fs::File::open(path.as_path())
            .await
            .map_err(|e| FileSystemError::read(&e))?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .await
            .map_err(|e| FileSystemError::read(&e))?;

        let metadata = file
            .metadata()
            .await
            .map_err(|e| FileSystemError::read(&e))?;
        let modified = metadata
            .modified()
            .map_err(|e| FileSystemError::read(&e))?;

        Ok((bytes, DateTime::<Utc>::from(modified)))
    }
}
