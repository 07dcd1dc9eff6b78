// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Path validation and security for file I/O tools.
//!
//! Every path supplied by an agent is resolved against a single workspace
//! root. Nothing outside that root (directly, through `..`, or through a
//! symlink) is ever handed to the file manager.

use anyhow::{Context, anyhow};
use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Why a path was refused.
///
/// Messages only ever mention the path the caller supplied, never the
/// canonical path it resolved to.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// The path escapes the workspace root.
    #[error("Path is outside the workspace: {input}")]
    Traversal {
        /// The caller-supplied path.
        input: String,
    },

    /// The path is malformed.
    #[error("Invalid path {input:?}: {reason}")]
    Invalid {
        /// The caller-supplied path.
        input: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The path is inside the workspace but cannot be read.
    #[error("Path is not accessible: {input}: {reason}")]
    NotAccessible {
        /// The caller-supplied path.
        input: String,
        /// The underlying I/O failure.
        reason: String,
    },
}

impl ValidationError {
    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Traversal { .. } => "PATH_TRAVERSAL",
            Self::Invalid { .. } => "PATH_INVALID",
            Self::NotAccessible { .. } => "PATH_NOT_ACCESSIBLE",
        }
    }

    fn traversal(input: &str) -> Self {
        Self::Traversal {
            input: input.to_string(),
        }
    }

    fn invalid(input: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    fn not_accessible(input: &str, err: &io::Error) -> Self {
        Self::NotAccessible {
            input: input.to_string(),
            reason: err.kind().to_string(),
        }
    }
}

/// Options for [`PathValidator::validate_path`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// Require the path to exist and be openable for reading.
    pub check_access: bool,
}

impl ValidateOptions {
    /// Options that require the target to be readable.
    #[must_use]
    pub const fn readable() -> Self {
        Self { check_access: true }
    }
}

/// An absolute, canonical path that was inside the workspace root when it
/// was validated.
///
/// Only [`PathValidator`] constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValidatedPath(PathBuf);

impl ValidatedPath {
    /// The canonical path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Final path segment, or an empty string for the root itself.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Consumes the wrapper.
    #[must_use]
    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for ValidatedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for ValidatedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Validates that file paths resolve inside the workspace root.
#[derive(Debug, Clone)]
pub struct PathValidator {
    /// Canonical workspace root.
    root: PathBuf,
}

impl PathValidator {
    /// Creates a validator for `root`, canonicalizing it once.
    ///
    /// # Errors
    ///
    /// Returns an error if the root does not exist or is not a directory.
    pub fn new(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .with_context(|| format!("Workspace root does not exist: {}", root.display()))?;
        if !canonical.is_dir() {
            return Err(anyhow!("Workspace root is not a directory: {}", root.display()));
        }
        debug!("PathValidator initialized with root {}", canonical.display());
        Ok(Self { root: canonical })
    }

    /// The canonical workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `validated` relative to the workspace root.
    #[must_use]
    pub fn relative(&self, validated: &ValidatedPath) -> PathBuf {
        validated
            .as_path()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Validates `input` against the workspace root.
    ///
    /// Relative inputs resolve against the root. Symlinks are followed and
    /// the resolved target must also lie inside the root.
    ///
    /// # Errors
    ///
    /// - `PATH_INVALID` for empty input or input with control characters.
    /// - `PATH_TRAVERSAL` for `..` segments, absolute paths outside the root,
    ///   or anything that resolves outside the root.
    /// - `PATH_NOT_ACCESSIBLE` if `check_access` is set and the target cannot
    ///   be opened for reading.
    pub async fn validate_path(
        &self,
        input: &str,
        options: ValidateOptions,
    ) -> Result<ValidatedPath, ValidationError> {
        let candidate = self.screen(input)?;

        let canonical = match tokio::fs::canonicalize(&candidate).await {
            Ok(canonical) => canonical,
            Err(e) => {
                self.refuse_dangling_escape(input, &candidate)?;
                if options.check_access {
                    return Err(ValidationError::not_accessible(input, &e));
                }
                let (ancestor, rest) = split_existing_ancestor(&candidate);
                let ancestor = tokio::fs::canonicalize(&ancestor)
                    .await
                    .map_err(|e| ValidationError::not_accessible(input, &e))?;
                ancestor.join(rest)
            }
        };

        let validated = self.contain(input, canonical)?;

        if options.check_access
            && let Err(e) = tokio::fs::File::open(validated.as_path()).await
        {
            return Err(ValidationError::not_accessible(input, &e));
        }

        Ok(validated)
    }

    /// Blocking counterpart of [`validate_path`](Self::validate_path).
    ///
    /// # Errors
    ///
    /// Same as [`validate_path`](Self::validate_path).
    pub fn validate_path_sync(
        &self,
        input: &str,
        options: ValidateOptions,
    ) -> Result<ValidatedPath, ValidationError> {
        let candidate = self.screen(input)?;

        let canonical = match candidate.canonicalize() {
            Ok(canonical) => canonical,
            Err(e) => {
                self.refuse_dangling_escape(input, &candidate)?;
                if options.check_access {
                    return Err(ValidationError::not_accessible(input, &e));
                }
                let (ancestor, rest) = split_existing_ancestor(&candidate);
                let ancestor = ancestor
                    .canonicalize()
                    .map_err(|e| ValidationError::not_accessible(input, &e))?;
                ancestor.join(rest)
            }
        };

        let validated = self.contain(input, canonical)?;

        if options.check_access
            && let Err(e) = std::fs::File::open(validated.as_path())
        {
            return Err(ValidationError::not_accessible(input, &e));
        }

        Ok(validated)
    }

    /// Validates every input in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first entry's error; no partial list is returned.
    pub async fn validate_multiple_paths<S: AsRef<str>>(
        &self,
        inputs: &[S],
    ) -> Result<Vec<ValidatedPath>, ValidationError> {
        let mut validated = Vec::with_capacity(inputs.len());
        for input in inputs {
            validated.push(
                self.validate_path(input.as_ref(), ValidateOptions::default())
                    .await?,
            );
        }
        Ok(validated)
    }

    /// Lexical checks on the raw input, before touching the filesystem.
    ///
    /// Returns the path to resolve.
    fn screen(&self, input: &str) -> Result<PathBuf, ValidationError> {
        if input.is_empty() {
            return Err(ValidationError::invalid(input, "path is empty"));
        }
        if input.chars().any(char::is_control) {
            return Err(ValidationError::invalid(
                input,
                "path contains control characters",
            ));
        }
        // Split on both separators so `..\` is caught on every platform.
        if input.split(['/', '\\']).any(|segment| segment == "..") {
            return Err(ValidationError::traversal(input));
        }

        let path = Path::new(input);
        if path.is_absolute() {
            if !path.starts_with(&self.root) {
                return Err(ValidationError::traversal(input));
            }
            Ok(path.to_path_buf())
        } else {
            Ok(self.root.join(path))
        }
    }

    /// Component-wise containment check on a canonical path.
    fn contain(&self, input: &str, canonical: PathBuf) -> Result<ValidatedPath, ValidationError> {
        // `Path::starts_with` compares whole components, so `/ws-evil` is not
        // under `/ws`.
        if canonical.starts_with(&self.root) {
            Ok(ValidatedPath(canonical))
        } else {
            Err(ValidationError::traversal(input))
        }
    }

    /// Refuses a path whose symlinks lead outside the root even though their
    /// targets do not exist.
    fn refuse_dangling_escape(&self, input: &str, candidate: &Path) -> Result<(), ValidationError> {
        match follow_links_lexically(candidate) {
            Some(resolved) if !resolved.starts_with(&self.root) => {
                Err(ValidationError::traversal(input))
            }
            // Too many links to follow: treat as an escape.
            None => Err(ValidationError::traversal(input)),
            Some(_) => Ok(()),
        }
    }
}

/// Symlinks followed before [`follow_links_lexically`] gives up.
const MAX_LINK_HOPS: usize = 40;

/// Resolves `path` by following every symlink along it, without requiring the
/// final target to exist. `.` and `..` are applied lexically.
///
/// Returns `None` after [`MAX_LINK_HOPS`] links.
fn follow_links_lexically(path: &Path) -> Option<PathBuf> {
    let mut pending: Vec<PathBuf> = path
        .components()
        .rev()
        .map(|c| PathBuf::from(c.as_os_str()))
        .collect();
    let mut resolved = PathBuf::new();
    let mut hops = 0;

    while let Some(part) = pending.pop() {
        match part.components().next() {
            Some(Component::Prefix(_)) => resolved = part,
            Some(Component::RootDir) => resolved.push(&part),
            Some(Component::ParentDir) => {
                resolved.pop();
            }
            Some(Component::Normal(name)) => {
                resolved.push(name);
                let is_link = resolved
                    .symlink_metadata()
                    .is_ok_and(|meta| meta.file_type().is_symlink());
                if is_link {
                    hops += 1;
                    if hops > MAX_LINK_HOPS {
                        return None;
                    }
                    let target = std::fs::read_link(&resolved).ok()?;
                    resolved.pop();
                    pending.extend(
                        target
                            .components()
                            .rev()
                            .map(|c| PathBuf::from(c.as_os_str())),
                    );
                }
            }
            Some(Component::CurDir) | None => {}
        }
    }
    Some(resolved)
}

/// Splits `path` into its deepest existing ancestor and the components below
/// it.
///
/// Uses `symlink_metadata` so a dangling symlink counts as existing; resolving
/// it later fails instead of silently re-rooting the path under its parent.
fn split_existing_ancestor(path: &Path) -> (PathBuf, PathBuf) {
    let mut ancestor = path;
    let mut rest = Vec::new();
    while ancestor.symlink_metadata().is_err() {
        let (Some(parent), Some(name)) = (ancestor.parent(), ancestor.file_name()) else {
            break;
        };
        rest.push(name);
        ancestor = parent;
    }
    let rest = rest.into_iter().rev().collect::<PathBuf>();
    (ancestor.to_path_buf(), rest)
}
