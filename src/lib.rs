// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! filepeek serves workspace files to AI assistants over MCP.
//!
//! Every path an agent supplies passes through a [`bridge::PathValidator`]
//! bound to one workspace root before any file is opened, and every
//! long-lived resource is torn down through a [`resource::ResourceManager`].

/// File access boundary and MCP tool handlers.
pub mod bridge;
/// Configuration loading.
pub mod config;
/// Structured logging capability.
pub mod logger;
/// MCP server implementation and type definitions.
pub mod mcp;
/// Helpers for composing `Result`-returning stages.
pub mod pipe;
/// Ordered, failure-tolerant resource teardown.
pub mod resource;
