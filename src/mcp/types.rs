// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Wire types for the slice of MCP that filepeek speaks.
//!
//! JSON-RPC 2.0 envelopes, the `initialize` handshake, and `tools/list` /
//! `tools/call`. Field names follow the protocol's camelCase on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision the server answers with.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Value of every envelope's `jsonrpc` field.
const JSONRPC_VERSION: &str = "2.0";

/// Unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Missing or malformed params.
pub const INVALID_PARAMS: i64 = -32602;
/// Handler failed while building a result.
pub const INTERNAL_ERROR: i64 = -32603;

/// Incoming call that expects a response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(
    dead_code,
    reason = "jsonrpc is carried for the wire format and never inspected"
)]
pub struct Request {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Echoed back on the response.
    pub id: RequestId,
    /// e.g. `tools/call`.
    pub method: String,
    /// Method-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Incoming message with no `id`; never answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(
    dead_code,
    reason = "jsonrpc and params are carried for the wire format and never inspected"
)]
pub struct Notification {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// e.g. `notifications/initialized`.
    pub method: String,
    /// Method-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Clients may number their requests or name them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    /// `"id": 7`
    Number(i64),
    /// `"id": "abc"`
    String(String),
}

/// Reply to a [`Request`]; exactly one of `result` and `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Copied from the request.
    pub id: RequestId,
    /// Present on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Present on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    fn envelope(id: RequestId, result: Option<Value>, error: Option<ResponseError>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
            error,
        }
    }

    /// Wraps `result` as a success reply.
    ///
    /// # Errors
    ///
    /// Returns an error if `result` does not serialize to JSON.
    pub fn success(id: RequestId, result: impl Serialize) -> Result<Self, serde_json::Error> {
        Ok(Self::envelope(id, Some(serde_json::to_value(result)?), None))
    }

    /// Builds a failure reply with one of the JSON-RPC error codes.
    pub fn error(id: RequestId, code: i64, message: impl Into<String>) -> Self {
        let error = ResponseError {
            code,
            message: message.into(),
            data: None,
        };
        Self::envelope(id, None, Some(error))
    }
}

/// `error` member of a failed [`Response`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    /// JSON-RPC error code.
    pub code: i64,
    /// Short description.
    pub message: String,
    /// Never set by this server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Params of `initialize`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(
    dead_code,
    reason = "client capabilities are accepted but filepeek offers nothing that depends on them"
)]
pub struct InitializeParams {
    /// Revision the client asked for; logged, not negotiated.
    pub protocol_version: String,
    /// Ignored.
    #[serde(default)]
    pub capabilities: Value,
    /// Who is connecting.
    pub client_info: ClientInfo,
}

/// `clientInfo` from `initialize`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientInfo {
    /// Client name, e.g. an editor or agent host.
    pub name: String,
    /// Some clients omit this.
    #[serde(default)]
    pub version: Option<String>,
}

/// Result of `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Always [`PROTOCOL_VERSION`].
    pub protocol_version: String,
    /// What the server offers.
    pub capabilities: ServerCapabilities,
    /// Name and build of this server.
    pub server_info: ServerInfo,
    /// Free-text usage notes shown to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// filepeek only advertises tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Set when tools are served.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// `capabilities.tools`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    /// The tool set is fixed, so this stays unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// `serverInfo` in the `initialize` result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    /// `"filepeek"`.
    pub name: String,
    /// Build version from `git describe`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// One entry of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    /// Name the client calls the tool by.
    pub name: String,
    /// Shown to the model when it picks a tool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of `arguments`.
    pub input_schema: Value,
}

/// Result of `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListToolsResult {
    /// Every tool the handler serves.
    pub tools: Vec<Tool>,
}

/// Params of `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct CallToolParams {
    /// Which tool.
    pub name: String,
    /// Tool input, checked against the tool's schema by the handler.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Result of `tools/call`.
///
/// Tool-level failures are still successful JSON-RPC replies, flagged with
/// `isError`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Output blocks.
    pub content: Vec<ToolContent>,
    /// `Some(true)` when the tool failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// An output block; filepeek only produces text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ToolContent {
    /// `{"type": "text", "text": ...}`
    Text {
        /// Block body.
        text: String,
    },
}

impl CallToolResult {
    fn single(text: String, is_error: Option<bool>) -> Self {
        Self {
            content: vec![ToolContent::Text { text }],
            is_error,
        }
    }

    /// One text block, not flagged as an error.
    pub fn text(text: impl Into<String>) -> Self {
        Self::single(text.into(), None)
    }

    /// One text block flagged with `isError`.
    pub fn error(message: impl Into<String>) -> Self {
        Self::single(message.into(), Some(true))
    }

    /// Concatenated text of all content items.
    #[must_use]
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|item| match item {
                ToolContent::Text { text } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn test_deserialize_initialize_params_without_capabilities() -> Result<()> {
        let json = r#"{
            "protocolVersion": "2024-11-05",
            "clientInfo": { "name": "test-client" }
        }"#;

        let params: InitializeParams = serde_json::from_str(json)?;
        assert_eq!(params.protocol_version, PROTOCOL_VERSION);
        assert_eq!(params.client_info.name, "test-client");
        assert!(params.client_info.version.is_none());
        Ok(())
    }

    #[test]
    fn test_serialize_initialize_result_omits_missing_instructions() -> Result<()> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: None }),
            },
            server_info: ServerInfo {
                name: "filepeek".to_string(),
                version: Some("0.1.0".to_string()),
            },
            instructions: None,
        };

        let json = serde_json::to_string(&result)?;
        assert!(json.contains("protocolVersion"));
        assert!(json.contains("serverInfo"));
        assert!(!json.contains("instructions"));
        Ok(())
    }

    #[test]
    fn test_serialize_tool_uses_camel_case_schema() -> Result<()> {
        let tool = Tool {
            name: "read_file".to_string(),
            description: Some("Read a file".to_string()),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"]
            }),
        };

        let json = serde_json::to_string(&tool)?;
        assert!(json.contains("inputSchema"));
        assert!(!json.contains("input_schema"));
        Ok(())
    }

    #[test]
    fn test_call_tool_result_error_flag() -> Result<()> {
        let ok = serde_json::to_string(&CallToolResult::text("fine"))?;
        assert!(!ok.contains("isError"));

        let failed = CallToolResult::error("PATH_TRAVERSAL: nope");
        assert_eq!(failed.joined_text(), "PATH_TRAVERSAL: nope");
        let json = serde_json::to_string(&failed)?;
        assert!(json.contains(r#""isError":true"#));
        assert!(json.contains(r#""type":"text""#));
        Ok(())
    }

    #[test]
    fn test_response_error_serialization() -> Result<()> {
        let resp = Response::error(RequestId::String("req-1".to_string()), METHOD_NOT_FOUND, "nope");
        let json = serde_json::to_string(&resp)?;
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains("-32601"));
        assert!(!json.contains("result"));

        let parsed: Response = serde_json::from_str(&json)?;
        let err = parsed.error.context("missing error")?;
        assert_eq!(err.code, METHOD_NOT_FOUND);
        assert_eq!(parsed.id, RequestId::String("req-1".to_string()));
        Ok(())
    }

    #[test]
    fn test_notification_without_params_omits_field() -> Result<()> {
        let notification = Notification {
            jsonrpc: "2.0".to_string(),
            method: "notifications/initialized".to_string(),
            params: None,
        };
        let json = serde_json::to_string(&notification)?;
        assert!(!json.contains("params"));
        Ok(())
    }
}
