// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Integration tests for the file tools served by the binary: `read_file`,
//! `validate_paths`.

use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};

/// Helper to spawn the server and talk to it over stdio.
struct ServerProcess {
    child: std::process::Child,
    stdin: Option<std::process::ChildStdin>,
    stdout: Option<BufReader<std::process::ChildStdout>>,
    next_id: i64,
}

impl ServerProcess {
    fn spawn(root: &std::path::Path) -> Result<Self> {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_filepeek"));
        cmd.arg("--root").arg(root);
        // Isolate from user-level config
        cmd.env("XDG_CONFIG_HOME", root);
        cmd.env_remove("FILEPEEK_ROOT");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().context("Failed to spawn filepeek")?;
        let stdin = child.stdin.take().context("Failed to get stdin")?;
        let stdout = BufReader::new(child.stdout.take().context("Failed to get stdout")?);

        Ok(Self {
            child,
            stdin: Some(stdin),
            stdout: Some(stdout),
            next_id: 1,
        })
    }

    fn send(&mut self, request: &Value) -> Result<()> {
        let json = serde_json::to_string(request)?;
        let stdin = self.stdin.as_mut().context("Stdin already closed")?;
        writeln!(stdin, "{json}").context("Failed to write to stdin")?;
        stdin.flush().context("Failed to flush stdin")?;
        Ok(())
    }

    fn recv(&mut self) -> Result<Value> {
        let mut line = String::new();
        let stdout = self.stdout.as_mut().context("Stdout already closed")?;
        stdout
            .read_line(&mut line)
            .context("Failed to read from stdout")?;
        serde_json::from_str(&line).context("Failed to parse JSON response")
    }

    fn request(&mut self, method: &str, params: &Value) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;
        self.send(&json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params
        }))?;

        let response = self.recv()?;
        if response.get("id") != Some(&json!(id)) {
            bail!("Response id mismatch: {response:?}");
        }
        Ok(response)
    }

    fn initialize(&mut self) -> Result<()> {
        let response = self.request(
            "initialize",
            &json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": {
                    "name": "file-tools-test",
                    "version": "1.0.0"
                }
            }),
        )?;
        if response.get("result").is_none() {
            bail!("Initialize failed: {response:?}");
        }

        self.send(&json!({
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        }))
    }

    fn call_tool(&mut self, name: &str, args: &Value) -> Result<Value> {
        let response = self.request("tools/call", &json!({ "name": name, "arguments": args }))?;
        let result = response
            .get("result")
            .context("No result in response")?
            .clone();
        Ok(result)
    }

    fn call_tool_text(&mut self, name: &str, args: &Value) -> Result<(String, bool)> {
        let result = self.call_tool(name, args)?;
        let is_error = result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let content = result
            .get("content")
            .and_then(|c| c.as_array())
            .and_then(|a| a.first())
            .and_then(|item| item.get("text"))
            .and_then(|t| t.as_str())
            .context("No text content in result")?;
        Ok((content.to_string(), is_error))
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        // Close stdin to trigger shutdown
        self.stdin.take();
        let _ = self.child.wait();
    }
}

#[test]
fn test_initialize_reports_server_info() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut server = ServerProcess::spawn(dir.path())?;

    let response = server.request(
        "initialize",
        &json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "file-tools-test", "version": "1.0.0" }
        }),
    )?;

    let name = response
        .pointer("/result/serverInfo/name")
        .and_then(Value::as_str);
    assert_eq!(name, Some("filepeek"));
    assert!(response.pointer("/result/capabilities/tools").is_some());
    Ok(())
}

#[test]
fn test_tools_list() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut server = ServerProcess::spawn(dir.path())?;
    server.initialize()?;

    let response = server.request("tools/list", &json!({}))?;
    let names: Vec<&str> = response
        .pointer("/result/tools")
        .and_then(Value::as_array)
        .context("No tools in response")?
        .iter()
        .filter_map(|tool| tool.get("name").and_then(Value::as_str))
        .collect();
    assert_eq!(names, vec!["read_file", "validate_paths"]);
    Ok(())
}

#[test]
fn test_read_file_relative_path() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("docs"))?;
    std::fs::write(dir.path().join("docs/hello.txt"), "line one\nline two\n")?;

    let mut server = ServerProcess::spawn(dir.path())?;
    server.initialize()?;

    let (text, is_error) = server.call_tool_text("read_file", &json!({ "path": "docs/hello.txt" }))?;
    assert!(!is_error, "Read should succeed: {text}");
    assert!(
        text.starts_with("hello.txt (18 bytes, modified "),
        "Header should name the file and its size: {text}"
    );
    assert!(text.ends_with("\n\nline one\nline two\n"), "{text}");
    Ok(())
}

#[test]
fn test_read_file_absolute_path_inside_root() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().canonicalize()?;
    let file_path = root.join("abs.txt");
    std::fs::write(&file_path, "absolute")?;

    let mut server = ServerProcess::spawn(&root)?;
    server.initialize()?;

    let (text, is_error) = server.call_tool_text(
        "read_file",
        &json!({ "path": file_path.to_string_lossy().to_string() }),
    )?;
    assert!(!is_error, "Read should succeed: {text}");
    assert!(text.ends_with("absolute"), "{text}");
    Ok(())
}

#[test]
fn test_read_file_traversal_refused() -> Result<()> {
    let outer = tempfile::tempdir()?;
    let root = outer.path().join("workspace");
    std::fs::create_dir_all(&root)?;
    std::fs::write(outer.path().join("secret.txt"), "do not read")?;

    let mut server = ServerProcess::spawn(&root)?;
    server.initialize()?;

    let (text, is_error) =
        server.call_tool_text("read_file", &json!({ "path": "../secret.txt" }))?;
    assert!(is_error, "Traversal should be refused");
    assert!(text.starts_with("PATH_TRAVERSAL: "), "{text}");
    assert!(!text.contains("do not read"));
    Ok(())
}

#[test]
fn test_read_file_outside_root_refused() -> Result<()> {
    let outer = tempfile::tempdir()?;
    let root = outer.path().join("workspace");
    std::fs::create_dir_all(&root)?;
    let secret = outer.path().join("secret.txt");
    std::fs::write(&secret, "do not read")?;

    let mut server = ServerProcess::spawn(&root)?;
    server.initialize()?;

    let (text, is_error) = server.call_tool_text(
        "read_file",
        &json!({ "path": secret.to_string_lossy().to_string() }),
    )?;
    assert!(is_error, "Absolute path outside the root should be refused");
    assert!(text.starts_with("PATH_TRAVERSAL: "), "{text}");
    Ok(())
}

#[test]
fn test_read_missing_file_not_accessible() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut server = ServerProcess::spawn(dir.path())?;
    server.initialize()?;

    let (text, is_error) = server.call_tool_text("read_file", &json!({ "path": "nope.txt" }))?;
    assert!(is_error);
    assert!(text.starts_with("PATH_NOT_ACCESSIBLE: "), "{text}");
    Ok(())
}

#[test]
fn test_read_directory_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("sub"))?;
    let mut server = ServerProcess::spawn(dir.path())?;
    server.initialize()?;

    let (_text, is_error) = server.call_tool_text("read_file", &json!({ "path": "sub" }))?;
    assert!(is_error, "Reading a directory should fail");
    Ok(())
}

#[test]
fn test_validate_paths_batch() -> Result<()> {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("a.txt"), "a")?;

    let mut server = ServerProcess::spawn(dir.path())?;
    server.initialize()?;

    let (text, is_error) = server.call_tool_text(
        "validate_paths",
        &json!({ "paths": ["a.txt", "new/b.txt"] }),
    )?;
    assert!(!is_error, "{text}");
    assert_eq!(text, "a.txt\nnew/b.txt\n");

    let (text, is_error) = server.call_tool_text(
        "validate_paths",
        &json!({ "paths": ["a.txt", "../escape.txt"] }),
    )?;
    assert!(is_error);
    assert!(text.starts_with("PATH_TRAVERSAL: "), "{text}");
    Ok(())
}

#[test]
fn test_unknown_tool_is_error_result() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut server = ServerProcess::spawn(dir.path())?;
    server.initialize()?;

    let (text, is_error) = server.call_tool_text("write_file", &json!({}))?;
    assert!(is_error);
    assert!(text.contains("Unknown tool: write_file"), "{text}");
    Ok(())
}

#[test]
fn test_exits_cleanly_when_stdin_closes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut server = ServerProcess::spawn(dir.path())?;
    server.initialize()?;

    server.stdin.take();
    let start = std::time::Instant::now();
    let status = server.child.wait()?;
    assert!(status.success(), "Server should exit cleanly: {status}");
    assert!(start.elapsed() < Duration::from_secs(10));
    Ok(())
}

#[test]
fn test_missing_root_fails_to_start() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output = Command::new(env!("CARGO_BIN_EXE_filepeek"))
        .arg("--root")
        .arg(dir.path().join("does-not-exist"))
        .env("XDG_CONFIG_HOME", dir.path())
        .stdin(Stdio::null())
        .output()?;
    assert!(!output.status.success());
    Ok(())
}
