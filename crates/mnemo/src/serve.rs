// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo serve` command implementation.
//!
//! Newline-delimited JSON over stdin/stdout. Each request line is
//! `{"tool": "<name>", "arguments": {...}}` and gets exactly one response
//! line, `{"content": "...", "is_error": bool}`. The pseudo-tool
//! `list_tools` answers with `{"tools": [...definitions...]}`. The loop ends
//! at end of input.

use mnemo_core::MnemoError;
use mnemo_tools::{ToolOutput, ToolRegistry};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Name of the request that returns tool definitions instead of invoking a tool.
pub const LIST_TOOLS: &str = "list_tools";

#[derive(Debug, Deserialize)]
struct ToolRequest {
    tool: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

/// Answer requests from `reader` on `writer` until end of input.
pub async fn run_serve<R, W>(
    registry: &ToolRegistry,
    reader: R,
    mut writer: W,
) -> Result<(), MnemoError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!(tools = registry.len(), "serving memory tools on stdio");

    let mut lines = BufReader::new(reader).lines();
    let mut handled = 0usize;
    while let Some(line) = lines.next_line().await.map_err(io_err)? {
        if line.trim().is_empty() {
            continue;
        }

        let response = handle_line(registry, &line).await;
        let mut encoded = serde_json::to_string(&response)
            .map_err(|e| MnemoError::Internal(format!("failed to encode response: {e}")))?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await.map_err(io_err)?;
        writer.flush().await.map_err(io_err)?;
        handled += 1;
    }

    info!(requests = handled, "input closed, stopping");
    Ok(())
}

async fn handle_line(registry: &ToolRegistry, line: &str) -> serde_json::Value {
    let request: ToolRequest = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(e) => {
            debug!(error = %e, "unparseable request line");
            return to_value(ToolOutput::error(format!("invalid request: {e}")));
        }
    };

    if request.tool == LIST_TOOLS {
        return serde_json::json!({ "tools": registry.tool_definitions() });
    }

    to_value(registry.dispatch(&request.tool, request.arguments).await)
}

fn to_value(output: ToolOutput) -> serde_json::Value {
    serde_json::json!({
        "content": output.content,
        "is_error": output.is_error,
    })
}

fn io_err(e: std::io::Error) -> MnemoError {
    MnemoError::Internal(format!("stdio failure: {e}"))
}
