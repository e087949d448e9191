// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool trait and registry for the tool-invocation boundary.
//!
//! The [`Tool`] trait is the interface every named operation implements. The
//! [`ToolRegistry`] looks tools up by name, advertises their definitions, and
//! turns every invocation into a [`ToolOutput`], errors included.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use mnemo_core::MnemoError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Result text handed back across the tool boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
        }
    }
}

/// A named operation callable with JSON arguments.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the `input` accepted by [`Tool::invoke`].
    fn parameters_schema(&self) -> serde_json::Value;

    async fn invoke(&self, input: serde_json::Value) -> Result<ToolOutput, MnemoError>;

    /// `{"name", "description", "input_schema"}` as advertised to callers.
    fn definition(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
            "description": self.description(),
            "input_schema": self.parameters_schema(),
        })
    }
}

/// Tools keyed by name. Iteration is in name order.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool under its `name()`, returning any tool it replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Option<Arc<dyn Tool>> {
        let replaced = self.tools.insert(tool.name().to_string(), tool);
        if let Some(old) = &replaced {
            warn!(tool = old.name(), "tool registered twice, keeping the newer one");
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// (name, description) pairs in name order.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.tools
            .values()
            .map(|t| (t.name(), t.description()))
            .collect()
    }

    /// Definitions of every tool in name order.
    pub fn tool_definitions(&self) -> Vec<serde_json::Value> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Invoke a tool by name. Unknown tools and tool errors come back as
    /// `is_error` outputs, so this never fails.
    pub async fn dispatch(&self, name: &str, input: serde_json::Value) -> ToolOutput {
        let Some(tool) = self.get(name) else {
            warn!(tool = name, "unknown tool requested");
            return ToolOutput::error(format!("Unknown tool: {name}"));
        };

        match tool.invoke(input).await {
            Ok(output) => {
                debug!(tool = name, is_error = output.is_error, "tool invoked");
                output
            }
            Err(e) => {
                warn!(tool = name, error = %e, "tool invocation failed");
                ToolOutput::error(e.to_string())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
