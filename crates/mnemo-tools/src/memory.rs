// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `add_memory`, `search_memory` and `delete_memory` tools.
//!
//! Arguments are checked before the engine is touched. A wrong JSON type
//! is a validation error, never silently dropped.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use mnemo_config::model::SearchConfig;
use mnemo_core::{MemoryKind, MnemoError};
use mnemo_memory::MemoryEngine;

use crate::format::format_search_results;
use crate::tool::{Tool, ToolOutput, ToolRegistry};

/// Registry holding the three memory tools over one shared engine.
pub fn memory_tools(engine: Arc<MemoryEngine>, search: &SearchConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(AddMemoryTool::new(engine.clone())));
    registry.register(Arc::new(SearchMemoryTool::new(engine.clone(), search)));
    registry.register(Arc::new(DeleteMemoryTool::new(engine)));
    registry
}

fn invalid(message: impl Into<String>) -> MnemoError {
    MnemoError::Validation(message.into())
}

/// Look up an argument. Absent and `null` are both `None`.
fn field<'a>(input: &'a Value, key: &str) -> Result<Option<&'a Value>, MnemoError> {
    match input {
        Value::Object(map) => Ok(map.get(key).filter(|v| !v.is_null())),
        Value::Null => Ok(None),
        _ => Err(invalid("arguments must be a JSON object")),
    }
}

fn optional_string<'a>(input: &'a Value, key: &str) -> Result<Option<&'a str>, MnemoError> {
    match field(input, key)? {
        None => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| invalid(format!("{key} must be a string"))),
    }
}

fn required_string<'a>(input: &'a Value, key: &str) -> Result<&'a str, MnemoError> {
    optional_string(input, key)?.ok_or_else(|| invalid(format!("{key} is required")))
}

fn string_list(input: &Value, key: &str) -> Result<Vec<String>, MnemoError> {
    let Some(value) = field(input, key)? else {
        return Ok(vec![]);
    };
    let items = value
        .as_array()
        .ok_or_else(|| invalid(format!("{key} must be an array of strings")))?;
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| invalid(format!("{key} must be an array of strings")))
        })
        .collect()
}

fn optional_integer(input: &Value, key: &str) -> Result<Option<i64>, MnemoError> {
    match field(input, key)? {
        None => Ok(None),
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_u64().map(|_| i64::MAX))
            .map(Some)
            .ok_or_else(|| invalid(format!("{key} must be an integer"))),
    }
}

/// Stores a new memory.
pub struct AddMemoryTool {
    engine: Arc<MemoryEngine>,
}

impl AddMemoryTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for AddMemoryTool {
    fn name(&self) -> &str {
        "add_memory"
    }

    fn description(&self) -> &str {
        "Add a new memory with tags"
    }

    fn parameters_schema(&self) -> Value {
        let kinds: Vec<&str> = MemoryKind::ALL.iter().map(MemoryKind::as_str).collect();
        serde_json::json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The content to remember"
                },
                "type": {
                    "type": "string",
                    "enum": kinds,
                    "default": MemoryKind::default().as_str(),
                    "description": "Type of memory"
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Tags to categorize the memory"
                }
            },
            "required": ["content"]
        })
    }

    async fn invoke(&self, input: Value) -> Result<ToolOutput, MnemoError> {
        let content = required_string(&input, "content")?;
        let kind = match optional_string(&input, "type")? {
            None => MemoryKind::default(),
            Some(raw) => MemoryKind::from_str(raw).map_err(|_| {
                invalid(format!(
                    "type must be one of: fact, conversation, reference (got {raw:?})"
                ))
            })?,
        };
        let tags = string_list(&input, "tags")?;

        let id = self.engine.add(content, kind, &tags).await?;
        Ok(ToolOutput::text(format!("Memory stored with ID: {id}")))
    }
}

/// Ranked search over stored memories.
pub struct SearchMemoryTool {
    engine: Arc<MemoryEngine>,
    default_limit: usize,
    max_limit: usize,
}

impl SearchMemoryTool {
    pub fn new(engine: Arc<MemoryEngine>, search: &SearchConfig) -> Self {
        let max_limit = search.max_limit.max(1);
        Self {
            engine,
            default_limit: search.default_limit.clamp(1, max_limit),
            max_limit,
        }
    }

    /// Resolve the caller's limit into `[1, max_limit]`.
    fn resolve_limit(&self, requested: Option<i64>) -> usize {
        match requested {
            None => self.default_limit,
            Some(n) if n < 1 => 1,
            Some(n) => usize::try_from(n)
                .unwrap_or(usize::MAX)
                .min(self.max_limit),
        }
    }
}

#[async_trait]
impl Tool for SearchMemoryTool {
    fn name(&self) -> &str {
        "search_memory"
    }

    fn description(&self) -> &str {
        "Search for memories by content or tags"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to search for in memory content"
                },
                "tags": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Tags to filter by (all must match)"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": self.max_limit,
                    "default": self.default_limit,
                    "description": "Maximum number of results"
                }
            }
        })
    }

    async fn invoke(&self, input: Value) -> Result<ToolOutput, MnemoError> {
        let query = optional_string(&input, "query")?.unwrap_or_default();
        let tags = string_list(&input, "tags")?;
        let limit = self.resolve_limit(optional_integer(&input, "limit")?);

        let results = self.engine.search(query, &tags, Some(limit)).await?;
        Ok(ToolOutput::text(format_search_results(&results)))
    }
}

/// Deletes a memory by id.
pub struct DeleteMemoryTool {
    engine: Arc<MemoryEngine>,
}

impl DeleteMemoryTool {
    pub fn new(engine: Arc<MemoryEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for DeleteMemoryTool {
    fn name(&self) -> &str {
        "delete_memory"
    }

    fn description(&self) -> &str {
        "Delete a memory by ID"
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "ID of the memory to delete"
                }
            },
            "required": ["id"]
        })
    }

    async fn invoke(&self, input: Value) -> Result<ToolOutput, MnemoError> {
        let id = required_string(&input, "id")?;
        self.engine.delete(id).await?;
        Ok(ToolOutput::text(format!("Memory {id} deleted successfully")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_treats_null_as_absent() {
        assert!(field(&json!({"a": null}), "a").unwrap().is_none());
        assert!(field(&Value::Null, "a").unwrap().is_none());
        assert!(field(&json!([1]), "a").is_err());
    }

    #[test]
    fn string_list_rejects_non_strings() {
        assert_eq!(
            string_list(&json!({"tags": ["a", "b"]}), "tags").unwrap(),
            vec!["a".to_string(), "b".to_string()]
        );
        assert!(string_list(&json!({"tags": ["a", 1]}), "tags").is_err());
        assert!(string_list(&json!({"tags": "a"}), "tags").is_err());
        assert!(string_list(&json!({}), "tags").unwrap().is_empty());
    }

    #[test]
    fn integer_parsing() {
        assert_eq!(optional_integer(&json!({"limit": 3}), "limit").unwrap(), Some(3));
        assert_eq!(optional_integer(&json!({"limit": -4}), "limit").unwrap(), Some(-4));
        assert_eq!(
            optional_integer(&json!({"limit": u64::MAX}), "limit").unwrap(),
            Some(i64::MAX)
        );
        assert!(optional_integer(&json!({"limit": 2.5}), "limit").is_err());
        assert!(optional_integer(&json!({"limit": "3"}), "limit").is_err());
    }
}
