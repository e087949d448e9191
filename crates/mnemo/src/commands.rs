// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot subcommands: add, search, delete, rebuild, tools.
//!
//! The memory subcommands go through the same tool registry as `serve`, so
//! validation and output text are identical on both surfaces.

use mnemo_core::MnemoError;
use mnemo_memory::MemoryEngine;
use mnemo_tools::{ToolOutput, ToolRegistry};
use serde_json::{json, Map, Value};

/// Print a tool result: content on stdout, errors on stderr. Returns success.
fn report(output: ToolOutput) -> bool {
    if output.is_error {
        eprintln!("{}", output.content);
        false
    } else {
        println!("{}", output.content);
        true
    }
}

pub(crate) fn add_arguments(content: String, kind: Option<String>, tags: Vec<String>) -> Value {
    let mut args = Map::new();
    args.insert("content".into(), Value::String(content));
    if let Some(kind) = kind {
        args.insert("type".into(), Value::String(kind));
    }
    if !tags.is_empty() {
        args.insert("tags".into(), json!(tags));
    }
    Value::Object(args)
}

pub(crate) fn search_arguments(
    query: Option<String>,
    tags: Vec<String>,
    limit: Option<i64>,
) -> Value {
    let mut args = Map::new();
    if let Some(query) = query {
        args.insert("query".into(), Value::String(query));
    }
    if !tags.is_empty() {
        args.insert("tags".into(), json!(tags));
    }
    if let Some(limit) = limit {
        args.insert("limit".into(), json!(limit));
    }
    Value::Object(args)
}

pub async fn run_add(
    registry: &ToolRegistry,
    content: String,
    kind: Option<String>,
    tags: Vec<String>,
) -> bool {
    report(
        registry
            .dispatch("add_memory", add_arguments(content, kind, tags))
            .await,
    )
}

pub async fn run_search(
    registry: &ToolRegistry,
    query: Option<String>,
    tags: Vec<String>,
    limit: Option<i64>,
) -> bool {
    report(
        registry
            .dispatch("search_memory", search_arguments(query, tags, limit))
            .await,
    )
}

pub async fn run_delete(registry: &ToolRegistry, id: String) -> bool {
    report(registry.dispatch("delete_memory", json!({ "id": id })).await)
}

pub async fn run_rebuild(engine: &MemoryEngine) -> Result<(), MnemoError> {
    let count = engine.rebuild_index().await?;
    println!(
        "Rebuilt {} index with {count} {}",
        engine.strategy(),
        if count == 1 { "entry" } else { "entries" }
    );
    Ok(())
}

pub fn run_tools(registry: &ToolRegistry) -> Result<(), MnemoError> {
    let defs = registry.tool_definitions();
    let rendered = serde_json::to_string_pretty(&defs)
        .map_err(|e| MnemoError::Internal(format!("failed to render tool definitions: {e}")))?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_arguments_omit_unset_fields() {
        assert_eq!(
            add_arguments("hi".into(), None, vec![]),
            json!({"content": "hi"})
        );
        assert_eq!(
            add_arguments("hi".into(), Some("reference".into()), vec!["a".into()]),
            json!({"content": "hi", "type": "reference", "tags": ["a"]})
        );
    }

    #[test]
    fn search_arguments_carry_limit_as_integer() {
        assert_eq!(search_arguments(None, vec![], None), json!({}));
        assert_eq!(
            search_arguments(Some("paris".into()), vec!["geo".into()], Some(3)),
            json!({"query": "paris", "tags": ["geo"], "limit": 3})
        );
    }
}
