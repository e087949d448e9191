// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tool-invocation boundary for the Mnemo memory engine.
//!
//! Exposes the engine as three named tools taking JSON arguments and
//! returning human-readable text. Every failure becomes an error output.

pub mod format;
pub mod memory;
pub mod tool;

pub use format::format_search_results;
pub use memory::{memory_tools, AddMemoryTool, DeleteMemoryTool, SearchMemoryTool};
pub use tool::{Tool, ToolOutput, ToolRegistry};
