// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text rendering of tool results.

use std::fmt::Write;

use mnemo_memory::ScoredMemory;

/// Shown when a search succeeds with no hits.
pub const NO_RESULTS: &str = "No matching memories found.";

/// Numbered list of search hits, best first.
pub fn format_search_results(results: &[ScoredMemory]) -> String {
    if results.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut out = String::new();
    for (i, hit) in results.iter().enumerate() {
        let record = &hit.record;
        let tags = if record.tags.is_empty() {
            "-".to_string()
        } else {
            record.tags.join(", ")
        };
        // Writing to a String cannot fail.
        let _ = writeln!(out, "[{}] {}", i + 1, record.content);
        let _ = writeln!(out, "   ID: {}", record.id);
        let _ = writeln!(out, "   Type: {}", record.kind);
        let _ = writeln!(out, "   Tags: {tags}");
        let _ = writeln!(out, "   Score: {:.3}", hit.score);
        out.push('\n');
    }
    out.truncate(out.trim_end().len());
    out
}
