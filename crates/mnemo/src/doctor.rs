// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `mnemo doctor` command implementation.
//!
//! Reports on configuration, the record store, the index artifact and the
//! embedding provider without repairing anything. Opening the engine would
//! rebuild a stale index, so the store and index are opened directly here.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use mnemo_config::MnemoConfig;
use mnemo_core::{HealthStatus, IndexStrategy, MnemoError, PluginAdapter};
use mnemo_memory::{index_path_for, HttpEmbedder, IndexDatabase};
use mnemo_memory::index::{META_REBUILDING, META_STRATEGY};
use mnemo_storage::RecordStore;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `mnemo doctor` command. Returns false when any check failed.
pub async fn run_doctor(config: &MnemoConfig, plain: bool) -> Result<bool, MnemoError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = collect_checks(config).await;

    println!();
    println!("  mnemo doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;
    for result in &results {
        match result.status {
            CheckStatus::Pass => {}
            CheckStatus::Warn => warn_count += 1,
            CheckStatus::Fail => fail_count += 1,
        }
        println!("{}", render_line(result, use_color));
    }

    println!();
    if fail_count > 0 || warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();

    Ok(fail_count == 0)
}

fn render_line(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if use_color {
        use colored::Colorize;
        let (symbol, message) = match result.status {
            CheckStatus::Pass => ("✓".green().to_string(), result.message.normal()),
            CheckStatus::Warn => ("!".yellow().to_string(), result.message.yellow()),
            CheckStatus::Fail => ("✗".red().to_string(), result.message.red()),
        };
        format!("    {symbol} {:<14} {message} ({duration_ms}ms)", result.name)
    } else {
        let label = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        format!(
            "    {label} {:<14} {} ({duration_ms}ms)",
            result.name, result.message
        )
    }
}

/// Run every check in order.
pub async fn collect_checks(config: &MnemoConfig) -> Vec<CheckResult> {
    let mut results = vec![check_config(config)];

    let store_path = Path::new(&config.storage.database_path);
    let (store, records) = check_store(config, store_path).await;
    results.push(store);

    let (index, entries) = check_index(config, store_path).await;
    results.push(index);

    results.push(check_consistency(records, entries));
    results.push(check_embedding(config).await);
    results
}

fn check_config(config: &MnemoConfig) -> CheckResult {
    let start = Instant::now();
    CheckResult::new(
        "Configuration",
        CheckStatus::Pass,
        format!("valid (strategy={})", config.index.strategy),
        start,
    )
}

async fn check_store(config: &MnemoConfig, path: &Path) -> (CheckResult, Option<usize>) {
    let start = Instant::now();
    if !path.exists() {
        let message = format!("not found: {} (created on first use)", path.display());
        return (CheckResult::new("Record store", CheckStatus::Warn, message, start), None);
    }

    let counted = async {
        let store = RecordStore::open(&config.storage).await?;
        let status = store.health_check().await?;
        Ok::<_, MnemoError>((store.count().await?, status))
    }
    .await;

    match counted {
        Ok((count, HealthStatus::Healthy)) => (
            CheckResult::new("Record store", CheckStatus::Pass, format!("{count} memories"), start),
            Some(count),
        ),
        Ok((count, HealthStatus::Degraded(reason))) => (
            CheckResult::new("Record store", CheckStatus::Warn, reason, start),
            Some(count),
        ),
        Ok((_, HealthStatus::Unhealthy(reason))) => (
            CheckResult::new("Record store", CheckStatus::Fail, reason, start),
            None,
        ),
        Err(e) => (
            CheckResult::new("Record store", CheckStatus::Fail, e.to_string(), start),
            None,
        ),
    }
}

async fn check_index(config: &MnemoConfig, store_path: &Path) -> (CheckResult, Option<usize>) {
    let start = Instant::now();
    let path = index_path_for(store_path);
    if !path.exists() {
        let status = if store_path.exists() {
            CheckStatus::Warn
        } else {
            CheckStatus::Pass
        };
        let message = format!("not found: {} (built on next open)", path.display());
        return (CheckResult::new("Index", status, message, start), None);
    }

    let inspected = async {
        let db = IndexDatabase::open(&path, &config.storage).await?;
        db.ping().await?;
        let interrupted = db.meta(META_REBUILDING).await?.is_some();
        Ok::<_, MnemoError>((db.meta(META_STRATEGY).await?, db.len().await?, interrupted))
    }
    .await;

    let configured = config.index.strategy.to_string();
    match inspected {
        Ok((_, entries, true)) => (
            CheckResult::new(
                "Index",
                CheckStatus::Warn,
                "a rebuild did not finish (rebuilt on next open)",
                start,
            ),
            Some(entries),
        ),
        Ok((Some(built), entries, false)) if built == configured => (
            CheckResult::new(
                "Index",
                CheckStatus::Pass,
                format!("{entries} entries ({built})"),
                start,
            ),
            Some(entries),
        ),
        Ok((built, entries, false)) => (
            CheckResult::new(
                "Index",
                CheckStatus::Warn,
                format!(
                    "built as {}, configured {configured} (rebuilt on next open)",
                    built.as_deref().unwrap_or("unknown")
                ),
                start,
            ),
            Some(entries),
        ),
        Err(e) => (
            CheckResult::new("Index", CheckStatus::Fail, e.to_string(), start),
            None,
        ),
    }
}

fn check_consistency(records: Option<usize>, entries: Option<usize>) -> CheckResult {
    let start = Instant::now();
    match (records, entries) {
        (Some(r), Some(e)) if r == e => {
            CheckResult::new("Consistency", CheckStatus::Pass, "in sync", start)
        }
        (Some(r), Some(e)) => CheckResult::new(
            "Consistency",
            CheckStatus::Warn,
            format!("{r} records but {e} index entries (run `mnemo rebuild`)"),
            start,
        ),
        _ => CheckResult::new("Consistency", CheckStatus::Pass, "skipped", start),
    }
}

async fn check_embedding(config: &MnemoConfig) -> CheckResult {
    let start = Instant::now();
    if config.index.strategy == IndexStrategy::Lexical {
        return CheckResult::new("Embedding", CheckStatus::Pass, "not used (lexical)", start);
    }

    let embedder = match HttpEmbedder::new(&config.embedding) {
        Ok(embedder) => embedder,
        Err(e) => return CheckResult::new("Embedding", CheckStatus::Fail, e.to_string(), start),
    };
    match embedder.health_check().await {
        Ok(HealthStatus::Healthy) => CheckResult::new(
            "Embedding",
            CheckStatus::Pass,
            format!("{} via {}", config.embedding.model, embedder.endpoint()),
            start,
        ),
        Ok(HealthStatus::Degraded(reason)) => {
            CheckResult::new("Embedding", CheckStatus::Warn, reason, start)
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            CheckResult::new("Embedding", CheckStatus::Fail, reason, start)
        }
        Err(e) => CheckResult::new("Embedding", CheckStatus::Fail, e.to_string(), start),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::MemoryKind;
    use mnemo_memory::MemoryEngine;
    use mnemo_test_utils::TestHarness;

    fn status_of<'a>(results: &'a [CheckResult], name: &str) -> &'a CheckStatus {
        &results
            .iter()
            .find(|r| r.name == name)
            .expect("check should be present")
            .status
    }

    #[tokio::test]
    async fn fresh_install_warns_only_about_the_missing_store() {
        let harness = TestHarness::lexical().unwrap();
        let results = collect_checks(&harness.config).await;
        assert_eq!(status_of(&results, "Configuration"), &CheckStatus::Pass);
        assert_eq!(status_of(&results, "Record store"), &CheckStatus::Warn);
        assert_eq!(status_of(&results, "Index"), &CheckStatus::Pass);
        assert_eq!(status_of(&results, "Embedding"), &CheckStatus::Pass);
    }

    #[tokio::test]
    async fn healthy_store_passes_everything() {
        let harness = TestHarness::lexical().unwrap();
        let engine = MemoryEngine::open(&harness.config, None).await.unwrap();
        engine.add("checked", MemoryKind::Fact, &[]).await.unwrap();
        engine.close().await.unwrap();

        let results = collect_checks(&harness.config).await;
        assert!(results.iter().all(|r| r.status == CheckStatus::Pass), "{results:?}");
    }

    #[tokio::test]
    async fn count_mismatch_is_reported_not_repaired() {
        let harness = TestHarness::lexical().unwrap();
        let engine = MemoryEngine::open(&harness.config, None).await.unwrap();
        let id = engine.add("orphan", MemoryKind::Fact, &[]).await.unwrap();
        engine.index().remove(&id).await.unwrap();
        engine.close().await.unwrap();

        let results = collect_checks(&harness.config).await;
        assert_eq!(status_of(&results, "Consistency"), &CheckStatus::Warn);
        let again = collect_checks(&harness.config).await;
        assert_eq!(status_of(&again, "Consistency"), &CheckStatus::Warn);
    }

    #[tokio::test]
    async fn unfinished_rebuild_is_reported() {
        let harness = TestHarness::lexical().unwrap();
        let engine = MemoryEngine::open(&harness.config, None).await.unwrap();
        engine.add("half done", MemoryKind::Fact, &[]).await.unwrap();
        engine.index().clear().await.unwrap();
        engine.close().await.unwrap();

        let results = collect_checks(&harness.config).await;
        assert_eq!(status_of(&results, "Index"), &CheckStatus::Warn);
    }

    #[tokio::test]
    async fn semantic_without_api_key_warns() {
        let mut harness = TestHarness::semantic().unwrap();
        harness.config.embedding.api_key = None;
        let results = collect_checks(&harness.config).await;
        assert_eq!(status_of(&results, "Embedding"), &CheckStatus::Warn);
    }

    #[test]
    fn plain_lines_carry_labels() {
        let result = CheckResult {
            name: "Index".into(),
            status: CheckStatus::Fail,
            message: "broken".into(),
            duration: Duration::from_millis(3),
        };
        let line = render_line(&result, false);
        assert!(line.contains("[FAIL]"));
        assert!(line.contains("broken (3ms)"));
    }
}
