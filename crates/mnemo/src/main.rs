// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mnemo - durable memories with lexical or semantic retrieval.
//!
//! This is the binary entry point. Logs go to stderr so stdout carries only
//! command output and, under `serve`, the tool protocol.

mod commands;
mod doctor;
mod serve;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use mnemo_config::MnemoConfig;
use mnemo_core::{EmbeddingAdapter, IndexStrategy, MnemoError};
use mnemo_memory::{HttpEmbedder, MemoryEngine};

/// Mnemo - durable memories with lexical or semantic retrieval.
#[derive(Parser, Debug)]
#[command(name = "mnemo", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the memory tools over newline-delimited JSON on stdin/stdout.
    Serve,
    /// Store a new memory.
    Add {
        /// The content to remember.
        content: String,
        /// Memory type: fact, conversation or reference.
        #[arg(long = "type", value_name = "TYPE")]
        kind: Option<String>,
        /// Tag to attach (repeatable).
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
    },
    /// Search stored memories.
    Search {
        /// Free-text query. Omit to list memories.
        query: Option<String>,
        /// Tag every result must carry (repeatable).
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,
        /// Maximum number of results.
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Delete a memory by id.
    Delete {
        /// Id of the memory to delete.
        id: String,
    },
    /// Rebuild the search index from the record store.
    Rebuild,
    /// List the available tools and their parameter schemas.
    Tools,
    /// Run diagnostic checks on configuration, store and index.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => mnemo_config::load_and_validate_path(path),
        None => mnemo_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            mnemo_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.log.level);

    let Some(command) = cli.command else {
        println!("mnemo: use --help for available commands");
        return ExitCode::SUCCESS;
    };

    match run(command, config).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Run one subcommand. `Ok(false)` means the command reported its own failure.
async fn run(command: Commands, config: MnemoConfig) -> Result<bool, MnemoError> {
    if let Commands::Doctor { plain } = command {
        return doctor::run_doctor(&config, plain).await;
    }

    let engine = Arc::new(open_engine(&config).await?);
    let registry = mnemo_tools::memory_tools(engine.clone(), &config.search);

    let succeeded = match command {
        Commands::Serve => {
            serve::run_serve(&registry, tokio::io::stdin(), tokio::io::stdout()).await?;
            true
        }
        Commands::Add { content, kind, tags } => {
            commands::run_add(&registry, content, kind, tags).await
        }
        Commands::Search { query, tags, limit } => {
            commands::run_search(&registry, query, tags, limit).await
        }
        Commands::Delete { id } => commands::run_delete(&registry, id).await,
        Commands::Rebuild => {
            commands::run_rebuild(&engine).await?;
            true
        }
        Commands::Tools => {
            commands::run_tools(&registry)?;
            true
        }
        Commands::Doctor { .. } => true,
    };

    engine.close().await?;
    Ok(succeeded)
}

/// Open the engine, with an HTTP embedder when the semantic strategy is configured.
async fn open_engine(config: &MnemoConfig) -> Result<MemoryEngine, MnemoError> {
    let embedder: Option<Arc<dyn EmbeddingAdapter>> = match config.index.strategy {
        IndexStrategy::Semantic => Some(Arc::new(HttpEmbedder::new(&config.embedding)?)),
        IndexStrategy::Lexical => None,
    };
    MemoryEngine::open(config, embedder).await
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mnemo={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::PluginAdapter;

    #[test]
    fn binary_loads_config_defaults() {
        let config =
            mnemo_config::load_and_validate_str("").expect("default config should be valid");
        assert_eq!(config.index.strategy, IndexStrategy::Lexical);
    }

    #[test]
    fn cli_parses_repeated_tags_and_global_config() {
        let cli = Cli::parse_from([
            "mnemo",
            "add",
            "hello",
            "--tag",
            "a",
            "--tag",
            "b",
            "--type",
            "reference",
            "--config",
            "/tmp/mnemo.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/mnemo.toml")));
        match cli.command {
            Some(Commands::Add { content, kind, tags }) => {
                assert_eq!(content, "hello");
                assert_eq!(kind.as_deref(), Some("reference"));
                assert_eq!(tags, vec!["a", "b"]);
            }
            other => panic!("expected add, got {other:?}"),
        }
    }

    #[test]
    fn cli_search_query_is_optional() {
        let cli = Cli::parse_from(["mnemo", "search", "--limit", "3"]);
        match cli.command {
            Some(Commands::Search { query, limit, .. }) => {
                assert!(query.is_none());
                assert_eq!(limit, Some(3));
            }
            other => panic!("expected search, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn semantic_engine_gets_an_http_embedder() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MnemoConfig::default();
        config.storage.database_path = dir.path().join("m.db").to_string_lossy().into_owned();
        config.index.strategy = IndexStrategy::Semantic;

        let engine = open_engine(&config).await.unwrap();
        let name = engine.embedder().map(|e| e.name().to_string());
        assert_eq!(name.as_deref(), Some("http-embedder"));
    }
}
