// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as limit ranges and strategy-dependent required settings.

use mnemo_core::IndexStrategy;

use crate::diagnostic::ConfigError;
use crate::model::{MnemoConfig, RESULT_CEILING};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MnemoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.log.level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "log.level `{}` is not one of {}",
            config.log.level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let search = &config.search;
    if search.max_limit == 0 || search.max_limit > RESULT_CEILING {
        fail(format!(
            "search.max_limit must be between 1 and {RESULT_CEILING}, got {}",
            search.max_limit
        ));
    }
    if search.default_limit == 0 || search.default_limit > search.max_limit {
        fail(format!(
            "search.default_limit must be between 1 and search.max_limit ({}), got {}",
            search.max_limit, search.default_limit
        ));
    }

    let embedding = &config.embedding;
    if embedding.timeout_secs == 0 {
        fail("embedding.timeout_secs must be greater than 0".to_string());
    }
    if embedding.dimensions == Some(0) {
        fail("embedding.dimensions must be greater than 0 when set".to_string());
    }
    if config.index.strategy == IndexStrategy::Semantic {
        if embedding.api_base.trim().is_empty() {
            fail("embedding.api_base is required when index.strategy = \"semantic\"".to_string());
        }
        if embedding.model.trim().is_empty() {
            fail("embedding.model is required when index.strategy = \"semantic\"".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
