// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment errors as miette diagnostics.
//!
//! Unknown keys and unknown enum values get a "did you mean" suggestion
//! (Jaro-Winkler via `strsim`) and, when the offending file can be re-read,
//! a label pointing at the line in that file.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use figment::error::Kind;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum similarity for a suggestion. `stratgy` still maps to `strategy`.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// One configuration problem, renderable by miette.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A key that no section of `MnemoConfig` accepts.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(mnemo::config::unknown_key),
        help("{}", choices_help(suggestion.as_deref(), "valid keys", valid_keys))
    )]
    UnknownKey {
        key: String,
        suggestion: Option<String>,
        valid_keys: String,
        #[label("not a mnemo setting")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value outside a closed set, such as `index.strategy = "fuzzy"`.
    #[error("unknown value `{value}` for `{key}`")]
    #[diagnostic(
        code(mnemo::config::unknown_value),
        help("{}", choices_help(suggestion.as_deref(), "expected one of", choices))
    )]
    UnknownValue {
        key: String,
        value: String,
        suggestion: Option<String>,
        choices: String,
        #[label("unsupported value")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong TOML type.
    #[error("invalid type for `{key}`: found {found}")]
    #[diagnostic(code(mnemo::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
    },

    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(mnemo::config::missing_key),
        help("add `{key} = <value>` to mnemo.toml")
    )]
    MissingKey { key: String },

    /// A value that parsed but breaks a cross-field rule.
    #[error("validation error: {message}")]
    #[diagnostic(code(mnemo::config::validation))]
    Validation { message: String },

    #[error("configuration error: {0}")]
    #[diagnostic(code(mnemo::config::other))]
    Other(String),
}

fn choices_help(suggestion: Option<&str>, label: &str, choices: &str) -> String {
    match suggestion {
        Some(s) => format!("did you mean `{s}`? {label}: {choices}"),
        None => format!("{label}: {choices}"),
    }
}

/// Convert every error carried by a `figment::Error`.
///
/// `toml_sources` pairs a file path with its content; an error whose metadata
/// names one of those files gets a source span.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    err.into_iter()
        .map(|error| convert(&error, toml_sources))
        .collect()
}

fn convert(error: &figment::Error, toml_sources: &[(String, String)]) -> ConfigError {
    let dotted = error.path.join(".");
    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let located = locate(error, toml_sources, |content| {
                find_key_offset(content, &error.path, field).map(|o| (o, field.len()))
            });
            let (span, src) = split(located);
            ConfigError::UnknownKey {
                key: qualify(&dotted, field),
                suggestion: suggest_key(field, expected),
                valid_keys: expected.join(", "),
                span,
                src,
            }
        }
        Kind::UnknownVariant(value, expected) => {
            let located = locate(error, toml_sources, |content| {
                find_value_offset(content, &error.path, value)
            });
            let (span, src) = split(located);
            ConfigError::UnknownValue {
                key: dotted,
                value: value.clone(),
                suggestion: suggest_key(value, expected),
                choices: expected.join(", "),
                span,
                src,
            }
        }
        Kind::InvalidType(actual, expected) => ConfigError::InvalidType {
            key: dotted,
            found: actual.to_string(),
            expected: expected.clone(),
        },
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: qualify(&dotted, field),
        },
        _ => ConfigError::Other(error.to_string()),
    }
}

fn qualify(section: &str, field: &str) -> String {
    if section.is_empty() {
        field.to_string()
    } else {
        format!("{section}.{field}")
    }
}

type Located = Option<(SourceSpan, NamedSource<String>)>;

fn split(located: Located) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    match located {
        Some((span, src)) => (Some(span), Some(src)),
        None => (None, None),
    }
}

/// Find the file the error came from and run `find` over its content.
fn locate(
    error: &figment::Error,
    toml_sources: &[(String, String)],
    find: impl Fn(&str) -> Option<(usize, usize)>,
) -> Located {
    let origin = match error.metadata.as_ref()?.source.as_ref()? {
        figment::Source::File(path) => path.display().to_string(),
        figment::Source::Code(_) | figment::Source::Custom(_) => "<inline>".to_string(),
        _ => return None,
    };
    let (name, content) = toml_sources.iter().find(|(p, _)| *p == origin)?;
    let (offset, len) = find(content)?;
    Some((
        SourceSpan::new(offset.into(), len),
        NamedSource::new(name, content.clone()),
    ))
}

/// Byte offset of `field` as a key inside the table named by `path`.
///
/// Walks the file line by line, tracking the current `[table]` header, so a
/// key with the same name in another table is never matched.
pub fn find_key_offset(content: &str, path: &[String], field: &str) -> Option<usize> {
    let wanted = path.join(".");
    let mut table = String::new();
    let mut offset = 0;

    for line in content.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if let Some(header) = trimmed.strip_prefix('[') {
            if let Some(end) = header.find(']') {
                table = header[..end].trim().to_string();
            }
        } else if table == wanted {
            if let Some(rest) = trimmed.strip_prefix(field) {
                if rest.trim_start().starts_with('=') {
                    return Some(offset + indent);
                }
            }
        }
        offset += line.len();
    }
    None
}

/// Offset and length of the quoted value assigned to the last key of `path`.
fn find_value_offset(content: &str, path: &[String], value: &str) -> Option<(usize, usize)> {
    let (key, table) = path.split_last()?;
    let key_offset = find_key_offset(content, table, key)?;
    let line_end = content[key_offset..]
        .find('\n')
        .map_or(content.len(), |n| key_offset + n);
    let quoted = format!("\"{value}\"");
    content[key_offset..line_end]
        .find(&quoted)
        .map(|n| (key_offset + n, quoted.len()))
}

/// Best candidate above the similarity threshold, if any.
pub fn suggest_key(unknown: &str, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .map(|&key| (key, strsim::jaro_winkler(unknown, key)))
        .filter(|(_, score)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(key, _)| key.to_string())
}

/// Render errors to stderr with miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    let handler = miette::GraphicalReportHandler::new();
    for error in errors {
        let mut buf = String::new();
        match handler.render_report(&mut buf, error as &dyn Diagnostic) {
            Ok(()) => eprint!("{buf}"),
            Err(_) => eprintln!("Error: {error}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "[storage]\nwal_mode = true\n\n[index]\nstratgy = \"lexical\"\nstrategy = \"fuzzy\"\n";

    #[test]
    fn suggests_close_keys_only() {
        assert_eq!(
            suggest_key("stratgy", &["strategy", "verify_on_open"]).as_deref(),
            Some("strategy")
        );
        assert_eq!(
            suggest_key("max_limt", &["default_limit", "max_limit"]).as_deref(),
            Some("max_limit")
        );
        assert_eq!(suggest_key("zzzzzz", &["database_path", "wal_mode"]), None);
    }

    #[test]
    fn key_offset_respects_tables() {
        let path = vec!["index".to_string()];
        let o = find_key_offset(SAMPLE, &path, "stratgy").expect("key in [index]");
        assert_eq!(&SAMPLE[o..o + 7], "stratgy");

        let storage = vec!["storage".to_string()];
        assert_eq!(find_key_offset(SAMPLE, &storage, "stratgy"), None);
        assert_eq!(find_key_offset(SAMPLE, &["log".to_string()], "level"), None);
    }

    #[test]
    fn value_offset_points_at_the_quoted_value() {
        let path = vec!["index".to_string(), "strategy".to_string()];
        let (o, len) = find_value_offset(SAMPLE, &path, "fuzzy").expect("value found");
        assert_eq!(&SAMPLE[o..o + len], "\"fuzzy\"");
    }

    #[test]
    fn help_mentions_suggestion_when_present() {
        assert_eq!(
            choices_help(Some("lexical"), "expected one of", "lexical, semantic"),
            "did you mean `lexical`? expected one of: lexical, semantic"
        );
        assert_eq!(choices_help(None, "valid keys", "a, b"), "valid keys: a, b");
    }
}
