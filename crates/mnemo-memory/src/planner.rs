// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query planner: turns engine-facing search requests into one [`IndexQuery`].
//!
//! - Empty text and no tags is the match-all query.
//! - Non-empty text always carries a relevance component.
//! - Tag filters are conjunctive.
//! - The result count is clamped to a fixed ceiling; smaller limits are honored exactly.

use mnemo_config::RESULT_CEILING;
use mnemo_core::{IndexQuery, MnemoError, TextQuery};

/// Builds index queries with a fixed result ceiling.
#[derive(Debug, Clone, Copy)]
pub struct QueryPlanner {
    ceiling: usize,
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new(RESULT_CEILING)
    }
}

impl QueryPlanner {
    /// Planner with a custom ceiling (at least 1).
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling: ceiling.max(1),
        }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Resolve a per-call limit: `None` means the ceiling, `Some(0)` is rejected.
    pub fn clamp_limit(&self, limit: Option<usize>) -> Result<usize, MnemoError> {
        match limit {
            Some(0) => Err(MnemoError::Validation(
                "limit must be at least 1".to_string(),
            )),
            Some(n) => Ok(n.min(self.ceiling)),
            None => Ok(self.ceiling),
        }
    }

    /// Plan a composite query from free text, tag filters and a limit.
    pub fn plan(
        &self,
        text: &str,
        tags: &[String],
        limit: Option<usize>,
    ) -> Result<IndexQuery, MnemoError> {
        let limit = self.clamp_limit(limit)?;
        let raw = text.trim();
        let text = (!raw.is_empty()).then(|| TextQuery {
            raw: raw.to_string(),
            terms: tokenize(raw),
        });

        Ok(IndexQuery {
            text,
            tags: normalize_tags(tags),
            limit,
            vector: None,
        })
    }
}

/// Lowercase `text` and split it on non-alphanumeric characters.
///
/// Terms are deduplicated, first occurrence wins.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut terms: Vec<String> = Vec::new();
    for term in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
        if !terms.iter().any(|t| t == term) {
            terms.push(term.to_string());
        }
    }
    terms
}

/// Trim tags, drop empties, deduplicate and sort.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    out.sort();
    out.dedup();
    out
}

/// FTS5 MATCH expression: each term as a quoted string, joined with `OR`.
///
/// Returns `None` when there are no terms.
pub fn fts_expression(terms: &[String]) -> Option<String> {
    if terms.is_empty() {
        return None;
    }
    let quoted: Vec<String> = terms
        .iter()
        .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
        .collect();
    Some(quoted.join(" OR "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_text_and_tags_is_match_all() {
        let query = QueryPlanner::default().plan("   ", &[], Some(5)).unwrap();
        assert!(query.is_match_all());
        assert_eq!(query.limit, 5);
    }

    #[test]
    fn text_is_tokenized_and_kept_raw() {
        let query = QueryPlanner::default()
            .plan("  Capital of FRANCE?  ", &[], None)
            .unwrap();
        let text = query.text.unwrap();
        assert_eq!(text.raw, "Capital of FRANCE?");
        assert_eq!(text.terms, vec!["capital", "of", "france"]);
    }

    #[test]
    fn punctuation_only_text_keeps_relevance_component() {
        let query = QueryPlanner::default().plan("?!", &[], None).unwrap();
        assert!(!query.is_match_all());
        assert!(query.text.unwrap().terms.is_empty());
    }

    #[test]
    fn limit_is_clamped_to_ceiling() {
        let planner = QueryPlanner::default();
        assert_eq!(planner.clamp_limit(Some(1000)).unwrap(), RESULT_CEILING);
        assert_eq!(planner.clamp_limit(Some(2)).unwrap(), 2);
        assert_eq!(planner.clamp_limit(None).unwrap(), RESULT_CEILING);
        assert!(matches!(
            planner.clamp_limit(Some(0)),
            Err(MnemoError::Validation(_))
        ));
    }

    #[test]
    fn tags_are_normalized() {
        assert_eq!(
            normalize_tags(&tags(&[" b", "a", "", "b ", "  "])),
            tags(&["a", "b"])
        );
    }

    #[test]
    fn fts_expression_quotes_and_ors() {
        assert_eq!(
            fts_expression(&tags(&["capital", "france"])).unwrap(),
            "\"capital\" OR \"france\""
        );
        assert!(fts_expression(&[]).is_none());
    }

    #[test]
    fn tokenize_handles_unicode() {
        assert_eq!(tokenize("Café, naïve - ÜBER"), vec!["café", "naïve", "über"]);
    }

    proptest! {
        #[test]
        fn terms_are_alphanumeric_and_unique(text in ".{0,64}") {
            let terms = tokenize(&text);
            for term in &terms {
                prop_assert!(!term.is_empty());
                prop_assert!(term.chars().all(char::is_alphanumeric));
            }
            let mut sorted = terms.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), terms.len());
        }

        #[test]
        fn planned_limit_never_exceeds_ceiling(limit in 1usize..10_000) {
            let query = QueryPlanner::default().plan("x", &[], Some(limit)).unwrap();
            prop_assert!(query.limit <= RESULT_CEILING);
            prop_assert_eq!(query.limit, limit.min(RESULT_CEILING));
        }

        #[test]
        fn normalized_tags_are_sorted_sets(raw in proptest::collection::vec("[ a-c]{0,3}", 0..8)) {
            let normalized = normalize_tags(&raw);
            prop_assert!(normalized.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(normalized.iter().all(|t| !t.is_empty() && t.trim() == t));
        }
    }
}
