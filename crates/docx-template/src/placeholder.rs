/*
 * placeholder.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Detection of `{{path}}` placeholders in raw text.
//!
//! A placeholder is `{{`, a first segment `[A-Za-z_][A-Za-z0-9_]*`, any number
//! of `.segment` continuations (`[A-Za-z0-9_]+`, so list indexes such as
//! `{{items.0.sku}}` work), and `}}`. There is no escape for a literal `{{`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::conditional::MARKER_PATTERN;

pub(crate) static PLACEHOLDER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\}\}")
        .expect("Invalid regex pattern for placeholders")
});

/// A placeholder found in text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Placeholder {
    /// The matched text, e.g. `{{customer.name}}`.
    pub original: String,

    /// Dot-separated path segments, e.g. `["customer", "name"]`.
    pub path: Vec<String>,
}

impl Placeholder {
    /// First path segment, the key looked up in the top-level record.
    pub fn root_key(&self) -> &str {
        self.path.first().map(String::as_str).unwrap_or_default()
    }

    /// True for `{{else}}` and `{{endif}}`, which the pattern also matches but
    /// which are conditional markers rather than data paths.
    pub fn is_marker(&self) -> bool {
        MARKER_PATTERN.is_match(&self.original)
    }
}

/// All placeholders in `text`, left to right, non-overlapping.
pub fn scan(text: &str) -> Vec<Placeholder> {
    PLACEHOLDER_PATTERN
        .captures_iter(text)
        .map(|caps| Placeholder {
            original: caps[0].to_string(),
            path: caps[1].split('.').map(str::to_string).collect(),
        })
        .collect()
}

/// True if `text` holds at least one placeholder.
pub fn contains_placeholder(text: &str) -> bool {
    PLACEHOLDER_PATTERN.is_match(text)
}

/// Data placeholders across `texts` with duplicates and conditional markers
/// removed, in first-seen order.
pub fn unique<'a>(texts: impl IntoIterator<Item = &'a str>) -> Vec<Placeholder> {
    let mut seen = HashSet::new();
    texts
        .into_iter()
        .flat_map(scan)
        .filter(|p| !p.is_marker() && seen.insert(p.original.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_simple_and_nested() {
        let found = scan("Dear {{name}}, your order {{order.id}} shipped.");
        assert_eq!(
            found,
            vec![
                Placeholder {
                    original: "{{name}}".to_string(),
                    path: vec!["name".to_string()],
                },
                Placeholder {
                    original: "{{order.id}}".to_string(),
                    path: vec!["order".to_string(), "id".to_string()],
                },
            ]
        );
    }

    #[test]
    fn test_scan_index_segments() {
        let found = scan("{{items.0.sku}}");
        assert_eq!(found[0].path, vec!["items", "0", "sku"]);
        assert_eq!(found[0].root_key(), "items");
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(scan("{{ name }}").is_empty());
        assert!(scan("{{0abc}}").is_empty());
        assert!(scan("{{a..b}}").is_empty());
        assert!(scan("{{if:show}}").is_empty());
        assert!(scan("{name}").is_empty());
        assert!(!contains_placeholder("{{name"));
    }

    #[test]
    fn test_adjacent_placeholders() {
        let found = scan("{{a}}{{b}}");
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_unique() {
        let found = unique(["{{a}} {{b}}", "{{a}} {{c}}"]);
        let originals: Vec<_> = found.iter().map(|p| p.original.as_str()).collect();
        assert_eq!(originals, vec!["{{a}}", "{{b}}", "{{c}}"]);
    }

    #[test]
    fn test_unique_skips_conditional_markers() {
        let found = unique(["{{if:show}}a{{else}}b{{endif}} {{ELSE}}{{EndIf}} {{name}} {{elsewhere}}"]);
        let originals: Vec<_> = found.iter().map(|p| p.original.as_str()).collect();
        assert_eq!(originals, vec!["{{name}}", "{{elsewhere}}"]);
    }
}
