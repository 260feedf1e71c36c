/*
 * replace.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Placeholder substitution over a tree.

use std::collections::{HashMap, HashSet};

use docx_xml::{NodeId, XmlTree};
use regex::Captures;

use crate::accessor;
use crate::error::{PlaceholderErrorDetail, PlaceholderErrors, TemplateError, TemplateResult};
use crate::placeholder::{self, PLACEHOLDER_PATTERN};
use crate::value::Record;

/// Escape a value for use as XML text or attribute content.
///
/// `&` goes first so the entities introduced afterwards are not re-escaped.
pub fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Placeholder substitution that remembers what it has already handled.
///
/// Text nodes it rewrote, and nodes it left alone because a placeholder
/// failed, are settled: later calls skip them. This keeps a value such as
/// `"{{b}}"` from being substituted again, and a failure inside a duplicated
/// table row from being reported a second time by the whole-part pass.
#[derive(Debug, Default)]
pub struct Replacer {
    errors: Vec<PlaceholderErrorDetail>,
    settled: HashSet<NodeId>,
}

impl Replacer {
    /// A replacer with no settled nodes and no errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitute every placeholder below `root`, collecting the ones that fail.
    ///
    /// A text node is rewritten only when all of its placeholders resolve; a
    /// node with any failure is left as it was. Each failing occurrence yields
    /// one detail tagged with `part`.
    pub fn substitute(&mut self, tree: &mut XmlTree, root: NodeId, data: &Record, part: &str) {
        // slots are collected once; rewriting one never moves another
        for slot in tree.text_slots(root) {
            let node = slot.node;
            if self.settled.contains(&node) {
                continue;
            }
            let Some(text) = tree.text(node) else {
                continue;
            };
            if !placeholder::contains_placeholder(text) {
                continue;
            }
            let found = placeholder::scan(text);

            let mut values: HashMap<String, String> = HashMap::new();
            let mut failed = false;
            for p in found {
                if values.contains_key(&p.original) {
                    continue;
                }
                match accessor::resolve(data, &p.path) {
                    Ok(value) => {
                        values.insert(p.original, escape_xml(&value));
                    }
                    Err(reason) => {
                        failed = true;
                        self.errors.push(PlaceholderErrorDetail {
                            placeholder: p.original,
                            part: part.to_string(),
                            reason,
                        });
                    }
                }
            }
            if failed {
                self.settled.insert(node);
                continue;
            }

            let replaced = PLACEHOLDER_PATTERN
                .replace_all(text, |caps: &Captures| {
                    values
                        .get(&caps[0])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned();
            let replacement = tree.add_text(replaced);
            tree.replace_child(slot.parent, slot.index, replacement);
            self.settled.insert(replacement);
        }
    }

    /// Failures collected so far.
    pub fn errors(&self) -> &[PlaceholderErrorDetail] {
        &self.errors
    }

    /// Consume the replacer, returning its failures.
    pub fn into_errors(self) -> Vec<PlaceholderErrorDetail> {
        self.errors
    }
}

/// Substitute every placeholder below `root` in one pass, returning the
/// failures.
pub fn substitute(
    tree: &mut XmlTree,
    root: NodeId,
    data: &Record,
    part: &str,
) -> Vec<PlaceholderErrorDetail> {
    let mut replacer = Replacer::new();
    replacer.substitute(tree, root, data, part);
    replacer.into_errors()
}

/// Substitute every placeholder of the tree, failing with all unresolved
/// placeholders at once.
pub fn replace_all(tree: &mut XmlTree, data: &Record, part: &str) -> TemplateResult<()> {
    let root = tree.root();
    let details = substitute(tree, root, data, part);
    if details.is_empty() {
        Ok(())
    } else {
        Err(TemplateError::Placeholders(PlaceholderErrors { details }))
    }
}
