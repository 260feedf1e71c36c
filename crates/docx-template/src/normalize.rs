/*
 * normalize.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Merging of placeholder text that the authoring tool split across runs.
//!
//! Word routinely stores `{{customer.name}}` as several sibling runs
//! (`{{`, `customer.`, `name}}`), often with proofing annotations in between.
//! This pass drops the annotations and collapses each such span of runs into
//! a single run so later passes can see whole tokens in one text node.
//!
//! The pass is idempotent: normalizing normalized output changes nothing.

use std::collections::HashMap;

use docx_xml::{NodeId, XmlAttribute, XmlElement, XmlTree};

use crate::conditional::MARKER_PATTERN;
use crate::names;
use crate::placeholder::PLACEHOLDER_PATTERN;

/// Normalize every run container in the tree.
pub fn normalize(tree: &mut XmlTree) {
    let root = tree.root();
    normalize_node(tree, root);
}

fn normalize_node(tree: &mut XmlTree, id: NodeId) {
    let children = tree.children(id).to_vec();
    for child in &children {
        if tree.is_element(*child) {
            normalize_node(tree, *child);
        }
    }

    if tree.name(id).is_some_and(names::is_run_container) {
        let merged = merge_runs(tree, &children);
        if merged != children {
            tree.set_children(id, merged);
        }
    }
}

/// Rebuild one container's child list with split tokens collapsed.
fn merge_runs(tree: &mut XmlTree, children: &[NodeId]) -> Vec<NodeId> {
    let kids: Vec<NodeId> = children
        .iter()
        .copied()
        .filter(|k| !tree.is_named(*k, names::PROOF_ERROR))
        .collect();

    let mut out = Vec::with_capacity(kids.len());
    let mut i = 0;
    while i < kids.len() {
        if !is_plain_run(tree, kids[i]) {
            out.push(kids[i]);
            i += 1;
            continue;
        }

        let mut buffer = run_text(tree, kids[i]);
        // Cumulative buffer length after each run of the span
        let mut ends = vec![buffer.len()];
        let mut j = i + 1;
        while j < kids.len() && is_plain_run(tree, kids[j]) && has_open_brace(after_last_token(&buffer))
        {
            buffer.push_str(&run_text(tree, kids[j]));
            ends.push(buffer.len());
            j += 1;
        }

        match last_token_end(&buffer) {
            Some(end) => {
                let count = ends
                    .iter()
                    .position(|e| *e >= end)
                    .map_or(ends.len(), |p| p + 1);
                if count == 1 {
                    out.push(kids[i]);
                } else {
                    let text = &buffer[..ends[count - 1]];
                    out.push(collapse(tree, &kids[i..i + count], text));
                }
                i += count;
            }
            None => {
                // Nothing to merge: keep the first run, retry from the next one
                out.push(kids[i]);
                i += 1;
            }
        }
    }
    out
}

/// End offset of the last complete placeholder or conditional marker.
fn last_token_end(text: &str) -> Option<usize> {
    let placeholder = PLACEHOLDER_PATTERN.find_iter(text).last().map(|m| m.end());
    let marker = MARKER_PATTERN.find_iter(text).last().map(|m| m.end());
    placeholder.max(marker)
}

fn after_last_token(text: &str) -> &str {
    &text[last_token_end(text).unwrap_or(0)..]
}

fn has_open_brace(text: &str) -> bool {
    text.contains('{')
}

/// A run holding nothing but formatting and text.
fn is_plain_run(tree: &XmlTree, id: NodeId) -> bool {
    tree.is_named(id, names::RUN)
        && tree.children(id).iter().all(|child| {
            matches!(
                tree.name(*child),
                Some(names::RUN_PROPERTIES | names::TEXT | names::LAST_RENDERED_PAGE_BREAK)
            )
        })
}

fn run_text(tree: &XmlTree, run: NodeId) -> String {
    tree.children(run)
        .iter()
        .filter(|child| tree.is_named(**child, names::TEXT))
        .map(|child| tree.text_content(*child))
        .collect()
}

fn run_properties(tree: &XmlTree, run: NodeId) -> Option<NodeId> {
    tree.children(run)
        .iter()
        .copied()
        .find(|child| tree.is_named(*child, names::RUN_PROPERTIES))
}

/// Formatting shared by most runs of the span. A tie means no formatting.
fn majority_properties(tree: &XmlTree, runs: &[NodeId]) -> Option<NodeId> {
    let mut tally: HashMap<Option<String>, (usize, Option<NodeId>)> = HashMap::new();
    for run in runs {
        let properties = run_properties(tree, *run);
        let key = properties.and_then(|p| tree.subtree_to_string(p).ok());
        let slot = tally.entry(key).or_insert((0, properties));
        slot.0 += 1;
    }

    let best = tally.values().map(|(count, _)| *count).max()?;
    let mut winners = tally.values().filter(|(count, _)| *count == best);
    let winner = winners.next()?;
    if winners.next().is_some() {
        return None;
    }
    winner.1
}

fn collapse(tree: &mut XmlTree, runs: &[NodeId], text: &str) -> NodeId {
    let mut children = Vec::new();
    if let Some(properties) = majority_properties(tree, runs) {
        children.push(tree.deep_clone(properties));
    }

    let mut text_element = XmlElement::new(names::TEXT);
    text_element
        .attributes
        .push(XmlAttribute::new(names::XML_SPACE, "preserve"));
    if !text.is_empty() {
        text_element.children.push(tree.add_text(text));
    }
    children.push(tree.add_element(text_element));

    let mut run = XmlElement::new(names::RUN);
    run.children = children;
    tree.add_element(run)
}
