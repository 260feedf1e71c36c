/*
 * conditional.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Conditional sections: `{{if:path}}` ... `{{else}}` ... `{{endif}}`.
//!
//! Markers are case-insensitive and are found in the concatenated text of the
//! whole part, so a marker may span several runs. Sections are resolved one
//! pair at a time, innermost first, re-scanning the tree after each one.
//!
//! When all markers of a pair sit in one paragraph the section is cut out of
//! that paragraph's text. Otherwise whole paragraphs are removed: the marker
//! paragraphs themselves, plus the branch that was not taken.

use std::ops::Range;
use std::sync::LazyLock;

use docx_xml::{NodeId, XmlElement, XmlNode, XmlTree};
use regex::Regex;
use tracing::debug;

use crate::accessor;
use crate::error::{TemplateError, TemplateResult};
use crate::names;
use crate::value::Record;

pub(crate) static MARKER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{\{(?:if:([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)|(else)|(endif))\}\}")
        .expect("Invalid regex pattern for conditional markers")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    If,
    Else,
    Endif,
}

/// A conditional marker found in a part's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalMarker {
    pub kind: MarkerKind,

    /// The condition as written (`If` only), e.g. `customer.vip`.
    pub condition: Option<String>,

    /// The condition split into path segments (`If` only).
    pub path: Option<Vec<String>>,

    /// Byte offset of the marker in the concatenated text.
    pub position: usize,

    /// The marker text as written, e.g. `{{IF:vip}}`.
    pub original: String,
}

impl ConditionalMarker {
    fn range(&self) -> Range<usize> {
        self.position..self.position + self.original.len()
    }
}

/// One `If`, its optional `Else`, and its `Endif`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalPair {
    pub if_marker: ConditionalMarker,
    pub else_marker: Option<ConditionalMarker>,
    pub endif_marker: ConditionalMarker,
}

/// All markers in `text`, in order.
pub fn detect_markers(text: &str) -> Vec<ConditionalMarker> {
    MARKER_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let (kind, condition) = if let Some(condition) = caps.get(1) {
                (MarkerKind::If, Some(condition.as_str().to_string()))
            } else if caps.get(2).is_some() {
                (MarkerKind::Else, None)
            } else {
                (MarkerKind::Endif, None)
            };
            Some(ConditionalMarker {
                kind,
                path: condition
                    .as_ref()
                    .map(|c| c.split('.').map(str::to_string).collect()),
                condition,
                position: whole.start(),
                original: whole.as_str().to_string(),
            })
        })
        .collect()
}

/// Check that markers nest properly.
pub fn validate(markers: &[ConditionalMarker]) -> TemplateResult<()> {
    // (index of the if marker, seen an else)
    let mut stack: Vec<(usize, bool)> = Vec::new();
    for (index, marker) in markers.iter().enumerate() {
        match marker.kind {
            MarkerKind::If => stack.push((index, false)),
            MarkerKind::Else => match stack.last_mut() {
                None => {
                    return Err(TemplateError::OrphanElse {
                        position: marker.position,
                    });
                }
                Some((_, true)) => {
                    return Err(TemplateError::DuplicateElse {
                        position: marker.position,
                    });
                }
                Some((_, seen_else)) => *seen_else = true,
            },
            MarkerKind::Endif => {
                if stack.pop().is_none() {
                    return Err(TemplateError::OrphanEndif {
                        position: marker.position,
                    });
                }
            }
        }
    }

    match stack.last() {
        Some((index, _)) => Err(TemplateError::UnmatchedIf {
            marker: markers[*index].original.clone(),
        }),
        None => Ok(()),
    }
}

/// Group validated markers into pairs, in the order their `Endif` closes them
/// (innermost first).
pub fn pair_markers(markers: &[ConditionalMarker]) -> Vec<ConditionalPair> {
    let mut stack: Vec<(&ConditionalMarker, Option<&ConditionalMarker>)> = Vec::new();
    let mut pairs = Vec::new();
    for marker in markers {
        match marker.kind {
            MarkerKind::If => stack.push((marker, None)),
            MarkerKind::Else => {
                if let Some(top) = stack.last_mut() {
                    top.1 = Some(marker);
                }
            }
            MarkerKind::Endif => {
                if let Some((if_marker, else_marker)) = stack.pop() {
                    pairs.push(ConditionalPair {
                        if_marker: if_marker.clone(),
                        else_marker: else_marker.cloned(),
                        endif_marker: marker.clone(),
                    });
                }
            }
        }
    }
    pairs
}

/// Resolve every conditional section in the tree.
pub fn process(tree: &mut XmlTree, data: &Record) -> TemplateResult<()> {
    loop {
        let stream = TextStream::build(tree);
        let markers = detect_markers(&stream.text);
        if markers.is_empty() {
            return Ok(());
        }
        validate(&markers)?;

        let pairs = pair_markers(&markers);
        let Some(pair) = pairs.first() else {
            return Ok(());
        };
        apply_pair(tree, &stream, pair, data)?;
    }
}

/// Evaluate the pair's condition against the data.
pub fn evaluate(marker: &ConditionalMarker, data: &Record) -> TemplateResult<bool> {
    let condition = marker.condition.clone().unwrap_or_default();
    let path = marker.path.as_deref().unwrap_or_default();
    accessor::lookup(data, path)
        .map(|value| value.is_truthy())
        .map_err(|source| TemplateError::Condition { condition, source })
}

fn apply_pair(
    tree: &mut XmlTree,
    stream: &TextStream,
    pair: &ConditionalPair,
    data: &Record,
) -> TemplateResult<()> {
    let keep = evaluate(&pair.if_marker, data)?;

    let if_paragraph = stream.paragraph_of(&pair.if_marker)?;
    let endif_paragraph = stream.paragraph_of(&pair.endif_marker)?;
    let else_paragraph = match &pair.else_marker {
        Some(marker) => Some(stream.paragraph_of(marker)?),
        None => None,
    };

    debug!(
        condition = pair.if_marker.condition.as_deref().unwrap_or_default(),
        keep, "Resolving conditional section"
    );

    let single_paragraph =
        if_paragraph == endif_paragraph && else_paragraph.is_none_or(|p| p == if_paragraph);
    if single_paragraph {
        let ranges = inline_cuts(pair, keep);
        stream.cut(tree, &ranges);
        return Ok(());
    }

    let mut doomed = Vec::new();
    match (keep, else_paragraph) {
        (true, None) => doomed.extend([if_paragraph, endif_paragraph]),
        (true, Some(else_paragraph)) => {
            doomed.push(if_paragraph);
            doomed.extend(section_nodes(tree, else_paragraph, endif_paragraph, pair)?);
        }
        (false, None) => doomed.extend(section_nodes(tree, if_paragraph, endif_paragraph, pair)?),
        (false, Some(else_paragraph)) => {
            doomed.extend(section_nodes(tree, if_paragraph, else_paragraph, pair)?);
            doomed.push(endif_paragraph);
        }
    }
    remove_nodes(tree, &doomed);
    Ok(())
}

/// Text ranges to delete when a section lives inside one paragraph.
fn inline_cuts(pair: &ConditionalPair, keep: bool) -> Vec<Range<usize>> {
    let if_range = pair.if_marker.range();
    let endif_range = pair.endif_marker.range();
    match (keep, &pair.else_marker) {
        (true, None) => vec![if_range, endif_range],
        (true, Some(else_marker)) => vec![if_range, else_marker.position..endif_range.end],
        (false, None) => vec![if_range.start..endif_range.end],
        (false, Some(else_marker)) => vec![if_range.start..else_marker.range().end, endif_range],
    }
}

/// The contiguous siblings from `start` through `end`, inclusive.
///
/// Both boundaries must be children of the same element, `start` first.
pub fn section_nodes(
    tree: &XmlTree,
    start: NodeId,
    end: NodeId,
    pair: &ConditionalPair,
) -> TemplateResult<Vec<NodeId>> {
    let not_found = |marker: &ConditionalMarker| TemplateError::SectionBoundaryNotFound {
        marker: marker.original.clone(),
    };

    let parent = tree.parent(start).ok_or_else(|| not_found(&pair.if_marker))?;
    let siblings = tree.children(parent);
    let start_index = siblings
        .iter()
        .position(|id| *id == start)
        .ok_or_else(|| not_found(&pair.if_marker))?;
    let end_index = siblings
        .iter()
        .position(|id| *id == end)
        .filter(|index| *index >= start_index)
        .ok_or_else(|| not_found(&pair.endif_marker))?;

    Ok(siblings[start_index..=end_index].to_vec())
}

fn remove_nodes(tree: &mut XmlTree, doomed: &[NodeId]) {
    for node in doomed {
        if let Some(parent) = tree.parent(*node) {
            let mut kept: Vec<NodeId> = tree
                .children(parent)
                .iter()
                .copied()
                .filter(|child| child != node)
                .collect();
            // a table cell must hold at least one paragraph
            if tree.is_named(parent, names::TABLE_CELL)
                && !kept.iter().any(|c| tree.is_named(*c, names::PARAGRAPH))
            {
                kept.push(tree.add_element(XmlElement::new(names::PARAGRAPH)));
            }
            tree.set_children(parent, kept);
        }
    }
}

/// A text node's slice of the concatenated part text.
struct TextSpan {
    node: NodeId,
    /// Parent and child index holding `node`; `None` for a text root.
    slot: Option<(NodeId, usize)>,
    range: Range<usize>,
    paragraph: Option<NodeId>,
}

/// The concatenated text of a part with a map back to its text nodes.
struct TextStream {
    text: String,
    spans: Vec<TextSpan>,
}

impl TextStream {
    fn build(tree: &XmlTree) -> Self {
        let mut stream = TextStream {
            text: String::new(),
            spans: Vec::new(),
        };
        stream.walk(tree, tree.root(), None, None);
        stream
    }

    fn walk(
        &mut self,
        tree: &XmlTree,
        id: NodeId,
        slot: Option<(NodeId, usize)>,
        paragraph: Option<NodeId>,
    ) {
        match tree.node(id) {
            XmlNode::Text(text) => {
                let start = self.text.len();
                self.text.push_str(text);
                self.spans.push(TextSpan {
                    node: id,
                    slot,
                    range: start..self.text.len(),
                    paragraph,
                });
            }
            XmlNode::Element(element) => {
                let paragraph = if element.name == names::PARAGRAPH {
                    Some(id)
                } else {
                    paragraph
                };
                for (index, child) in element.children.iter().enumerate() {
                    self.walk(tree, *child, Some((id, index)), paragraph);
                }
            }
        }
    }

    /// Innermost paragraph holding the start of `marker`.
    fn paragraph_of(&self, marker: &ConditionalMarker) -> TemplateResult<NodeId> {
        self.spans
            .iter()
            .find(|span| span.range.contains(&marker.position))
            .and_then(|span| span.paragraph)
            .ok_or_else(|| TemplateError::SectionBoundaryNotFound {
                marker: marker.original.clone(),
            })
    }

    /// Delete the given (sorted, disjoint) ranges from the text nodes they touch.
    fn cut(&self, tree: &mut XmlTree, ranges: &[Range<usize>]) {
        for span in &self.spans {
            if !ranges
                .iter()
                .any(|r| r.start < span.range.end && r.end > span.range.start)
            {
                continue;
            }

            let mut kept = String::new();
            let mut pos = span.range.start;
            for r in ranges {
                let start = r.start.clamp(span.range.start, span.range.end);
                let end = r.end.clamp(span.range.start, span.range.end);
                if start > pos {
                    kept.push_str(&self.text[pos..start]);
                }
                pos = pos.max(end);
            }
            if pos < span.range.end {
                kept.push_str(&self.text[pos..span.range.end]);
            }

            let replacement = tree.add_text(kept);
            match span.slot {
                Some((parent, index)) => tree.replace_child(parent, index, replacement),
                None => tree.replace(span.node, replacement),
            };
        }
    }
}
