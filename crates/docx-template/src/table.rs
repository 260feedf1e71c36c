/*
 * table.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Row duplication for tables driven by list data.
//!
//! A row whose placeholders reference a list (by their first path segment)
//! is a template row. Adjacent template rows over the same list form a group
//! that is repeated once per list item, with the list key rebound to the item:
//! `{{items.sku}}` in a template row renders each item's `sku`.

use docx_xml::{NodeId, XmlTree};
use tracing::debug;

use crate::error::{TemplateError, TemplateResult};
use crate::names;
use crate::placeholder;
use crate::replace::Replacer;
use crate::value::{Record, Value};

/// How a single row takes part in duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAnalysis {
    /// No placeholder refers to a list.
    Ordinary,

    /// Every list placeholder refers to this key.
    Template { list_key: String },
}

/// Adjacent template rows repeated together for each item of one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateGroup {
    pub list_key: String,
    pub rows: Vec<NodeId>,
}

/// Classify a row by the list keys its placeholders reference.
pub fn analyze_row(tree: &XmlTree, row: NodeId, data: &Record) -> TemplateResult<RowAnalysis> {
    let mut keys: Vec<String> = Vec::new();
    for found in placeholder::scan(&tree.text_content(row)) {
        let key = found.root_key();
        let is_list = matches!(data.get(key), Some(Value::List(_)));
        if is_list && !keys.iter().any(|k| k.eq_ignore_ascii_case(key)) {
            keys.push(key.to_string());
        }
    }

    match keys.len() {
        0 => Ok(RowAnalysis::Ordinary),
        1 => Ok(RowAnalysis::Template {
            list_key: keys.remove(0),
        }),
        _ => Err(TemplateError::MultipleLists { keys }),
    }
}

/// Template groups among a table's rows, in document order.
pub fn template_groups(
    tree: &XmlTree,
    table: NodeId,
    data: &Record,
) -> TemplateResult<Vec<TemplateGroup>> {
    let mut groups: Vec<TemplateGroup> = Vec::new();
    let mut open = false;

    for child in tree.children(table) {
        if !tree.is_named(*child, names::TABLE_ROW) {
            open = false;
            continue;
        }
        match analyze_row(tree, *child, data)? {
            RowAnalysis::Ordinary => open = false,
            RowAnalysis::Template { list_key } => match groups.last_mut() {
                Some(group) if open && group.list_key.eq_ignore_ascii_case(&list_key) => {
                    group.rows.push(*child);
                }
                _ => {
                    groups.push(TemplateGroup {
                        list_key,
                        rows: vec![*child],
                    });
                    open = true;
                }
            },
        }
    }
    Ok(groups)
}

/// Expand every template group of every table in the tree.
///
/// Placeholders in the duplicated rows are substituted right away with the
/// item's scoped data; failures go to `replacer`.
pub fn process(
    tree: &mut XmlTree,
    data: &Record,
    part: &str,
    replacer: &mut Replacer,
) -> TemplateResult<()> {
    let root = tree.root();
    for table in tree.find_all(root, names::TABLE) {
        if !tree.is_attached(table) {
            continue;
        }

        let groups = template_groups(tree, table, data)?;
        for group in groups.iter().rev() {
            expand_group(tree, table, group, data, part, replacer);
        }
    }
    Ok(())
}

fn expand_group(
    tree: &mut XmlTree,
    table: NodeId,
    group: &TemplateGroup,
    data: &Record,
    part: &str,
    replacer: &mut Replacer,
) {
    let items = data
        .get(&group.list_key)
        .and_then(Value::as_list)
        .map(<[Value]>::to_vec)
        .unwrap_or_default();

    debug!(
        list = group.list_key.as_str(),
        rows = group.rows.len(),
        items = items.len(),
        "Expanding table rows"
    );

    let mut clones = Vec::with_capacity(items.len() * group.rows.len());
    for item in items {
        let scoped = data.rebind(&group.list_key, item);
        for row in &group.rows {
            let clone = tree.deep_clone(*row);
            replacer.substitute(tree, clone, &scoped, part);
            clones.push(clone);
        }
    }

    let children = tree.children(table).to_vec();
    let Some(at) = children.iter().position(|c| *c == group.rows[0]) else {
        return;
    };
    let mut spliced: Vec<NodeId> = children[..at].to_vec();
    spliced.extend(clones);
    spliced.extend(
        children[at..]
            .iter()
            .copied()
            .filter(|c| !group.rows.contains(c)),
    );
    tree.set_children(table, spliced);
}
