/*
 * names.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Qualified element and attribute names of the WordprocessingML vocabulary
//! that the passes look for.

pub const PARAGRAPH: &str = "w:p";
pub const RUN: &str = "w:r";
pub const RUN_PROPERTIES: &str = "w:rPr";
pub const TEXT: &str = "w:t";
pub const PROOF_ERROR: &str = "w:proofErr";
pub const LAST_RENDERED_PAGE_BREAK: &str = "w:lastRenderedPageBreak";
pub const HYPERLINK: &str = "w:hyperlink";
pub const SMART_TAG: &str = "w:smartTag";
pub const SIMPLE_FIELD: &str = "w:fldSimple";

pub const TABLE: &str = "w:tbl";
pub const TABLE_ROW: &str = "w:tr";
pub const TABLE_CELL: &str = "w:tc";

pub const DRAWING: &str = "w:drawing";
pub const DOC_PROPERTIES: &str = "wp:docPr";
pub const DESCRIPTION: &str = "descr";
pub const EXTENT: &str = "wp:extent";
pub const SHAPE_EXTENT: &str = "a:ext";
pub const BLIP: &str = "a:blip";
pub const EMBED: &str = "r:embed";

pub const RELATIONSHIPS: &str = "Relationships";
pub const RELATIONSHIP: &str = "Relationship";
pub const CONTENT_TYPES: &str = "Types";
pub const CONTENT_TYPE_DEFAULT: &str = "Default";

pub const XML_SPACE: &str = "xml:space";

/// Elements whose direct children are runs that may be merged.
pub fn is_run_container(name: &str) -> bool {
    matches!(name, PARAGRAPH | HYPERLINK | SMART_TAG | SIMPLE_FIELD)
}
