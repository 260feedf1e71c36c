/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template engine for Word (`.docx`) documents.
//!
//! A template is an ordinary Word document containing:
//!
//! - Placeholders: `{{customer.name}}`, `{{items.0.sku}}`
//! - Conditional sections: `{{if:customer.vip}}...{{else}}...{{endif}}`
//!   (case-insensitive markers, inline or spanning paragraphs)
//! - Repeated table rows: a row referencing a list, `{{items.sku}}`, is
//!   duplicated once per item
//! - Images: a drawing whose alt text is `{{image:logo}}` is replaced by the
//!   file the data names
//!
//! Data lookups are case-insensitive at every path segment.
//!
//! # Architecture
//!
//! Loading parses each templated part (body, headers, footers, notes,
//! document properties) into a [`docx_xml::XmlTree`] and normalizes it once:
//! placeholder text that Word split across several runs is merged back into
//! one run. Rendering clones those trees and runs a [`TransformPipeline`] on
//! each: conditional sections, table rows, placeholders, images.
//!
//! Errors come in two kinds. A malformed template or a broken image stops
//! the render at once. Unresolved placeholders are collected across all
//! parts and reported together in [`TemplateError::Placeholders`].
//!
//! # Example
//!
//! ```ignore
//! use docx_template::{Record, RenderOptions, Template};
//!
//! let template = Template::open("invoice.docx".as_ref())?;
//! let data = Record::from_json(serde_json::json!({
//!     "customer": {"name": "Ada"},
//!     "items": [{"sku": "A1", "qty": 2}]
//! }));
//! template
//!     .render(&data, &RenderOptions::default())?
//!     .write_to("invoice-ada.docx".as_ref())?;
//! ```

pub mod accessor;
pub mod conditional;
pub mod data;
pub mod error;
pub mod image;
pub mod names;
pub mod normalize;
pub mod options;
pub mod package;
pub mod placeholder;
pub mod replace;
pub mod table;
pub mod template;
pub mod transform;
pub mod value;

// Re-export main types at crate root
pub use data::{DataFormat, load_record};
pub use error::{
    DataAccessError, ImageError, PackageError, PlaceholderErrorDetail, PlaceholderErrors,
    TemplateError, TemplateResult,
};
pub use options::{Compression, RenderOptions};
pub use package::Package;
pub use placeholder::Placeholder;
pub use template::{RenderedDocument, Template, render_file};
pub use transform::{PartTransform, RenderContext, TransformPipeline};
pub use value::{KeyKind, Record, Value};
