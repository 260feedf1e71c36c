/*
 * template.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Loaded templates and rendering.

use std::path::Path;

use docx_xml::XmlTree;
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::error::{PlaceholderErrors, TemplateError, TemplateResult};
use crate::image::{ContentTypes, MediaStore, RelationshipsPart};
use crate::normalize::normalize;
use crate::options::{Compression, RenderOptions};
use crate::package::{CONTENT_TYPES_PART, DOCUMENT_PART, Package};
use crate::placeholder::{self, Placeholder};
use crate::transform::{RenderContext, TransformPipeline};
use crate::value::Record;

/// Parts that take part in templating besides the main document.
fn is_template_part(name: &str) -> bool {
    let numbered = |prefix: &str| {
        name.strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(".xml"))
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    };
    matches!(
        name,
        DOCUMENT_PART
            | "word/footnotes.xml"
            | "word/endnotes.xml"
            | "docProps/core.xml"
            | "docProps/app.xml"
    ) || numbered("word/header")
        || numbered("word/footer")
}

fn is_relationships_part(name: &str) -> bool {
    name.strip_prefix("word/_rels/")
        .is_some_and(|rest| rest.ends_with(".rels") && !rest.contains('/'))
}

/// A parsed, normalized template ready to render any number of times.
///
/// Rendering never mutates the template, so one instance can be shared
/// across threads.
pub struct Template {
    package: Package,
    parts: IndexMap<String, XmlTree>,
    content_types: ContentTypes,
    relationships: IndexMap<String, RelationshipsPart>,
    pipeline: TransformPipeline,
}

impl Template {
    /// Load a template from a `.docx` file.
    pub fn open(path: &Path) -> TemplateResult<Self> {
        info!(path = %path.display(), "Loading template");
        Self::load(Package::open(path)?)
    }

    /// Load a template from the bytes of a `.docx` file.
    pub fn from_bytes(bytes: &[u8]) -> TemplateResult<Self> {
        Self::load(Package::from_bytes(bytes)?)
    }

    /// Parse and normalize every templated part of `package`.
    pub fn load(package: Package) -> TemplateResult<Self> {
        package.validate()?;

        let mut names: Vec<&str> = package.part_names().filter(|n| is_template_part(n)).collect();
        // the main document renders first
        names.sort_by_key(|n| *n != DOCUMENT_PART);

        let mut parts = IndexMap::new();
        for name in names {
            let bytes = package.part(name).unwrap_or_default();
            let mut tree = docx_xml::parse_bytes(bytes).map_err(|e| TemplateError::xml(name, e))?;
            normalize(&mut tree);
            debug!(part = name, "Loaded template part");
            parts.insert(name.to_string(), tree);
        }

        let content_types = ContentTypes::parse(package.part(CONTENT_TYPES_PART).unwrap_or_default())?;
        let mut relationships = IndexMap::new();
        for (name, bytes) in package.parts().filter(|(n, _)| is_relationships_part(n)) {
            relationships.insert(name.to_string(), RelationshipsPart::parse(name, bytes)?);
        }

        Ok(Template {
            package,
            parts,
            content_types,
            relationships,
            pipeline: TransformPipeline::standard(),
        })
    }

    /// Replace the passes run on each part.
    pub fn with_pipeline(mut self, pipeline: TransformPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Names of the templated parts, main document first.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// The normalized tree of a templated part.
    pub fn part(&self, name: &str) -> Option<&XmlTree> {
        self.parts.get(name)
    }

    /// Unique data placeholders of each templated part, in document order.
    ///
    /// Conditional markers are not listed. Parts without placeholders are
    /// left out.
    pub fn placeholders(&self) -> IndexMap<String, Vec<Placeholder>> {
        let mut found = IndexMap::new();
        for (name, tree) in &self.parts {
            let nodes = tree.text_nodes(tree.root());
            let unique = placeholder::unique(nodes.iter().filter_map(|node| tree.text(*node)));
            if !unique.is_empty() {
                found.insert(name.clone(), unique);
            }
        }
        found
    }

    /// Render the template against `data`.
    ///
    /// Structural and image errors abort at once. Unresolved placeholders are
    /// collected over all parts and reported together.
    pub fn render(&self, data: &Record, options: &RenderOptions) -> TemplateResult<RenderedDocument> {
        info!(parts = self.parts.len(), "Rendering template");

        let mut media = MediaStore::new(
            self.content_types.clone(),
            self.relationships.clone(),
            self.package.part_names(),
        );
        let mut errors = Vec::new();
        let mut rendered = Vec::with_capacity(self.parts.len());

        for (name, template_tree) in &self.parts {
            let mut tree = template_tree.clone();
            let mut ctx = RenderContext::new(name, data, options, &mut media);
            self.pipeline.execute(&mut tree, &mut ctx)?;
            errors.extend(ctx.into_errors());

            let bytes = tree.to_xml_bytes().map_err(|e| TemplateError::xml(name, e))?;
            rendered.push((name.clone(), bytes));
        }

        if !errors.is_empty() {
            info!(count = errors.len(), "Unresolved placeholders");
            return Err(TemplateError::Placeholders(PlaceholderErrors { details: errors }));
        }

        let mut package = self.package.clone();
        for (name, bytes) in rendered.into_iter().chain(media.into_parts()?) {
            package.set_part(name, bytes);
        }
        Ok(RenderedDocument {
            package,
            compression: options.compression,
        })
    }

    /// Render once per record, in parallel. Results keep the input order.
    pub fn render_batch(
        &self,
        records: &[Record],
        options: &RenderOptions,
    ) -> Vec<TemplateResult<RenderedDocument>> {
        info!(count = records.len(), "Rendering batch");
        records
            .par_iter()
            .map(|data| self.render(data, options))
            .collect()
    }
}

/// The output of a render: every part of the final container.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    package: Package,
    compression: Compression,
}

impl RenderedDocument {
    /// Bytes of one output part.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.package.part(name)
    }

    /// All parts by name, rendered and untouched alike.
    pub fn parts(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.package.parts()
    }

    /// The output container.
    pub fn package(&self) -> &Package {
        &self.package
    }

    /// Take the output container.
    pub fn into_package(self) -> Package {
        self.package
    }

    /// Serialize to `.docx` bytes with the render's compression.
    pub fn to_bytes(&self) -> TemplateResult<Vec<u8>> {
        Ok(self.package.to_bytes(self.compression)?)
    }

    /// Write the document to `path`, atomically.
    pub fn write_to(&self, path: &Path) -> TemplateResult<()> {
        self.package.write_to(path, self.compression)?;
        info!(path = %path.display(), "Wrote document");
        Ok(())
    }
}

/// Load `template`, render it with `data`, and write the result to `output`.
///
/// Nothing is written unless the render succeeds.
pub fn render_file(
    template: &Path,
    data: &Record,
    output: &Path,
    options: &RenderOptions,
) -> TemplateResult<()> {
    Template::open(template)?.render(data, options)?.write_to(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parts() {
        assert!(is_template_part("word/document.xml"));
        assert!(is_template_part("word/header1.xml"));
        assert!(is_template_part("word/footer12.xml"));
        assert!(is_template_part("docProps/core.xml"));
        assert!(!is_template_part("word/headerx.xml"));
        assert!(!is_template_part("word/header.xml"));
        assert!(!is_template_part("word/footer.xml"));
        assert!(!is_template_part("word/styles.xml"));
        assert!(!is_template_part("word/_rels/document.xml.rels"));
    }

    #[test]
    fn test_relationships_parts() {
        assert!(is_relationships_part("word/_rels/document.xml.rels"));
        assert!(is_relationships_part("word/_rels/header1.xml.rels"));
        assert!(!is_relationships_part("_rels/.rels"));
    }

    #[test]
    fn test_template_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Template>();
        assert_send_sync::<RenderedDocument>();
    }
}
