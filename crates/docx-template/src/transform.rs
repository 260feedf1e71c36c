/*
 * transform.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Part transformation pipeline.
 */

//! Part transformation pipeline.
//!
//! - [`PartTransform`] - a pass over one part's tree
//! - [`TransformPipeline`] - ordered passes run on every templated part
//!
//! The standard pipeline resolves conditional sections, expands table rows,
//! substitutes the remaining placeholders, and finally embeds images.

use docx_xml::XmlTree;

use crate::conditional;
use crate::error::{PlaceholderErrorDetail, TemplateResult};
use crate::image::{self, MediaStore};
use crate::options::RenderOptions;
use crate::replace::Replacer;
use crate::table;
use crate::value::Record;

/// State shared by the passes over one part.
pub struct RenderContext<'a> {
    /// Part name, e.g. `word/document.xml`.
    pub part: &'a str,
    pub data: &'a Record,
    pub options: &'a RenderOptions,

    /// Media, relationships and content types added by this render.
    pub media: &'a mut MediaStore,

    /// Collects unresolved placeholders instead of failing.
    pub replacer: Replacer,
}

impl<'a> RenderContext<'a> {
    /// Context for rendering `part` with `data`.
    pub fn new(
        part: &'a str,
        data: &'a Record,
        options: &'a RenderOptions,
        media: &'a mut MediaStore,
    ) -> Self {
        RenderContext {
            part,
            data,
            options,
            media,
            replacer: Replacer::new(),
        }
    }

    /// Placeholder failures collected during the passes.
    pub fn into_errors(self) -> Vec<PlaceholderErrorDetail> {
        self.replacer.into_errors()
    }
}

/// A pass over one part's tree.
///
/// Transforms are `Send + Sync` so a loaded template can be rendered from
/// several threads at once.
pub trait PartTransform: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn transform(&self, tree: &mut XmlTree, ctx: &mut RenderContext) -> TemplateResult<()>;
}

pub struct ConditionalTransform;

impl PartTransform for ConditionalTransform {
    fn name(&self) -> &str {
        "conditional-sections"
    }

    fn transform(&self, tree: &mut XmlTree, ctx: &mut RenderContext) -> TemplateResult<()> {
        conditional::process(tree, ctx.data)
    }
}

pub struct TableTransform;

impl PartTransform for TableTransform {
    fn name(&self) -> &str {
        "table-rows"
    }

    fn transform(&self, tree: &mut XmlTree, ctx: &mut RenderContext) -> TemplateResult<()> {
        table::process(tree, ctx.data, ctx.part, &mut ctx.replacer)
    }
}

pub struct ReplaceTransform;

impl PartTransform for ReplaceTransform {
    fn name(&self) -> &str {
        "placeholders"
    }

    fn transform(&self, tree: &mut XmlTree, ctx: &mut RenderContext) -> TemplateResult<()> {
        let root = tree.root();
        ctx.replacer.substitute(tree, root, ctx.data, ctx.part);
        Ok(())
    }
}

pub struct ImageTransform;

impl PartTransform for ImageTransform {
    fn name(&self) -> &str {
        "images"
    }

    fn transform(&self, tree: &mut XmlTree, ctx: &mut RenderContext) -> TemplateResult<()> {
        let image_root = ctx.options.image_root.as_deref();
        image::embed(tree, ctx.data, ctx.part, image_root, ctx.media)?;
        Ok(())
    }
}

/// Transforms run in insertion order.
pub struct TransformPipeline {
    transforms: Vec<Box<dyn PartTransform>>,
}

impl TransformPipeline {
    /// An empty pipeline.
    pub fn new() -> Self {
        Self {
            transforms: Vec::new(),
        }
    }

    /// Conditional sections, table rows, placeholders, images.
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline.extend([
            Box::new(ConditionalTransform) as Box<dyn PartTransform>,
            Box::new(TableTransform),
            Box::new(ReplaceTransform),
            Box::new(ImageTransform),
        ]);
        pipeline
    }

    /// Append a transform.
    pub fn push(&mut self, transform: Box<dyn PartTransform>) {
        self.transforms.push(transform);
    }

    /// Append several transforms, keeping their order.
    pub fn extend(&mut self, transforms: impl IntoIterator<Item = Box<dyn PartTransform>>) {
        self.transforms.extend(transforms);
    }

    /// Number of transforms.
    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// True when no transforms are registered.
    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    /// Run every transform on `tree`, stopping at the first error.
    pub fn execute(&self, tree: &mut XmlTree, ctx: &mut RenderContext) -> TemplateResult<()> {
        for transform in &self.transforms {
            tracing::debug!(transform = transform.name(), part = ctx.part, "Running transform");
            transform.transform(tree, ctx)?;
        }
        Ok(())
    }

    /// Transform names in execution order.
    pub fn transform_names(&self) -> Vec<&str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }
}

impl Default for TransformPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;
    use crate::image::ContentTypes;
    use docx_xml::parse;
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::Mutex;

    fn media() -> MediaStore {
        MediaStore::new(
            ContentTypes::parse(b"<Types/>").unwrap(),
            IndexMap::new(),
            std::iter::empty(),
        )
    }

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl PartTransform for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn transform(&self, _tree: &mut XmlTree, ctx: &mut RenderContext) -> TemplateResult<()> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}:{}", self.name, ctx.part));
            Ok(())
        }
    }

    struct Failing;

    impl PartTransform for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn transform(&self, _tree: &mut XmlTree, _ctx: &mut RenderContext) -> TemplateResult<()> {
            Err(TemplateError::MultipleLists {
                keys: vec!["a".to_string(), "b".to_string()],
            })
        }
    }

    #[test]
    fn test_runs_in_insertion_order_and_stops_on_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = TransformPipeline::new();
        pipeline.push(Box::new(Recording {
            name: "first",
            log: log.clone(),
        }));
        pipeline.push(Box::new(Failing));
        pipeline.push(Box::new(Recording {
            name: "never",
            log: log.clone(),
        }));
        assert_eq!(pipeline.transform_names(), vec!["first", "failing", "never"]);

        let mut tree = parse("<w:body/>").unwrap();
        let data = Record::new();
        let options = RenderOptions::default();
        let mut media = media();
        let mut ctx = RenderContext::new("word/document.xml", &data, &options, &mut media);
        assert!(pipeline.execute(&mut tree, &mut ctx).is_err());
        assert_eq!(*log.lock().unwrap(), vec!["first:word/document.xml"]);
    }

    #[test]
    fn test_standard_pipeline() {
        let pipeline = TransformPipeline::standard();
        assert_eq!(pipeline.len(), 4);
        assert!(TransformPipeline::new().is_empty());
        assert_eq!(
            pipeline.transform_names(),
            vec!["conditional-sections", "table-rows", "placeholders", "images"]
        );

        let mut tree = parse(concat!(
            "<w:body>",
            "<w:p><w:r><w:t>{{if:vip}}VIP {{name}}{{endif}}</w:t></w:r></w:p>",
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>{{items.sku}}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
            "<w:p><w:r><w:t>{{missing}}</w:t></w:r></w:p>",
            "</w:body>"
        ))
        .unwrap();
        let data = Record::from_json(json!({"vip": true, "name": "Ada", "items": [{"sku": "A"}, {"sku": "B"}]}));
        let options = RenderOptions::default();
        let mut media = media();
        let mut ctx = RenderContext::new("word/document.xml", &data, &options, &mut media);
        pipeline.execute(&mut tree, &mut ctx).unwrap();

        let errors = ctx.into_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].placeholder, "{{missing}}");
        assert_eq!(tree.text_content(tree.root()), "VIP AdaAB{{missing}}");
    }
}
