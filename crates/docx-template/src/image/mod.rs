/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Image embedding for drawings marked `{{image:name}}`.
//!
//! A drawing whose `wp:docPr` description is exactly `{{image:name}}` is
//! pointed at the image file named by `name` in the data. The file is copied
//! into `word/media/`, linked through a new relationship, and the drawing's
//! extents are rescaled so the image fits inside the template's box with its
//! aspect ratio preserved.

pub mod content_types;
pub mod dimensions;
pub mod relationships;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use docx_xml::{NodeId, XmlTree};
use indexmap::IndexMap;
use regex::Regex;
use tracing::debug;

use crate::error::{ImageError, TemplateResult};
use crate::names;
use crate::package::CONTENT_TYPES_PART;
use crate::value::{Record, Value};

pub use content_types::ContentTypes;
pub use dimensions::{Dimensions, ImageFormat};
pub use relationships::{
    IMAGE_RELATIONSHIP_TYPE, Relationship, RelationshipIds, RelationshipsPart,
    next_relationship_id, rels_part_for,
};

static IMAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{\{image:([A-Za-z0-9_-]+)\}\}$")
        .expect("Invalid regex pattern for image markers")
});

const MEDIA_DIR: &str = "word/media/";

/// An image file read from disk and ready to embed.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub path: PathBuf,
    pub format: ImageFormat,

    /// Lower-cased file extension, reused for the media part name.
    pub extension: String,
    pub bytes: Vec<u8>,
    pub dimensions: Dimensions,
}

impl SourceImage {
    /// Check, read and measure the file `path` for the image called `name`.
    pub fn load(name: &str, path: &Path) -> Result<Self, ImageError> {
        if !path.is_file() {
            return Err(ImageError::FileMissing {
                name: name.to_string(),
                path: path.to_path_buf(),
            });
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let format =
            ImageFormat::from_extension(&extension).ok_or_else(|| ImageError::UnsupportedFormat {
                name: name.to_string(),
                extension: extension.clone(),
            })?;

        let bytes = fs::read(path).map_err(|source| ImageError::Unreadable {
            name: name.to_string(),
            path: path.to_path_buf(),
            source,
        })?;
        let dimensions = dimensions::decode(&bytes, format).map_err(|message| {
            ImageError::UndecodableDimensions {
                name: name.to_string(),
                message,
            }
        })?;

        Ok(SourceImage {
            path: path.to_path_buf(),
            format,
            extension,
            bytes,
            dimensions,
        })
    }
}

/// Scale `source` uniformly so it fits inside `template`.
pub fn scale(source: (f64, f64), template: (f64, f64)) -> (f64, f64) {
    let factor = (template.0 / source.0).min(template.1 / source.1);
    (source.0 * factor, source.1 * factor)
}

/// Package parts created or changed by embedding images during one render.
#[derive(Debug, Clone)]
pub struct MediaStore {
    next_media: u32,
    media: IndexMap<String, Vec<u8>>,
    content_types: ContentTypes,
    content_types_changed: bool,
    relationships: IndexMap<String, RelationshipsPart>,
    touched: HashSet<String>,
}

impl MediaStore {
    /// A store over a package's manifest, relationship parts, and part names.
    pub fn new<'a>(
        content_types: ContentTypes,
        relationships: IndexMap<String, RelationshipsPart>,
        part_names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let highest = part_names
            .into_iter()
            .filter_map(media_number)
            .max()
            .unwrap_or(0);
        MediaStore {
            next_media: highest + 1,
            media: IndexMap::new(),
            content_types,
            content_types_changed: false,
            relationships,
            touched: HashSet::new(),
        }
    }

    /// Store `image` as a new media part linked from `part`; returns the
    /// relationship ID.
    pub fn add_image(&mut self, part: &str, image: &SourceImage) -> String {
        let file = format!("image{}.{}", self.next_media, image.extension);
        self.next_media += 1;

        let target = if part.starts_with("word/") && !part["word/".len()..].contains('/') {
            format!("media/{}", file)
        } else {
            format!("/{}{}", MEDIA_DIR, file)
        };

        if self
            .content_types
            .ensure_default(&image.extension, image.format.mime_type())
        {
            self.content_types_changed = true;
        }

        let rels_name = rels_part_for(part);
        let id = self
            .relationships
            .entry(rels_name.clone())
            .or_insert_with(RelationshipsPart::empty)
            .add(IMAGE_RELATIONSHIP_TYPE, &target);
        self.touched.insert(rels_name);

        self.media
            .insert(format!("{}{}", MEDIA_DIR, file), image.bytes.clone());
        id
    }

    /// Parts to overlay on the output package: new media, changed
    /// relationship parts, and the manifest if it changed.
    pub fn into_parts(self) -> TemplateResult<Vec<(String, Vec<u8>)>> {
        let mut parts: Vec<(String, Vec<u8>)> = self.media.into_iter().collect();
        for (name, rels) in &self.relationships {
            if self.touched.contains(name) {
                parts.push((name.clone(), rels.to_bytes(name)?));
            }
        }
        if self.content_types_changed {
            parts.push((
                CONTENT_TYPES_PART.to_string(),
                self.content_types.to_bytes()?,
            ));
        }
        Ok(parts)
    }
}

/// `N` of a `word/media/imageN.ext` part name.
fn media_number(part: &str) -> Option<u32> {
    let file = part.strip_prefix(MEDIA_DIR)?;
    let stem = file.split('.').next()?;
    stem.strip_prefix("image")?.parse().ok()
}

/// Embed the image for every marked drawing in `tree`.
///
/// Relative paths in the data are resolved against `image_root`. Returns the
/// number of images embedded.
pub fn embed(
    tree: &mut XmlTree,
    data: &Record,
    part: &str,
    image_root: Option<&Path>,
    store: &mut MediaStore,
) -> TemplateResult<usize> {
    let root = tree.root();
    let mut embedded = 0;

    for drawing in tree.find_all(root, names::DRAWING) {
        let Some(name) = marker_name(tree, drawing) else {
            continue;
        };
        let path = image_path(data, &name, image_root)?;
        let image = SourceImage::load(&name, &path)?;

        let missing_extent = || ImageError::MissingExtent { name: name.clone() };
        let extent = tree
            .find_first(drawing, names::EXTENT)
            .ok_or_else(missing_extent)?;
        let box_width = extent_value(tree, extent, "cx").ok_or_else(missing_extent)?;
        let box_height = extent_value(tree, extent, "cy").ok_or_else(missing_extent)?;

        let (width, height) = scale(
            (
                f64::from(image.dimensions.width),
                f64::from(image.dimensions.height),
            ),
            (box_width, box_height),
        );
        let cx = (width.round() as i64).to_string();
        let cy = (height.round() as i64).to_string();

        let id = store.add_image(part, &image);
        debug!(
            image = name.as_str(),
            path = %image.path.display(),
            relationship = id.as_str(),
            "Embedding image"
        );

        set_attributes(tree, extent, &[("cx", cx.as_str()), ("cy", cy.as_str())]);
        for shape_extent in tree.find_all(drawing, names::SHAPE_EXTENT) {
            if tree.attribute(shape_extent, "cx").is_some() {
                set_attributes(tree, shape_extent, &[("cx", cx.as_str()), ("cy", cy.as_str())]);
            }
        }
        for blip in tree.find_all(drawing, names::BLIP) {
            set_attributes(tree, blip, &[(names::EMBED, id.as_str())]);
        }
        embedded += 1;
    }

    Ok(embedded)
}

/// The image name of a drawing's `{{image:name}}` description, if any.
fn marker_name(tree: &XmlTree, drawing: NodeId) -> Option<String> {
    let properties = tree.find_first(drawing, names::DOC_PROPERTIES)?;
    let description = tree.attribute(properties, names::DESCRIPTION)?;
    IMAGE_MARKER
        .captures(description.trim())
        .map(|caps| caps[1].to_string())
}

fn image_path(data: &Record, name: &str, image_root: Option<&Path>) -> Result<PathBuf, ImageError> {
    let value = data.get(name).ok_or_else(|| ImageError::DataMissing {
        name: name.to_string(),
    })?;
    let Value::String(raw) = value else {
        return Err(ImageError::InvalidValue {
            name: name.to_string(),
        });
    };
    if raw.is_empty() {
        return Err(ImageError::InvalidValue {
            name: name.to_string(),
        });
    }

    let path = PathBuf::from(raw);
    Ok(match image_root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path,
    })
}

fn extent_value(tree: &XmlTree, extent: NodeId, name: &str) -> Option<f64> {
    tree.attribute(extent, name)?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| *v > 0.0)
}

fn set_attributes(tree: &mut XmlTree, id: NodeId, attributes: &[(&str, &str)]) {
    let Some(element) = tree.element(id) else {
        return;
    };
    let mut updated = element.clone();
    for (name, value) in attributes {
        updated = updated.with_attribute(name, *value);
    }
    let replacement = tree.add_element(updated);
    tree.replace(id, replacement);
}
