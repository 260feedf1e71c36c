/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for template loading and rendering.
//!
//! Errors come in tiers:
//!
//! - Structural errors ([`TemplateError`] variants other than
//!   [`TemplateError::Placeholders`]) abort the render at the first one found.
//! - Placeholder errors are collected across every part and reported together
//!   as one [`PlaceholderErrors`] value.
//! - Image errors ([`ImageError`]) abort at the first failing image.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to resolve a dot-path against a data record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataAccessError {
    #[error("path '{path}' not found")]
    PathNotFound { path: String },

    #[error("key '{key}' is ambiguous, matches {}", .matches.join(", "))]
    AmbiguousKey { key: String, matches: Vec<String> },

    #[error("key '{key}' matches both field '{field}' and map key '{string_key}'")]
    ConflictingKeyTypes {
        key: String,
        field: String,
        string_key: String,
    },

    #[error("'{segment}' is not a valid list index")]
    InvalidIndex { segment: String },

    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("value is null")]
    NilValue,

    #[error("value is not a string, number or boolean")]
    UnsupportedType,
}

/// One unresolved placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderErrorDetail {
    /// The placeholder text as written, e.g. `{{customer.name}}`.
    pub placeholder: String,

    /// Part the placeholder was found in, e.g. `word/document.xml`.
    pub part: String,

    pub reason: DataAccessError,
}

impl fmt::Display for PlaceholderErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}: {}", self.placeholder, self.part, self.reason)
    }
}

/// Every unresolved placeholder of a render.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlaceholderErrors {
    pub details: Vec<PlaceholderErrorDetail>,
}

impl PlaceholderErrors {
    /// Number of failures.
    pub fn len(&self) -> usize {
        self.details.len()
    }

    /// True when nothing failed.
    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }
}

impl fmt::Display for PlaceholderErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} unresolved placeholder(s)", self.details.len())?;
        for detail in &self.details {
            write!(f, "\n  {}", detail)?;
        }
        Ok(())
    }
}

/// Failure to embed an image into a drawing.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("no data for image '{name}'")]
    DataMissing { name: String },

    #[error("data for image '{name}' is not a file path")]
    InvalidValue { name: String },

    #[error("image file for '{name}' not found: {}", .path.display())]
    FileMissing { name: String, path: PathBuf },

    #[error("image file for '{name}' could not be read: {}", .path.display())]
    Unreadable {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("image '{name}' has unsupported format '{extension}' (expected png, jpg, jpeg or gif)")]
    UnsupportedFormat { name: String, extension: String },

    #[error("could not read dimensions of image '{name}': {message}")]
    UndecodableDimensions { name: String, message: String },

    #[error("drawing for image '{name}' has no usable extent")]
    MissingExtent { name: String },
}

/// Errors reading or writing the document container.
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("document container is missing required part '{0}'")]
    MissingPart(String),
}

/// Errors that can occur during template operations.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error(transparent)]
    Package(#[from] PackageError),

    /// A part could not be parsed or serialized.
    #[error("malformed part '{part}': {source}")]
    Xml {
        part: String,
        #[source]
        source: docx_xml::Error,
    },

    #[error("if marker '{marker}' has no matching endif")]
    UnmatchedIf { marker: String },

    #[error("endif marker at offset {position} has no matching if")]
    OrphanEndif { position: usize },

    #[error("else marker at offset {position} has no matching if")]
    OrphanElse { position: usize },

    #[error("second else marker at offset {position} for the same if")]
    DuplicateElse { position: usize },

    /// A conditional section boundary could not be located in the tree.
    #[error("conditional section boundary '{marker}' not found")]
    SectionBoundaryNotFound { marker: String },

    #[error("cannot evaluate condition '{condition}': {source}")]
    Condition {
        condition: String,
        #[source]
        source: DataAccessError,
    },

    /// A table row references more than one list, so its scope is ambiguous.
    #[error("table row references more than one list: {}", .keys.join(", "))]
    MultipleLists { keys: Vec<String> },

    #[error("{0}")]
    Placeholders(PlaceholderErrors),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("cannot load data from {}: {message}", .path.display())]
    Data { path: PathBuf, message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl TemplateError {
    pub(crate) fn xml(part: &str, source: docx_xml::Error) -> Self {
        TemplateError::Xml {
            part: part.to_string(),
            source,
        }
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_errors_display_lists_every_detail() {
        let errors = PlaceholderErrors {
            details: vec![
                PlaceholderErrorDetail {
                    placeholder: "{{a}}".to_string(),
                    part: "word/document.xml".to_string(),
                    reason: DataAccessError::PathNotFound {
                        path: "a".to_string(),
                    },
                },
                PlaceholderErrorDetail {
                    placeholder: "{{b}}".to_string(),
                    part: "word/header1.xml".to_string(),
                    reason: DataAccessError::NilValue,
                },
            ],
        };
        let message = TemplateError::Placeholders(errors).to_string();
        assert!(message.starts_with("2 unresolved placeholder(s)"));
        assert!(message.contains("{{a}} in word/document.xml: path 'a' not found"));
        assert!(message.contains("{{b}} in word/header1.xml: value is null"));
    }

    #[test]
    fn test_ambiguous_key_message() {
        let err = DataAccessError::AmbiguousKey {
            key: "name".to_string(),
            matches: vec!["NAME".to_string(), "Name".to_string()],
        };
        assert_eq!(err.to_string(), "key 'name' is ambiguous, matches NAME, Name");
    }
}
