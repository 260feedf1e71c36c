/*
 * package.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The zip container holding a document's parts.

use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use indexmap::IndexMap;
use tempfile::NamedTempFile;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::PackageError;
use crate::options::Compression;

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PACKAGE_RELATIONSHIPS_PART: &str = "_rels/.rels";

/// Parts every document container must have.
pub const REQUIRED_PARTS: [&str; 3] = [DOCUMENT_PART, CONTENT_TYPES_PART, PACKAGE_RELATIONSHIPS_PART];

/// An in-memory document container: part name to bytes, in archive order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    parts: IndexMap<String, Vec<u8>>,
}

impl Package {
    /// Read a container from a file.
    pub fn open(path: &Path) -> Result<Self, PackageError> {
        let file = File::open(path).map_err(|source| PackageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Read a container from zip bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PackageError> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Read a container from any seekable zip source.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, PackageError> {
        let mut archive = ZipArchive::new(reader)?;
        let mut parts = IndexMap::new();
        for index in 0..archive.len() {
            let mut entry = archive.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).map_err(ZipError::from)?;
            parts.insert(name, bytes);
        }
        Ok(Package { parts })
    }

    /// Build a container from named parts, keeping their order.
    pub fn from_parts(parts: impl IntoIterator<Item = (String, Vec<u8>)>) -> Self {
        Package {
            parts: parts.into_iter().collect(),
        }
    }

    /// Bytes of the part `name`, if present.
    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts.get(name).map(Vec::as_slice)
    }

    /// Whether the part `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.parts.contains_key(name)
    }

    /// Add a part or overwrite an existing one in place.
    pub fn set_part(&mut self, name: impl Into<String>, bytes: Vec<u8>) {
        self.parts.insert(name.into(), bytes);
    }

    /// Part names in archive order.
    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// Parts in archive order.
    pub fn parts(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.parts.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Number of parts.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True when the container has no parts.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Check that the parts every document needs are present.
    pub fn validate(&self) -> Result<(), PackageError> {
        match REQUIRED_PARTS.iter().find(|name| !self.contains(name)) {
            Some(missing) => Err(PackageError::MissingPart(missing.to_string())),
            None => Ok(()),
        }
    }

    /// Serialize to zip bytes.
    ///
    /// Media parts are always stored uncompressed.
    pub fn to_bytes(&self, compression: Compression) -> Result<Vec<u8>, PackageError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, bytes) in &self.parts {
            let method = match compression {
                Compression::Deflated if !name.starts_with("word/media/") => {
                    CompressionMethod::Deflated
                }
                _ => CompressionMethod::Stored,
            };
            let options = SimpleFileOptions::default().compression_method(method);
            writer.start_file(name.as_str(), options)?;
            writer.write_all(bytes).map_err(ZipError::from)?;
        }
        Ok(writer.finish()?.into_inner())
    }

    /// Write the container to `path`.
    ///
    /// The bytes go to a temporary file next to `path` that is renamed over
    /// it only once complete, so a failure never leaves a partial file.
    pub fn write_to(&self, path: &Path, compression: Compression) -> Result<(), PackageError> {
        let bytes = self.to_bytes(compression)?;

        let io_error = |source| PackageError::Io {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir).map_err(io_error)?;
        temp.write_all(&bytes).map_err(io_error)?;
        temp.flush().map_err(io_error)?;
        temp.persist(path).map_err(|e| io_error(e.error))?;
        Ok(())
    }
}
