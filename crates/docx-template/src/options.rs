/*
 * options.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Render configuration.
//!
//! Options are plain data so they can come from a TOML file:
//!
//! ```toml
//! image-root = "assets/images"
//! compression = "stored"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{TemplateError, TemplateResult};

/// How parts are compressed in the output container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct RenderOptions {
    /// Directory that relative image paths in the data are resolved against.
    /// Without it they are relative to the working directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_root: Option<PathBuf>,

    #[serde(default)]
    pub compression: Compression,
}

impl RenderOptions {
    /// Parse options from TOML text.
    pub fn from_toml_str(source: &str) -> TemplateResult<Self> {
        toml::from_str(source).map_err(|e| TemplateError::Config {
            message: e.to_string(),
        })
    }

    /// Load options from a TOML file.
    ///
    /// A relative `image-root` is taken relative to the file's directory.
    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        let source = fs::read_to_string(path).map_err(|e| TemplateError::Config {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        let mut options = Self::from_toml_str(&source)?;
        if let (Some(root), Some(dir)) = (&options.image_root, path.parent())
            && root.is_relative()
        {
            options.image_root = Some(dir.join(root));
        }
        Ok(options)
    }

    /// Set the base directory for relative image paths.
    pub fn with_image_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.image_root = Some(root.into());
        self
    }

    /// Set the compression used when writing the output.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}
