/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation
 */

//! Render command implementation.
//!
//! Options come from three places, later ones winning: defaults, the
//! `--config` TOML file, and the `--image-root` / `--store` flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use docx_template::{Compression, RenderOptions, Template, load_record};

/// Arguments for the render command
#[derive(Debug)]
pub struct RenderArgs {
    /// Template document
    pub template: String,
    /// JSON or YAML data file
    pub data: String,
    /// Output file path
    pub output: String,
    /// Render options file
    pub config: Option<String>,
    /// Base directory for relative image paths
    pub image_root: Option<String>,
    /// Write without compression
    pub store: bool,
}

/// Merge the config file and command-line flags into render options.
pub fn resolve_options(args: &RenderArgs) -> Result<RenderOptions> {
    let mut options = match &args.config {
        Some(config) => RenderOptions::from_file(Path::new(config))
            .with_context(|| format!("Failed to load config {}", config))?,
        None => RenderOptions::default(),
    };
    if let Some(root) = &args.image_root {
        options = options.with_image_root(PathBuf::from(root));
    }
    if args.store {
        options = options.with_compression(Compression::Stored);
    }
    Ok(options)
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let options = resolve_options(&args)?;

    let template_path = Path::new(&args.template);
    let template = Template::open(template_path)
        .with_context(|| format!("Failed to load template {}", template_path.display()))?;
    let data = load_record(Path::new(&args.data))?;

    // unresolved placeholders are listed by the error's Display
    let rendered = template
        .render(&data, &options)
        .with_context(|| format!("Failed to render {}", template_path.display()))?;

    let output = Path::new(&args.output);
    rendered
        .write_to(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    info!(output = %output.display(), "Rendered");
    Ok(())
}
