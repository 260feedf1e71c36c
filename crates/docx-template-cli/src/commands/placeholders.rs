/*
 * placeholders.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Placeholders command implementation
 */

//! Lists the placeholders a template expects, grouped by part.

use std::path::Path;

use anyhow::{Context, Result};
use docx_template::{Placeholder, Template};

/// Arguments for the placeholders command
#[derive(Debug)]
pub struct PlaceholdersArgs {
    /// Template document
    pub template: String,
    /// Print as JSON instead of plain text
    pub json: bool,
}

/// Execute the placeholders command
pub fn execute(args: PlaceholdersArgs) -> Result<()> {
    let path = Path::new(&args.template);
    let template = Template::open(path)
        .with_context(|| format!("Failed to load template {}", path.display()))?;
    let found = template.placeholders();

    let output = if args.json {
        let listing: serde_json::Map<String, serde_json::Value> = found
            .iter()
            .map(|(part, placeholders)| (part.clone(), paths(placeholders).into()))
            .collect();
        serde_json::to_string_pretty(&listing)?
    } else {
        format_listing(found.iter().map(|(part, p)| (part.as_str(), p.as_slice())))
    };
    println!("{}", output);
    Ok(())
}

fn paths(placeholders: &[Placeholder]) -> Vec<String> {
    placeholders.iter().map(|p| p.path.join(".")).collect()
}

fn format_listing<'a>(parts: impl Iterator<Item = (&'a str, &'a [Placeholder])>) -> String {
    let mut out = String::new();
    for (part, placeholders) in parts {
        out.push_str(part);
        out.push('\n');
        for path in paths(placeholders) {
            out.push_str("  ");
            out.push_str(&path);
            out.push('\n');
        }
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_template::placeholder::scan;

    #[test]
    fn test_format_listing() {
        let body = scan("{{customer.name}} {{items.0.sku}}");
        let header = scan("{{title}}");
        let listing = format_listing(
            [
                ("word/document.xml", body.as_slice()),
                ("word/header1.xml", header.as_slice()),
            ]
            .into_iter(),
        );
        assert_eq!(
            listing,
            "word/document.xml\n  customer.name\n  items.0.sku\nword/header1.xml\n  title"
        );
    }

    #[test]
    fn test_empty_listing() {
        assert_eq!(format_listing(std::iter::empty()), "");
    }
}
