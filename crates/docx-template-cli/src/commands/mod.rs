//! Command implementations for the docx-template CLI
//!
//! Each command module handles the CLI interface and delegates to
//! docx-template for the actual work.

pub mod placeholders;
pub mod render;
