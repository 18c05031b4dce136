//! Structured documentation extraction from captured component pages.
//!
//! - [`metadata`]: component metadata and args-table properties
//! - [`content`]: usage guidelines, code examples, preview regions
//! - [`relationships`]: inter-component dependencies from code and markup
//! - [`text`]: visible-text and cleaning helpers

pub mod content;
pub mod metadata;
pub mod relationships;
pub mod text;

pub use content::{
    PreviewContent, classify_guideline, extract_code_examples, extract_preview_content,
    extract_usage_guidelines,
};
pub use metadata::MetadataExtractor;
pub use relationships::{
    ComponentSource, analyze_component_relationships, find_component_dependencies,
};
pub use text::{clean_content_text, excerpt, strip_markup, visible_text};
