//! Shared types, error model, and configuration for docgraph.
//!
//! This crate is the foundation depended on by all other docgraph crates.
//! It provides:
//! - [`DocGraphError`]: the unified error type
//! - Domain types ([`Component`], [`ExtractedComponentRecord`], [`KgResult`], ...)
//! - Configuration ([`AppConfig`], [`DiscoveryConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CrawlerConfig, DiscoveryConfig, ExtractionConfig, ModelConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_api_key,
    validate_config,
};
pub use error::{DocGraphError, Result};
pub use types::{
    CodeExample, Component, ComponentDependency, ComponentFailure, ComponentMetadata,
    ComponentProperty, CrawlSummary, CrawledPage, ExtractedComponentRecord, GuidelineKind,
    KgEntity, KgRelation, KgResult, LeafLink, Priority, PropertyMap, RelationshipType,
    RunSummary, Termination, Triple, UsageGuideline,
};
