//! Knowledge graph extraction from component records.
//!
//! - [`ModelService`] and [`OpenAiModel`]: model-guided triple extraction
//! - [`KgSchema`]: the entity and relation vocabulary
//! - [`KnowledgeGraphBuilder`]: per-component graph with a deterministic fallback
//! - [`combine`]: graph merge across components
//! - [`testing`]: a scripted model for tests

pub mod builder;
pub mod merge;
pub mod model;
pub mod schema;
pub mod testing;

pub use builder::{
    BuilderSettings, ExtractionStrategy, FallbackReason, KnowledgeGraphBuilder,
    METHOD_MANUAL_FALLBACK, METHOD_SCHEMA_GUIDED, is_placeholder_property, manual_graph,
    validate_record,
};
pub use merge::{COMBINED_SOURCE, COMPONENT_URL_KEY, combine};
pub use model::{ModelService, OpenAiModel, parse_triples};
pub use schema::{KgSchema, SCHEMA_VERSION};
