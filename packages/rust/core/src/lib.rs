//! Pipeline orchestration for docgraph.
//!
//! This crate ties together discovery, page capture, extraction and knowledge
//! graph construction into the two batch workflows: [`run_crawl`] and
//! [`ExtractionOrchestrator`].

pub mod artifacts;
pub mod crawl;
pub mod orchestrator;
pub mod progress;

pub use artifacts::{ArtifactMeta, ArtifactWriter, safe_name};
pub use crawl::run_crawl;
pub use orchestrator::{
    COMBINED_KG_FILE, ExtractionOrchestrator, RELATIONSHIPS_FILE, SUMMARY_FILE,
};
pub use progress::{ProgressReporter, SilentProgress};
