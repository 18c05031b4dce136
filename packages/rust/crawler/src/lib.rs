//! Navigation-tree discovery and page capture.
//!
//! This crate provides:
//! - [`Navigator`]: the page automation surface, with [`HttpNavigator`] as a static implementation
//! - [`HierarchyExplorer`]: bounded fixpoint expansion of a collapsible navigation tree
//! - [`DiscoveryStrategy`]: hierarchy or flat-selector component discovery
//! - [`capture_page`]: preview markup and metadata capture for one component
//! - [`testing`]: an in-memory navigator for tests

pub mod capture;
pub mod discovery;
pub mod explorer;
pub mod http;
pub mod navigator;
pub mod testing;
pub mod urls;

pub use capture::{CAPTURE_ERROR_KEY, CaptureTimeouts, capture_page};
pub use discovery::{DiscoveryOutcome, DiscoveryStrategy};
pub use explorer::{ExplorationOutcome, HierarchyExplorer};
pub use http::HttpNavigator;
pub use navigator::{Navigator, NodeHandle, WaitState};
pub use urls::{normalize_url, resolve_href};
