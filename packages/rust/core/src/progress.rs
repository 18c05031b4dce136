//! Progress callbacks for long-running pipelines.

use docgraph_shared::{CrawlSummary, RunSummary};

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each component page is captured.
    fn page_captured(&self, name: &str, current: usize, total: usize);
    /// Called after each component is extracted.
    fn component_extracted(&self, name: &str, current: usize, total: usize);
    fn crawl_done(&self, summary: &CrawlSummary);
    fn extraction_done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_captured(&self, _name: &str, _current: usize, _total: usize) {}
    fn component_extracted(&self, _name: &str, _current: usize, _total: usize) {}
    fn crawl_done(&self, _summary: &CrawlSummary) {}
    fn extraction_done(&self, _summary: &RunSummary) {}
}
