//! Crawl pipeline: start page → discovery → page capture → crawled page JSON.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{info, instrument, warn};

use docgraph_crawler::navigator::bounded;
use docgraph_crawler::{
    CAPTURE_ERROR_KEY, CaptureTimeouts, DiscoveryStrategy, Navigator, capture_page,
};
use docgraph_shared::{AppConfig, ComponentFailure, CrawlSummary, DocGraphError, Result};

use crate::artifacts::{ArtifactWriter, clear_directory, file_timestamp, safe_name};
use crate::progress::ProgressReporter;

/// Discover components from the configured start page and save one
/// `<safe_name>_<timestamp>.json` per captured page.
///
/// The output directory is cleared first. Capture and write problems are
/// recorded per component; only an unreachable start page or an unusable
/// output directory fails the run.
#[instrument(skip_all, fields(start_url = %config.crawler.start_url))]
pub async fn run_crawl<N: Navigator>(
    config: &AppConfig,
    navigator: &mut N,
    progress: &dyn ProgressReporter,
) -> Result<CrawlSummary> {
    let crawler = &config.crawler;
    let output_dir = PathBuf::from(&crawler.output_dir);
    // headless and max_depth only apply to browser-backed navigators.
    info!(
        output = %output_dir.display(),
        headless = crawler.headless,
        max_depth = crawler.max_depth,
        "starting crawl"
    );

    progress.phase("Preparing output directory");
    clear_directory(&output_dir)?;
    let mut writer = ArtifactWriter::create(&output_dir)?;

    progress.phase("Loading start page");
    let timeout = crawler.navigation_timeout();
    bounded("goto start page", timeout, navigator.goto(&crawler.start_url, timeout))
        .await
        .map_err(|e| {
            DocGraphError::navigation(format!("cannot load {}: {e}", crawler.start_url))
        })?;

    progress.phase("Discovering components");
    let strategy = DiscoveryStrategy::from_config(&config.discovery)?;
    let outcome = strategy.discover(navigator, &config.discovery).await?;
    let total = outcome.components.len();

    progress.phase("Capturing pages");
    let timeouts = CaptureTimeouts {
        navigation: timeout,
        frame_wait: config.discovery.discovery_timeout(),
    };
    let mut pages_saved = 0;
    let mut failures = Vec::new();

    for (i, component) in outcome.components.iter().enumerate() {
        let page = capture_page(navigator, component, &crawler.preview_frame_id, timeouts).await;
        progress.page_captured(&component.name, i + 1, total);

        if page.html.trim().is_empty() {
            let reason = page
                .metadata
                .get(CAPTURE_ERROR_KEY)
                .and_then(|v| v.as_str())
                .unwrap_or("no markup captured")
                .to_string();
            warn!(component = %component.name, %reason, "page not captured");
            failures.push(ComponentFailure {
                name: component.name.clone(),
                reason,
            });
            continue;
        }

        let stem = format!("{}_{}", safe_name(&page.name), file_timestamp(Utc::now()));
        match writer.write_unique_json(&stem, &page) {
            Ok(_) => pages_saved += 1,
            Err(e) => {
                warn!(component = %component.name, error = %e, "failed to save page");
                failures.push(ComponentFailure {
                    name: component.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let summary = CrawlSummary {
        components_discovered: total,
        pages_saved,
        termination: outcome.termination,
        iterations: outcome.iterations,
        failures,
        output_directory: output_dir.display().to_string(),
    };
    info!(
        discovered = summary.components_discovered,
        saved = summary.pages_saved,
        failed = summary.failures.len(),
        "crawl complete"
    );
    progress.crawl_done(&summary);
    Ok(summary)
}
