//! Capture of one component page as a [`CrawledPage`].

use std::time::Duration;

use chrono::Utc;
use scraper::{Html, Selector};
use tracing::{debug, instrument, warn};

use docgraph_shared::{Component, CrawledPage, PropertyMap};

use crate::navigator::{Navigator, WaitState, bounded};
use crate::urls::resolve_href;

/// Timeouts applied while capturing a page.
#[derive(Debug, Clone, Copy)]
pub struct CaptureTimeouts {
    pub navigation: Duration,
    pub frame_wait: Duration,
}

/// Metadata key holding the reason a page could not be captured.
pub const CAPTURE_ERROR_KEY: &str = "capture_error";

/// Load `component` and capture its preview markup and `<meta>` tags.
///
/// Never fails. When the component page itself cannot be loaded the capture has
/// empty markup and [`CAPTURE_ERROR_KEY`] set; the navigator may still show the
/// previous page, which must not be attributed to this component. Otherwise the
/// preview frame is preferred over the main page markup.
#[instrument(skip_all, fields(component = %component.name))]
pub async fn capture_page<N: Navigator>(
    navigator: &mut N,
    component: &Component,
    frame_id: &str,
    timeouts: CaptureTimeouts,
) -> CrawledPage {
    let discovered_at = Utc::now();

    if let Err(e) = bounded(
        "goto",
        timeouts.navigation,
        navigator.goto(&component.url, timeouts.navigation),
    )
    .await
    {
        warn!(url = %component.url, error = %e, "navigation failed, skipping capture");
        let mut metadata = PropertyMap::new();
        metadata.insert(CAPTURE_ERROR_KEY.into(), e.to_string().into());
        return CrawledPage {
            name: component.name.clone(),
            url: component.url.clone(),
            html: String::new(),
            metadata,
            discovered_at,
            processed_at: Utc::now(),
        };
    }

    let main_html = navigator.content().await.unwrap_or_else(|e| {
        warn!(error = %e, "could not read page content");
        String::new()
    });
    let page_title = navigator.title().await.unwrap_or_default();

    let mut metadata = PropertyMap::new();
    collect_meta_tags(&main_html, &mut metadata);

    let preview = load_preview(navigator, frame_id, timeouts).await;
    let html = match preview {
        Some((frame_html, frame_title)) => {
            collect_meta_tags(&frame_html, &mut metadata);
            metadata.insert("page_title".into(), page_title.into());
            metadata.insert("iframe_title".into(), frame_title.into());
            metadata.insert("component_html_length".into(), frame_html.len().into());
            metadata.insert(
                "has_iframe_content".into(),
                (!frame_html.trim().is_empty()).into(),
            );
            frame_html
        }
        None => {
            debug!("preview frame unavailable, keeping main page markup");
            main_html
        }
    };

    CrawledPage {
        name: component.name.clone(),
        url: component.url.clone(),
        html,
        metadata,
        discovered_at,
        processed_at: Utc::now(),
    }
}

/// Resolve the preview frame's `src` and load it. Returns `(markup, title)`.
async fn load_preview<N: Navigator>(
    navigator: &mut N,
    frame_id: &str,
    timeouts: CaptureTimeouts,
) -> Option<(String, String)> {
    let selector = format!("#{frame_id}");

    if let Err(e) = navigator
        .wait_for(&selector, WaitState::Attached, timeouts.frame_wait)
        .await
    {
        warn!(error = %e, "preview frame not found");
        return None;
    }

    let frames = navigator.locate(&selector).await.ok()?;
    let src = frames.first()?.attr("src")?.to_string();
    let frame_url = resolve_href(&navigator.current_url(), &src)?;

    if let Err(e) = bounded(
        "goto",
        timeouts.navigation,
        navigator.goto(&frame_url, timeouts.navigation),
    )
    .await
    {
        warn!(url = %frame_url, error = %e, "could not load preview frame");
        return None;
    }

    let html = navigator.content().await.ok()?;
    let title = navigator.title().await.unwrap_or_default();
    debug!(length = html.len(), "captured preview frame");
    Some((html, title))
}

/// Copy `<meta>` tags keyed by `name`, `property`, or `itemprop` into `out`.
fn collect_meta_tags(html: &str, out: &mut PropertyMap) {
    static META: std::sync::LazyLock<Selector> =
        std::sync::LazyLock::new(|| Selector::parse("meta").expect("valid selector"));

    let doc = Html::parse_document(html);
    for tag in doc.select(&META) {
        let el = tag.value();
        let key = el
            .attr("name")
            .or_else(|| el.attr("property"))
            .or_else(|| el.attr("itemprop"));
        if let Some(key) = key {
            out.insert(key.to_string(), el.attr("content").unwrap_or("").into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::SimulatedTree;

    const BASE: &str = "http://localhost:6006/";
    const PAGE_URL: &str = "http://localhost:6006/?path=/docs/inputs-button--docs";
    const FRAME_URL: &str = "http://localhost:6006/iframe.html?id=inputs-button--docs&viewMode=docs";

    fn component() -> Component {
        Component {
            name: "Button".into(),
            url: PAGE_URL.into(),
            selectors: vec![],
            metadata: PropertyMap::new(),
        }
    }

    fn timeouts() -> CaptureTimeouts {
        CaptureTimeouts {
            navigation: Duration::from_secs(1),
            frame_wait: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn captures_preview_frame() {
        let main = r#"<html><head><title>Button ⋅ Storybook</title>
            <meta name="description" content="Storybook docs"></head>
            <body><iframe id="storybook-preview-iframe" src="iframe.html?id=inputs-button--docs&amp;viewMode=docs"></iframe></body></html>"#;
        let frame = r#"<html><head><title>Preview</title>
            <meta property="og:type" content="component"></head>
            <body><div id="storybook-root"><button>Click</button></div></body></html>"#;
        let mut nav = SimulatedTree::new(BASE, vec![])
            .with_page(PAGE_URL, main)
            .with_page(FRAME_URL, frame);

        let page = capture_page(&mut nav, &component(), "storybook-preview-iframe", timeouts()).await;

        assert!(page.html.contains("storybook-root"));
        assert_eq!(page.metadata["description"], "Storybook docs");
        assert_eq!(page.metadata["og:type"], "component");
        assert_eq!(page.metadata["page_title"], "Button ⋅ Storybook");
        assert_eq!(page.metadata["iframe_title"], "Preview");
        assert_eq!(page.metadata["has_iframe_content"], true);
        assert!(page.processed_at >= page.discovered_at);
    }

    #[tokio::test]
    async fn falls_back_to_main_page_without_frame() {
        let main = "<html><body><h1>Button</h1><p>No preview here.</p></body></html>";
        let mut nav = SimulatedTree::new(BASE, vec![]).with_page(PAGE_URL, main);

        let page = capture_page(&mut nav, &component(), "storybook-preview-iframe", timeouts()).await;
        assert!(page.html.contains("No preview here."));
        assert!(!page.metadata.contains_key("has_iframe_content"));
    }

    #[tokio::test]
    async fn unreachable_page_yields_empty_capture() {
        let mut nav = SimulatedTree::new(BASE, vec![]);
        let page = capture_page(&mut nav, &component(), "storybook-preview-iframe", timeouts()).await;
        assert!(page.html.is_empty());
        assert_eq!(page.name, "Button");
        assert!(page.metadata.contains_key(CAPTURE_ERROR_KEY));
    }

    #[tokio::test]
    async fn failed_navigation_never_reuses_previous_page() {
        let alpha = "<html><body><p>ALPHA CONTENT</p></body></html>";
        let mut nav = SimulatedTree::new(BASE, vec![]).with_page(PAGE_URL, alpha);

        let first = capture_page(&mut nav, &component(), "storybook-preview-iframe", timeouts()).await;
        assert!(first.html.contains("ALPHA"));

        let missing = Component {
            name: "Badge".into(),
            url: "http://localhost:6006/?path=/docs/display-badge--docs".into(),
            selectors: vec![],
            metadata: PropertyMap::new(),
        };
        let second = capture_page(&mut nav, &missing, "storybook-preview-iframe", timeouts()).await;
        assert_eq!(second.name, "Badge");
        assert!(second.html.is_empty());
        assert!(!second.metadata.contains_key("page_title"));
        assert!(
            second.metadata[CAPTURE_ERROR_KEY]
                .as_str()
                .unwrap()
                .contains("404")
        );
    }
}
