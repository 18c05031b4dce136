//! The rendering/automation surface the crawler drives.
//!
//! A [`Navigator`] owns one "page": it can be pointed at a URL, queried with CSS
//! selectors, and asked to click on previously located nodes. Located nodes are
//! returned as [`NodeHandle`] snapshots; a handle stays meaningful only until the
//! next mutation of the page.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use scraper::{Html, Selector};

use docgraph_shared::{DocGraphError, Result};

/// Target state for [`Navigator::wait_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    /// Present in the document.
    Attached,
    /// Present and rendered.
    Visible,
    /// Absent from the document.
    Detached,
}

/// Snapshot of one located element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    /// Navigator-specific identity used to act on the node later.
    pub id: String,
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Whitespace-collapsed text content.
    pub text: String,
}

impl NodeHandle {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Page automation used by discovery and page capture.
///
/// Methods return `Send` futures so navigators can be driven from spawned tasks.
pub trait Navigator: Send {
    /// Load `url`, replacing the current page.
    fn goto(&mut self, url: &str, timeout: Duration) -> impl Future<Output = Result<()>> + Send;

    /// All elements currently matching `selector`, in document order.
    fn locate(&mut self, selector: &str) -> impl Future<Output = Result<Vec<NodeHandle>>> + Send;

    /// Click a node previously returned by [`Navigator::locate`].
    fn click(&mut self, node: &NodeHandle) -> impl Future<Output = Result<()>> + Send;

    /// Wait until `selector` reaches `state`, or fail with a timeout error.
    fn wait_for(
        &mut self,
        selector: &str,
        state: WaitState,
        timeout: Duration,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Serialized markup of the current page.
    fn content(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// Document title of the current page.
    fn title(&mut self) -> impl Future<Output = Result<String>> + Send;

    /// URL of the current page (empty before the first `goto`).
    fn current_url(&self) -> String;
}

/// Run a navigator future under `timeout`, mapping expiry to [`DocGraphError::Timeout`].
pub async fn bounded<T>(
    operation: &str,
    timeout: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(DocGraphError::timeout(operation, timeout)),
    }
}

/// Parse a CSS selector, reporting failures as parse errors.
pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| DocGraphError::parse(format!("invalid selector '{selector}': {e:?}")))
}

/// Locate `selector` in a static HTML document.
///
/// Handle ids are `<selector>#<index>` unless the element carries `data-node-id`.
pub fn select_nodes(html: &str, selector: &str) -> Result<Vec<NodeHandle>> {
    let sel = parse_selector(selector)?;
    let doc = Html::parse_document(html);

    let nodes = doc
        .select(&sel)
        .enumerate()
        .map(|(index, el)| {
            let attributes: BTreeMap<String, String> = el
                .value()
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let id = attributes
                .get("data-node-id")
                .cloned()
                .unwrap_or_else(|| format!("{selector}#{index}"));
            NodeHandle {
                id,
                tag: el.value().name().to_string(),
                attributes,
                text: collapse_whitespace(&el.text().collect::<String>()),
            }
        })
        .collect();

    Ok(nodes)
}

/// Text of the first `<title>` element, or empty.
pub fn document_title(html: &str) -> String {
    let doc = Html::parse_document(html);
    let Ok(sel) = Selector::parse("title") else {
        return String::new();
    };
    doc.select(&sel)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
