//! Static [`Navigator`] over plain HTTP.
//!
//! Pages are fetched with `reqwest` and queried with `scraper`. No script runs, so
//! lazily rendered trees stay collapsed and clicks are reported as unsupported.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use docgraph_shared::{DocGraphError, Result};

use crate::navigator::{self, Navigator, NodeHandle, WaitState};

/// Navigator that fetches documents without executing them.
pub struct HttpNavigator {
    client: Client,
    current_url: Option<Url>,
    body: String,
}

impl HttpNavigator {
    /// Create a navigator sending `user_agent` on every request.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| DocGraphError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            current_url: None,
            body: String::new(),
        })
    }

    fn require_page(&self) -> Result<()> {
        if self.current_url.is_none() {
            return Err(DocGraphError::navigation("no page loaded"));
        }
        Ok(())
    }
}

impl Navigator for HttpNavigator {
    #[instrument(skip_all, fields(url = %url))]
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let target = match Url::parse(url) {
            Ok(u) => u,
            Err(_) => self
                .current_url
                .as_ref()
                .and_then(|base| base.join(url).ok())
                .ok_or_else(|| DocGraphError::navigation(format!("cannot resolve URL '{url}'")))?,
        };

        debug!(%target, "fetching page");

        let response = self
            .client
            .get(target.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DocGraphError::timeout(format!("goto {target}"), timeout)
                } else {
                    DocGraphError::Network(format!("{target}: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DocGraphError::Network(format!("{target}: HTTP {status}")));
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| DocGraphError::Network(format!("{target}: body read failed: {e}")))?;

        self.current_url = Some(final_url);
        self.body = body;
        Ok(())
    }

    async fn locate(&mut self, selector: &str) -> Result<Vec<NodeHandle>> {
        self.require_page()?;
        navigator::select_nodes(&self.body, selector)
    }

    async fn click(&mut self, node: &NodeHandle) -> Result<()> {
        Err(DocGraphError::navigation(format!(
            "static navigator cannot click <{}> '{}'",
            node.tag, node.text
        )))
    }

    async fn wait_for(&mut self, selector: &str, state: WaitState, timeout: Duration) -> Result<()> {
        self.require_page()?;
        // Static content never changes, so the answer is known immediately.
        let present = !navigator::select_nodes(&self.body, selector)?.is_empty();
        let reached = match state {
            WaitState::Attached | WaitState::Visible => present,
            WaitState::Detached => !present,
        };
        if reached {
            Ok(())
        } else {
            Err(DocGraphError::timeout(
                format!("wait_for {selector} ({state:?})"),
                timeout,
            ))
        }
    }

    async fn content(&mut self) -> Result<String> {
        self.require_page()?;
        Ok(self.body.clone())
    }

    async fn title(&mut self) -> Result<String> {
        self.require_page()?;
        Ok(navigator::document_title(&self.body))
    }

    fn current_url(&self) -> String {
        self.current_url
            .as_ref()
            .map(Url::to_string)
            .unwrap_or_default()
    }
}
