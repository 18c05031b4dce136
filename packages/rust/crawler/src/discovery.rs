//! Component discovery strategies.

use std::collections::HashSet;

use regex::Regex;
use tracing::{debug, info, instrument, warn};

use docgraph_shared::{
    Component, DiscoveryConfig, DocGraphError, PropertyMap, Result, Termination,
};

use crate::explorer::HierarchyExplorer;
use crate::navigator::{Navigator, WaitState, bounded};
use crate::urls::resolve_href;

/// How components are found on the start page.
#[derive(Debug, Clone)]
pub enum DiscoveryStrategy {
    /// Expand the navigation tree and collect its leaves.
    Hierarchy,
    /// Flat scan of configured selectors, filtered by URL patterns.
    Selector { url_patterns: Vec<Regex> },
}

/// Components found by a strategy, plus how the search ended.
#[derive(Debug, Clone)]
pub struct DiscoveryOutcome {
    pub components: Vec<Component>,
    pub iterations: u32,
    pub termination: Termination,
}

impl DiscoveryStrategy {
    /// Build the strategy named in `config.strategy`.
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self> {
        match config.strategy.as_str() {
            "hierarchy" => Ok(Self::Hierarchy),
            "selector" => {
                let url_patterns = config
                    .url_patterns
                    .iter()
                    .map(|p| {
                        Regex::new(p).map_err(|e| {
                            DocGraphError::config(format!("invalid URL pattern '{p}': {e}"))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self::Selector { url_patterns })
            }
            other => Err(DocGraphError::config(format!(
                "unknown discovery strategy '{other}'"
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hierarchy => "hierarchy",
            Self::Selector { .. } => "selector",
        }
    }

    /// Discover components on the navigator's current page.
    #[instrument(skip_all, fields(strategy = self.name()))]
    pub async fn discover<N: Navigator>(
        &self,
        navigator: &mut N,
        config: &DiscoveryConfig,
    ) -> Result<DiscoveryOutcome> {
        let (components, iterations, termination) = match self {
            Self::Hierarchy => {
                if let Err(e) = navigator
                    .wait_for(
                        &config.tree_selector,
                        WaitState::Visible,
                        config.discovery_timeout(),
                    )
                    .await
                {
                    warn!(error = %e, tree = %config.tree_selector, "navigation tree did not appear");
                }

                let outcome = HierarchyExplorer::new(config.clone())
                    .expand_and_collect(navigator)
                    .await?;
                let components = outcome
                    .links
                    .into_iter()
                    .enumerate()
                    .map(|(index, link)| {
                        let mut metadata = PropertyMap::new();
                        metadata.insert("strategy".into(), "hierarchy".into());
                        metadata.insert("index".into(), index.into());
                        Component {
                            name: link.display_text,
                            url: link.href,
                            selectors: vec![format!(
                                "{} {}",
                                config.tree_selector, config.leaf_link_selector
                            )],
                            metadata,
                        }
                    })
                    .collect();
                (components, outcome.iterations, outcome.termination)
            }
            Self::Selector { url_patterns } => {
                let components = scan_selectors(navigator, config, url_patterns).await;
                (components, 0, Termination::NotApplicable)
            }
        };

        let components = finalize(components, config.max_components);
        info!(count = components.len(), "discovered components");

        Ok(DiscoveryOutcome {
            components,
            iterations,
            termination,
        })
    }
}

async fn scan_selectors<N: Navigator>(
    navigator: &mut N,
    config: &DiscoveryConfig,
    url_patterns: &[Regex],
) -> Vec<Component> {
    let base = navigator.current_url();
    let mut components = Vec::new();

    for selector in &config.component_selectors {
        let nodes = match bounded("locate", config.discovery_timeout(), navigator.locate(selector))
            .await
        {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!(selector = %selector, error = %e, "selector scan failed");
                continue;
            }
        };

        for node in nodes {
            let Some(raw_href) = node.attr("href") else {
                continue;
            };
            let Some(url) = resolve_href(&base, raw_href) else {
                continue;
            };
            if !url_patterns.is_empty() && !url_patterns.iter().any(|p| p.is_match(&url)) {
                debug!(%url, "URL matches no pattern, skipping");
                continue;
            }

            let name = if node.text.is_empty() {
                raw_href.to_string()
            } else {
                node.text.clone()
            };
            let mut metadata = PropertyMap::new();
            metadata.insert("strategy".into(), "selector".into());
            metadata.insert("href".into(), raw_href.into());
            components.push(Component {
                name,
                url,
                selectors: vec![selector.clone()],
                metadata,
            });
        }
    }

    components
}

/// Deduplicate by URL (first seen wins) and apply the optional cap.
pub fn finalize(components: Vec<Component>, max_components: Option<usize>) -> Vec<Component> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Component> = components
        .into_iter()
        .filter(|c| {
            let fresh = seen.insert(c.url.clone());
            if !fresh {
                debug!(url = %c.url, "skipping duplicate URL");
            }
            fresh
        })
        .collect();

    if let Some(max) = max_components {
        unique.truncate(max);
    }
    unique
}
