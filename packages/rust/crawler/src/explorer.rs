//! Exhaustive expansion of a lazily rendered navigation tree.
//!
//! The explorer repeatedly clicks every collapsed node it can see until nothing
//! collapsed remains, no click makes progress, or the iteration ceiling is hit,
//! then collects every leaf link once.

use std::collections::HashSet;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use docgraph_shared::{DiscoveryConfig, LeafLink, Result, Termination};

use crate::navigator::{Navigator, NodeHandle, bounded};
use crate::urls::resolve_href;

/// Result of one exploration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorationOutcome {
    /// Leaf links in first-seen order, unique by normalized URL.
    pub links: Vec<LeafLink>,
    /// Expansion rounds performed.
    pub iterations: u32,
    pub termination: Termination,
    /// Expansion attempts that failed across all rounds.
    pub failed_expansions: usize,
}

/// Per-round expansion tally, threaded through the attempt loop.
#[derive(Debug, Default, Clone, Copy)]
struct ExpansionTally {
    expanded: usize,
    failed: usize,
}

impl ExpansionTally {
    fn record(self, node: &NodeHandle, outcome: Result<()>) -> Self {
        match outcome {
            Ok(()) => Self {
                expanded: self.expanded + 1,
                ..self
            },
            Err(e) => {
                warn!(node = %node.text, error = %e, "could not expand node");
                Self {
                    failed: self.failed + 1,
                    ..self
                }
            }
        }
    }
}

/// Drives a [`Navigator`] to reveal and collect every leaf of the navigation tree.
pub struct HierarchyExplorer {
    config: DiscoveryConfig,
    action_timeout: Duration,
}

impl HierarchyExplorer {
    pub fn new(config: DiscoveryConfig) -> Self {
        let action_timeout = config.discovery_timeout();
        Self {
            config,
            action_timeout,
        }
    }

    /// Bound each click and query by `timeout` instead of the discovery timeout.
    pub fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Selectors matching collapsed nodes of every expandable type.
    fn collapsed_selectors(&self) -> Vec<String> {
        self.config
            .expandable_node_types
            .iter()
            .map(|node_type| {
                format!(
                    "{} [data-nodetype=\"{node_type}\"][{}=\"false\"]",
                    self.config.tree_selector, self.config.expansion_attribute
                )
            })
            .collect()
    }

    fn leaf_selector(&self) -> String {
        format!(
            "{} {}",
            self.config.tree_selector, self.config.leaf_link_selector
        )
    }

    /// Expand the tree to a fixpoint and collect its leaf links.
    #[instrument(skip_all, fields(tree = %self.config.tree_selector))]
    pub async fn expand_and_collect<N: Navigator>(
        &self,
        navigator: &mut N,
    ) -> Result<ExplorationOutcome> {
        let max_iterations = self.config.max_iterations;
        let mut iterations = 0u32;
        let mut failed_expansions = 0usize;

        let termination = loop {
            let candidates = match self.collapsed_nodes(navigator).await {
                Ok(nodes) => nodes,
                Err(e) => {
                    warn!(error = %e, "could not locate collapsed nodes");
                    break Termination::NoProgress;
                }
            };

            if candidates.is_empty() {
                break Termination::Stable;
            }
            if iterations == max_iterations {
                warn!(
                    max_iterations,
                    remaining = candidates.len(),
                    "iteration ceiling reached with collapsed nodes left"
                );
                break Termination::IterationCeiling;
            }
            iterations += 1;

            let mut tally = ExpansionTally::default();
            for node in &candidates {
                let outcome = bounded("click", self.action_timeout, navigator.click(node)).await;
                tally = tally.record(node, outcome);
            }
            failed_expansions += tally.failed;

            tokio::time::sleep(self.config.settle_delay()).await;

            if let Ok(visible) = navigator.locate(&self.leaf_selector()).await {
                debug!(
                    iteration = iterations,
                    candidates = candidates.len(),
                    expanded = tally.expanded,
                    failed = tally.failed,
                    visible_links = visible.len(),
                    "expansion round finished"
                );
            }

            if tally.expanded == 0 {
                warn!(
                    iteration = iterations,
                    candidates = candidates.len(),
                    "no node could be expanded"
                );
                break Termination::NoProgress;
            }
        };

        let links = self.collect_links(navigator).await;
        info!(
            links = links.len(),
            iterations,
            ?termination,
            "tree exploration finished"
        );

        Ok(ExplorationOutcome {
            links,
            iterations,
            termination,
            failed_expansions,
        })
    }

    async fn collapsed_nodes<N: Navigator>(&self, navigator: &mut N) -> Result<Vec<NodeHandle>> {
        let mut nodes = Vec::new();
        for selector in self.collapsed_selectors() {
            nodes.extend(bounded("locate", self.action_timeout, navigator.locate(&selector)).await?);
        }
        Ok(nodes)
    }

    /// Collect every visible leaf once, keyed by normalized URL; first display text wins.
    ///
    /// A failed leaf query yields no links rather than discarding the expansion work.
    async fn collect_links<N: Navigator>(&self, navigator: &mut N) -> Vec<LeafLink> {
        let anchors = match bounded(
            "locate",
            self.action_timeout,
            navigator.locate(&self.leaf_selector()),
        )
        .await
        {
            Ok(anchors) => anchors,
            Err(e) => {
                warn!(error = %e, "could not locate leaf links");
                return Vec::new();
            }
        };
        let base = navigator.current_url();

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        let mut duplicates = 0usize;
        let mut discarded = 0usize;

        for (index, anchor) in anchors.iter().enumerate() {
            let Some(href) = anchor.attr("href").and_then(|h| resolve_href(&base, h)) else {
                discarded += 1;
                continue;
            };
            if !seen.insert(href.clone()) {
                duplicates += 1;
                continue;
            }
            let display_text = if anchor.text.trim().is_empty() {
                format!("Component_{index}")
            } else {
                anchor.text.trim().to_string()
            };
            links.push(LeafLink { href, display_text });
        }

        debug!(
            anchors = anchors.len(),
            unique = links.len(),
            duplicates,
            discarded,
            "collected leaf links"
        );
        links
    }
}
