//! In-memory navigator for tests.
//!
//! [`SimulatedTree`] renders a lazily expanded navigation tree to HTML on every
//! query: children of a collapsed node are simply not in the document, exactly as
//! on a client-rendered documentation site. Individual nodes can be made to fail
//! or to ignore clicks.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use docgraph_shared::{DocGraphError, Result};

use crate::navigator::{self, Navigator, NodeHandle, WaitState};

/// How an expandable node reacts to a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickBehavior {
    /// Flip `aria-expanded` to `true` and render children.
    Expand,
    /// Return a navigation error.
    Fail,
    /// Accept the click but stay collapsed.
    Ignore,
}

/// One node of a simulated tree.
#[derive(Debug, Clone)]
pub enum SimNode {
    Branch {
        label: String,
        node_type: String,
        expanded: bool,
        behavior: ClickBehavior,
        children: Vec<SimNode>,
    },
    Leaf {
        label: String,
        href: String,
    },
}

impl SimNode {
    /// Collapsed `group` node.
    pub fn group(label: &str, children: Vec<SimNode>) -> Self {
        Self::Branch {
            label: label.into(),
            node_type: "group".into(),
            expanded: false,
            behavior: ClickBehavior::Expand,
            children,
        }
    }

    /// Collapsed `component` node (a component with several stories).
    pub fn component(label: &str, children: Vec<SimNode>) -> Self {
        Self::Branch {
            label: label.into(),
            node_type: "component".into(),
            expanded: false,
            behavior: ClickBehavior::Expand,
            children,
        }
    }

    pub fn leaf(label: &str, href: &str) -> Self {
        Self::Leaf {
            label: label.into(),
            href: href.into(),
        }
    }

    /// Start expanded.
    pub fn expanded(mut self) -> Self {
        if let Self::Branch { expanded, .. } = &mut self {
            *expanded = true;
        }
        self
    }

    /// Fail every click on this node.
    pub fn failing(self) -> Self {
        self.with_behavior(ClickBehavior::Fail)
    }

    /// Swallow clicks on this node without expanding.
    pub fn stuck(self) -> Self {
        self.with_behavior(ClickBehavior::Ignore)
    }

    fn with_behavior(mut self, new: ClickBehavior) -> Self {
        if let Self::Branch { behavior, .. } = &mut self {
            *behavior = new;
        }
        self
    }
}

/// A [`Navigator`] over an in-memory tree plus optional static pages.
#[derive(Debug, Clone)]
pub struct SimulatedTree {
    base_url: String,
    tree_id: String,
    roots: Vec<SimNode>,
    pages: HashMap<String, String>,
    current_url: String,
    on_tree: bool,
    clicks: usize,
}

impl SimulatedTree {
    /// Tree served at `base_url` inside `<nav id="storybook-explorer-tree">`.
    pub fn new(base_url: &str, roots: Vec<SimNode>) -> Self {
        Self {
            base_url: base_url.into(),
            tree_id: "storybook-explorer-tree".into(),
            roots,
            pages: HashMap::new(),
            current_url: String::new(),
            on_tree: false,
            clicks: 0,
        }
    }

    /// Serve `html` when navigating to `url`.
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.into(), html.into());
        self
    }

    /// Number of clicks received so far.
    pub fn clicks(&self) -> usize {
        self.clicks
    }

    /// Current markup of the tree page.
    pub fn render(&self) -> String {
        let mut out = String::from("<html><head><title>Storybook</title></head><body>");
        let _ = write!(out, "<nav id=\"{}\">", self.tree_id);
        let mut counter = 0usize;
        for node in &self.roots {
            render_node(node, &mut counter, &mut out);
        }
        out.push_str("</nav></body></html>");
        out
    }

    fn current_html(&self) -> Result<String> {
        if self.on_tree {
            return Ok(self.render());
        }
        self.pages
            .get(&self.current_url)
            .cloned()
            .ok_or_else(|| DocGraphError::navigation("no page loaded"))
    }
}

impl Navigator for SimulatedTree {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<()> {
        let target = crate::urls::resolve_href(&self.current_or_base(), url)
            .unwrap_or_else(|| url.to_string());

        if same_page(&target, &self.base_url) {
            self.on_tree = true;
        } else if self.pages.contains_key(&target) {
            self.on_tree = false;
        } else {
            return Err(DocGraphError::Network(format!("{target}: HTTP 404 Not Found")));
        }
        self.current_url = target;
        Ok(())
    }

    async fn locate(&mut self, selector: &str) -> Result<Vec<NodeHandle>> {
        let html = self.current_html()?;
        navigator::select_nodes(&html, selector)
    }

    async fn click(&mut self, node: &NodeHandle) -> Result<()> {
        if !self.on_tree {
            return Err(DocGraphError::navigation("click outside the tree page"));
        }
        let target: usize = node
            .attr("data-node-id")
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| DocGraphError::navigation(format!("stale node handle {}", node.id)))?;

        self.clicks += 1;
        let mut counter = 0usize;
        for root in &mut self.roots {
            if let Some(outcome) = click_node(root, target, &mut counter) {
                return outcome;
            }
        }
        Err(DocGraphError::navigation(format!("node {target} not found")))
    }

    async fn wait_for(&mut self, selector: &str, state: WaitState, timeout: Duration) -> Result<()> {
        let html = self.current_html()?;
        let present = !navigator::select_nodes(&html, selector)?.is_empty();
        let reached = match state {
            WaitState::Attached | WaitState::Visible => present,
            WaitState::Detached => !present,
        };
        if reached {
            Ok(())
        } else {
            Err(DocGraphError::timeout(format!("wait_for {selector}"), timeout))
        }
    }

    async fn content(&mut self) -> Result<String> {
        self.current_html()
    }

    async fn title(&mut self) -> Result<String> {
        Ok(navigator::document_title(&self.current_html()?))
    }

    fn current_url(&self) -> String {
        self.current_url.clone()
    }
}

impl SimulatedTree {
    fn current_or_base(&self) -> String {
        if self.current_url.is_empty() {
            self.base_url.clone()
        } else {
            self.current_url.clone()
        }
    }
}

fn same_page(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Render `node` in pre-order, numbering branches with `counter`.
fn render_node(node: &SimNode, counter: &mut usize, out: &mut String) {
    match node {
        SimNode::Leaf { label, href } => {
            let _ = write!(
                out,
                "<a class=\"sidebar-item\" data-nodetype=\"story\" href=\"{}\">{}</a>",
                escape(href),
                escape(label)
            );
        }
        SimNode::Branch {
            label,
            node_type,
            expanded,
            children,
            ..
        } => {
            let id = *counter;
            *counter += 1;
            let _ = write!(
                out,
                "<div class=\"sidebar-item\"><button data-node-id=\"{id}\" data-nodetype=\"{node_type}\" aria-expanded=\"{expanded}\">{}</button>",
                escape(label)
            );
            if *expanded {
                out.push_str("<div role=\"group\">");
                for child in children {
                    render_node(child, counter, out);
                }
                out.push_str("</div>");
            } else {
                // Collapsed subtrees are not rendered, but their ids stay reserved.
                *counter += count_branches(children);
            }
            out.push_str("</div>");
        }
    }
}

fn count_branches(nodes: &[SimNode]) -> usize {
    nodes
        .iter()
        .map(|n| match n {
            SimNode::Leaf { .. } => 0,
            SimNode::Branch { children, .. } => 1 + count_branches(children),
        })
        .sum()
}

/// Walk in the same pre-order as [`render_node`] and apply a click to branch `target`.
fn click_node(node: &mut SimNode, target: usize, counter: &mut usize) -> Option<Result<()>> {
    let SimNode::Branch {
        label,
        expanded,
        behavior,
        children,
        ..
    } = node
    else {
        return None;
    };

    let id = *counter;
    *counter += 1;
    if id == target {
        return Some(match behavior {
            ClickBehavior::Expand => {
                *expanded = !*expanded;
                Ok(())
            }
            ClickBehavior::Ignore => Ok(()),
            ClickBehavior::Fail => Err(DocGraphError::navigation(format!(
                "element '{label}' is not clickable"
            ))),
        });
    }
    for child in children.iter_mut() {
        if let Some(outcome) = click_node(child, target, counter) {
            return Some(outcome);
        }
    }
    None
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
