//! Application configuration for docgraph.
//!
//! User config lives at `~/.docgraph/docgraph.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocGraphError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docgraph.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docgraph";

// ---------------------------------------------------------------------------
// Config structs (matching docgraph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl target and navigator settings.
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Component discovery settings.
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Model service settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Extraction pipeline settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// `[crawler]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Root URL of the documentation site.
    #[serde(default = "default_start_url")]
    pub start_url: String,

    /// Directory receiving one JSON file per crawled page.
    #[serde(default = "default_crawler_output_dir")]
    pub output_dir: String,

    /// Per-navigation timeout in milliseconds.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Maximum navigation depth from the start URL, for browser-backed
    /// navigators that follow links. `HttpNavigator` and the tree explorer do not
    /// read it; tree expansion is bounded by `discovery.max_iterations`.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Launch a browser-backed navigator headless. `HttpNavigator` has no window
    /// and ignores it.
    #[serde(default = "default_true")]
    pub headless: bool,

    /// User-Agent sent by the HTTP navigator.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Id of the element hosting the component preview.
    #[serde(default = "default_preview_frame_id")]
    pub preview_frame_id: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: default_start_url(),
            output_dir: default_crawler_output_dir(),
            navigation_timeout_ms: default_navigation_timeout_ms(),
            max_depth: default_max_depth(),
            headless: true,
            user_agent: default_user_agent(),
            preview_frame_id: default_preview_frame_id(),
        }
    }
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

fn default_start_url() -> String {
    "http://localhost:6006".into()
}
fn default_crawler_output_dir() -> String {
    "process/crawler".into()
}
fn default_navigation_timeout_ms() -> u64 {
    30_000
}
fn default_max_depth() -> u32 {
    3
}
fn default_true() -> bool {
    true
}
fn default_user_agent() -> String {
    format!("docgraph/{}", env!("CARGO_PKG_VERSION"))
}
fn default_preview_frame_id() -> String {
    "storybook-preview-iframe".into()
}

/// `[discovery]` section. Constructed once per run and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// `hierarchy` (expand the navigation tree) or `selector` (flat scan).
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Root of the navigation tree.
    #[serde(default = "default_tree_selector")]
    pub tree_selector: String,

    /// `data-nodetype` values of nodes that can be expanded.
    #[serde(default = "default_expandable_node_types")]
    pub expandable_node_types: Vec<String>,

    /// Attribute carrying the expansion state (`"true"` / `"false"`).
    #[serde(default = "default_expansion_attribute")]
    pub expansion_attribute: String,

    /// Leaf anchors, relative to the tree root.
    #[serde(default = "default_leaf_link_selector")]
    pub leaf_link_selector: String,

    /// Selectors used by the flat `selector` strategy.
    #[serde(default = "default_component_selectors")]
    pub component_selectors: Vec<String>,

    /// Regexes a component URL must match under the `selector` strategy.
    #[serde(default = "default_url_patterns")]
    pub url_patterns: Vec<String>,

    /// How long to wait for the tree root to appear, in milliseconds.
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,

    /// Pause after each expansion round, in milliseconds.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Hard ceiling on expansion rounds.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    /// Truncate the discovered list to this many components.
    #[serde(default)]
    pub max_components: Option<usize>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            tree_selector: default_tree_selector(),
            expandable_node_types: default_expandable_node_types(),
            expansion_attribute: default_expansion_attribute(),
            leaf_link_selector: default_leaf_link_selector(),
            component_selectors: default_component_selectors(),
            url_patterns: default_url_patterns(),
            discovery_timeout_ms: default_discovery_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            max_iterations: default_max_iterations(),
            max_components: None,
        }
    }
}

impl DiscoveryConfig {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_strategy() -> String {
    "hierarchy".into()
}
fn default_tree_selector() -> String {
    "#storybook-explorer-tree".into()
}
fn default_expandable_node_types() -> Vec<String> {
    vec!["group".into(), "component".into()]
}
fn default_expansion_attribute() -> String {
    "aria-expanded".into()
}
fn default_leaf_link_selector() -> String {
    "a[href]".into()
}
fn default_component_selectors() -> Vec<String> {
    vec![
        "#storybook-explorer-tree a[href]".into(),
        ".sidebar-item[data-nodetype=\"document\"] a".into(),
        ".sidebar-item[data-nodetype=\"story\"] a".into(),
    ]
}
fn default_url_patterns() -> Vec<String> {
    vec!["/docs/".into(), "/story/".into()]
}
fn default_discovery_timeout_ms() -> u64 {
    30_000
}
fn default_settle_delay_ms() -> u64 {
    500
}
fn default_max_iterations() -> u32 {
    15
}

/// `[model]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Disable the model entirely; every component uses the manual fallback.
    #[serde(default)]
    pub disabled: bool,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible API base URL.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model_name")]
    pub name: String,

    /// Upper bound on in-flight model requests.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Attempts per component before falling back.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff between attempts, doubled each retry.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            name: default_model_name(),
            max_concurrent_requests: default_max_concurrent_requests(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model_name() -> String {
    "gpt-4o-mini".into()
}
fn default_max_concurrent_requests() -> usize {
    4
}
fn default_request_timeout_secs() -> u64 {
    120
}
fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_ms() -> u64 {
    1_000
}

/// `[extraction]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Directory of crawled page JSON files.
    #[serde(default = "default_crawler_output_dir")]
    pub input_dir: String,

    /// Directory receiving records, graphs and the run summary.
    #[serde(default = "default_extraction_output_dir")]
    pub output_dir: String,

    /// Content shorter than this skips model extraction.
    #[serde(default = "default_min_content_length")]
    pub min_content_length: usize,

    /// Minimum entities for a model-derived graph to be accepted.
    #[serde(default = "default_min_entity_count")]
    pub min_entity_count: usize,

    /// Characters of visible text kept on each record.
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,

    /// Per-field metadata selector overrides (`title`, `description`, `category`, `tags`).
    #[serde(default)]
    pub metadata_selectors: std::collections::BTreeMap<String, Vec<String>>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            input_dir: default_crawler_output_dir(),
            output_dir: default_extraction_output_dir(),
            min_content_length: default_min_content_length(),
            min_entity_count: default_min_entity_count(),
            excerpt_length: default_excerpt_length(),
            metadata_selectors: Default::default(),
        }
    }
}

fn default_extraction_output_dir() -> String {
    "process/extraction".into()
}
fn default_min_content_length() -> usize {
    100
}
fn default_min_entity_count() -> usize {
    3
}
fn default_excerpt_length() -> usize {
    1_000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docgraph/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DocGraphError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docgraph/docgraph.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocGraphError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| DocGraphError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocGraphError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| DocGraphError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocGraphError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the model API key env var is set and non-empty, returning the key.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.model.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(DocGraphError::config(format!(
            "model API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Check the config for values that would make a run meaningless.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    url::Url::parse(&config.crawler.start_url).map_err(|e| {
        DocGraphError::config(format!("invalid start URL {}: {e}", config.crawler.start_url))
    })?;
    if config.discovery.max_iterations == 0 {
        return Err(DocGraphError::config("discovery.max_iterations must be at least 1"));
    }
    if config.model.max_attempts == 0 {
        return Err(DocGraphError::config("model.max_attempts must be at least 1"));
    }
    if config.model.max_concurrent_requests == 0 {
        return Err(DocGraphError::config(
            "model.max_concurrent_requests must be at least 1",
        ));
    }
    match config.discovery.strategy.as_str() {
        "hierarchy" | "selector" => Ok(()),
        other => Err(DocGraphError::config(format!(
            "unknown discovery strategy '{other}' (expected 'hierarchy' or 'selector')"
        ))),
    }
}
