//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use docgraph_core::{ExtractionOrchestrator, ProgressReporter, run_crawl};
use docgraph_crawler::navigator::bounded;
use docgraph_crawler::{DiscoveryStrategy, HttpNavigator, Navigator};
use docgraph_knowledge::{ExtractionStrategy, OpenAiModel};
use docgraph_shared::{
    AppConfig, CrawlSummary, RunSummary, init_config, load_config, load_config_from,
    validate_api_key, validate_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// docgraph: crawl component documentation into a knowledge graph.
#[derive(Parser)]
#[command(
    name = "docgraph",
    version,
    about = "Crawl component documentation sites and extract a typed knowledge graph.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file (defaults to ~/.docgraph/docgraph.toml).
    #[arg(long, global = true, env = "DOCGRAPH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Crawl overrides; flags beat environment variables, which beat the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct CrawlArgs {
    /// Documentation site root.
    #[arg(long, env = "CRAWLER_START_URL")]
    pub start_url: Option<String>,

    /// Directory for crawled page JSON files.
    #[arg(long, env = "CRAWLER_OUTPUT_DIR")]
    pub output_dir: Option<String>,

    /// Headless flag for browser-backed navigators (the HTTP navigator ignores it).
    #[arg(long, env = "PLAYWRIGHT_HEADLESS")]
    pub headless: Option<bool>,

    /// Navigation timeout in milliseconds.
    #[arg(long, env = "PLAYWRIGHT_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Link depth for browser-backed navigators (the HTTP navigator ignores it;
    /// use --max-iterations to bound tree expansion).
    #[arg(long, env = "CRAWLER_MAX_DEPTH")]
    pub max_depth: Option<u32>,

    /// Discovery strategy: hierarchy or selector.
    #[arg(long)]
    pub strategy: Option<String>,

    /// Expansion iteration ceiling.
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Keep at most this many components.
    #[arg(long)]
    pub max_components: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ExtractArgs {
    /// Directory of crawled page JSON files.
    #[arg(long)]
    pub input: Option<String>,

    /// Directory for records, graphs and the run summary.
    #[arg(long)]
    pub out: Option<String>,

    /// Skip the model and use the deterministic fallback for every component.
    #[arg(long)]
    pub no_model: bool,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Discover components and print them without capturing pages.
    Discover {
        #[command(flatten)]
        crawl: CrawlArgs,
    },

    /// Discover components and save one JSON file per page.
    Crawl {
        #[command(flatten)]
        crawl: CrawlArgs,
    },

    /// Extract records and knowledge graphs from crawled pages.
    Extract {
        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Crawl, then extract.
    Run {
        #[command(flatten)]
        crawl: CrawlArgs,
        #[command(flatten)]
        extract: ExtractArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docgraph=info",
        1 => "docgraph=debug",
        _ => "docgraph=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Command::Discover { crawl } => cmd_discover(resolve_config(config_path, &crawl, None)?).await,
        Command::Crawl { crawl } => cmd_crawl(&resolve_config(config_path, &crawl, None)?).await,
        Command::Extract { extract } => {
            let config = resolve_config(config_path, &CrawlArgs::default(), Some(&extract))?;
            cmd_extract(&config, extract.no_model).await
        }
        Command::Run { crawl, extract } => {
            let config = resolve_config(config_path, &crawl, Some(&extract))?;
            cmd_crawl(&config).await?;
            cmd_extract(&config, extract.no_model).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(config_path).await,
        },
    }
}

/// Load the config file and apply command-line overrides.
fn resolve_config(
    path: Option<&Path>,
    crawl: &CrawlArgs,
    extract: Option<&ExtractArgs>,
) -> Result<AppConfig> {
    let mut config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };

    if let Some(url) = &crawl.start_url {
        config.crawler.start_url = url.clone();
    }
    if let Some(dir) = &crawl.output_dir {
        config.crawler.output_dir = dir.clone();
        config.extraction.input_dir = dir.clone();
    }
    if let Some(headless) = crawl.headless {
        config.crawler.headless = headless;
    }
    if let Some(ms) = crawl.timeout {
        config.crawler.navigation_timeout_ms = ms;
    }
    if let Some(depth) = crawl.max_depth {
        config.crawler.max_depth = depth;
    }
    if let Some(strategy) = &crawl.strategy {
        config.discovery.strategy = strategy.clone();
    }
    if let Some(max) = crawl.max_iterations {
        config.discovery.max_iterations = max;
    }
    if crawl.max_components.is_some() {
        config.discovery.max_components = crawl.max_components;
    }

    if let Some(extract) = extract {
        if let Some(input) = &extract.input {
            config.extraction.input_dir = input.clone();
        }
        if let Some(out) = &extract.out {
            config.extraction.output_dir = out.clone();
        }
    }

    validate_config(&config)?;
    Ok(config)
}

/// Model-guided extraction when a key is available and the model answers;
/// otherwise the manual fallback.
async fn model_strategy(
    config: &AppConfig,
    no_model: bool,
) -> Result<ExtractionStrategy<OpenAiModel>> {
    if no_model || config.model.disabled {
        info!("model extraction disabled, using manual fallback");
        return Ok(ExtractionStrategy::ManualOnly);
    }
    match validate_api_key(config) {
        Ok(key) => {
            let model = OpenAiModel::new(&config.model, key)?;
            Ok(ExtractionStrategy::SchemaGuided(model).verified().await)
        }
        Err(e) => {
            warn!(error = %e, "no model API key, using manual fallback");
            Ok(ExtractionStrategy::ManualOnly)
        }
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_discover(config: AppConfig) -> Result<()> {
    let mut navigator = HttpNavigator::new(&config.crawler.user_agent)?;
    let timeout = config.crawler.navigation_timeout();
    bounded(
        "goto start page",
        timeout,
        navigator.goto(&config.crawler.start_url, timeout),
    )
    .await
    .map_err(|e| eyre!("cannot load {}: {e}", config.crawler.start_url))?;

    let strategy = DiscoveryStrategy::from_config(&config.discovery)?;
    info!(strategy = strategy.name(), url = %config.crawler.start_url, "discovering components");
    let outcome = strategy.discover(&mut navigator, &config.discovery).await?;

    println!();
    for component in &outcome.components {
        println!("  {:<32} {}", component.name, component.url);
    }
    println!();
    println!("  Components:  {}", outcome.components.len());
    println!("  Iterations:  {}", outcome.iterations);
    println!("  Termination: {:?}", outcome.termination);
    println!();
    Ok(())
}

async fn cmd_crawl(config: &AppConfig) -> Result<()> {
    let mut navigator = HttpNavigator::new(&config.crawler.user_agent)?;
    let reporter = CliProgress::new();
    let summary = run_crawl(config, &mut navigator, &reporter).await?;

    println!();
    println!("  Crawl complete!");
    println!("  Discovered:  {}", summary.components_discovered);
    println!("  Saved:       {}", summary.pages_saved);
    println!("  Termination: {:?} after {} iteration(s)", summary.termination, summary.iterations);
    for failure in &summary.failures {
        println!("  Failed:      {} ({})", failure.name, failure.reason);
    }
    println!("  Output:      {}", summary.output_directory);
    println!();
    Ok(())
}

async fn cmd_extract(config: &AppConfig, no_model: bool) -> Result<()> {
    let strategy = model_strategy(config, no_model).await?;
    let orchestrator = ExtractionOrchestrator::from_config(config, strategy);

    let input = PathBuf::from(&config.extraction.input_dir);
    if !input.is_dir() {
        return Err(eyre!("input directory '{}' does not exist", input.display()));
    }
    let output = PathBuf::from(&config.extraction.output_dir);

    let reporter = CliProgress::new();
    let summary = orchestrator
        .process_directory(&input, &output, &reporter)
        .await?;

    println!();
    println!("  Extraction complete!");
    println!("  Run:          {}", summary.run_id);
    println!(
        "  Components:   {}/{} extracted",
        summary.successful_extractions, summary.total_pages
    );
    println!(
        "  Graphs:       {} model-guided, {} manual fallback",
        summary.model_guided, summary.manual_fallbacks
    );
    println!(
        "  Merged graph: {} entities, {} relations",
        summary.merged_entities, summary.merged_relations
    );
    for failure in &summary.failures {
        println!("  Failed:       {} ({})", failure.name, failure.reason);
    }
    println!("  Output:       {}", summary.output_directory);
    println!();
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn page_captured(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Capturing [{current}/{total}] {name}"));
    }

    fn component_extracted(&self, name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Extracting [{current}/{total}] {name}"));
    }

    fn crawl_done(&self, _summary: &CrawlSummary) {
        self.spinner.finish_and_clear();
    }

    fn extraction_done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "docgraph",
            "run",
            "--start-url",
            "http://localhost:6006",
            "--max-components",
            "5",
            "--no-model",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Run { crawl, extract } => {
                assert_eq!(crawl.start_url.as_deref(), Some("http://localhost:6006"));
                assert_eq!(crawl.max_components, Some(5));
                assert!(extract.no_model);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn overrides_beat_file_values() {
        let dir = std::env::temp_dir().join(format!("dg-cli-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("docgraph.toml");
        std::fs::write(
            &path,
            "[crawler]\nstart_url = \"http://docs.example.com\"\noutput_dir = \"file/out\"\n",
        )
        .unwrap();

        let crawl = CrawlArgs {
            output_dir: Some("flag/out".into()),
            strategy: Some("selector".into()),
            ..CrawlArgs::default()
        };
        let config = resolve_config(Some(&path), &crawl, None).unwrap();
        assert_eq!(config.crawler.start_url, "http://docs.example.com");
        assert_eq!(config.crawler.output_dir, "flag/out");
        assert_eq!(config.extraction.input_dir, "flag/out");
        assert_eq!(config.discovery.strategy, "selector");

        let browser = CrawlArgs {
            headless: Some(false),
            max_depth: Some(5),
            ..CrawlArgs::default()
        };
        let config = resolve_config(Some(&path), &browser, None).unwrap();
        assert!(!config.crawler.headless);
        assert_eq!(config.crawler.max_depth, 5);

        let bad = CrawlArgs {
            strategy: Some("random".into()),
            ..CrawlArgs::default()
        };
        assert!(resolve_config(Some(&path), &bad, None).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn disabled_model_means_manual_only() {
        let config = AppConfig::default();
        assert!(matches!(
            model_strategy(&config, true).await.unwrap(),
            ExtractionStrategy::ManualOnly
        ));
    }
}
