//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use doccrawl_core::{RunSummary, SourceStatus};
use doccrawl_shared::{
    AppConfig, ProgressReporter, SourceEntry, SourceKind, init_config, load_config,
    load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// doccrawl: combine GitHub and sitemap documentation into single Markdown files.
#[derive(Parser)]
#[command(
    name = "doccrawl",
    version,
    about = "Crawl documentation from GitHub repositories and sitemaps into combined Markdown files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.doccrawl/doccrawl.toml).
    #[arg(long, global = true, env = "DOCCRAWL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl every configured knowledge file.
    Run {
        /// GitHub knowledge file(s); replaces the configured sources.
        #[arg(long, value_name = "FILE")]
        github: Vec<PathBuf>,

        /// Sitemap knowledge file(s); replaces the configured sources.
        #[arg(long, value_name = "FILE")]
        sitemap: Vec<PathBuf>,

        /// Directory under which `<group>/docs.md` files are written.
        #[arg(long)]
        output_root: Option<PathBuf>,
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
        0 => "doccrawl=info",
        1 => "doccrawl=debug",
        _ => "doccrawl=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
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
        Command::Run {
            github,
            sitemap,
            output_root,
        } => cmd_run(config_path, github, sitemap, output_root).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path),
        },
    }
}

fn resolve_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Command-line sources replace the configured list when any are given.
fn apply_overrides(
    config: &mut AppConfig,
    github: Vec<PathBuf>,
    sitemap: Vec<PathBuf>,
    output_root: Option<PathBuf>,
) {
    if !github.is_empty() || !sitemap.is_empty() {
        config.sources = github
            .into_iter()
            .map(|knowledge_file| SourceEntry {
                knowledge_file,
                kind: SourceKind::Github,
            })
            .chain(sitemap.into_iter().map(|knowledge_file| SourceEntry {
                knowledge_file,
                kind: SourceKind::Sitemap,
            }))
            .collect();
    }
    if let Some(root) = output_root {
        config.output_root = root;
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(
    config_path: Option<&Path>,
    github: Vec<PathBuf>,
    sitemap: Vec<PathBuf>,
    output_root: Option<PathBuf>,
) -> Result<()> {
    let mut config = resolve_config(config_path)?;
    apply_overrides(&mut config, github, sitemap, output_root);

    let token = config.github.token();
    info!(
        sources = config.sources.len(),
        authenticated = token.is_some(),
        "starting documentation crawl"
    );

    let progress = CliProgress::new();
    let summary = doccrawl_core::run(&config, token.as_deref(), &progress).await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("  Documentation crawl finished");
    println!();
    println!(
        "  {:<16} {:<8} {:>6} {:>7} {:>7} {:>7}  {}",
        "GROUP", "KIND", "ROOTS", "FOUND", "WRITTEN", "FAILED", "STATUS"
    );
    for source in &summary.sources {
        let status = match &source.status {
            SourceStatus::Completed => match &source.output {
                Some(path) => format!("ok -> {}", path.display()),
                None => "ok".to_string(),
            },
            SourceStatus::Skipped(reason) => format!("skipped: {reason}"),
            SourceStatus::Failed(reason) => format!("failed: {reason}"),
        };
        println!(
            "  {:<16} {:<8} {:>6} {:>7} {:>7} {:>7}  {}",
            source.group,
            source.kind.to_string(),
            source.roots,
            source.found,
            source.written,
            source.failed,
            status
        );
    }
    println!();
    println!("  Documents: {}", summary.documents_written());
    println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());
    println!();
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
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .expect("valid progress template")
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn fetching(&self, url: &str, current: usize, total: usize) {
        let message = if total > 0 {
            format!("Fetching [{current}/{total}] {url}")
        } else {
            format!("Fetching [{current}] {url}")
        };
        self.spinner.set_message(message);
    }

    fn document_written(&self, source: &str) {
        self.spinner.set_message(format!("Wrote {source}"));
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_run_overrides() {
        let cli = Cli::try_parse_from([
            "doccrawl",
            "-v",
            "run",
            "--github",
            "editorjs/.knowledge",
            "--sitemap",
            "flutter/.knowledge",
            "--output-root",
            "out",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);

        let Command::Run {
            github,
            sitemap,
            output_root,
        } = cli.command
        else {
            panic!("expected run command");
        };

        let mut config = AppConfig::default();
        apply_overrides(&mut config, github, sitemap, output_root);
        assert_eq!(config.output_root, PathBuf::from("out"));
        assert_eq!(
            config.sources,
            vec![
                SourceEntry {
                    knowledge_file: PathBuf::from("editorjs/.knowledge"),
                    kind: SourceKind::Github,
                },
                SourceEntry {
                    knowledge_file: PathBuf::from("flutter/.knowledge"),
                    kind: SourceKind::Sitemap,
                },
            ]
        );
    }

    #[test]
    fn no_overrides_keep_configured_sources() {
        let mut config = AppConfig::default();
        let before = config.sources.clone();
        apply_overrides(&mut config, vec![], vec![], None);
        assert_eq!(config.sources, before);
        assert_eq!(config.output_root, PathBuf::from("."));
    }

    #[test]
    fn cli_parses_config_show_with_path() {
        let cli = Cli::try_parse_from(["doccrawl", "config", "show", "--config", "x.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(
            cli.command,
            Command::Config {
                action: ConfigAction::Show
            }
        ));
    }
}
