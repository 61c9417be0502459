use anyhow::{Context, Result};
use arxiv_courier::config::{find_config_file, load_config, Credentials};
use arxiv_courier::sources::{ArxivFeed, FeedSource};
use arxiv_courier::utils::HttpClient;
use arxiv_courier::{run, Outcome};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// arXiv Courier - Announce new arXiv papers on Bluesky
#[derive(Parser, Debug)]
#[command(name = "arxiv-courier")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Summarize new arXiv papers and post them to Bluesky", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log line format
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Show all environment variables
    #[arg(long, global = true)]
    env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Fetch, summarize and publish new announcements (default)
    Run,

    /// Print the new announcements as JSON without summarizing or posting
    Fetch,
}

/// Print all available environment variables
fn print_env_vars() {
    println!("arXiv Courier - Environment Variables");
    println!();
    println!("Credentials (required by `run`):");
    println!("  BSKYBOT                     Bluesky handle of the posting account");
    println!("  BSKYPWD                     Bluesky app password");
    println!("  GEMINI_KEY                  Gemini API key");
    println!();
    println!("Settings (override the config file):");
    println!("  ARXIV_COURIER_FEED__CATEGORIES           Comma-separated categories (default: cs.SD,eess.AS)");
    println!("  ARXIV_COURIER_FEED__BASE_URL             Feed root (default: https://export.arxiv.org/rss)");
    println!("  ARXIV_COURIER_SUMMARIZER__MODEL          Model name (default: gemini-1.5-flash)");
    println!("  ARXIV_COURIER_SUMMARIZER__CHAR_BUDGET    Summary length budget (default: 300)");
    println!("  ARXIV_COURIER_PUBLISHER__SERVICE_URL     PDS URL (default: https://bsky.social)");
    println!("  ARXIV_COURIER_PUBLISHER__WINDOW_SECS     Posting window in seconds (default: 18000)");
    println!("  ARXIV_COURIER_HTTP__TIMEOUT_SECS         Request timeout (default: 30)");
    println!();
    println!("Other Settings:");
    println!("  RUST_LOG                    Rust logging level (e.g., debug, info, warn, error)");
    println!();
    println!("Example:");
    println!("  export BSKYBOT=\"mybot.bsky.social\"");
    println!("  export ARXIV_COURIER_FEED__CATEGORIES=\"cs.CL,cs.LG\"");
}

fn init_tracing(cli: &Cli) {
    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("arxiv_courier={}", env_filter)),
    );

    let registry = tracing_subscriber::registry().with(filter);
    match cli.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.env {
        print_env_vars();
        return Ok(());
    }

    init_tracing(&cli);

    let config_path = cli.config.clone().or_else(find_config_file);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }
    let config = load_config(config_path.as_deref()).context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            let credentials = Credentials::from_env().context("Missing credentials")?;
            match run(&config, credentials).await? {
                Outcome::NothingToDo => {}
                Outcome::Published(report) => {
                    if !report.is_complete() {
                        tracing::warn!(
                            "{} of {} posts were skipped",
                            report.skipped.len(),
                            report.skipped.len() + report.posted.len()
                        );
                    }
                }
            }
        }
        Commands::Fetch => {
            let http = Arc::new(HttpClient::from_config(&config.http)?);
            let feed = ArxivFeed::new(&config.feed, http);
            let entries = feed.fetch_new().await?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }

    Ok(())
}
