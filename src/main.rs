mod crawler;
mod fetch;
mod html;
mod identify;
mod settings;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::fetch::HttpFetcher;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "seedscrape", about = "Pull links or text out of a set of seed pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every seed concurrently and print extracted values per seed as JSON
    Scrape {
        /// Tag to extract: a (links), li, h1, h2, h3, p, td
        target: String,
        /// Seed page URLs
        #[arg(required = true)]
        urls: Vec<String>,
        /// Max pages fetched at once (0 = no limit)
        #[arg(short, long)]
        concurrency: Option<usize>,
        /// Show a progress bar on stderr
        #[arg(long)]
        progress: bool,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Print the tag name of the first element with the given id
    FindId {
        url: String,
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load settings")?;
    info!(settings = ?settings, "settings loaded");

    let fetcher = HttpFetcher::new(&settings).context("Failed to build HTTP client")?;

    let result = match cli.command {
        Commands::Scrape {
            target,
            urls,
            concurrency,
            progress,
            pretty,
        } => {
            let mut opts = settings.scrape_options();
            if let Some(n) = concurrency {
                opts.max_concurrency = Some(n);
            }
            opts.progress |= progress;

            let found = crawler::scrape(Arc::new(fetcher), &target, &urls, &opts).await?;
            let sorted: BTreeMap<_, _> = found.into_iter().collect();
            let json = if pretty {
                serde_json::to_string_pretty(&sorted)?
            } else {
                serde_json::to_string(&sorted)?
            };
            println!("{}", json);
            Ok(())
        }
        Commands::FindId { url, id } => {
            let tag = identify::find_by_identifier(&fetcher, &url, &id).await;
            println!("{}", tag);
            Ok(())
        }
    };

    info!("Done in {:.1}s", t0.elapsed().as_secs_f64());
    result
}
