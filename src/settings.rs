use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::crawler::ScrapeOptions;

const CONFIG_FILE: &str = "seedscrape";
const ENV_PREFIX: &str = "SEEDSCRAPE";

/// Runtime settings: defaults, then `seedscrape.toml`, then `SEEDSCRAPE_*` env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 0 means no cap.
    pub max_concurrency: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub progress: bool,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn scrape_options(&self) -> ScrapeOptions {
        ScrapeOptions {
            max_concurrency: (self.max_concurrency > 0).then_some(self.max_concurrency),
            progress: self.progress,
        }
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("max_concurrency", 0_i64)?
        .set_default("timeout_secs", 30_i64)?
        .set_default("user_agent", concat!("seedscrape/", env!("CARGO_PKG_VERSION")))?
        .set_default("progress", false)
}
