//! Command-line arguments for the quiz-supply binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use quiz_agent::backend::openai::{DEFAULT_MODEL, OPENAI_BASE_URL};
use quiz_bank::Category;

use crate::config::SupplyConfig;
use crate::types::{Result, SupplyError};

#[derive(Parser, Debug, Clone)]
#[command(name = "quiz-supply")]
#[command(about = "Generate, validate, and serve exam questions")]
pub struct Args {
    /// YAML configuration file
    #[arg(long, env = "QUIZ_CONFIG")]
    pub config: Option<PathBuf>,

    /// Item store path, overriding the configuration file
    #[arg(long, env = "QUIZ_STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = OPENAI_BASE_URL)]
    pub base_url: String,

    /// Model used for generation
    #[arg(long, env = "QUIZ_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// API key for the generator
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Log level for quiz crates
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch one item quickly, falling back to the store on timeout
    Initial {
        category: Category,
        /// Wait for the background backfill and print what it produced
        #[arg(long)]
        wait: bool,
    },
    /// Generate a batch of new items
    Batch {
        category: Category,
        /// Items to generate; defaults to acquisition.default_batch_size
        #[arg(long)]
        count: Option<usize>,
    },
    /// Print a random stored item
    Random { category: Category },
    /// Print stored item counts per category
    Stats,
}

impl Command {
    /// Whether the command calls the generator.
    pub fn needs_generator(&self) -> bool {
        matches!(self, Command::Initial { .. } | Command::Batch { .. })
    }
}

impl Args {
    /// Resolve the effective configuration.
    pub fn load_config(&self) -> Result<SupplyConfig> {
        let mut config = match &self.config {
            Some(path) => SupplyConfig::load(path)?,
            None => SupplyConfig::default(),
        };
        if let Some(path) = &self.store_path {
            config.store.path = path.display().to_string();
        }
        config.validate()?;
        Ok(config)
    }

    /// API key for the generator. Required against the public OpenAI
    /// endpoint; optional for self-hosted compatible servers.
    pub fn api_key(&self) -> Result<Option<String>> {
        let key = self
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty());
        if key.is_none()
            && self.command.needs_generator()
            && self.base_url.trim_end_matches('/') == OPENAI_BASE_URL
        {
            return Err(SupplyError::Config("OPENAI_API_KEY is not set".to_string()));
        }
        Ok(key)
    }
}
