//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use modelhub::{Error, HubConfig};

use crate::formatter::OutputFormat;

/// Model directory used when neither a flag nor the config file names one.
pub const DEFAULT_MODEL_PATH: &str = "./models";

/// modelhub command-line tool
#[derive(Parser, Debug)]
#[command(name = "modelhub")]
#[command(version, about = "Inspect a directory of model definitions", long_about = None)]
pub struct Args {
    /// Directory scanned for model definitions [default: ./models].
    #[arg(short, long)]
    pub model_path: Option<PathBuf>,

    /// JSON configuration file. Command-line flags override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Connection URL.
    #[arg(long)]
    pub url: Option<String>,

    /// Type plugins to load, in order (repeatable or comma-separated).
    #[arg(short, long = "type", value_delimiter = ',')]
    pub types: Vec<String>,

    /// Log database operations.
    #[arg(long)]
    pub debug: bool,

    /// Output format.
    #[arg(long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// What to do with the loaded models.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List discovered models without loading them.
    List,
    /// Load one model and print its schema.
    Show {
        /// Model name.
        model: String,
    },
    /// Load every model and report failures and unresolved references.
    Check,
}

impl Args {
    /// Build the hub configuration.
    pub fn into_config(self) -> Result<(HubConfig, Command, OutputFormat), Error> {
        let mut config = match &self.config {
            Some(path) => HubConfig::from_file(path)?,
            None => HubConfig::default(),
        };

        if let Some(url) = self.url {
            config.url = url;
        }
        if !self.types.is_empty() {
            config = config.with_types(self.types);
        }
        if self.debug {
            config = config.with_debug(true);
        }
        match self.model_path {
            Some(path) => config = config.with_model_path(path),
            None if !config.has_model_path() => {
                config = config.with_model_path(DEFAULT_MODEL_PATH)
            }
            None => {}
        }

        Ok((config, self.command, self.format))
    }
}
