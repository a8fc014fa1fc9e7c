use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::configuration::{positive, Configuration, ConfigurationError};

use super::ConfigurationDirectoryType;

/// EVE Online Market Synchronization
///
/// Keep a local copy of the live market orders and daily trade history of a region.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to cache directory, which stores the fetch cache. The directory will be created if it
    /// doesn't exist.
    #[arg(global = true, long)]
    pub cache_directory: Option<PathBuf>,
    /// Path to data directory, which stores the market database. The directory will be created if
    /// it doesn't exist.
    #[arg(global = true, long)]
    pub data_directory: Option<PathBuf>,
    /// Path to configuration file.
    #[arg(global = true, long)]
    pub config: Option<PathBuf>,
    /// Region to synchronize (default: The Forge)
    #[arg(global = true, long)]
    pub region: Option<i32>,
    /// Number of items synchronized at the same time
    #[arg(global = true, long)]
    pub concurrency: Option<usize>,
    /// Disable all output formating options.
    #[arg(global = true, long)]
    pub no_color: bool,
    /// Force enabling formating options, useful in context where it wouldn't be supported (such as
    /// piping to another command).
    #[arg(global = true, long)]
    pub force_color: bool,
    /// Disable all logging and most normal output.
    #[arg(global = true, short, long)]
    pub quiet: bool,
    /// Set verbosity level ('v', 'vv' or 'vvv')
    #[arg(global = true, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Clone)]
pub enum Commands {
    /// Synchronize live market orders of the selected items
    Orders(SyncOptions),
    /// Synchronize daily trade history of the selected items and display their sales volumes
    History(SyncOptions),
    /// Display average daily sales volumes over 30 and 60 days from stored history
    Volumes(VolumesOptions),
}

impl Commands {
    pub fn json(&self) -> bool {
        match self {
            Commands::Orders(opts) | Commands::History(opts) => opts.items.json,
            Commands::Volumes(opts) => opts.items.json,
        }
    }

    fn items_file(&self) -> Option<PathBuf> {
        match self {
            Commands::Orders(opts) | Commands::History(opts) => opts.items.items_file.clone(),
            Commands::Volumes(opts) => opts.items.items_file.clone(),
        }
    }
}

#[derive(clap::Args, Debug, PartialEq, Clone)]
pub struct ItemSelection {
    /// Item (type) id to work on. Can be repeated.
    #[arg(long = "item")]
    pub items: Vec<i32>,
    /// File listing item ids, one '<type_id>, <name>' per line.
    #[arg(long)]
    pub items_file: Option<PathBuf>,
    /// Generate command result and details as JSON output on stdout.
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug, PartialEq, Clone)]
pub struct SyncOptions {
    #[command(flatten)]
    pub items: ItemSelection,
}

#[derive(clap::Args, Debug, PartialEq, Clone)]
pub struct VolumesOptions {
    #[command(flatten)]
    pub items: ItemSelection,
    /// Reference date of the averages (YYYY-MM-DD, default: today)
    #[arg(long)]
    pub as_of: Option<NaiveDate>,
}

pub fn get_directory(args: &Args, dir_type: &ConfigurationDirectoryType) -> Option<PathBuf> {
    match dir_type {
        ConfigurationDirectoryType::Data => args.data_directory.clone(),
        ConfigurationDirectoryType::Cache => args.cache_directory.clone(),
        ConfigurationDirectoryType::Configuration => args
            .config
            .as_ref()
            .and_then(|cfg| cfg.parent().map(|p| p.to_path_buf())),
    }
}

pub struct CLIConfiguration<T: Configuration> {
    args: Args,
    default: T,
}

impl<T: Configuration> CLIConfiguration<T> {
    pub fn new(args: &Args, default: T) -> Self {
        CLIConfiguration {
            args: args.clone(),
            default,
        }
    }
}

impl<T: Configuration> Configuration for CLIConfiguration<T> {
    fn no_color(&self) -> Result<Option<bool>, ConfigurationError> {
        if self.args.no_color {
            return Ok(Some(true));
        }
        self.default.no_color()
    }

    fn base_api_url(&self) -> Result<String, ConfigurationError> {
        self.default.base_api_url()
    }

    fn request_timeout(&self) -> Result<Duration, ConfigurationError> {
        self.default.request_timeout()
    }

    fn region_id(&self) -> Result<i32, ConfigurationError> {
        if let Some(region) = self.args.region {
            return Ok(region);
        }
        self.default.region_id()
    }

    fn items_file(&self) -> Result<Option<PathBuf>, ConfigurationError> {
        if let Some(items_file) = self.args.command.items_file() {
            return Ok(Some(items_file));
        }
        self.default.items_file()
    }

    fn cooldown(&self) -> Result<Duration, ConfigurationError> {
        self.default.cooldown()
    }

    fn concurrency(&self) -> Result<usize, ConfigurationError> {
        if let Some(concurrency) = self.args.concurrency {
            return positive(concurrency, "--concurrency");
        }
        self.default.concurrency()
    }

    fn persistence_timeout(&self) -> Result<Duration, ConfigurationError> {
        self.default.persistence_timeout()
    }
}
