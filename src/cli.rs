//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use driverstage::{Elevation, Overrides};

/// driverstage CLI
#[derive(Parser)]
#[command(name = "driverstage")]
#[command(about = "Match local hardware against a driver catalog and stage the newest drivers", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Configuration file (default: OS config dir)
    #[arg(long, global = true, env = "DRIVERSTAGE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the staging pipeline once
    Run {
        /// Treat the process as elevated without checking
        #[arg(long, conflicts_with = "no_elevation")]
        assume_elevated: bool,

        /// Treat the process as unprivileged without checking
        #[arg(long)]
        no_elevation: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration (password masked)
    Config {
        /// Write the effective configuration back to the config file
        #[arg(long)]
        save: bool,
    },

    /// Print configuration, log and audit locations
    Paths {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    pub fn elevation(&self) -> Elevation {
        match self {
            Commands::Run {
                assume_elevated: true,
                ..
            } => Elevation::Assume,
            Commands::Run {
                no_elevation: true, ..
            } => Elevation::Deny,
            _ => Elevation::Detect,
        }
    }
}

/// Settings that override the configuration file.
#[derive(Args, Debug, Default)]
pub struct OverrideArgs {
    /// Directory packages are staged into
    #[arg(long, global = true)]
    pub target_path: Option<PathBuf>,

    /// Catalog gateway base URL
    #[arg(long, global = true)]
    pub catalog_server: Option<String>,

    /// Catalog database name
    #[arg(long, global = true)]
    pub database: Option<String>,

    /// Distribution endpoint host (and optional path)
    #[arg(long, global = true)]
    pub distribution_endpoint: Option<String>,

    /// Device inventory exported by the platform enumerator
    #[arg(long, global = true)]
    pub inventory: Option<PathBuf>,

    /// Keep every matching driver version
    #[arg(long, global = true)]
    pub find_all: bool,

    /// Only stage drivers newer than the installed ones
    #[arg(long, global = true)]
    pub update_only_dated: bool,

    /// Include devices that are not currently attached
    #[arg(long, global = true)]
    pub include_absent: bool,

    /// Category tag to include (repeatable)
    #[arg(long = "category", global = true)]
    pub categories: Vec<String>,

    /// Match category tags as substrings
    #[arg(long, global = true)]
    pub wildcard: bool,

    /// Resolve content ids but do not download
    #[arg(long, global = true)]
    pub no_download: bool,

    /// Install downloaded drivers (needs elevation)
    #[arg(long, global = true)]
    pub install: bool,

    /// Let the installer restart the machine
    #[arg(long, global = true)]
    pub allow_restart: bool,

    /// Use plain HTTP for the distribution endpoint
    #[arg(long, global = true)]
    pub no_ssl: bool,

    /// Parallel content lookups and downloads
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

impl From<OverrideArgs> for Overrides {
    fn from(args: OverrideArgs) -> Self {
        Overrides {
            target_path: args.target_path,
            catalog_server: args.catalog_server,
            database: args.database,
            distribution_endpoint: args.distribution_endpoint,
            inventory: args.inventory,
            find_all: args.find_all,
            update_only_dated: args.update_only_dated,
            include_absent: args.include_absent,
            categories: args.categories,
            wildcard: args.wildcard,
            no_download: args.no_download,
            install: args.install,
            allow_restart: args.allow_restart,
            no_ssl: args.no_ssl,
            workers: args.workers,
            log_level: args.log_level,
        }
    }
}
