//! Command-line arguments.
//!
//! Options can come from the command line or, for the global ones, from
//! environment variables:
//!
//! - `--config` / `RESFILE_CONFIG`: JSON file with manager settings
//! - `--no-caseless` / `RESFILE_NO_CASELESS`: disable the case-insensitive
//!   open fallback

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use resfile_format::ResourceId;
use resfile_storage::ResConfig;
use std::path::PathBuf;

/// Inspect and edit resource container files
#[derive(Debug, Clone, Parser)]
#[command(name = "resfile", about = "Inspect and edit LG resource container files", version)]
pub struct Cli {
    /// JSON configuration file for the resource manager
    #[arg(long, global = true, env = "RESFILE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Do not retry failed opens with a case-insensitive path lookup
    #[arg(long, global = true, env = "RESFILE_NO_CASELESS")]
    pub no_caseless: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List the directory entries of a file
    List {
        /// Container file
        file: PathBuf,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show header and directory summary
    Info {
        /// Container file
        file: PathBuf,
    },

    /// Write the bytes of one resource to a file or stdout
    Extract {
        /// Container file
        file: PathBuf,

        /// Resource id
        id: ResourceId,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print a hex dump instead of raw bytes
        #[arg(long, conflicts_with = "output")]
        hex: bool,
    },

    /// Append a resource, creating the file if needed
    Add {
        /// Container file
        file: PathBuf,

        /// Resource id (1-65535)
        #[arg(value_parser = clap::value_parser!(u16).range(1..))]
        id: ResourceId,

        /// File holding the resource bytes
        input: PathBuf,

        /// Resource type number
        #[arg(long = "type", default_value_t = 0)]
        rtype: u8,

        /// Load the resource whenever the file is opened
        #[arg(long)]
        load_on_open: bool,
    },

    /// Mark a resource deleted
    Remove {
        /// Container file
        file: PathBuf,

        /// Resource id
        id: ResourceId,
    },

    /// Print or replace the header comment
    Comment {
        /// Container file
        file: PathBuf,

        /// New comment (printed when omitted)
        text: Option<String>,
    },
}

impl Cli {
    /// Manager configuration from `--config` and `--no-caseless`
    ///
    /// # Errors
    ///
    /// Returns error if the configuration file cannot be loaded
    pub fn resolve_config(&self) -> Result<ResConfig> {
        let config = match &self.config {
            Some(path) => ResConfig::from_json_file(path)
                .with_context(|| format!("loading configuration {}", path.display()))?,
            None => ResConfig::default(),
        };
        Ok(if self.no_caseless {
            config.with_caseless_fallback(false)
        } else {
            config
        })
    }
}
