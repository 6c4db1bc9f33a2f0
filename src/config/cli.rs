//! Command-line interface definition

use clap::{Parser, Subcommand};

/// Keep large files in versioned object storage
#[derive(Debug, Parser)]
#[command(name = "trove", version, about)]
pub struct Cli {
    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Initialize a project
    Init,

    /// Push a file
    Push {
        filename: String,
    },

    /// Pull one file, or every file in the manifest
    Pull {
        filename: Option<String>,

        /// Version to fetch instead of the recorded one
        #[arg(long)]
        version: Option<String>,
    },

    /// Delete a file from storage
    Delete {
        filename: String,
    },

    /// List files in storage
    List,

    /// List stored versions of a file
    Versions {
        filename: String,
    },

    /// Show the current version
    Version,
}
