//! CLI definitions and entry point.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Local mirror and editor for GitHub issue trackers
#[derive(Parser, Debug)]
#[command(name = "ghist", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default ~/.ghist.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Project to operate on, as owner/repo
    #[arg(short, long, global = true)]
    pub project: Option<String>,

    /// File holding a personal access token
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database
    Init,

    /// Start tracking a project
    Add {
        /// Project as owner/repo
        #[arg(value_name = "OWNER/REPO")]
        name: String,
    },

    /// Pull new issues, comments, and events
    Sync {
        /// Projects to sync (default: all tracked)
        projects: Vec<String>,
    },

    /// Sync, then re-download every issue's full event timeline
    Resync {
        /// Projects to resync (default: all tracked)
        projects: Vec<String>,
    },

    /// Rebuild derived history from the raw event log
    Refill {
        /// Projects to refill (default: all tracked)
        projects: Vec<String>,
    },

    /// Show tracked projects and their sync checkpoints
    Status,

    /// Display one issue with its full transcript
    Show {
        /// Issue number
        number: i64,
    },

    /// List open issues matching a search query
    List {
        /// Search terms
        query: Vec<String>,
    },

    /// Edit one issue in $EDITOR
    Edit {
        /// Issue number
        number: i64,
    },

    /// Create a new issue in $EDITOR
    New,

    /// Edit all issues matching a search query at once
    Bulk {
        /// Search terms
        query: Vec<String>,
    },

    /// List open milestones
    Milestones,

    /// Summarize activity from the derived history
    Report,
}
