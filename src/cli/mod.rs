//! Command-line interface for taskpad
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in [`task`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::{Error, Result};
use crate::events::EventDestination;
use crate::output::OutputOptions;

mod task;

/// taskpad - local task tracking
///
/// Create, edit, complete, delete, filter, sort and search tasks stored on
/// this machine. The most recent change can be undone.
#[derive(Parser, Debug)]
#[command(name = "taskpad")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a config file (defaults to ./.taskpad.toml)
    #[arg(long, global = true, env = "TASKPAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory holding the task store
    #[arg(long, global = true, env = "TASKPAD_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Write store events as JSON lines to a file, or "-" for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Change a task's title or description
    Edit {
        /// Task id or unique prefix
        id: String,

        /// New title (blank keeps the current one)
        #[arg(long)]
        title: Option<String>,

        /// New description (blank clears it)
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Mark a task completed, or pending again
    Toggle {
        /// Task id or unique prefix
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task id or unique prefix
        id: String,
    },

    /// Undo the most recent change
    Undo,

    /// List tasks
    List {
        /// Status filter: all, pending, completed
        #[arg(long)]
        filter: Option<String>,

        /// Case-insensitive text to look for in title or description
        #[arg(short, long)]
        search: Option<String>,

        /// Sort key: created_at or status
        #[arg(long)]
        sort: Option<String>,

        /// Sort order: asc or desc
        #[arg(long)]
        order: Option<String>,
    },

    /// Show one task
    Show {
        /// Task id or unique prefix
        id: String,
    },

    /// Task counts and pending undo
    Stats,
}

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub events: Option<String>,
    pub output: OutputOptions,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let events_on_stdout =
            EventDestination::parse(self.events.as_deref()) == Some(EventDestination::Stdout);
        if self.json && events_on_stdout {
            return Err(Error::InvalidArgument(
                "--events - cannot be combined with --json; write events to a file instead"
                    .to_string(),
            ));
        }

        let global = GlobalOptions {
            config: self.config,
            data_dir: self.data_dir,
            events: self.events,
            output: OutputOptions {
                json: self.json,
                quiet: self.quiet,
            },
        };

        match self.command {
            Commands::Add { title, description } => {
                task::run_add(&global, task::AddOptions { title, description })
            }
            Commands::Edit {
                id,
                title,
                description,
            } => task::run_edit(
                &global,
                task::EditOptions {
                    id,
                    title,
                    description,
                },
            ),
            Commands::Toggle { id } => task::run_toggle(&global, &id),
            Commands::Rm { id } => task::run_rm(&global, &id),
            Commands::Undo => task::run_undo(&global),
            Commands::List {
                filter,
                search,
                sort,
                order,
            } => task::run_list(
                &global,
                task::ListOptions {
                    filter,
                    search,
                    sort,
                    order,
                },
            ),
            Commands::Show { id } => task::run_show(&global, &id),
            Commands::Stats => task::run_stats(&global),
        }
    }
}
