mod help_text;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Scaffolds and safely maintains AI-assistant project files
#[derive(Parser, Debug)]
#[command(name = "aipim", version, about, long_about = help_text::ROOT_LONG_ABOUT)]
pub struct Cli {
    /// Run as if started in DIRECTORY
    #[arg(short = 'C', value_name = "DIRECTORY", global = true)]
    pub directory: Option<PathBuf>,

    /// Increase log verbosity (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Read templates from DIR instead of the built-in ones
    #[arg(long, value_name = "DIR", global = true)]
    pub templates_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Set up .project and generate the AI prompt files
    #[command(long_about = help_text::INSTALL_LONG_ABOUT)]
    Install {
        /// AI tools to generate prompt files for (e.g. claude-code, gemini, chatgpt)
        #[arg(long = "ai", value_name = "TOOL", value_delimiter = ',')]
        ais: Vec<String>,

        /// Guideline documents to merge into the prompt (nextjs, astro, node, vue)
        #[arg(long, value_name = "ID", value_delimiter = ',')]
        guidelines: Vec<String>,

        /// Show what would be done without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Regenerate prompt files that have not been edited by hand
    #[command(long_about = help_text::UPDATE_LONG_ABOUT)]
    Update {
        /// Show what would be done without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show whether each managed file is pristine, modified, legacy or missing
    #[command(long_about = help_text::STATUS_LONG_ABOUT)]
    Status {},

    /// Check the project setup, exit with success if nothing is missing
    Validate {},

    /// Create and track tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Print a prompt to open a new assistant session
    #[command(long_about = help_text::START_LONG_ABOUT)]
    Start {
        /// Include more commits and decisions
        #[arg(long)]
        full: bool,

        /// Write the prompt to FILE instead of stdout
        #[arg(long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Show task dependencies, blocked tasks and cycles
    #[command(long_about = help_text::DEPS_LONG_ABOUT)]
    Deps {},

    /// Record an interruption so the session can be resumed later
    #[command(long_about = help_text::PAUSE_LONG_ABOUT)]
    Pause {
        /// Why the session is interrupted
        #[arg(short, long)]
        reason: String,

        /// Stash uncommitted changes
        #[arg(long)]
        stash: bool,
    },

    /// Summarize where the last session stopped
    Resume {
        /// Show a pending interruption snapshot without restoring it
        #[arg(long)]
        keep_snapshot: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create the next numbered task file in the backlog
    Init {
        /// Kind of task, e.g. feat, fix, chore
        #[arg(value_name = "TYPE")]
        task_type: String,

        /// Task name
        #[arg(value_name = "NAME")]
        name: String,
    },

    /// Print a prompt for the next backlog task
    Next {},

    /// Show checkbox progress of the current task
    Progress {},
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}
