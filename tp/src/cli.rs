//! Command-line interface definitions for tp

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// taskpilot - LLM agent for personal task management
#[derive(Parser)]
#[command(name = "tp", about = "LLM agent for personal task management", version)]
pub struct Cli {
    /// Path to a config file (default: .taskpilot.yml, then ~/.config/taskpilot/taskpilot.yml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a single turn with the given message
    Turn {
        /// The user message
        message: String,

        /// Session id to record the turn under
        #[arg(short, long, default_value = "default")]
        session: String,
    },

    /// Interactive chat: one turn per input line
    Chat {
        /// Session id to record turns under
        #[arg(short, long, default_value = "default")]
        session: String,
    },

    /// Inspect logged steps
    Steps {
        #[command(subcommand)]
        command: StepsCommand,
    },
}

#[derive(Subcommand)]
pub enum StepsCommand {
    /// List turns for a session
    Turns {
        /// Session id
        #[arg(short, long, default_value = "default")]
        session: String,
    },

    /// Show a turn's steps in order
    Show {
        /// Turn id
        turn_id: String,
    },
}
