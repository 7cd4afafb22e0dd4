//! tb - taskboard CLI
//!
//! Direct shell access to the task store: add, list, start, done, reorder.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Context, Result};
use taskboard::{TaskStatus, TaskStore};

#[derive(Parser)]
#[command(name = "tb", about = "Personal task store", version)]
struct Cli {
    /// Path to the task database (default: ~/.taskpilot/tasks.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a new task
    Add {
        /// Task title
        title: String,
        /// Longer description
        #[arg(short, long, default_value = "")]
        description: String,
        /// Project tag
        #[arg(short, long)]
        project: Option<String>,
        /// Category tags (repeatable)
        #[arg(short, long)]
        category: Vec<String>,
    },
    /// List tasks, optionally filtered by status
    List {
        /// Filter: open, in_progress, or done
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Mark a task in_progress
    Start { id: i64 },
    /// Mark a task done
    Done { id: i64 },
    /// Reorder tasks by id sequence
    Reorder { ids: Vec<i64> },
}

fn default_db_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| eyre::eyre!("Could not determine home directory"))?;
    let dir = home.join(".taskpilot");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("tasks.db"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path()?,
    };
    let store = TaskStore::open(&db_path).context("Failed to open task store")?;

    match cli.command {
        Command::Add {
            title,
            description,
            project,
            category,
        } => {
            let task = store.create(&title, &description, project.as_deref(), &category)?;
            println!("{} {}", "Created".green(), task.summary());
        }
        Command::List { status } => {
            let filter = status.map(|s| TaskStatus::parse(&s)).transpose()?;
            let tasks = store.list(filter)?;
            if tasks.is_empty() {
                println!("No tasks found");
            }
            for task in tasks {
                let line = task.summary();
                match task.status {
                    TaskStatus::Done => println!("{}", line.dimmed()),
                    TaskStatus::InProgress => println!("{}", line.yellow()),
                    TaskStatus::Open => println!("{}", line),
                }
            }
        }
        Command::Start { id } => {
            let task = store.update_status(id, TaskStatus::InProgress)?;
            println!("{} {}", "Started".yellow(), task.summary());
        }
        Command::Done { id } => {
            let task = store.update_status(id, TaskStatus::Done)?;
            println!("{} {}", "Completed".green(), task.summary());
        }
        Command::Reorder { ids } => {
            store.reorder(&ids)?;
            println!("{} {} tasks", "Reordered".green(), ids.len());
        }
    }

    Ok(())
}
