//! tp - taskpilot CLI
//!
//! Entry point for running agent turns against the task store.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::debug;

use taskboard::TaskStore;

use taskpilot::cli::{Cli, Command, StepsCommand};
use taskpilot::config::{default_data_path, Config};
use taskpilot::llm::create_client;
use taskpilot::prompts::PromptLoader;
use taskpilot::steps::{StepLogger, TurnStatus};
use taskpilot::tools::ToolExecutor;
use taskpilot::trace::create_sink;
use taskpilot::turn::{TurnOrchestrator, TurnRequest};
use taskpilot::ChatMessage;

fn setup_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn build_orchestrator(config: &Config) -> Result<(TurnOrchestrator, Arc<StepLogger>)> {
    debug!("build_orchestrator: called");
    let llm = create_client(&config.llm).context("Failed to create LLM client")?;

    let steps_path = match &config.steps.db_path {
        Some(path) => path.clone(),
        None => default_data_path("steps.db")?,
    };
    let steps = Arc::new(StepLogger::open(&steps_path).context("Failed to open step log")?);

    let store_path = match &config.store.db_path {
        Some(path) => path.clone(),
        None => default_data_path("tasks.db")?,
    };
    let store = Arc::new(TaskStore::open(&store_path).context("Failed to open task store")?);

    let orchestrator = TurnOrchestrator::new(
        llm,
        ToolExecutor::standard().with_timeout(config.turn.tool_timeout_ms),
        Arc::new(PromptLoader::new()),
        steps.clone(),
        create_sink(&config.trace),
        store,
        &config.turn,
        config.llm.temperature,
        config.llm.max_tokens,
        config.steps.on_failure,
    );
    Ok((orchestrator, steps))
}

async fn run_turn_command(config: &Config, session: &str, message: &str) -> Result<()> {
    let (orchestrator, steps) = build_orchestrator(config)?;

    // Rebuild conversation context from this session's prior turns
    let conversation = session_conversation(&steps, session)?;
    let request = TurnRequest::new(session, message).with_conversation(conversation);
    let result = orchestrator.run_turn(request).await?;

    println!("{}", result.final_text);
    Ok(())
}

async fn run_chat(config: &Config, session: &str) -> Result<()> {
    let (orchestrator, steps) = build_orchestrator(config)?;
    let mut conversation = session_conversation(&steps, session)?;

    println!("{}", "taskpilot chat - empty line to exit".dimmed());
    let stdin = io::stdin();
    loop {
        print!("{} ", ">".cyan());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            break;
        }

        let request = TurnRequest::new(session, message).with_conversation(conversation.clone());
        match orchestrator.run_turn(request).await {
            Ok(result) => {
                println!("{}", result.final_text);
                conversation.push(ChatMessage::user(message));
                conversation.push(ChatMessage::assistant(&result.final_text));
            }
            Err(e) => {
                eprintln!("{} {}", "Turn failed:".red(), e);
            }
        }
    }
    Ok(())
}

/// Rebuild a chat context from the session's completed turns
fn session_conversation(steps: &StepLogger, session: &str) -> Result<Vec<ChatMessage>> {
    let mut conversation = Vec::new();
    for turn in steps.list_turns(session)? {
        if turn.status != TurnStatus::Completed {
            continue;
        }
        conversation.push(ChatMessage::user(&turn.user_text));
        if let Some(final_text) = &turn.final_text {
            conversation.push(ChatMessage::assistant(final_text));
        }
    }
    Ok(conversation)
}

fn open_step_log(config: &Config) -> Result<StepLogger> {
    let steps_path = match &config.steps.db_path {
        Some(path) => path.clone(),
        None => default_data_path("steps.db")?,
    };
    StepLogger::open(&steps_path).context("Failed to open step log")
}

fn show_turns(config: &Config, session: &str) -> Result<()> {
    let steps = open_step_log(config)?;
    let turns = steps.list_turns(session)?;
    if turns.is_empty() {
        println!("No turns recorded for session '{}'", session);
        return Ok(());
    }
    for turn in turns {
        let status = match turn.status {
            TurnStatus::Completed => turn.status.as_str().green(),
            TurnStatus::Failed => turn.status.as_str().red(),
            TurnStatus::InProgress => turn.status.as_str().yellow(),
        };
        println!("{} [{}] {}", turn.turn_id.dimmed(), status, turn.user_text);
    }
    Ok(())
}

fn show_steps(config: &Config, turn_id: &str) -> Result<()> {
    let steps = open_step_log(config)?;
    let turn = steps.get_turn(turn_id)?;
    println!("{} {} ({})", "Turn".bold(), turn.turn_id, turn.status.as_str());
    println!("{} {}", "User:".bold(), turn.user_text);
    if let Some(final_text) = &turn.final_text {
        println!("{} {}", "Reply:".bold(), final_text);
    }

    for step in steps.list_steps(turn_id)? {
        println!();
        println!(
            "{} {} {}",
            format!("#{}", step.step_number).cyan(),
            step.step_type.as_str().bold(),
            step.created_at.to_rfc3339().dimmed()
        );
        if let Some(model) = &step.llm_model {
            println!("  model: {}", model);
        }
        if let Some(output) = &step.output_data {
            println!("  output: {}", output);
        }
        if let Some(error) = &step.error {
            println!("  {} {}", "error:".red(), error);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref());

    let config = Config::load(cli.config.as_ref())?;

    match cli.command {
        Command::Turn { message, session } => run_turn_command(&config, &session, &message).await,
        Command::Chat { session } => run_chat(&config, &session).await,
        Command::Steps { command } => match command {
            StepsCommand::Turns { session } => show_turns(&config, &session),
            StepsCommand::Show { turn_id } => show_steps(&config, &turn_id),
        },
    }
}
