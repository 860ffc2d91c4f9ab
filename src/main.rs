//! Webpilot - Browser Instruction Execution Engine
//!
//! Main entry point for the CLI application.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;

use webpilot::llm::{LLMProvider, OllamaClient, TaskPlanner, ToolCallingReasoner};
use webpilot::{AgentBrowserPage, Config, InstructionValidator, SessionRunner};

/// Webpilot - validate and execute browser instructions
#[derive(Parser, Debug)]
#[command(name = "webpilot")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Run in headed browser mode (visible window)
    #[arg(long, global = true)]
    headed: bool,

    /// Enable debug output
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Reasoner model served by Ollama
    #[arg(long, short = 'm', global = true)]
    model: Option<String>,

    /// Instruction schema to use instead of the built-in one
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    /// Turn limit for the autonomous loop and the planner
    #[arg(long, global = true)]
    max_turns: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check an instruction file against the schema
    Validate {
        /// JSON array of {action, args} objects
        file: PathBuf,
    },
    /// Execute an instruction file
    Run {
        /// JSON array of {action, args} objects
        file: PathBuf,
    },
    /// Turn a plain-language task into an instruction list
    Plan {
        /// What to do, in plain language
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,

        /// Execute the plan after printing it
        #[arg(long)]
        execute: bool,

        /// Also write the plan to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Reach a goal with the observe-reason-act loop
    Auto {
        /// The goal, in plain language
        #[arg(required = true, num_args = 1..)]
        goal: Vec<String>,
    },
}

fn init_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

fn load_validator(config: &Config) -> anyhow::Result<InstructionValidator> {
    let validator = match config.browser.schema_path {
        Some(ref path) => InstructionValidator::load(path)?,
        None => InstructionValidator::builtin()?,
    };
    Ok(validator)
}

fn read_instructions(path: &Path) -> anyhow::Result<Vec<Value>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    match value {
        Value::Array(items) => Ok(items),
        _ => bail!("{} must contain a JSON array of instructions", path.display()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn browser_page(config: &Config) -> anyhow::Result<AgentBrowserPage> {
    if !AgentBrowserPage::is_available().await {
        return Err(webpilot::PilotError::AgentBrowserNotFound.into());
    }
    Ok(AgentBrowserPage::from_config(&config.browser))
}

async fn reasoner(
    config: &Config,
    validator: &InstructionValidator,
) -> anyhow::Result<ToolCallingReasoner> {
    let client = OllamaClient::from_config(config)?;
    let model = &config.models.reasoner;
    if !client.is_model_available(model).await? {
        return Err(webpilot::PilotError::ModelNotFound(model.clone()).into());
    }
    Ok(ToolCallingReasoner::new(Arc::new(client), model.clone(), validator))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Build configuration
    let mut config = Config::load();

    // Apply CLI overrides
    if let Some(ref model) = args.model {
        config.models.reasoner = model.clone();
    }

    if let Some(ref schema) = args.schema {
        config.browser.schema_path = Some(schema.clone());
    }

    if let Some(max_turns) = args.max_turns {
        config.agent.max_turns = max_turns;
    }

    if args.debug {
        config.agent.debug = true;
    }

    if args.headed {
        config.browser.headed = true;
    }

    init_logging(config.agent.debug);

    // A broken schema stops everything before any browser work
    let validator = load_validator(&config)?;

    match args.command {
        Command::Validate { file } => {
            let instructions = read_instructions(&file)?;
            validator.validate(&Value::Array(instructions.clone()))?;
            println!("{}: {} valid instruction(s)", file.display(), instructions.len());
        }
        Command::Run { file } => {
            let instructions = read_instructions(&file)?;
            let page = browser_page(&config).await?;
            let results = SessionRunner::new(page, validator, &config)
                .run_batch(&instructions)
                .await?;
            print_json(&results)?;
        }
        Command::Plan {
            task,
            execute,
            output,
        } => {
            let task = task.join(" ");
            info!("planning: {}", task);
            let reasoner = reasoner(&config, &validator).await?;
            let plan = TaskPlanner::new(&reasoner, &validator, config.agent.max_turns)
                .plan(&task)
                .await?;
            let instructions: Vec<Value> = plan.iter().map(|i| i.to_value()).collect();

            if let Some(path) = output {
                fs::write(&path, serde_json::to_string_pretty(&instructions)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("plan written to {}", path.display());
            }

            if execute {
                let page = browser_page(&config).await?;
                let results = SessionRunner::new(page, validator, &config)
                    .run_batch(&instructions)
                    .await?;
                print_json(&results)?;
            } else {
                print_json(&instructions)?;
            }
        }
        Command::Auto { goal } => {
            let goal = goal.join(" ");
            let reasoner = reasoner(&config, &validator).await?;
            let page = browser_page(&config).await?;
            let results = SessionRunner::new(page, validator, &config)
                .run_autonomous(&reasoner, &goal)
                .await?;
            print_json(&results)?;
        }
    }

    Ok(())
}
