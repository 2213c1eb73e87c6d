//! Self-calling agent CLI.
//!
//! `agent run` plans a goal given on the command line; `agent request` handles
//! a JSON request envelope and prints the JSON response.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use agent::core::types::AgentLogEntry;
use agent::exit_codes;
use agent::io::config::load_config;
use agent::request::{exit_code_for, handle_request};
use agent::{AgentRun, LimitsInput, ModelCapability, Orchestrator, logging};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "agent",
    version,
    about = "Recursive self-calling agent with bounded depth and iterations"
)]
struct Cli {
    /// Path to the TOML config file. Defaults apply when it is missing.
    #[arg(long, global = true, default_value = "agent.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan a goal and print the reasoning trace.
    Run {
        /// Goal to pursue.
        goal: String,
        #[arg(long)]
        max_depth: Option<f64>,
        #[arg(long)]
        max_iterations: Option<f64>,
        /// Use the heuristic backend even when a model is configured.
        #[arg(long)]
        heuristic: bool,
        /// Stop the run after this many seconds and return a partial result.
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Print the run as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Handle a `{goal, maxDepth, maxIterations}` JSON request from a file or stdin.
    Request {
        /// Request file; `-` or omitted reads stdin.
        path: Option<PathBuf>,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::FAULT
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    match cli.command {
        Command::Run {
            goal,
            max_depth,
            max_iterations,
            heuristic,
            timeout_secs,
            json,
        } => {
            let capability = if heuristic {
                ModelCapability::Unavailable
            } else {
                ModelCapability::detect(&config.model)
            };
            let mut orchestrator = Orchestrator::new(config, capability);
            if let Some(secs) = timeout_secs {
                orchestrator = orchestrator.with_timeout(Duration::from_secs(secs));
            }
            match orchestrator.run(&goal, &LimitsInput::new(max_depth, max_iterations)) {
                Ok(run) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&run)?);
                    } else {
                        print!("{}", render_run(&run));
                    }
                    Ok(exit_codes::OK)
                }
                Err(err) => {
                    eprintln!("{}", err);
                    Ok(exit_code_for(&err))
                }
            }
        }
        Command::Request { path } => {
            let raw = read_request(path.as_deref())?;
            let capability = ModelCapability::detect(&config.model);
            let (code, response) = handle_request(&raw, &config, capability);
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(code)
        }
    }
}

fn read_request(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => {
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
        }
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("read request from stdin")?;
            Ok(raw)
        }
    }
}

fn render_run(run: &AgentRun) -> String {
    let mut out = String::new();
    for entry in &run.steps {
        render_entry(&mut out, entry);
    }
    out.push_str("\nConclusion:\n");
    out.push_str(&run.conclusion);
    out.push('\n');
    out.push_str(&format!(
        "\n{} iteration(s), depth reached {}, {}{}\n",
        run.iterations,
        run.depth_reached,
        if run.used_model {
            "model-assisted"
        } else {
            "heuristic"
        },
        if run.completed { "" } else { ", stopped early" }
    ));
    out
}

fn render_entry(out: &mut String, entry: &AgentLogEntry) {
    let indent = "  ".repeat(entry.depth as usize);
    let mut lines = entry.message.lines();
    let first = lines.next().unwrap_or_default();
    out.push_str(&format!("{indent}[{}] {first}\n", entry.kind.as_str()));
    for line in lines {
        out.push_str(&format!("{indent}    {line}\n"));
    }
}
