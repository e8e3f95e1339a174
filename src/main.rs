use std::io::{self, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use pkms::cli::{Cli, Command};
use pkms::commands::{self, Outcome};
use pkms::config::{env_flag, Config, LlmMode};
use pkms::workspace::Workspace;
use pkms::{repl, tui};

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn build_config(cli: &Cli) -> Result<Config> {
    let data_dir = match &cli.data_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("failed to read current directory")?,
    };
    let mut config = Config::new(data_dir, cli.backend);
    config.verbose = cli.verbose || env_flag("PKMS_VERBOSE");
    config.neo4j_enabled = env_flag("PKMS_NEO4J");
    config.llm_mode = LlmMode::parse(&std::env::var("PKMS_LLM").unwrap_or_default())?;
    Ok(config)
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command.clone() else {
        Cli::command().print_help()?;
        return Ok(());
    };
    let config = build_config(&cli)?;
    init_logging(config.verbose);
    config.paths().ensure_app_data()?;
    tracing::debug!(data_dir = %config.data_dir.display(), backend = %config.backend, "starting");

    let mut ws = Workspace::open(config)?;
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout().lock();

    match command {
        Command::Shell => repl::shell(&mut ws, &mut input, &mut out)?,

        Command::Home => repl::home(&mut ws, &mut input, &mut out, true)?,

        Command::Chat {
            message,
            task_id,
            interactive,
        } if interactive || message.is_empty() => {
            repl::chat(&mut ws, task_id, &mut input, &mut out)?;
        }

        Command::Dashboard {
            tui: true,
            poll_interval,
        } => {
            tui::run(&mut ws, Duration::from_millis(poll_interval))?;
        }

        Command::Reset { yes: false } => {
            let question = "Delete all tasks, notes, documents and chat history?";
            if !repl::confirm(&mut input, &mut out, question)? {
                writeln!(out, "aborted")?;
                return Ok(());
            }
            commands::execute(&mut ws, Command::Reset { yes: true }, &mut out)?;
        }

        Command::SetupLlm {
            provider,
            key: None,
        } => {
            let key = repl::ask(&mut input, &mut out, &format!("{provider} API key: "))?;
            commands::execute(
                &mut ws,
                Command::SetupLlm {
                    provider,
                    key: Some(key),
                },
                &mut out,
            )?;
        }

        command => {
            if commands::execute(&mut ws, command, &mut out)? == Outcome::NotFound {
                out.flush()?;
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
