//! Line-oriented loops: the command shell, interactive chat and the home menu.
//!
//! Each loop reads from any `BufRead` and writes to any `Write` so it can be
//! driven from tests as well as the terminal.

use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;

use crate::chat::{ChatEngine, ChatHistory, HELP};
use crate::cli::Cli;
use crate::commands;
use crate::output;
use crate::tui;
use crate::workspace::Workspace;

const SHELL_HELP: &str = "Commands: any pkms subcommand (add, list, search, toggle, delete, notes, doc, \
advise, dashboard, ...), /select <id>, /current, /exit. Anything else is sent to the chat advisor.";

const CHAT_HELP: &str = "Commands: /select <id>, /clear, /exit, /help. \
You can also type 'summarize task <id>' or 'suggest tasks'.";

/// Read one line without its terminator. `None` at end of input.
fn read_line(input: &mut dyn BufRead) -> Result<Option<String>> {
    let mut buf = String::new();
    if input.read_line(&mut buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(buf.trim().to_string()))
}

fn prompt(input: &mut dyn BufRead, out: &mut dyn Write, text: &str) -> Result<Option<String>> {
    write!(out, "{text}")?;
    out.flush()?;
    read_line(input)
}

/// Ask a yes/no question. Anything but `y`/`yes` is a no.
pub fn confirm(input: &mut dyn BufRead, out: &mut dyn Write, question: &str) -> Result<bool> {
    let answer = prompt(input, out, &format!("{question} [y/N] "))?;
    Ok(matches!(
        answer.as_deref().map(str::to_lowercase).as_deref(),
        Some("y" | "yes")
    ))
}

/// Ask for a value, rejecting blank answers.
pub fn ask(input: &mut dyn BufRead, out: &mut dyn Write, question: &str) -> Result<String> {
    match prompt(input, out, question)? {
        Some(v) if !v.is_empty() => Ok(v),
        _ => anyhow::bail!("no value entered"),
    }
}

fn is_exit(line: &str) -> bool {
    matches!(line, "/exit" | "exit" | "quit")
}

/// Handle `/select <id>`, shared by the shell and chat loops.
fn select(engine: &mut ChatEngine, arg: &str, out: &mut dyn Write) -> Result<()> {
    match arg.trim().parse::<i64>() {
        Ok(id) if engine.select_task(id) => writeln!(out, "selected {id}")?,
        Ok(_) => writeln!(out, "not found")?,
        Err(_) => writeln!(out, "bad id")?,
    }
    Ok(())
}

fn chat_reply(engine: &mut ChatEngine, line: &str, out: &mut dyn Write) -> Result<()> {
    let reply = engine.handle_message(line)?;
    writeln!(out, "{reply}")?;
    engine.save_history()
}

/// Interactive shell: pkms subcommands, or chat messages when a line does
/// not parse as one.
pub fn shell(ws: &mut Workspace, input: &mut dyn BufRead, out: &mut dyn Write) -> Result<()> {
    let history = ChatHistory::load(&ws.config.paths().chat_history());
    let mut engine = ChatEngine::new(ws, history);
    writeln!(
        out,
        "Type '/help' for help, '/exit' to quit. Use command syntax or plain chat messages."
    )?;

    while let Some(line) = prompt(input, out, "> ")? {
        if line.is_empty() {
            continue;
        }
        if is_exit(&line) {
            break;
        }
        if line == "/help" || line == "help" {
            writeln!(out, "{SHELL_HELP}")?;
            continue;
        }
        if let Some(arg) = line.strip_prefix("/select ") {
            select(&mut engine, arg, out)?;
            continue;
        }
        if line == "/current" {
            match engine.selected_task() {
                Some(t) => writeln!(out, "current selection: {}: {}", t.id, t.text)?,
                None => writeln!(out, "no task selected")?,
            }
            continue;
        }

        let Some(words) = shlex::split(&line) else {
            writeln!(out, "unbalanced quotes")?;
            continue;
        };
        match Cli::try_parse_from(std::iter::once("pkms".to_string()).chain(words)) {
            Ok(Cli {
                command: Some(command),
                ..
            }) => {
                if command.is_interactive() {
                    writeln!(out, "that command is not available inside the shell")?;
                    continue;
                }
                // Errors are reported and the shell keeps going.
                if let Err(e) = commands::execute(engine.workspace(), command, out) {
                    writeln!(out, "error: {e:#}")?;
                }
            }
            Ok(_) => writeln!(out, "{SHELL_HELP}")?,
            Err(e) => match e.kind() {
                ErrorKind::InvalidSubcommand | ErrorKind::UnknownArgument => {
                    tracing::debug!(%line, "not a command, sending to chat");
                    chat_reply(&mut engine, &line, out)?;
                }
                _ => write!(out, "{}", e.render())?,
            },
        }
    }
    Ok(())
}

/// Interactive chat session. A leading `/` on other commands is dropped, so
/// `/advise` and `advise` are the same.
pub fn chat(
    ws: &mut Workspace,
    task_id: Option<i64>,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<()> {
    let history = ChatHistory::load(&ws.config.paths().chat_history());
    let mut engine = ChatEngine::new(ws, history);
    if let Some(id) = task_id {
        if engine.select_task(id) {
            writeln!(out, "Selected task {id}")?;
        } else {
            writeln!(out, "Task {id} not found")?;
        }
    }
    writeln!(
        out,
        "Entering interactive chat. Commands: /select <id>, /clear, /exit, /help"
    )?;

    while let Some(line) = prompt(input, out, "chat> ")? {
        if line.is_empty() {
            continue;
        }
        if is_exit(&line) {
            break;
        }
        if line == "/help" || line == "help" {
            writeln!(out, "{CHAT_HELP}\n{HELP}")?;
            continue;
        }
        if let Some(arg) = line.strip_prefix("/select ") {
            select(&mut engine, arg, out)?;
            continue;
        }
        if line.starts_with("/clear") {
            engine.clear_selection();
            writeln!(out, "selection cleared")?;
            continue;
        }
        let message = line.strip_prefix('/').unwrap_or(&line);
        chat_reply(&mut engine, message, out)?;
    }
    Ok(())
}

const HOME_MENU: &str = "\
*** PKMS Home ***
1) Show dashboard
2) Interactive dashboard
3) Chat companion
4) Command shell
5) Show commands and examples
6) Exit";

/// Home menu. The interactive dashboard takes over the terminal, so it is
/// only offered when `allow_tui` is set.
pub fn home(
    ws: &mut Workspace,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
    allow_tui: bool,
) -> Result<()> {
    loop {
        writeln!(out, "{HOME_MENU}")?;
        let Some(choice) = prompt(input, out, "\nChoose an option [1-6]: ")? else {
            break;
        };
        match choice.as_str() {
            "1" => {
                let neko = ws.neko.borrow().status_line();
                write!(
                    out,
                    "{}",
                    output::format_dashboard(ws.tasks.tasks(), ws.docs.list(), &neko)
                )?;
            }
            "2" if allow_tui => tui::run(ws, Duration::from_millis(1000))?,
            "2" => writeln!(out, "the interactive dashboard needs a terminal")?,
            "3" => chat(ws, None, input, out)?,
            "4" => shell(ws, input, out)?,
            "5" => writeln!(out, "{}", output::INSTRUCTIONS)?,
            "6" | "q" | "quit" | "exit" => {
                writeln!(out, "Goodbye")?;
                break;
            }
            _ => writeln!(out, "Invalid choice")?,
        }
    }
    Ok(())
}
