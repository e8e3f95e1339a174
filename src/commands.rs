//! Non-interactive subcommands, shared by `main` and the shell.

use std::io::Write;

use anyhow::{Context, Result};

use crate::bundle;
use crate::chat::{ChatEngine, ChatHistory};
use crate::cli::{Command, DocCommand, NekoCommand, NotesCommand};
use crate::llm::{self, Provider, StoredKey};
use crate::model::Task;
use crate::neko;
use crate::output;
use crate::validate::parse_tags;
use crate::workspace::Workspace;

/// How a command finished. `NotFound` maps to exit status 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    NotFound,
}

fn task_or_not_found(
    out: &mut dyn Write,
    task: Option<Task>,
    f: impl FnOnce(&Task) -> String,
) -> Result<Outcome> {
    match task {
        Some(t) => {
            writeln!(out, "{}", f(&t))?;
            Ok(Outcome::Done)
        }
        None => {
            writeln!(out, "not found")?;
            Ok(Outcome::NotFound)
        }
    }
}

/// Run a command against `ws`, writing its report to `out`.
///
/// Prompts and loops for interactive commands (see
/// [`Command::is_interactive`]) are handled by the caller first.
pub fn execute(ws: &mut Workspace, command: Command, out: &mut dyn Write) -> Result<Outcome> {
    match command {
        Command::Add {
            text,
            priority,
            tags,
        } => {
            let t = ws.tasks.add(&text, priority, parse_tags(&tags))?;
            writeln!(out, "added task {}: {}", t.id, t.text)?;
        }

        Command::Edit {
            id,
            text,
            priority,
            tags,
        } => {
            if ws.tasks.get(id).is_none() {
                writeln!(out, "not found")?;
                return Ok(Outcome::NotFound);
            }
            if let Some(text) = text {
                ws.tasks.edit(id, &text)?;
            }
            if let Some(p) = priority {
                ws.tasks.set_priority(id, p)?;
            }
            if let Some(tags) = tags {
                ws.tasks.set_tags(id, parse_tags(&tags))?;
            }
            let task = ws.tasks.get(id).cloned();
            return task_or_not_found(out, task, |t| format!("edited {}", output::format_task_line(t)));
        }

        Command::List { open, json } => {
            let tasks = ws.tasks.list(!open);
            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&tasks)?)?;
            } else {
                write!(out, "{}", output::format_task_list(tasks))?;
            }
        }

        Command::Describe { id, detail, remove } => {
            let task = match (detail, remove) {
                (Some(detail), _) => ws.tasks.add_detail(id, &detail)?,
                (None, Some(index)) => ws.tasks.remove_detail(id, index)?,
                (None, None) => ws.tasks.get(id).cloned(),
            };
            let notes: Vec<_> = ws
                .notes
                .list()
                .iter()
                .filter(|n| n.task_id == Some(id))
                .collect();
            return task_or_not_found(out, task, |t| {
                output::format_task_detail(t, &notes).trim_end().to_string()
            });
        }

        Command::Complete { id } => {
            let task = ws.tasks.set_completed(id, true)?;
            return task_or_not_found(out, task, |t| format!("completed task {}", t.id));
        }

        Command::Toggle { id } => {
            let task = ws.tasks.toggle(id)?;
            return task_or_not_found(out, task, |t| format!("toggled {}: {}", t.id, t.status_str()));
        }

        Command::Search { query } => {
            write!(out, "{}", output::format_task_list(ws.tasks.search(&query)))?;
        }

        Command::Delete { id } => {
            if !ws.tasks.delete(id)? {
                writeln!(out, "not found")?;
                return Ok(Outcome::NotFound);
            }
            writeln!(out, "deleted")?;
        }

        Command::Notes { command } => return notes(ws, command, out),
        Command::Doc { command } => return doc(ws, command, out),

        Command::Export { path } => {
            bundle::export(ws, &path)?;
            writeln!(out, "exported to {}", path.display())?;
        }

        Command::Import { path } => {
            let counts = bundle::import(ws, &path)?;
            writeln!(out, "{counts}")?;
        }

        Command::Chat {
            message, task_id, ..
        } => {
            let history = ChatHistory::load(&ws.config.paths().chat_history());
            let mut engine = ChatEngine::new(ws, history);
            if let Some(id) = task_id {
                if engine.select_task(id) {
                    writeln!(out, "Selected task {id}")?;
                } else {
                    writeln!(out, "Task {id} not found")?;
                }
            }
            let reply = engine.handle_message(&message.join(" "))?;
            writeln!(out, "{reply}")?;
            engine.save_history()?;
        }

        Command::ChatHistory => {
            let history = ChatHistory::load(&ws.config.paths().chat_history());
            for entry in history.entries() {
                writeln!(out, "{}: {}", entry.role, entry.text)?;
            }
        }

        Command::Suggest => {
            let suggestions = ws.agent.suggest_tasks_from_documents(ws.docs.list());
            if suggestions.is_empty() {
                writeln!(out, "No suggestions.")?;
            } else {
                write!(out, "{}", output::format_bullets(&suggestions))?;
            }
        }

        Command::Advise => {
            for line in ws.agent.productivity_advice(ws.tasks.tasks(), ws.docs.list()) {
                writeln!(out, "{line}")?;
            }
        }

        Command::Dashboard { .. } => {
            let neko = ws.neko.borrow().status_line();
            write!(
                out,
                "{}",
                output::format_dashboard(ws.tasks.tasks(), ws.docs.list(), &neko)
            )?;
        }

        Command::Review => {
            let today = chrono::Utc::now().date_naive();
            let tasks = ws.tasks.added_on(today);
            let notes = ws.notes.added_on(today);
            write!(out, "{}", output::format_review(today, &tasks, &notes))?;
        }

        Command::Instructions => writeln!(out, "{}", output::INSTRUCTIONS)?,

        Command::Info => info(ws, out)?,

        Command::Reset { .. } => {
            ws.reset()?;
            writeln!(out, "all tasks, notes, documents and chat history removed")?;
        }

        Command::SetupLlm { provider, key } => {
            let key = key.context("an API key is required")?;
            setup_llm(ws, &provider, &key)?;
            writeln!(out, "saved {provider} key to {}", ws.config.paths().llm_json().display())?;
        }

        Command::Neko { command } => return neko_cmd(ws, command, out),

        Command::Home | Command::Shell => {
            anyhow::bail!("this command is only available from the terminal");
        }
    }
    Ok(Outcome::Done)
}

fn notes(ws: &mut Workspace, command: NotesCommand, out: &mut dyn Write) -> Result<Outcome> {
    match command {
        NotesCommand::Add { text, task_id } => {
            ws.notes.add(&text, task_id)?;
            writeln!(out, "added note {}", ws.notes.list().len())?;
        }
        NotesCommand::List => {
            if ws.notes.list().is_empty() {
                writeln!(out, "No notes.")?;
            } else {
                write!(out, "{}", output::format_note_list(ws.notes.list()))?;
            }
        }
        NotesCommand::Describe { index, detail } => {
            if ws.notes.get(index).is_err() {
                writeln!(out, "note not found")?;
                return Ok(Outcome::NotFound);
            }
            ws.notes.describe(index, &detail)?;
            writeln!(out, "added detail to note {index}")?;
        }
        NotesCommand::Delete { index } => {
            if ws.notes.get(index).is_err() {
                writeln!(out, "note not found")?;
                return Ok(Outcome::NotFound);
            }
            ws.notes.delete(index)?;
            writeln!(out, "deleted")?;
        }
        NotesCommand::Search { query } => {
            let hits = ws.notes.search(&query);
            write!(out, "{}", output::format_note_hits(&hits))?;
        }
    }
    Ok(Outcome::Done)
}

fn doc(ws: &mut Workspace, command: DocCommand, out: &mut dyn Write) -> Result<Outcome> {
    match command {
        DocCommand::Add {
            title,
            text,
            tags,
            links,
        } => {
            let d = ws.docs.add(&title, &text, parse_tags(&tags), parse_tags(&links))?;
            writeln!(out, "added doc {}: {}", d.id, d.title)?;
        }
        DocCommand::List => write!(out, "{}", output::format_doc_list(ws.docs.list()))?,
        DocCommand::Search { query } => {
            for d in ws.docs.search(&query) {
                writeln!(out, "{}: {}", d.id, d.title)?;
            }
        }
        DocCommand::View { id } => match ws.docs.get(id) {
            Some(d) => write!(out, "{}", output::format_doc_view(d))?,
            None => {
                writeln!(out, "not found")?;
                return Ok(Outcome::NotFound);
            }
        },
        DocCommand::Delete { id } => {
            if !ws.docs.delete(id)? {
                writeln!(out, "not found")?;
                return Ok(Outcome::NotFound);
            }
            writeln!(out, "deleted")?;
        }
    }
    Ok(Outcome::Done)
}

fn neko_cmd(ws: &mut Workspace, command: NekoCommand, out: &mut dyn Write) -> Result<Outcome> {
    match command {
        NekoCommand::Status => {
            let neko = ws.neko.borrow();
            // Persist the decay applied on load.
            neko.save()?;
            writeln!(out, "{}", neko.render())?;
        }
        NekoCommand::Heal { amount } => {
            let mut neko = ws.neko.borrow_mut();
            neko.heal_by(amount);
            neko.save()?;
            writeln!(out, "{}", neko.status_line())?;
        }
        NekoCommand::Reset => {
            let mut neko = ws.neko.borrow_mut();
            neko.reset();
            neko.save()?;
            writeln!(out, "{}", neko.status_line())?;
        }
        NekoCommand::Run => {
            let raw = std::env::var("TASK_NEKO_TEST_ACTIONS")
                .context("TASK_NEKO_TEST_ACTIONS is not set")?;
            let actions = neko::parse_actions(&raw)?;
            for line in neko::run_actions(&mut ws.tasks, &actions) {
                writeln!(out, "{line}")?;
            }
            writeln!(out, "{}", ws.neko.borrow().status_line())?;
        }
    }
    Ok(Outcome::Done)
}

fn info(ws: &Workspace, out: &mut dyn Write) -> Result<()> {
    let paths = ws.config.paths();
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let llm = if ws.agent.llm().available() {
        "active"
    } else {
        "inactive (no key found)"
    };
    writeln!(out, "cwd: {}", cwd.display())?;
    writeln!(out, "data dir: {}", ws.config.data_dir.display())?;
    writeln!(out, "active backend: {}", ws.config.backend)?;
    writeln!(out, "task store: {}", ws.tasks.store_path().display())?;
    writeln!(out, "note store: {}", ws.notes.store_path().display())?;
    writeln!(out, "document store: {}", ws.docs.store_path().display())?;
    writeln!(out, "chat history: {}", paths.chat_history().display())?;
    writeln!(out, "neko: {}", ws.neko.borrow().path().display())?;
    writeln!(out, "llm: {llm} ({:?})", ws.config.llm_mode)?;
    writeln!(out, "neo4j: {}", if ws.config.neo4j_enabled { "enabled" } else { "disabled" })?;
    Ok(())
}

pub fn setup_llm(ws: &Workspace, provider: &str, key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("API key must not be empty");
    }
    let stored = StoredKey {
        provider: Provider::parse(provider)?,
        api_key: key.to_string(),
    };
    let paths = ws.config.paths();
    paths.ensure_app_data()?;
    llm::store_key(&paths.llm_json(), &stored)
}
