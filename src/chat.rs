//! Conversational front end over the workspace.
//!
//! Messages are matched against a small command grammar; anything else is
//! answered in the context of the selected task, or with a help line.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::llm::ChatMessage;
use crate::model::{ChatEntry, Task};
use crate::store::{read_json_array, write_json_atomic};
use crate::workspace::Workspace;

pub const HELP: &str = "Commands: suggest tasks | advise | summarize doc <id> | summarize task <id> | \
select task <id> | select note <n> | clear | add task <text> | edit task <id> to <text> | \
add detail <text> | add detail to task <id>: <text> | complete/delete task <id>.";

const LONG_TASK_WORDS: usize = 12;

/// Ordered transcript persisted as a JSON array.
pub struct ChatHistory {
    path: PathBuf,
    entries: Vec<ChatEntry>,
}

impl ChatHistory {
    /// Missing or corrupt history starts empty.
    pub fn load(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: read_json_array(path),
        }
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn add(&mut self, role: &str, text: &str) {
        self.entries.push(ChatEntry {
            role: role.to_string(),
            text: text.to_string(),
        });
    }

    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.entries)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Complete(i64),
    Delete(i64),
}

pub struct ChatEngine<'a> {
    ws: &'a mut Workspace,
    history: ChatHistory,
    selected_task: Option<i64>,
    selected_note: Option<usize>,
    pending: Option<Pending>,
}

fn trailing_id(msg: &str) -> Option<i64> {
    msg.split_whitespace().last()?.parse().ok()
}

impl<'a> ChatEngine<'a> {
    pub fn new(ws: &'a mut Workspace, history: ChatHistory) -> Self {
        Self {
            ws,
            history,
            selected_task: None,
            selected_note: None,
            pending: None,
        }
    }

    /// The workspace the engine operates on, for callers that interleave
    /// plain commands with chat.
    pub fn workspace(&mut self) -> &mut Workspace {
        self.ws
    }

    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn save_history(&self) -> Result<()> {
        self.history.save()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        self.selected_task.and_then(|id| self.ws.tasks.get(id))
    }

    /// Select by task id, falling back to a 1-based position in the list.
    pub fn select_task(&mut self, id_or_index: i64) -> bool {
        let tasks = self.ws.tasks.tasks();
        let found = tasks
            .iter()
            .find(|t| t.id == id_or_index)
            .or_else(|| {
                usize::try_from(id_or_index)
                    .ok()
                    .filter(|i| *i >= 1)
                    .and_then(|i| tasks.get(i - 1))
            })
            .map(|t| t.id);
        if found.is_some() {
            self.selected_task = found;
        }
        found.is_some()
    }

    /// Select a note by its 1-based display index.
    pub fn select_note(&mut self, display_index: usize) -> bool {
        let ok = self.ws.notes.get(display_index).is_ok();
        if ok {
            self.selected_note = Some(display_index);
        }
        ok
    }

    pub fn clear_selection(&mut self) {
        self.selected_task = None;
        self.selected_note = None;
    }

    /// Record `message`, answer it, and record the answer.
    pub fn handle_message(&mut self, message: &str) -> Result<String> {
        self.history.add("user", message);
        let response = self.respond(message.trim())?;
        self.history.add("assistant", &response);
        Ok(response)
    }

    fn respond(&mut self, msg: &str) -> Result<String> {
        let lower = msg.to_lowercase();

        if let Some(pending) = self.pending {
            if matches!(lower.as_str(), "yes" | "y" | "no" | "n") {
                self.pending = None;
                if lower.starts_with('n') {
                    return Ok("Cancelled.".into());
                }
                return self.confirm(pending);
            }
        }

        if let Some(rest) = msg.strip_prefix("select task ") {
            return Ok(match rest.trim().parse::<i64>() {
                Ok(id) if self.select_task(id) => format!("selected task {id}"),
                Ok(_) => "task not found".into(),
                Err(_) => "Invalid task id".into(),
            });
        }

        if let Some(rest) = msg.strip_prefix("select note ") {
            return Ok(match rest.trim().parse::<usize>() {
                Ok(n) if self.select_note(n) => format!("selected note {n}"),
                Ok(_) => "note not found".into(),
                Err(_) => "Invalid note index".into(),
            });
        }

        if msg == "clear selection" || msg == "clear" {
            self.clear_selection();
            return Ok("selection cleared".into());
        }

        if msg.starts_with("suggest tasks") {
            let suggestions = self.ws.agent.suggest_tasks_from_documents(self.ws.docs.list());
            return Ok(if suggestions.is_empty() {
                "No suggestions.".into()
            } else {
                suggestions.join("\n")
            });
        }

        if matches!(lower.as_str(), "advise" | "advice" | "advise all" | "productivity") {
            return Ok(self.advise());
        }

        if msg.starts_with("summarize doc ") {
            return Ok(match trailing_id(msg) {
                Some(id) => match self.ws.docs.get(id) {
                    Some(doc) => self.ws.agent.summarize_document(doc),
                    None => "Document not found".into(),
                },
                None => "Invalid document id".into(),
            });
        }

        if msg.starts_with("summarize task ") {
            return Ok(match trailing_id(msg) {
                Some(id) => match self.ws.tasks.get(id) {
                    Some(task) => self.ws.agent.summarize_task(task),
                    None => "Task not found".into(),
                },
                None => "Invalid task id".into(),
            });
        }

        if let Some(text) = msg.strip_prefix("add task ") {
            let text = text.trim();
            if text.is_empty() {
                return Ok("No task text provided.".into());
            }
            let t = self
                .ws
                .tasks
                .add(text, crate::model::DEFAULT_PRIORITY, Vec::new())?;
            return Ok(format!("Added task {}: {}", t.id, t.text));
        }

        if msg.starts_with("edit task ") {
            let Some((left, new_text)) = msg.split_once(" to ") else {
                return Ok("Usage: edit task <id> to <new text>".into());
            };
            let Some(id) = trailing_id(left) else {
                return Ok("Invalid command or id".into());
            };
            let new_text = new_text.trim();
            if new_text.is_empty() {
                return Ok("No new text provided.".into());
            }
            return Ok(match self.ws.tasks.edit(id, new_text)? {
                Some(t) => format!("Edited task {}: {}", t.id, t.text),
                None => "Task not found".into(),
            });
        }

        if msg.starts_with("add detail to task ") {
            let Some((left, detail)) = msg.split_once(':') else {
                return Ok("Usage: add detail to task <id>: <detail>".into());
            };
            let Some(id) = trailing_id(left) else {
                return Ok("Invalid command or id".into());
            };
            return self.add_detail(id, detail);
        }

        if let Some(detail) = msg.strip_prefix("add detail ") {
            let Some(id) = self.selected_task else {
                return Ok("No task selected. Use 'select task <id>' first or use 'add detail to task <id>: <text>'".into());
            };
            return self.add_detail(id, detail);
        }

        if msg.starts_with("complete task ") || msg.starts_with("delete task ") {
            let Some(id) = trailing_id(msg) else {
                return Ok("Invalid task id".into());
            };
            let (pending, verb) = if msg.starts_with("complete") {
                (Pending::Complete(id), "complete")
            } else {
                (Pending::Delete(id), "delete")
            };
            self.pending = Some(pending);
            return Ok(format!(
                "Please confirm: reply 'yes' to {verb} task {id}, or 'no' to cancel."
            ));
        }

        if let Some(task) = self.selected_task().cloned() {
            return Ok(self.task_reply(&task, msg));
        }

        Ok(HELP.into())
    }

    fn confirm(&mut self, pending: Pending) -> Result<String> {
        Ok(match pending {
            Pending::Delete(id) => {
                if self.ws.tasks.delete(id)? {
                    if self.selected_task == Some(id) {
                        self.selected_task = None;
                    }
                    "Deleted".into()
                } else {
                    "Task not found".into()
                }
            }
            Pending::Complete(id) => match self.ws.tasks.set_completed(id, true)? {
                Some(t) => format!("Completed task {}", t.id),
                None => "Task not found".into(),
            },
        })
    }

    fn add_detail(&mut self, id: i64, detail: &str) -> Result<String> {
        let detail = detail.trim();
        if detail.is_empty() {
            return Ok("No detail provided.".into());
        }
        Ok(match self.ws.tasks.add_detail(id, detail)? {
            Some(t) => format!("Added detail to task {}", t.id),
            None => "Task not found".into(),
        })
    }

    fn advise(&self) -> String {
        let tasks = self.ws.tasks.tasks();
        let docs = self.ws.docs.list();
        let mut lines = Vec::new();
        if let Some(note) = self
            .selected_note
            .and_then(|n| self.ws.notes.get(n).ok())
        {
            lines.push(self.ws.agent.note_focus(note));
        }

        let llm = self.ws.agent.llm();
        let from_llm = if llm.available() {
            let open = tasks.iter().filter(|t| !t.completed).count();
            let mut prompt = vec![
                "You are an assistant providing concise productivity advice.".to_string(),
                format!(
                    "Tasks: {open} open / {} done (total {})",
                    tasks.len() - open,
                    tasks.len()
                ),
            ];
            prompt.extend(tasks.iter().take(3).map(|t| format!("- {}", t.text)));
            prompt.push(
                "Provide 3 prioritized, one-line suggestions as a numbered list (1., 2., 3.). \
                 Keep each around 10-15 words with an optional short rationale in parentheses. \
                 Do not list internal IDs."
                    .into(),
            );
            llm.summarize(&prompt.join("\n"))
                .filter(|s| !s.trim().is_empty())
        } else {
            None
        };

        match from_llm {
            Some(text) => lines.push(text),
            None => lines.extend(self.ws.agent.productivity_advice(tasks, docs)),
        }
        lines.join("\n")
    }

    fn task_reply(&self, task: &Task, msg: &str) -> String {
        let llm = self.ws.agent.llm();
        if llm.available() {
            let messages = [
                ChatMessage::new("system", "You help the user make progress on one task."),
                ChatMessage::new("user", format!("Task: {}\nUser: {msg}", task.text)),
            ];
            if let Some(reply) = llm.chat(&messages).filter(|s| !s.trim().is_empty()) {
                return reply;
            }
            return self.ws.agent.summarize_task(task);
        }
        let mut reply = format!(
            "Selected task {}: {}",
            task.id,
            self.ws.agent.summarize_task(task)
        );
        if task.word_count() > LONG_TASK_WORDS {
            reply.push_str("\nThis task looks long, consider breaking it into smaller steps.");
        }
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::llm::{MockLlm, NoLlm};
    use crate::store::Backend;
    use tempfile::TempDir;

    fn workspace(dir: &TempDir) -> Workspace {
        Workspace::open_with_llm(Config::new(dir.path(), Backend::Json), Box::new(NoLlm)).unwrap()
    }

    fn engine<'a>(ws: &'a mut Workspace, dir: &TempDir) -> ChatEngine<'a> {
        ChatEngine::new(ws, ChatHistory::load(&dir.path().join("chat.json")))
    }

    #[test]
    fn add_edit_detail_flow() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        let mut chat = engine(&mut ws, &dir);
        assert_eq!(
            chat.handle_message("add task Write report").unwrap(),
            "Added task 1: Write report"
        );
        assert_eq!(
            chat.handle_message("edit task 1 to Write final report").unwrap(),
            "Edited task 1: Write final report"
        );
        assert_eq!(
            chat.handle_message("add detail to task 1: include charts").unwrap(),
            "Added detail to task 1"
        );
        assert_eq!(
            chat.handle_message("edit task 9 to nope").unwrap(),
            "Task not found"
        );
        assert_eq!(chat.handle_message("add task   ").unwrap(), HELP);
        drop(chat);
        assert_eq!(ws.tasks.get(1).unwrap().details, vec!["include charts"]);
    }

    #[test]
    fn delete_needs_confirmation() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        ws.tasks.add("temp", 3, vec![]).unwrap();
        let mut chat = engine(&mut ws, &dir);
        assert_eq!(
            chat.handle_message("delete task 1").unwrap(),
            "Please confirm: reply 'yes' to delete task 1, or 'no' to cancel."
        );
        assert_eq!(chat.handle_message("no").unwrap(), "Cancelled.");
        chat.handle_message("delete task 1").unwrap();
        assert_eq!(chat.handle_message("yes").unwrap(), "Deleted");
        chat.handle_message("delete task 1").unwrap();
        assert_eq!(chat.handle_message("y").unwrap(), "Task not found");
    }

    #[test]
    fn complete_through_chat_heals() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        ws.tasks.add("finish", 3, vec![]).unwrap();
        let before = ws.neko.borrow().life();
        let mut chat = engine(&mut ws, &dir);
        chat.handle_message("complete task 1").unwrap();
        assert_eq!(chat.handle_message("YES").unwrap(), "Completed task 1");
        drop(chat);
        assert!(ws.tasks.get(1).unwrap().completed);
        assert!(ws.neko.borrow().life() > before || before == 100);
    }

    #[test]
    fn yes_without_pending_is_not_a_confirmation() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        let mut chat = engine(&mut ws, &dir);
        assert_eq!(chat.handle_message("yes").unwrap(), HELP);
    }

    #[test]
    fn select_task_by_id_or_position() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        for text in ["a", "b", "c"] {
            ws.tasks.add(text, 3, vec![]).unwrap();
        }
        ws.tasks.delete(1).unwrap();
        let mut chat = engine(&mut ws, &dir);
        assert_eq!(chat.handle_message("select task 3").unwrap(), "selected task 3");
        assert_eq!(chat.selected_task().unwrap().text, "c");
        // No task has id 1 any more; position 1 is task 2.
        assert_eq!(chat.handle_message("select task 1").unwrap(), "selected task 1");
        assert_eq!(chat.selected_task().unwrap().id, 2);
        assert_eq!(chat.handle_message("select task 40").unwrap(), "task not found");
        assert_eq!(chat.handle_message("select task x").unwrap(), "Invalid task id");
    }

    #[test]
    fn selected_task_context_reply() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        ws.tasks
            .add(
                "Plan the quarterly offsite with venue catering travel agenda and speaker list today",
                3,
                vec![],
            )
            .unwrap();
        let mut chat = engine(&mut ws, &dir);
        chat.handle_message("select task 1").unwrap();
        let reply = chat.handle_message("what next?").unwrap();
        assert!(reply.starts_with("Selected task 1: Plan the quarterly offsite with venue catering..."));
        assert!(reply.ends_with("consider breaking it into smaller steps."));

        chat.handle_message("add detail book venue").unwrap();
        chat.handle_message("clear").unwrap();
        assert_eq!(
            chat.handle_message("add detail x").unwrap(),
            "No task selected. Use 'select task <id>' first or use 'add detail to task <id>: <text>'"
        );
    }

    #[test]
    fn advise_with_selected_note() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        ws.notes.add("Note for chat", None).unwrap();
        let mut chat = engine(&mut ws, &dir);
        assert!(chat.select_note(1));
        assert!(!chat.select_note(2));
        let resp = chat.handle_message("advise").unwrap();
        assert!(resp.starts_with("Note focus: Note for chat"));
        assert!(resp.contains("Tasks: 0 open / 0 done (total 0)"));
    }

    #[test]
    fn advise_prefers_llm() {
        let dir = TempDir::new().unwrap();
        let mut ws =
            Workspace::open_with_llm(Config::new(dir.path(), Backend::Json), Box::new(MockLlm))
                .unwrap();
        let mut chat = engine(&mut ws, &dir);
        assert!(chat
            .handle_message("productivity")
            .unwrap()
            .starts_with("[mock-llm] You are an assistant"));
    }

    #[test]
    fn summaries_and_suggestions() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        ws.docs
            .add("Plan", "TODO: add tests\nship it", vec![], vec![])
            .unwrap();
        ws.tasks.add("short task", 3, vec![]).unwrap();
        let mut chat = engine(&mut ws, &dir);
        assert_eq!(chat.handle_message("suggest tasks").unwrap(), "add tests");
        assert_eq!(
            chat.handle_message("summarize doc 1").unwrap(),
            "Plan: TODO: add tests"
        );
        assert_eq!(chat.handle_message("summarize doc 7").unwrap(), "Document not found");
        assert_eq!(chat.handle_message("summarize task 1").unwrap(), "short task");
        assert_eq!(chat.handle_message("summarize task x").unwrap(), "Invalid task id");
    }

    #[test]
    fn history_records_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut ws = workspace(&dir);
        let mut chat = engine(&mut ws, &dir);
        chat.handle_message("hello").unwrap();
        chat.save_history().unwrap();
        assert_eq!(chat.history().entries().len(), 2);

        let reloaded = ChatHistory::load(&dir.path().join("chat.json"));
        assert_eq!(reloaded.entries()[0].role, "user");
        assert_eq!(reloaded.entries()[1].text, HELP);
    }

    #[test]
    fn corrupt_history_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chat.json");
        std::fs::write(&path, "[{").unwrap();
        assert!(ChatHistory::load(&path).entries().is_empty());
    }
}
