use chrono::NaiveDate;

use crate::model::{Document, Note, Task};

const DASHBOARD_TASKS: usize = 10;
const DASHBOARD_DOCS: usize = 5;

pub const INSTRUCTIONS: &str = "\
pkms keeps tasks, notes and documents in ./app_data (or --data-dir).

  pkms add \"Write report\" -p 4 -t work     add a task (priority 1-5, tags)
  pkms list [--open]                       list tasks
  pkms complete <id> | toggle <id>         finish or reopen a task
  pkms describe <id> \"detail\"              append a detail line
  pkms notes add \"idea\" [--task <id>]      capture a note
  pkms doc add \"Title\" \"Body\" -t tag       store a document
  pkms search <query> | doc search <q>     find tasks or documents
  pkms advise | suggest                    heuristic advice and doc-derived tasks
  pkms chat [message]                      talk to the assistant
  pkms dashboard [--tui]                   overview, with neko
  pkms review                              what was added today
  pkms shell | home                        interactive loops

Set OPENAI_API_KEY or ANTHROPIC_KEY, or run `pkms setup-llm`, to enable LLM summaries.";

fn tag_suffix(tags: &[String]) -> String {
    if tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", tags.join(", "))
    }
}

pub fn format_task_line(task: &Task) -> String {
    format!(
        "[{}] {}: {} (P{}){}",
        task.icon(),
        task.id,
        task.text,
        task.priority,
        tag_suffix(&task.tags)
    )
}

pub fn format_task_list<'a>(tasks: impl IntoIterator<Item = &'a Task>) -> String {
    let mut out = String::new();
    for task in tasks {
        out.push_str(&format_task_line(task));
        out.push('\n');
    }
    out
}

/// Full view of one task with its details and any notes pointing at it.
pub fn format_task_detail(task: &Task, notes: &[&Note]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Task:     {}\n", task.id));
    out.push_str(&format!("Text:     {}\n", task.text));
    out.push_str(&format!("Status:   {}\n", task.status_str()));
    out.push_str(&format!("Priority: {}\n", task.priority));
    if !task.tags.is_empty() {
        out.push_str(&format!("Tags:     {}\n", task.tags.join(", ")));
    }
    out.push_str(&format!("Created:  {}\n", task.created));

    if !task.details.is_empty() {
        out.push_str("\nDetails:\n");
        for (i, d) in task.details.iter().enumerate() {
            out.push_str(&format!("  {}. {d}\n", i + 1));
        }
    }
    if !notes.is_empty() {
        out.push_str("\nNotes:\n");
        for note in notes {
            out.push_str(&format!("  [{}] {}\n", note.created, note.text));
        }
    }
    out
}

fn note_line(display_index: usize, note: &Note) -> String {
    let link = note
        .task_id
        .map(|id| format!(" (task #{id})"))
        .unwrap_or_default();
    format!("{display_index}. {}{link}", note.text)
}

pub fn format_note_list(notes: &[Note]) -> String {
    let mut out = String::new();
    for (i, note) in notes.iter().enumerate() {
        out.push_str(&note_line(i + 1, note));
        out.push('\n');
        for d in &note.details {
            out.push_str(&format!("   - {d}\n"));
        }
    }
    out
}

pub fn format_note_hits(hits: &[(usize, &Note)]) -> String {
    let mut out = String::new();
    for (i, note) in hits {
        out.push_str(&note_line(*i, note));
        out.push('\n');
    }
    out
}

pub fn format_doc_list<'a>(docs: impl IntoIterator<Item = &'a Document>) -> String {
    let mut out = String::new();
    for doc in docs {
        out.push_str(&format!(
            "{}: {} [tags: {}]\n",
            doc.id,
            doc.title,
            doc.tags.join(", ")
        ));
    }
    out
}

pub fn format_doc_view(doc: &Document) -> String {
    let mut out = format!(
        "{}: {}\n----\n{}\n----\ntags: {}\n",
        doc.id,
        doc.title,
        doc.text,
        doc.tags.join(", ")
    );
    if !doc.links.is_empty() {
        out.push_str(&format!("links: {}\n", doc.links.join(", ")));
    }
    out
}

/// Plain dashboard. Advice and suggestions have their own commands.
pub fn format_dashboard(tasks: &[Task], docs: &[Document], neko_line: &str) -> String {
    let mut lines = vec!["=== DASHBOARD ===".to_string(), "Tasks:".to_string()];
    for t in tasks.iter().take(DASHBOARD_TASKS) {
        lines.push(format!(" [{}] {}: {}", t.icon(), t.id, t.text));
    }
    if tasks.len() > DASHBOARD_TASKS {
        lines.push(format!(" ... ({} more)", tasks.len() - DASHBOARD_TASKS));
    }
    lines.push("Documents:".to_string());
    for d in docs.iter().take(DASHBOARD_DOCS) {
        lines.push(format!(" {}: {} (tags: {})", d.id, d.title, d.tags.join(", ")));
    }
    if docs.len() > DASHBOARD_DOCS {
        lines.push(format!(" ... ({} more)", docs.len() - DASHBOARD_DOCS));
    }
    lines.push(neko_line.to_string());
    lines.join("\n") + "\n"
}

pub fn format_review(date: NaiveDate, tasks: &[&Task], notes: &[&Note]) -> String {
    let mut out = format!("Review for {date}\n");
    out.push_str(&format!("Tasks added today: {}\n", tasks.len()));
    for t in tasks {
        out.push_str(&format!("  {}\n", format_task_line(t)));
    }
    out.push_str(&format!("Notes added today: {}\n", notes.len()));
    for n in notes {
        out.push_str(&format!("  - {}\n", n.text));
    }
    out
}

pub fn format_bullets(items: &[String]) -> String {
    let mut out = String::new();
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
    out
}
