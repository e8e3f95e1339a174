//! Heuristic assistant: summaries, doc-derived task suggestions and
//! productivity advice. An LLM, when available, only replaces summaries.

use chrono::{DateTime, Duration, Utc};

use crate::llm::{Llm, NoLlm};
use crate::model::{parse_timestamp, Document, Note, Task};

const ACTION_VERBS: &[&str] = &[
    "add", "create", "implement", "write", "refactor", "plan", "review", "test", "fix", "update",
    "remove", "design",
];

const LONG_TASK_WORDS: usize = 12;
const QUICK_WIN_WORDS: usize = 5;
const HIGH_PRIORITY: u8 = 4;
const FOCUS_OVERLOAD: usize = 5;
const URGENT_DAYS: i64 = 7;
const STALE_DAYS: i64 = 14;
const LIST_LIMIT: usize = 3;

fn truncate_words(text: &str, n: usize, ellipsis: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut out = words.iter().take(n).copied().collect::<Vec<_>>().join(" ");
    if words.len() > n {
        out.push_str(ellipsis);
    }
    out
}

/// Drop `TODO` / `TODO:` marker words (any case). Words that merely contain
/// "todo" are kept.
fn strip_todo(line: &str) -> String {
    line.split_whitespace()
        .filter_map(|word| {
            let lower = word.to_ascii_lowercase();
            if lower == "todo" || lower == "todo:" {
                None
            } else if lower.starts_with("todo:") {
                Some(&word["todo:".len()..])
            } else {
                Some(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn task_list(tasks: &[&Task]) -> String {
    let mut out = tasks
        .iter()
        .take(LIST_LIMIT)
        .map(|t| format!("#{} {}", t.id, t.text))
        .collect::<Vec<_>>()
        .join("; ");
    if tasks.len() > LIST_LIMIT {
        out.push_str(&format!(" (+{} more)", tasks.len() - LIST_LIMIT));
    }
    out
}

/// Age of a task at `now`. Unparsable and future timestamps have no age.
fn task_age(task: &Task, now: DateTime<Utc>) -> Option<Duration> {
    let created = parse_timestamp(&task.created)?;
    let age = now.signed_duration_since(created);
    (age >= Duration::zero()).then_some(age)
}

pub struct Agent {
    llm: Box<dyn Llm>,
}

impl Default for Agent {
    fn default() -> Self {
        Self::new(Box::new(NoLlm))
    }
}

impl Agent {
    pub fn new(llm: Box<dyn Llm>) -> Self {
        Self { llm }
    }

    pub fn llm(&self) -> &dyn Llm {
        self.llm.as_ref()
    }

    fn llm_summary(&self, text: &str) -> Option<String> {
        if !self.llm.available() {
            return None;
        }
        self.llm.summarize(text).filter(|s| !s.trim().is_empty())
    }

    pub fn summarize_task(&self, task: &Task) -> String {
        self.llm_summary(&task.text)
            .unwrap_or_else(|| truncate_words(&task.text, 7, "..."))
    }

    pub fn summarize_document(&self, doc: &Document) -> String {
        if let Some(summary) = self.llm_summary(&doc.text) {
            return format!("{}: {summary}", doc.title);
        }
        let first_line = doc.text.lines().map(str::trim).find(|l| !l.is_empty());
        match first_line {
            Some(line) => format!("{}: {}", doc.title, truncate_words(line, 10, "...")),
            None => doc.title.clone(),
        }
    }

    pub fn suggest_tasks_from_document(&self, doc: &Document) -> Vec<String> {
        let mut out = Vec::new();
        for line in doc.text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if line.to_ascii_lowercase().contains("todo") {
                out.push(strip_todo(line));
                continue;
            }
            let first = line
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_lowercase();
            if ACTION_VERBS.contains(&first.as_str()) {
                out.push(line.to_string());
            }
        }
        out
    }

    /// Suggestions from every document, first occurrence wins.
    pub fn suggest_tasks_from_documents(&self, docs: &[Document]) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        docs.iter()
            .flat_map(|d| self.suggest_tasks_from_document(d))
            .filter(|s| seen.insert(s.clone()))
            .collect()
    }

    pub fn productivity_advice(&self, tasks: &[Task], docs: &[Document]) -> Vec<String> {
        self.productivity_advice_at(tasks, docs, Utc::now())
    }

    pub fn productivity_advice_at(
        &self,
        tasks: &[Task],
        docs: &[Document],
        now: DateTime<Utc>,
    ) -> Vec<String> {
        let open: Vec<&Task> = tasks.iter().filter(|t| !t.completed).collect();
        let done = tasks.len() - open.len();
        let mut advice = vec![format!(
            "Tasks: {} open / {done} done (total {})",
            open.len(),
            tasks.len()
        )];

        if !open.is_empty() {
            let spread: Vec<String> = (1..=5u8)
                .rev()
                .filter_map(|p| {
                    let n = open.iter().filter(|t| t.priority == p).count();
                    (n > 0).then(|| format!("P{p}:{n}"))
                })
                .collect();
            advice.push(format!("Priority spread: {}", spread.join(" ")));
        }

        let older_than = |t: &Task, days: i64| {
            task_age(t, now).is_some_and(|age| age > Duration::days(days))
        };

        let high: Vec<&Task> = open
            .iter()
            .copied()
            .filter(|t| t.priority >= HIGH_PRIORITY)
            .collect();
        let urgent: Vec<&Task> = high
            .iter()
            .copied()
            .filter(|t| older_than(*t, URGENT_DAYS))
            .collect();
        if !urgent.is_empty() {
            advice.push(format!("Urgent: {}", task_list(&urgent)));
        }
        if !high.is_empty() {
            advice.push(format!("High focus: {}", task_list(&high)));
        }
        if high.len() > FOCUS_OVERLOAD {
            advice.push(format!(
                "Focus overload: {} high-priority tasks open; pick the top {LIST_LIMIT} and defer the rest.",
                high.len()
            ));
        }

        let stale: Vec<&Task> = open
            .iter()
            .copied()
            .filter(|t| older_than(*t, STALE_DAYS))
            .collect();
        if !stale.is_empty() {
            advice.push(format!("Stale: {}", task_list(&stale)));
        }

        let quick: Vec<&Task> = open
            .iter()
            .copied()
            .filter(|t| t.priority >= 3 && t.word_count() <= QUICK_WIN_WORDS)
            .collect();
        if !quick.is_empty() {
            advice.push(format!("Quick wins: {}", task_list(&quick)));
        }

        let refine: Vec<&Task> = open
            .iter()
            .copied()
            .filter(|t| t.priority >= 3 && t.details.is_empty())
            .collect();
        if !refine.is_empty() {
            advice.push(format!("Refine: {}", task_list(&refine)));
        }

        let long = open
            .iter()
            .filter(|t| t.word_count() > LONG_TASK_WORDS)
            .count();
        if long > 0 {
            advice.push(format!(
                "Break down {long} long tasks (>{LONG_TASK_WORDS} words) for momentum."
            ));
        }

        let suggestions = self.suggest_tasks_from_documents(docs);
        if !suggestions.is_empty() {
            advice.push(format!(
                "Doc-derived suggestions: {} available.",
                suggestions.len()
            ));
        }
        advice
    }

    pub fn note_focus(&self, note: &Note) -> String {
        format!("Note focus: {}", note.text)
    }
}
