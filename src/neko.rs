//! A virtual pet whose life decays hourly and is restored by finishing tasks.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::model::parse_timestamp;
use crate::store::write_json_atomic;
use crate::tasks::{CompletionHook, TaskManager};

pub const DEFAULT_LIFE: i64 = 50;
pub const MAX_LIFE: i64 = 100;
pub const HEAL_AMOUNT: i64 = 15;
const REVIVE_LIFE: i64 = 20;
const BAR_CELLS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mood {
    Thriving,
    Happy,
    Idle,
    Sad,
    Critical,
    Dead,
}

impl Mood {
    pub fn from_life(life: i64) -> Self {
        match life {
            l if l <= 0 => Self::Dead,
            l if l >= 90 => Self::Thriving,
            l if l >= 70 => Self::Happy,
            l if l >= 40 => Self::Idle,
            l if l >= 20 => Self::Sad,
            _ => Self::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thriving => "THRIVING",
            Self::Happy => "HAPPY",
            Self::Idle => "IDLE",
            Self::Sad => "SAD",
            Self::Critical => "CRITICAL",
            Self::Dead => "DEAD",
        }
    }

    pub fn face(self) -> &'static str {
        match self {
            Self::Thriving => "( ≧ω≦ )",
            Self::Happy => "( ^_^ )",
            Self::Idle => "( o.o )",
            Self::Sad => "( ._. )",
            Self::Critical => "( T_T )",
            Self::Dead => "( X_X )",
        }
    }

    fn vibes(self) -> &'static [&'static str] {
        match self {
            Self::Thriving => &[
                "I feel INFINITE!",
                "We are actually unstoppable.",
                "High energy detected! Zoomies time!",
            ],
            Self::Happy => &[
                "Purring...",
                "Good flow. Let's keep this up.",
                "I saved a spot in the sun for you.",
            ],
            Self::Idle => &["Waiting for orders...", "Just vibing.", "Did you drink water today?"],
            Self::Sad => &[
                "It's getting dark in here...",
                "My hunger is growing...",
                "Please don't forget me.",
            ],
            Self::Critical => &["I don't feel so good...", "Please... one task...", "Fading away..."],
            Self::Dead => &["...", "(Spooky ghost noises)", "Press F to pay respects."],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NekoState {
    pub life: i64,
    #[serde(default)]
    pub last_tick: String,
}

/// Default life from `TASK_NEKO_DEFAULT_LIFE`, clamped to the valid range.
pub fn default_life_from_env() -> i64 {
    std::env::var("TASK_NEKO_DEFAULT_LIFE")
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_LIFE)
        .clamp(0, MAX_LIFE)
}

fn tick_string(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct Neko {
    path: PathBuf,
    default_life: i64,
    state: NekoState,
}

impl Neko {
    pub fn load(path: &Path) -> Self {
        Self::load_at(path, default_life_from_env(), Utc::now())
    }

    pub fn load_at(path: &Path, default_life: i64, now: DateTime<Utc>) -> Self {
        let state = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<NekoState>(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "corrupt neko state, starting over");
                NekoState {
                    life: default_life,
                    last_tick: String::new(),
                }
            }),
            Err(_) => NekoState {
                life: default_life,
                last_tick: String::new(),
            },
        };
        let mut neko = Self {
            path: path.to_path_buf(),
            default_life,
            state,
        };
        neko.state.life = neko.state.life.clamp(0, MAX_LIFE);
        neko.decay(now);
        neko
    }

    /// Consume whole hours since the last tick, one life point each.
    fn decay(&mut self, now: DateTime<Utc>) {
        let Some(last) = parse_timestamp(&self.state.last_tick) else {
            self.state.last_tick = tick_string(now);
            return;
        };
        let hours = now.signed_duration_since(last).num_hours();
        if hours <= 0 {
            return;
        }
        let before = self.state.life;
        self.state.life = (self.state.life - hours).max(0);
        self.state.last_tick = tick_string(last + Duration::hours(hours));
        tracing::debug!(hours, before, after = self.state.life, "neko decayed");
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn life(&self) -> i64 {
        self.state.life
    }

    pub fn state(&self) -> &NekoState {
        &self.state
    }

    pub fn mood(&self) -> Mood {
        Mood::from_life(self.state.life)
    }

    pub fn is_dead(&self) -> bool {
        self.mood() == Mood::Dead
    }

    pub fn heal(&mut self) {
        self.heal_by(HEAL_AMOUNT);
    }

    /// A dead neko revives at a fixed life instead of gaining `amount`.
    pub fn heal_by(&mut self, amount: i64) {
        self.state.life = if self.state.life <= 0 {
            REVIVE_LIFE
        } else {
            self.state.life.saturating_add(amount).clamp(0, MAX_LIFE)
        };
        tracing::debug!(life = self.state.life, "neko healed");
    }

    pub fn reset(&mut self) {
        self.state = NekoState {
            life: self.default_life,
            last_tick: tick_string(Utc::now()),
        };
    }

    pub fn save(&self) -> Result<()> {
        write_json_atomic(&self.path, &self.state)
            .with_context(|| format!("failed to save neko state to {}", self.path.display()))
    }

    pub fn bar(&self) -> String {
        let filled = ((self.state.life.max(0) / 5) as usize).min(BAR_CELLS);
        format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
    }

    /// One-line status for dashboards.
    pub fn status_line(&self) -> String {
        let mood = self.mood();
        if mood == Mood::Dead {
            return format!("Neko: {} GHOST (complete a task to revive)", mood.face());
        }
        format!("Neko: {} {} {}%", mood.face(), mood.as_str(), self.state.life)
    }

    pub fn render(&self) -> String {
        let mood = self.mood();
        let vibe = mood
            .vibes()
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("...");
        let status = if mood == Mood::Dead {
            "GHOST (complete a task to revive)".to_string()
        } else {
            format!("[{}] {}%", self.bar(), self.state.life)
        };
        format!("{} {}\n\"{vibe}\"\n{status}", mood.face(), mood.as_str())
    }
}

/// Completion hook that heals and persists a shared neko.
pub fn healing_hook(neko: Rc<RefCell<Neko>>) -> CompletionHook {
    Box::new(move |task: &crate::model::Task| {
        let mut neko = neko.borrow_mut();
        neko.heal();
        tracing::info!(task = task.id, life = neko.life(), "task completed, neko healed");
        if let Err(e) = neko.save() {
            tracing::warn!(error = %e, "failed to save neko state");
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Add,
    Toggle,
    Delete,
    Edit,
}

/// One entry of a `TASK_NEKO_TEST_ACTIONS` script.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptedAction {
    pub action: ActionKind,
    #[serde(default)]
    pub text: Option<String>,
    /// 0-based position in the task list.
    #[serde(default)]
    pub index: Option<usize>,
}

pub fn parse_actions(raw: &str) -> Result<Vec<ScriptedAction>> {
    serde_json::from_str(raw).context("invalid TASK_NEKO_TEST_ACTIONS")
}

fn id_at(tm: &TaskManager, index: Option<usize>) -> Result<i64> {
    let Some(i) = index else {
        bail!("action needs an index");
    };
    match tm.tasks().get(i) {
        Some(t) => Ok(t.id),
        None => bail!("no task at index {i}"),
    }
}

/// Apply scripted actions in order, returning one outcome line per action.
/// A failing action is reported and the script continues.
pub fn run_actions(tm: &mut TaskManager, actions: &[ScriptedAction]) -> Vec<String> {
    actions
        .iter()
        .map(|a| match apply_action(tm, a) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(action = ?a.action, error = %e, "scripted action failed");
                format!("skipped {:?}: {e}", a.action).to_lowercase()
            }
        })
        .collect()
}

fn apply_action(tm: &mut TaskManager, action: &ScriptedAction) -> Result<String> {
    match action.action {
        ActionKind::Add => {
            let text = action.text.as_deref().unwrap_or("");
            let t = tm.add(text, crate::model::DEFAULT_PRIORITY, Vec::new())?;
            Ok(format!("added task {}: {}", t.id, t.text))
        }
        ActionKind::Toggle => {
            let id = id_at(tm, action.index)?;
            let t = tm.toggle(id)?.context("task vanished")?;
            Ok(format!("toggled {}: {}", t.id, t.status_str()))
        }
        ActionKind::Delete => {
            let id = id_at(tm, action.index)?;
            tm.delete(id)?;
            Ok(format!("deleted task {id}"))
        }
        ActionKind::Edit => {
            let id = id_at(tm, action.index)?;
            let text = action.text.as_deref().unwrap_or("");
            let t = tm.edit(id, text)?.context("task vanished")?;
            Ok(format!("edited task {}: {}", t.id, t.text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Task;
    use crate::store::JsonStore;
    use tempfile::TempDir;

    fn at(s: &str) -> DateTime<Utc> {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn moods_by_life() {
        let cases = [
            (0, Mood::Dead),
            (-3, Mood::Dead),
            (95, Mood::Thriving),
            (90, Mood::Thriving),
            (70, Mood::Happy),
            (40, Mood::Idle),
            (20, Mood::Sad),
            (19, Mood::Critical),
            (1, Mood::Critical),
        ];
        for (life, mood) in cases {
            assert_eq!(Mood::from_life(life), mood, "life {life}");
        }
    }

    #[test]
    fn fresh_neko_uses_default_life() {
        let dir = TempDir::new().unwrap();
        let neko = Neko::load_at(&dir.path().join("neko.json"), 50, Utc::now());
        assert_eq!(neko.life(), 50);
        assert_eq!(neko.mood(), Mood::Idle);
    }

    #[test]
    fn heal_caps_and_revives() {
        let dir = TempDir::new().unwrap();
        let mut neko = Neko::load_at(&dir.path().join("neko.json"), 95, Utc::now());
        neko.heal();
        assert_eq!(neko.life(), 100);

        let mut dead = Neko::load_at(&dir.path().join("dead.json"), 0, Utc::now());
        assert!(dead.is_dead());
        dead.heal();
        assert_eq!(dead.life(), 20);
    }

    #[test]
    fn heal_by_stays_within_life_range() {
        let dir = TempDir::new().unwrap();
        let mut neko = Neko::load_at(&dir.path().join("neko.json"), 50, Utc::now());
        neko.heal_by(i64::MAX);
        assert_eq!(neko.life(), 100);
        neko.heal_by(-200);
        assert_eq!(neko.life(), 0);
        assert!(neko.is_dead());
    }

    #[test]
    fn decay_consumes_whole_hours() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("neko.json");
        std::fs::write(
            &path,
            r#"{"life": 50, "last_tick": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        let neko = Neko::load_at(&path, 50, at("2024-01-01T03:30:00Z"));
        assert_eq!(neko.life(), 47);
        assert_eq!(neko.state().last_tick, "2024-01-01T03:00:00Z");

        let starved = Neko::load_at(&path, 50, at("2024-01-10T00:00:00Z"));
        assert_eq!(starved.life(), 0);
    }

    #[test]
    fn state_without_tick_does_not_decay() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("neko.json");
        std::fs::write(&path, r#"{"life": 80}"#).unwrap();
        let neko = Neko::load_at(&path, 50, Utc::now());
        assert_eq!(neko.life(), 80);
        assert!(!neko.state().last_tick.is_empty());
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("neko.json");
        let mut neko = Neko::load_at(&path, 50, Utc::now());
        neko.heal();
        neko.save().unwrap();
        let again = Neko::load_at(&path, 50, Utc::now());
        assert_eq!(again.life(), 65);
    }

    #[test]
    fn render_shows_bar_or_ghost() {
        let dir = TempDir::new().unwrap();
        let neko = Neko::load_at(&dir.path().join("a.json"), 50, Utc::now());
        let out = neko.render();
        assert!(out.starts_with("( o.o ) IDLE"));
        assert!(out.ends_with(&format!("[{}{}] 50%", "█".repeat(10), "░".repeat(10))));

        let dead = Neko::load_at(&dir.path().join("b.json"), 0, Utc::now());
        assert!(dead.render().contains("GHOST (complete a task to revive)"));
        assert!(dead.status_line().contains("GHOST"));
    }

    #[test]
    fn scripted_actions_heal_on_completion() {
        let dir = TempDir::new().unwrap();
        let neko = Rc::new(RefCell::new(Neko::load_at(
            &dir.path().join("neko.json"),
            50,
            Utc::now(),
        )));
        let mut tm =
            TaskManager::load(Box::new(JsonStore::<Task>::new(dir.path().join("tasks.json"))))
                .unwrap();
        tm.set_completion_hook(healing_hook(Rc::clone(&neko)));

        let actions = parse_actions(
            r#"[{"action": "add", "text": "feed cat"},
                {"action": "add", "text": "walk"},
                {"action": "toggle", "index": 0},
                {"action": "edit", "index": 1, "text": "walk dog"},
                {"action": "delete", "index": 5}]"#,
        )
        .unwrap();
        let out = run_actions(&mut tm, &actions);
        assert_eq!(out[2], "toggled 1: completed");
        assert_eq!(out[3], "edited task 2: walk dog");
        assert!(out[4].starts_with("skipped delete"));
        assert_eq!(neko.borrow().life(), 65);

        let persisted = Neko::load_at(&dir.path().join("neko.json"), 50, Utc::now());
        assert_eq!(persisted.life(), 65);
    }

    #[test]
    fn bad_action_script_is_an_error() {
        assert!(parse_actions(r#"[{"action": "explode"}]"#).is_err());
    }
}
