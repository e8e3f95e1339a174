use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::agent::Agent;
use crate::config::Config;
use crate::docs::DocumentManager;
use crate::llm::{self, Llm};
use crate::neko::{healing_hook, Neko};
use crate::notes::NoteManager;
use crate::store::{make_document_store, make_note_store, make_task_store};
use crate::tasks::TaskManager;

/// Everything a command needs, opened from one [`Config`].
///
/// Task completion is wired to heal the neko, so every surface (CLI, chat,
/// TUI, scripted actions) shares that behavior.
pub struct Workspace {
    pub config: Config,
    pub tasks: TaskManager,
    pub notes: NoteManager,
    pub docs: DocumentManager,
    pub agent: Agent,
    pub neko: Rc<RefCell<Neko>>,
}

impl Workspace {
    pub fn open(config: Config) -> Result<Self> {
        let llm = llm::from_config(&config);
        Self::open_with_llm(config, llm)
    }

    pub fn open_with_llm(config: Config, llm: Box<dyn Llm>) -> Result<Self> {
        let paths = config.paths();
        let mut tasks = TaskManager::load(make_task_store(config.backend, &paths)?)?;
        let notes = NoteManager::load(make_note_store(config.backend, &paths)?)?;
        let docs = DocumentManager::load(make_document_store(&paths)?);
        let neko = Rc::new(RefCell::new(Neko::load(&paths.neko_json())));
        tasks.set_completion_hook(healing_hook(Rc::clone(&neko)));
        Ok(Self {
            config,
            tasks,
            notes,
            docs,
            agent: Agent::new(llm),
            neko,
        })
    }

    /// Re-read every store after an outside change. The neko is replaced in
    /// place so the completion hook keeps pointing at it.
    pub fn reload(&mut self) -> Result<()> {
        let paths = self.config.paths();
        self.tasks.reload()?;
        self.notes = NoteManager::load(make_note_store(self.config.backend, &paths)?)?;
        self.docs = DocumentManager::load(make_document_store(&paths)?);
        *self.neko.borrow_mut() = Neko::load(&paths.neko_json());
        Ok(())
    }

    /// Wipe tasks, notes, documents and chat history. The neko is kept.
    pub fn reset(&mut self) -> Result<()> {
        self.tasks.replace_all(Vec::new())?;
        self.notes.replace_all(Vec::new())?;
        self.docs.replace_all(Vec::new())?;
        let history = self.config.paths().chat_history();
        if history.exists() {
            std::fs::remove_file(&history)
                .with_context(|| format!("failed to remove {}", history.display()))?;
        }
        tracing::info!(data_dir = %self.config.data_dir.display(), "workspace reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::NoLlm;
    use crate::store::Backend;
    use tempfile::TempDir;

    #[test]
    fn completing_a_task_heals_the_neko() {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path(), Backend::Json);
        let mut ws = Workspace::open_with_llm(config, Box::new(NoLlm)).unwrap();
        let before = ws.neko.borrow().life();
        let t = ws.tasks.add("finish me", 3, vec![]).unwrap();
        ws.tasks.toggle(t.id).unwrap();
        assert_eq!(ws.neko.borrow().life(), (before + 15).min(100));
    }

    #[test]
    fn reset_wipes_every_store() {
        let dir = TempDir::new().unwrap();
        let config = Config::new(dir.path(), Backend::Sqlite);
        let mut ws = Workspace::open_with_llm(config.clone(), Box::new(NoLlm)).unwrap();
        ws.tasks.add("t", 3, vec![]).unwrap();
        ws.notes.add("n", None).unwrap();
        ws.docs.add("d", "body", vec![], vec![]).unwrap();
        ws.reset().unwrap();

        let ws = Workspace::open_with_llm(config, Box::new(NoLlm)).unwrap();
        assert!(ws.tasks.tasks().is_empty());
        assert!(ws.notes.list().is_empty());
        assert!(ws.docs.list().is_empty());
    }
}
