//! Runtime configuration and on-disk layout.
//!
//! Everything lives under a single data directory (default: the current
//! working directory). Stores sit in `app_data/`, chat history in
//! `data_pkms/`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::store::Backend;

/// Which LLM adapter to build when a credential is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmMode {
    /// Real HTTP provider chosen from the available credential.
    #[default]
    Remote,
    /// Key detection only; summaries are produced locally.
    Stub,
    /// Always-available deterministic adapter for demos.
    Mock,
    /// Never call an LLM.
    Off,
}

impl LlmMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "remote" | "" => Ok(Self::Remote),
            "stub" => Ok(Self::Stub),
            "mock" => Ok(Self::Mock),
            "off" | "none" => Ok(Self::Off),
            _ => anyhow::bail!("invalid PKMS_LLM '{s}': must be remote, stub, mock, or off"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub backend: Backend,
    pub verbose: bool,
    pub neo4j_enabled: bool,
    pub llm_mode: LlmMode,
}

impl Config {
    pub fn new(data_dir: impl Into<PathBuf>, backend: Backend) -> Self {
        Self {
            data_dir: data_dir.into(),
            backend,
            verbose: false,
            neo4j_enabled: false,
            llm_mode: LlmMode::default(),
        }
    }

    pub fn paths(&self) -> DataPaths {
        DataPaths::new(&self.data_dir)
    }
}

/// Read an env flag the way the rest of the tooling does: only `1` is true.
pub fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

#[derive(Debug, Clone)]
pub struct DataPaths {
    pub root: PathBuf,
    pub app_data: PathBuf,
}

impl DataPaths {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            app_data: root.join("app_data"),
        }
    }

    pub fn ensure_app_data(&self) -> Result<()> {
        if !self.app_data.exists() {
            std::fs::create_dir_all(&self.app_data).with_context(|| {
                format!("failed to create directory {}", self.app_data.display())
            })?;
        }
        Ok(())
    }

    pub fn tasks_json(&self) -> PathBuf {
        self.app_data.join("tasks.json")
    }

    pub fn tasks_db(&self) -> PathBuf {
        self.app_data.join("tasks.db")
    }

    pub fn notes_json(&self) -> PathBuf {
        self.app_data.join("notes.json")
    }

    pub fn notes_db(&self) -> PathBuf {
        self.app_data.join("notes.db")
    }

    pub fn docs_json(&self) -> PathBuf {
        self.app_data.join("docs.json")
    }

    /// `TASK_NEKO_DATA_FILE` wins over the default location.
    pub fn neko_json(&self) -> PathBuf {
        match std::env::var("TASK_NEKO_DATA_FILE") {
            Ok(p) if !p.is_empty() => PathBuf::from(p),
            _ => self.app_data.join("neko.json"),
        }
    }

    pub fn llm_json(&self) -> PathBuf {
        self.app_data.join("llm.json")
    }

    pub fn chat_history(&self) -> PathBuf {
        self.root.join("data_pkms").join("chat_history.json")
    }

    /// Directories searched for data left behind by older layouts.
    pub fn legacy_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.root.join("data_pkms"),
            self.root.join("demo_data"),
            self.root.clone(),
        ]
    }
}
