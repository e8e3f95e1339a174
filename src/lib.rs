//! Personal tasks, notes and documents, with heuristic and LLM-backed advice
//! and a virtual pet that thrives when tasks get done.

pub mod agent;
pub mod bundle;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod docs;
pub mod llm;
pub mod model;
pub mod neko;
pub mod notes;
pub mod output;
pub mod repl;
pub mod store;
pub mod tasks;
pub mod tui;
pub mod validate;
pub mod workspace;
