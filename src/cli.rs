use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::store::Backend;

#[derive(Parser, Debug)]
#[command(
    name = "pkms",
    about = "Tasks, notes and documents with an optional LLM advisor",
    after_help = "Examples: pkms add \"Buy milk\"; pkms advise; pkms dashboard"
)]
pub struct Cli {
    /// Storage backend for tasks and notes
    #[arg(long, value_enum, env = "PKMS_BACKEND", default_value = "json", global = true)]
    pub backend: Backend,

    /// Directory holding app_data/ and data_pkms/ [default: current directory]
    #[arg(long, env = "PKMS_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Enable debug logging (also PKMS_VERBOSE=1)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Add a task
    Add {
        /// Task text
        text: String,
        /// Priority, 1 (low) to 5 (urgent)
        #[arg(short, long, default_value = "3")]
        priority: u8,
        /// Comma-separated tags
        #[arg(short, long, default_value = "")]
        tags: String,
    },

    /// Edit a task's text, priority or tags
    Edit {
        /// Task id
        id: i64,
        /// New text
        text: Option<String>,
        /// New priority
        #[arg(short, long)]
        priority: Option<u8>,
        /// Replace tags (comma-separated)
        #[arg(short, long)]
        tags: Option<String>,
    },

    /// List tasks
    List {
        /// Hide completed tasks
        #[arg(long)]
        open: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a task, append a detail line, or remove one
    Describe {
        /// Task id
        id: i64,
        /// Detail to append (omit to show the task)
        detail: Option<String>,
        /// Remove the detail at this 0-based index instead
        #[arg(long, conflicts_with = "detail")]
        remove: Option<usize>,
    },

    /// Mark a task as completed
    Complete {
        /// Task id
        id: i64,
    },

    /// Flip a task between pending and completed
    Toggle {
        /// Task id
        id: i64,
    },

    /// Search task text, details and tags
    Search {
        query: String,
    },

    /// Delete a task
    Delete {
        /// Task id
        id: i64,
    },

    /// Manage notes
    Notes {
        #[command(subcommand)]
        command: NotesCommand,
    },

    /// Manage documents
    Doc {
        #[command(subcommand)]
        command: DocCommand,
    },

    /// Write tasks, notes and documents to one JSON file
    Export {
        path: PathBuf,
    },

    /// Append tasks, notes and documents from an export file
    Import {
        path: PathBuf,
    },

    /// Chat with the advisor (single message, or interactive when omitted)
    Chat {
        /// Message words
        message: Vec<String>,
        /// Select this task before chatting
        #[arg(long)]
        task_id: Option<i64>,
        /// Force an interactive session
        #[arg(short, long)]
        interactive: bool,
    },

    /// Show chat history
    ChatHistory,

    /// Suggest tasks from documents
    Suggest,

    /// Show productivity advice
    Advise,

    /// Show the dashboard
    Dashboard {
        /// Launch the interactive dashboard
        #[arg(long)]
        tui: bool,
        /// Poll interval in milliseconds
        #[arg(long, default_value = "1000")]
        poll_interval: u64,
    },

    /// Show what was added today
    Review,

    /// Interactive home menu
    Home,

    /// Show usage examples
    Instructions,

    /// Show environment and data paths
    Info,

    /// Delete all tasks, notes, documents and chat history
    Reset {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Interactive shell accepting commands or chat messages
    Shell,

    /// Store an LLM API key in app_data/llm.json
    SetupLlm {
        /// Provider (openai, anthropic)
        #[arg(long, default_value = "openai")]
        provider: String,
        /// API key (omit to be prompted)
        #[arg(long)]
        key: Option<String>,
    },

    /// Virtual pet that thrives on completed tasks
    Neko {
        #[command(subcommand)]
        command: NekoCommand,
    },
}

impl Command {
    /// Commands that read from the terminal and so cannot run inside the shell.
    pub fn is_interactive(&self) -> bool {
        match self {
            Command::Chat {
                message,
                interactive,
                ..
            } => *interactive || message.is_empty(),
            Command::Dashboard { tui, .. } => *tui,
            Command::Reset { yes } => !*yes,
            Command::SetupLlm { key, .. } => key.is_none(),
            Command::Home | Command::Shell => true,
            _ => false,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum NotesCommand {
    /// Add a note
    Add {
        text: String,
        /// Link the note to a task id
        #[arg(long = "task")]
        task_id: Option<i64>,
    },
    /// List notes with their display numbers
    List,
    /// Append a detail line to a note
    Describe {
        /// Note number as shown by `notes list`
        index: usize,
        detail: String,
    },
    /// Delete a note
    Delete {
        /// Note number as shown by `notes list`
        index: usize,
    },
    /// Search note text and details
    Search {
        query: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum DocCommand {
    /// Add a document
    Add {
        title: String,
        text: String,
        /// Comma-separated tags
        #[arg(short, long, default_value = "")]
        tags: String,
        /// Comma-separated links
        #[arg(short, long, default_value = "")]
        links: String,
    },
    /// List documents
    List,
    /// Ranked keyword search
    Search {
        query: String,
    },
    /// Show a document
    View {
        id: i64,
    },
    /// Delete a document
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum NekoCommand {
    /// Show the neko
    Status,
    /// Heal the neko by hand
    Heal {
        /// Life points to add (1-100)
        #[arg(long, default_value = "15", value_parser = clap::value_parser!(i64).range(1..=100))]
        amount: i64,
    },
    /// Reset life to the default
    Reset,
    /// Apply TASK_NEKO_TEST_ACTIONS to the task list
    Run,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pkms").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = parse(&["list", "--backend", "sqlite", "--data-dir", "/tmp/x"]);
        assert_eq!(cli.backend, Backend::Sqlite);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        assert!(matches!(cli.command, Some(Command::List { open: false, .. })));
    }

    #[test]
    fn chat_words_are_collected() {
        let cli = parse(&["chat", "suggest", "tasks"]);
        let Some(cmd @ Command::Chat { .. }) = cli.command else {
            panic!("expected chat");
        };
        assert!(!cmd.is_interactive());
        if let Command::Chat { message, .. } = cmd {
            assert_eq!(message, vec!["suggest", "tasks"]);
        }
    }

    #[test]
    fn interactive_classification() {
        assert!(parse(&["chat"]).command.unwrap().is_interactive());
        assert!(parse(&["reset"]).command.unwrap().is_interactive());
        assert!(!parse(&["reset", "--yes"]).command.unwrap().is_interactive());
        assert!(parse(&["dashboard", "--tui"]).command.unwrap().is_interactive());
        assert!(!parse(&["dashboard"]).command.unwrap().is_interactive());
    }

    #[test]
    fn notes_subcommands() {
        let cli = parse(&["notes", "add", "idea", "--task", "4"]);
        assert!(matches!(
            cli.command,
            Some(Command::Notes {
                command: NotesCommand::Add { task_id: Some(4), .. }
            })
        ));
    }

    #[test]
    fn neko_heal_amount_is_bounded() {
        assert!(matches!(
            parse(&["neko", "heal", "--amount", "100"]).command,
            Some(Command::Neko {
                command: NekoCommand::Heal { amount: 100 }
            })
        ));
        for bad in ["0", "-5", "101", "9223372036854775807"] {
            let args = ["pkms", "neko", "heal", "--amount", bad];
            assert!(Cli::try_parse_from(args).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn describe_detail_conflicts_with_remove() {
        let args = ["pkms", "describe", "1", "x", "--remove", "0"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
