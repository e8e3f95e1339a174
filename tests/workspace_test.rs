use pkms::bundle;
use pkms::chat::{ChatEngine, ChatHistory};
use pkms::config::Config;
use pkms::llm::NoLlm;
use pkms::store::Backend;
use pkms::workspace::Workspace;
use tempfile::TempDir;

fn open(dir: &TempDir, backend: Backend) -> Workspace {
    Workspace::open_with_llm(Config::new(dir.path(), backend), Box::new(NoLlm)).unwrap()
}

#[test]
fn json_and_sqlite_backends_agree() {
    let mut snapshots = Vec::new();
    for backend in [Backend::Json, Backend::Sqlite] {
        let dir = TempDir::new().unwrap();
        {
            let mut ws = open(&dir, backend);
            ws.tasks.add("Write report", 4, vec!["work".into()]).unwrap();
            ws.tasks.add("Buy milk", 2, vec![]).unwrap();
            ws.tasks.add_detail(1, "outline first").unwrap();
            ws.tasks.toggle(2).unwrap();
            ws.tasks.add("Throwaway", 3, vec![]).unwrap();
            assert!(ws.tasks.delete(3).unwrap());
            ws.notes.add("Ask about charts", Some(1)).unwrap();
            ws.notes.describe(1, "bar or line").unwrap();
        }

        // Everything must survive a reopen.
        let ws = open(&dir, backend);
        let tasks: Vec<_> = ws
            .tasks
            .tasks()
            .iter()
            .map(|t| (t.id, t.text.clone(), t.completed, t.priority, t.tags.clone(), t.details.clone()))
            .collect();
        let notes: Vec<_> = ws
            .notes
            .list()
            .iter()
            .map(|n| (n.id, n.text.clone(), n.task_id, n.details.clone()))
            .collect();
        snapshots.push((tasks, notes));
    }
    assert_eq!(snapshots[0], snapshots[1]);
    assert_eq!(snapshots[0].0.len(), 2);
    assert_eq!(snapshots[0].1[0].3, vec!["bar or line".to_string()]);
}

#[test]
fn export_then_import_appends_with_fresh_ids() {
    let src = TempDir::new().unwrap();
    let mut ws = open(&src, Backend::Json);
    ws.tasks.add("Plan sprint", 5, vec!["team".into()]).unwrap();
    ws.notes.add("retro notes", Some(1)).unwrap();
    ws.docs
        .add("Roadmap", "TODO: draft milestones", vec!["plan".into()], vec![])
        .unwrap();
    let file = src.path().join("bundle.json");
    bundle::export(&ws, &file).unwrap();

    let dst = TempDir::new().unwrap();
    let mut other = open(&dst, Backend::Sqlite);
    other.tasks.add("Existing", 3, vec![]).unwrap();
    let counts = bundle::import(&mut other, &file).unwrap();
    assert_eq!((counts.tasks, counts.notes, counts.documents), (1, 1, 1));

    let ids: Vec<i64> = other.tasks.tasks().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 2]);
    let imported = other.tasks.get(2).unwrap();
    assert_eq!(imported.text, "Plan sprint");
    assert_eq!(imported.priority, 5);
    assert_eq!(other.docs.search("milestones")[0].title, "Roadmap");

    // Imported data is persisted, not just held in memory.
    let reopened = open(&dst, Backend::Sqlite);
    assert_eq!(reopened.tasks.tasks().len(), 2);
    assert_eq!(reopened.notes.list().len(), 1);
}

#[test]
fn import_relinks_notes_to_renumbered_tasks() {
    let src = TempDir::new().unwrap();
    let mut ws = open(&src, Backend::Json);
    ws.tasks.add("a", 3, vec![]).unwrap();
    ws.tasks.add("b", 3, vec![]).unwrap();
    ws.notes.add("about a", Some(1)).unwrap();
    ws.notes.add("about b", Some(2)).unwrap();
    ws.notes.add("about a missing task", Some(42)).unwrap();
    let file = src.path().join("bundle.json");
    bundle::export(&ws, &file).unwrap();

    let dst = TempDir::new().unwrap();
    let mut other = open(&dst, Backend::Json);
    other.tasks.add("unrelated existing", 3, vec![]).unwrap();
    bundle::import(&mut other, &file).unwrap();

    let linked: Vec<_> = other
        .notes
        .list()
        .iter()
        .map(|n| {
            let task = n.task_id.and_then(|id| other.tasks.get(id));
            (n.text.as_str(), n.task_id, task.map(|t| t.text.as_str()))
        })
        .collect();
    assert_eq!(
        linked,
        vec![
            ("about a", Some(2), Some("a")),
            ("about b", Some(3), Some("b")),
            ("about a missing task", Some(42), None),
        ]
    );
}

#[test]
fn import_accepts_a_bare_task_array() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("tasks.json.bak");
    std::fs::write(
        &file,
        r#"[{"id": 7, "text": "old task", "created": "2024-01-01T00:00:00", "completed": true}]"#,
    )
    .unwrap();
    let mut ws = open(&dir, Backend::Json);
    let counts = bundle::import(&mut ws, &file).unwrap();
    assert_eq!(counts.tasks, 1);
    assert_eq!(ws.tasks.get(1).unwrap().text, "old task");
}

#[test]
fn reset_clears_data_and_chat_history() {
    let dir = TempDir::new().unwrap();
    let mut ws = open(&dir, Backend::Json);
    ws.tasks.add("to be deleted", 3, vec![]).unwrap();
    ws.notes.add("to be deleted", None).unwrap();
    {
        let history = ChatHistory::load(&ws.config.paths().chat_history());
        let mut engine = ChatEngine::new(&mut ws, history);
        engine.handle_message("suggest tasks").unwrap();
        engine.save_history().unwrap();
    }
    assert!(ws.config.paths().chat_history().exists());

    ws.reset().unwrap();
    assert!(!ws.config.paths().chat_history().exists());

    let ws = open(&dir, Backend::Json);
    assert!(ws.tasks.tasks().is_empty());
    assert!(ws.notes.list().is_empty());
    assert!(ws.agent.productivity_advice(ws.tasks.tasks(), ws.docs.list())[0].starts_with("Tasks: 0 open / 0 done"));
}

#[test]
fn review_counts_only_todays_records() {
    let dir = TempDir::new().unwrap();
    let mut ws = open(&dir, Backend::Sqlite);
    ws.tasks.add("Task added today for review", 3, vec![]).unwrap();
    ws.notes.add("Note added today for review", None).unwrap();

    let today = chrono::Utc::now().date_naive();
    assert_eq!(ws.tasks.added_on(today).len(), 1);
    assert_eq!(ws.notes.added_on(today).len(), 1);
    let yesterday = today.pred_opt().unwrap();
    assert!(ws.tasks.added_on(yesterday).is_empty());

    let report = pkms::output::format_review(today, &ws.tasks.added_on(today), &ws.notes.added_on(today));
    assert!(report.contains("Tasks added today: 1"));
    assert!(report.contains("Note added today for review"));
}

#[test]
fn chat_crud_flow() {
    let dir = TempDir::new().unwrap();
    let mut ws = open(&dir, Backend::Json);
    let life_before = ws.neko.borrow().life();
    {
        let history = ChatHistory::load(&ws.config.paths().chat_history());
        let mut engine = ChatEngine::new(&mut ws, history);

        assert_eq!(engine.handle_message("add task Draft proposal").unwrap(), "Added task 1: Draft proposal");
        assert_eq!(
            engine.handle_message("edit task 1 to Draft the Q3 proposal").unwrap(),
            "Edited task 1: Draft the Q3 proposal"
        );
        assert_eq!(engine.handle_message("select task 1").unwrap(), "selected task 1");
        assert_eq!(engine.handle_message("add detail gather numbers").unwrap(), "Added detail to task 1");

        let ask = engine.handle_message("complete task 1").unwrap();
        assert!(ask.starts_with("Please confirm"));
        assert_eq!(engine.handle_message("yes").unwrap(), "Completed task 1");

        engine.handle_message("add task Scratch").unwrap();
        engine.handle_message("delete task 2").unwrap();
        assert_eq!(engine.handle_message("no").unwrap(), "Cancelled.");
        engine.handle_message("delete task 2").unwrap();
        assert_eq!(engine.handle_message("y").unwrap(), "Deleted");

        engine.save_history().unwrap();
    }

    let task = ws.tasks.get(1).unwrap();
    assert!(task.completed);
    assert_eq!(task.details, vec!["gather numbers".to_string()]);
    assert!(ws.tasks.get(2).is_none());
    assert_eq!(ws.neko.borrow().life(), (life_before + 15).min(100));

    let history = ChatHistory::load(&ws.config.paths().chat_history());
    assert_eq!(history.entries().len(), 22);
    assert_eq!(history.entries()[0].role, "user");
    assert_eq!(history.entries()[1].role, "assistant");
}
