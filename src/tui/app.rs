use crate::model::Task;
use crate::workspace::Workspace;

/// A task as shown in the list.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub id: i64,
    pub text: String,
    pub completed: bool,
    pub priority: u8,
}

impl From<&Task> for TaskRow {
    fn from(t: &Task) -> Self {
        Self {
            id: t.id,
            text: t.text.clone(),
            completed: t.completed,
            priority: t.priority,
        }
    }
}

pub struct App {
    pub rows: Vec<TaskRow>,
    pub cursor: usize,
    /// Task id waiting for a `y` to be deleted.
    pub pending_delete: Option<i64>,
    pub message: Option<String>,
}

impl App {
    pub fn new(ws: &Workspace) -> Self {
        let mut app = App {
            rows: Vec::new(),
            cursor: 0,
            pending_delete: None,
            message: None,
        };
        app.refresh(ws);
        app
    }

    pub fn refresh(&mut self, ws: &Workspace) {
        self.rows = ws.tasks.tasks().iter().map(TaskRow::from).collect();
        // Clamp cursor
        if self.rows.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.rows.len() {
            self.cursor = self.rows.len() - 1;
        }
    }

    pub fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if !self.rows.is_empty() && self.cursor < self.rows.len() - 1 {
            self.cursor += 1;
        }
    }

    pub fn selected_id(&self) -> Option<i64> {
        self.rows.get(self.cursor).map(|r| r.id)
    }

    pub fn request_delete(&mut self) {
        if let Some(id) = self.selected_id() {
            self.pending_delete = Some(id);
            self.message = Some(format!("Delete task {id}? (y/n)"));
        }
    }

    pub fn cancel_delete(&mut self) {
        self.pending_delete = None;
        self.message = None;
    }
}
