use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PRIORITY: u8 = 3;

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub text: String,
    pub created: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub details: Vec<String>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Task {
    /// Returns display icon: x=done, space=open
    pub fn icon(&self) -> &'static str {
        if self.completed {
            "x"
        } else {
            " "
        }
    }

    pub fn status_str(&self) -> &'static str {
        if self.completed {
            "completed"
        } else {
            "pending"
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: i64,
    pub text: String,
    pub created: String,
    #[serde(default)]
    pub details: Vec<String>,
    /// Not checked against the task store; may dangle.
    #[serde(default)]
    pub task_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: String,
    pub text: String,
}

/// Anything persisted with an integer id assigned as `max + 1`.
pub trait Record {
    fn id(&self) -> i64;
}

impl Record for Task {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for Document {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Record for Note {
    fn id(&self) -> i64 {
        self.id
    }
}

pub fn next_id<R: Record>(records: &[R]) -> i64 {
    records.iter().map(Record::id).max().unwrap_or(0) + 1
}

/// Current time in the format stored in `created` fields.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse a stored timestamp. Timestamps without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// The calendar date a record was created on, if its timestamp parses.
pub fn created_date(raw: &str) -> Option<NaiveDate> {
    parse_timestamp(raw).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id_starts_at_one() {
        let empty: Vec<Task> = Vec::new();
        assert_eq!(next_id(&empty), 1);
    }

    #[test]
    fn next_id_uses_max_not_len() {
        let notes = vec![
            Note {
                id: 7,
                text: "a".into(),
                created: String::new(),
                details: vec![],
                task_id: None,
            },
            Note {
                id: 2,
                text: "b".into(),
                created: String::new(),
                details: vec![],
                task_id: Some(99),
            },
        ];
        assert_eq!(next_id(&notes), 8);
    }

    #[test]
    fn timestamps_with_and_without_offset() {
        let aware = parse_timestamp("2024-03-01T10:00:00+02:00").unwrap();
        assert_eq!(aware.to_rfc3339(), "2024-03-01T08:00:00+00:00");
        let naive = parse_timestamp("2024-03-01T10:00:00.123456").unwrap();
        assert_eq!(naive.to_rfc3339_opts(SecondsFormat::Secs, true), "2024-03-01T10:00:00Z");
        assert!(parse_timestamp("yesterday").is_none());
        assert_eq!(
            created_date("2024-03-01T23:59:59Z"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn now_timestamp_parses_back() {
        assert!(parse_timestamp(&now_timestamp()).is_some());
    }

    #[test]
    fn legacy_task_json_gets_defaults() {
        let task: Task =
            serde_json::from_str(r#"{"id": 1, "text": "old", "created": "t1", "completed": true}"#)
                .unwrap();
        assert_eq!(task.priority, DEFAULT_PRIORITY);
        assert!(task.details.is_empty());
        assert!(task.tags.is_empty());
        assert!(task.completed);
    }
}
