use anyhow::{bail, Result};

use crate::model::Record;

/// Validate a task priority: must be in 1..=5
pub fn validate_priority(priority: u8) -> Result<()> {
    if !(1..=5).contains(&priority) {
        bail!("invalid priority {priority}: must be between 1 and 5");
    }
    Ok(())
}

/// Split a comma-separated tag list, dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Map a 1-based display index onto the id of the record at that position.
pub fn resolve_display_index<R: Record>(records: &[R], display_index: usize) -> Result<i64> {
    if display_index == 0 || display_index > records.len() {
        bail!(
            "invalid index {display_index}: expected 1..={}",
            records.len()
        );
    }
    Ok(records[display_index - 1].id())
}

/// Validate free text entered for a task, note or detail.
pub fn validate_text(what: &str, text: &str) -> Result<()> {
    if text.trim().is_empty() {
        bail!("{what} must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Note;

    fn note(id: i64) -> Note {
        Note {
            id,
            text: format!("n{id}"),
            created: String::new(),
            details: vec![],
            task_id: None,
        }
    }

    #[test]
    fn valid_priorities() {
        for p in 1..=5 {
            assert!(validate_priority(p).is_ok());
        }
    }

    #[test]
    fn invalid_priorities() {
        assert!(validate_priority(0).is_err());
        assert!(validate_priority(6).is_err());
    }

    #[test]
    fn tags_trimmed_and_blanks_dropped() {
        assert_eq!(parse_tags(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn display_index_maps_position_to_id() {
        let notes = vec![note(4), note(9)];
        assert_eq!(resolve_display_index(&notes, 1).unwrap(), 4);
        assert_eq!(resolve_display_index(&notes, 2).unwrap(), 9);
        assert!(resolve_display_index(&notes, 0).is_err());
        assert!(resolve_display_index(&notes, 3).is_err());
    }

    #[test]
    fn blank_text_rejected() {
        assert!(validate_text("task text", "   ").is_err());
        assert!(validate_text("task text", "x").is_ok());
    }
}
