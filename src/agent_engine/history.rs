use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::ClickResult;

/// One line of the session journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub ts: i64,
    pub step: u64,
    pub kind: String,
    pub action: Option<String>,
    pub arguments: Option<serde_json::Value>,
    pub outcome: Option<String>,
}

impl JournalEntry {
    pub fn new(step: u64, kind: &str) -> Self {
        Self {
            ts: chrono::Utc::now().timestamp_millis(),
            step,
            kind: kind.into(),
            action: None,
            arguments: None,
            outcome: None,
        }
    }

    pub fn action(mut self, name: &str, arguments: &serde_json::Value) -> Self {
        self.action = Some(name.into());
        self.arguments = Some(arguments.clone());
        self
    }

    pub fn outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }
}

/// Append-only JSONL record of one task run.
pub struct SessionHistory {
    pub session_id: String,
    file_path: PathBuf,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::in_dir(&sessions_dir())
    }

    pub fn in_dir(dir: &Path) -> Self {
        let session_id = uuid::Uuid::new_v4().to_string();
        let file_path = dir.join(format!("session_{session_id}.jsonl"));
        Self {
            session_id,
            file_path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn append(&self, entry: &JournalEntry) -> ClickResult<()> {
        let line = serde_json::to_string(entry)?;
        if let Some(parent) = self.file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Like [`append`](Self::append) but a write failure is only logged.
    pub fn record(&self, entry: JournalEntry) {
        if let Err(e) = self.append(&entry) {
            tracing::warn!(path = %self.file_path.display(), error = %e, "journal write failed");
        }
    }
}

impl Default for SessionHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// `<data_local_dir>/clickclickclick/sessions`, or `./sessions` when the
/// platform has no data directory.
fn sessions_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("clickclickclick"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sessions")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_json_line_per_entry() {
        let dir = std::env::temp_dir().join(format!("ccc_journal_{}", uuid::Uuid::new_v4()));
        let journal = SessionHistory::in_dir(&dir);
        journal.record(JournalEntry::new(1, "task").outcome("open settings"));
        journal.record(
            JournalEntry::new(1, "action")
                .action("click_at_a_point", &serde_json::json!({ "x": 1, "y": 2 }))
                .outcome("true"),
        );

        let body = std::fs::read_to_string(journal.path()).expect("journal exists");
        let lines: Vec<JournalEntry> = body
            .lines()
            .map(|l| serde_json::from_str(l).expect("valid json line"))
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].action.as_deref(), Some("click_at_a_point"));
        assert_eq!(lines[1].arguments.as_ref().expect("args")["y"], 2);
        let _ = std::fs::remove_dir_all(dir);
    }
}
