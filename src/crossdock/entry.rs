//! Result entries reported back to the orchestrator.

use serde::{Deserialize, Serialize};

/// Outcome of a single check within a behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Skipped,
}

/// One recorded outcome plus diagnostic text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub status: Status,
    pub output: String,
}

impl Entry {
    pub fn new(status: Status, output: impl Into<String>) -> Self {
        Self {
            status,
            output: output.into(),
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == Status::Passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_serializes_lowercase_status() {
        let entry = Entry::new(Status::Skipped, "not here");
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"status":"skipped","output":"not here"}"#);
    }

    #[test]
    fn test_entry_parses_orchestrator_shape() {
        let entry: Entry = serde_json::from_str(r#"{"status":"passed","output":"ok"}"#).unwrap();
        assert!(entry.is_passed());
        assert_eq!(entry.output, "ok");
    }
}
