//! JSON output for machine consumers
//!
//! When the --json-progress flag is enabled, all progress and status
//! information is emitted as JSON lines to stdout, suppressing the styled
//! terminal output.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum JsonMessage {
    /// Progress update
    Progress {
        current: usize,
        total: usize,
        message: String,
    },
    /// File conversion completed
    FileCompleted {
        input_path: String,
        output_path: String,
        duration_ms: u128,
    },
    /// File conversion failed
    FileFailed { input_path: String, error: String },
    /// Batch summary
    Summary {
        total_files: usize,
        succeeded: usize,
        failed: usize,
        success_rate: f64,
        duration_secs: f64,
    },
}

impl JsonMessage {
    /// Emit JSON message to stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    /// Create and emit progress message
    pub fn progress(current: usize, total: usize, message: impl Into<String>) {
        Self::Progress {
            current,
            total,
            message: message.into(),
        }
        .emit();
    }

    /// Create and emit file completed message
    pub fn file_completed(input_path: &Path, output_path: &Path, duration_ms: u128) {
        Self::FileCompleted {
            input_path: input_path.display().to_string(),
            output_path: output_path.display().to_string(),
            duration_ms,
        }
        .emit();
    }

    /// Create and emit file failed message
    pub fn file_failed(input_path: &Path, error: impl Into<String>) {
        Self::FileFailed {
            input_path: input_path.display().to_string(),
            error: error.into(),
        }
        .emit();
    }

    /// Create and emit summary message
    pub fn summary(
        total_files: usize,
        succeeded: usize,
        failed: usize,
        success_rate: f64,
        duration_secs: f64,
    ) {
        Self::Summary {
            total_files,
            succeeded,
            failed,
            success_rate,
            duration_secs,
        }
        .emit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_serialize_with_type_tag() {
        let msg = JsonMessage::FileFailed {
            input_path: "a.png".into(),
            error: "unreadable".into(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"filefailed\""));
        assert!(json.contains("unreadable"));

        let msg = JsonMessage::Summary {
            total_files: 10,
            succeeded: 7,
            failed: 3,
            success_rate: 70.0,
            duration_secs: 1.5,
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"success_rate\":70.0"));
    }
}
