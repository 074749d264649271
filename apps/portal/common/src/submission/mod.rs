//! Work-sample submissions: a CSV-backed record table plus uploaded files.

pub mod controller;
pub mod render;
pub mod routes;
pub mod store;
pub mod upload;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

pub const STATUS_SUBMITTED: &str = "Submitted";

pub const OTHER_MODULE: &str = "Other";

pub const MODULE_OPTIONS: [&str; 6] = [
    "Module 1: Basic Wood Carving Techniques",
    "Module 2: Introduction to Pottery Wheel",
    "Task 3.1: Soldering Practice",
    "Project Alpha: Weaving Pattern Design",
    "Cultural Practice: Traditional Knot Tying - Step 1",
    OTHER_MODULE,
];

/// Format of chat message timestamps.
pub const CHAT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const TIMESTAMP_INPUT_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub author: String,
    pub message: String,
    pub timestamp: String,
}

/// Submission time as read from the CSV. Cells that do not parse are kept
/// as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmittedAt {
    Parsed(NaiveDateTime),
    Raw(String),
}

impl SubmittedAt {
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        TIMESTAMP_INPUT_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
            .map(SubmittedAt::Parsed)
            .unwrap_or_else(|| SubmittedAt::Raw(text.to_string()))
    }

    pub fn format(&self, fmt: &str) -> String {
        match self {
            SubmittedAt::Parsed(ts) => ts.format(fmt).to_string(),
            SubmittedAt::Raw(raw) => raw.clone(),
        }
    }

    fn to_csv(&self) -> String {
        self.format(CSV_TIMESTAMP_FORMAT)
    }
}

impl From<NaiveDateTime> for SubmittedAt {
    fn from(ts: NaiveDateTime) -> Self {
        SubmittedAt::Parsed(ts)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub timestamp: SubmittedAt,
    pub learner_name: String,
    pub module_task: String,
    pub filename: String,
    pub file_path: String,
    pub status: String,
    pub chat: Vec<ChatMessage>,
}

impl Submission {
    /// Selector label, e.g. `[2025-04-12 09:30] Ana - Module 1 (Submitted)`.
    pub fn label(&self) -> String {
        format!(
            "[{}] {} - {} ({})",
            self.timestamp.format("%Y-%m-%d %H:%M"),
            self.learner_name,
            self.module_task,
            self.status
        )
    }
}
