pub mod config;
pub mod error;
pub mod forum;
pub mod html;
pub mod notice;
pub mod session;
pub mod submission;

use thiserror::Error;

/// Custom error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error("Error creating upload directory {path}: {source}")]
    UploadDirectory {
        path: String,
        source: std::io::Error,
    },

    #[error("Submissions file {0} could not be read at startup; not overwriting it")]
    SubmissionsFileUnreadable(String),

    #[error("Invalid submission index: {0}")]
    InvalidSubmissionIndex(usize),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Utility functions
pub mod utils {
    use uuid::Uuid;

    /// Short random id such as `topic_1a2b3c4d`.
    pub fn generate_prefixed_id(prefix: &str) -> String {
        let hex = Uuid::new_v4().simple().to_string();
        format!("{}_{}", prefix, &hex[..8])
    }
}

pub mod logger {
    use slog::{Drain, Logger, o};
    use slog_async;
    use slog_envlogger;
    use slog_term;

    pub fn init_root_logger() -> Logger {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::FullFormat::new(decorator).build().fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        let drain = slog_envlogger::new(drain).fuse();

        Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
    }

    pub fn create_child_logger(parent: &Logger, module: &str) -> Logger {
        parent.new(o!("module" => module.to_string()))
    }

    /// Logger that drops every record, used where no output is wanted.
    pub fn discard() -> Logger {
        Logger::root(slog::Discard, o!())
    }
}
