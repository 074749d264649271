use ::config::{Config, ConfigError, Environment};
use dotenv::dotenv;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ForumConfig {
    pub database_url: String,
    pub bind_address: String,
    pub run_migrations: bool,
    pub session_idle_secs: u64,
    pub max_sessions: usize,
}

impl ForumConfig {
    pub fn new() -> Result<Self, ConfigError> {
        // Load environment variables from .env file
        dotenv().ok();

        let mut s = Config::new();
        s.set_default("bind_address", "0.0.0.0:8080")?;
        s.set_default("run_migrations", true)?;
        s.set_default("session_idle_secs", 1800i64)?;
        s.set_default("max_sessions", 500i64)?;

        // Eg.. `APP_DATABASE_URL=postgres://... would set the `database_url` key
        s.merge(Environment::with_prefix("APP"))?;

        s.try_into()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionConfig {
    pub bind_address: String,
    pub upload_dir: String,
    pub submissions_file: String,
    /// Write chat threads to JSON side-files in `chat_dir`.
    pub persist_chat: bool,
    pub chat_dir: String,
    /// Sessions unused for this long are dropped.
    pub session_idle_secs: u64,
    pub max_sessions: usize,
}

impl SubmissionConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let mut s = Config::new();
        s.set_default("bind_address", "0.0.0.0:8081")?;
        s.set_default("upload_dir", "uploaded_work_samples")?;
        s.set_default("submissions_file", "submissions.csv")?;
        s.set_default("persist_chat", false)?;
        s.set_default("chat_dir", "submission_chats")?;
        s.set_default("session_idle_secs", 1800i64)?;
        s.set_default("max_sessions", 500i64)?;

        s.merge(Environment::with_prefix("APP"))?;

        s.try_into()
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8081".to_string(),
            upload_dir: "uploaded_work_samples".to_string(),
            submissions_file: "submissions.csv".to_string(),
            persist_chat: false,
            chat_dir: "submission_chats".to_string(),
            session_idle_secs: 1800,
            max_sessions: 500,
        }
    }
}
