use super::{CHAT_TIMESTAMP_FORMAT, ChatMessage, STATUS_SUBMITTED, Submission, SubmittedAt};
use crate::ServiceError;
use crate::config::SubmissionConfig;
use crate::notice::Notice;
use chrono::{Local, NaiveDateTime};
use slog::{Logger, info, warn};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const PERSISTED_COLUMNS: [&str; 6] = [
    "Timestamp",
    "Learner Name",
    "Module/Task",
    "Filename",
    "File Path",
    "Status",
];

pub const CHAT_COLUMN: &str = "Chat";

/// The submission table of one session, loaded from the CSV file once and
/// written back in full after every new submission.
pub struct SubmissionStore {
    upload_dir: PathBuf,
    submissions_file: PathBuf,
    chat_dir: Option<PathBuf>,
    records: Vec<Submission>,
    /// Set when the CSV existed but could not be read; the file is then
    /// never rewritten.
    file_unreadable: bool,
    logger: Logger,
}

impl SubmissionStore {
    pub fn ensure_upload_dir(path: &Path) -> Result<(), ServiceError> {
        fs::create_dir_all(path).map_err(|source| ServiceError::UploadDirectory {
            path: path.display().to_string(),
            source,
        })
    }

    /// Creates the upload directory and loads the CSV. Recoverable problems
    /// with the file come back as notices; only directory creation is fatal.
    pub fn initialize(
        config: &SubmissionConfig,
        logger: Logger,
    ) -> Result<(Self, Vec<Notice>), ServiceError> {
        let upload_dir = PathBuf::from(&config.upload_dir);
        Self::ensure_upload_dir(&upload_dir)?;

        let chat_dir = if config.persist_chat {
            let dir = PathBuf::from(&config.chat_dir);
            fs::create_dir_all(&dir)?;
            Some(dir)
        } else {
            None
        };

        let mut store = Self {
            upload_dir,
            submissions_file: PathBuf::from(&config.submissions_file),
            chat_dir,
            records: Vec::new(),
            file_unreadable: false,
            logger,
        };

        let mut notices = Vec::new();
        match read_submissions(&store.submissions_file) {
            Ok((records, warnings)) => {
                store.records = records;
                notices.extend(warnings.into_iter().map(Notice::warning));
            }
            Err(e) => {
                store.file_unreadable = true;
                notices.push(Notice::error(format!("Error loading submissions file: {}", e)));
            }
        }
        if store.chat_dir.is_some() {
            notices.extend(store.restore_chats().into_iter().map(Notice::warning));
        }

        for notice in &notices {
            warn!(store.logger, "{}", notice.text; "file" => store.submissions_file.display().to_string());
        }
        info!(store.logger, "Submission store ready";
            "records" => store.records.len(),
            "persist_chat" => store.chat_dir.is_some());

        Ok((store, notices))
    }

    pub fn records(&self) -> &[Submission] {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&Submission> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Appends a record with an empty chat and rewrites the CSV. The record
    /// stays in memory even when the write fails.
    pub fn add_submission_to_state(
        &mut self,
        timestamp: NaiveDateTime,
        learner_name: &str,
        module_task: &str,
        filename: &str,
        file_path: &str,
        status: &str,
    ) -> Result<(), ServiceError> {
        self.records.push(Submission {
            timestamp: SubmittedAt::from(timestamp),
            learner_name: learner_name.to_string(),
            module_task: module_task.to_string(),
            filename: filename.to_string(),
            file_path: file_path.to_string(),
            status: status.to_string(),
            chat: Vec::new(),
        });
        info!(self.logger, "Submission added"; "learner" => learner_name, "file" => file_path);

        self.save_submission_record()
    }

    /// Appends a chat message to the record at `index`. Without chat
    /// persistence the message only lives in this store.
    pub fn add_chat_message(
        &mut self,
        index: usize,
        author: &str,
        message: &str,
    ) -> Result<ChatMessage, ServiceError> {
        let submission = self
            .records
            .get_mut(index)
            .ok_or(ServiceError::InvalidSubmissionIndex(index))?;

        let entry = ChatMessage {
            author: author.to_string(),
            message: message.to_string(),
            timestamp: Local::now().format(CHAT_TIMESTAMP_FORMAT).to_string(),
        };
        match &self.chat_dir {
            Some(dir) => {
                let mut chat = submission.chat.clone();
                chat.push(entry.clone());
                write_chat(dir, &submission.file_path, &chat)?;
                submission.chat = chat;
            }
            None => submission.chat.push(entry.clone()),
        }

        Ok(entry)
    }

    fn save_submission_record(&self) -> Result<(), ServiceError> {
        if self.file_unreadable {
            let path = self.submissions_file.display().to_string();
            warn!(self.logger, "Not overwriting unreadable submissions file"; "file" => &path);
            return Err(ServiceError::SubmissionsFileUnreadable(path));
        }
        write_submissions(&self.submissions_file, &self.records).map_err(|e| {
            warn!(self.logger, "Error saving submission record to CSV"; "error" => e.to_string());
            e
        })
    }

    fn restore_chats(&mut self) -> Vec<String> {
        let Some(dir) = &self.chat_dir else {
            return Vec::new();
        };

        let mut warnings = Vec::new();
        for submission in &mut self.records {
            let Some(path) = chat_file(dir, &submission.file_path) else {
                continue;
            };
            match fs::read_to_string(&path) {
                Ok(text) => match serde_json::from_str::<Vec<ChatMessage>>(&text) {
                    Ok(chat) => submission.chat = chat,
                    Err(e) => warnings.push(format!(
                        "Chat history in {} could not be read ({}); starting it empty.",
                        path.display(),
                        e
                    )),
                },
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warnings.push(format!(
                    "Chat history in {} could not be opened ({}).",
                    path.display(),
                    e
                )),
            }
        }
        warnings
    }
}

/// Reads the CSV into records plus warnings about what had to be defaulted.
/// A missing file is an empty table.
pub fn read_submissions(path: &Path) -> Result<(Vec<Submission>, Vec<String>), ServiceError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok((Vec::new(), Vec::new())),
        Err(e) => return Err(e.into()),
    };

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let mut warnings = Vec::new();

    if headers.iter().all(|h| h.trim().is_empty()) {
        warnings.push(
            "Issue loading submissions or chat history (no columns to parse from file), initializing fresh state."
                .to_string(),
        );
        return Ok((Vec::new(), warnings));
    }

    let position = |name: &str| headers.iter().position(|h| h.trim() == name);
    let columns: Vec<Option<usize>> = PERSISTED_COLUMNS.iter().map(|c| position(*c)).collect();
    for (name, column) in PERSISTED_COLUMNS.iter().zip(&columns) {
        if column.is_none() {
            warnings.push(format!(
                "Submissions file has no '{}' column; using default values.",
                name
            ));
        }
    }
    let chat_column = position(CHAT_COLUMN);

    let mut records = Vec::new();
    for (row, record) in reader.byte_records().enumerate() {
        let record = record?;
        let cell = |column: Option<usize>| {
            column
                .and_then(|i| record.get(i))
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default()
        };

        let chat = match chat_column.and_then(|i| record.get(i)) {
            Some(raw) => decode_chat(raw).unwrap_or_else(|e| {
                warnings.push(format!(
                    "Chat history for row {} could not be read ({}); starting it empty.",
                    row, e
                ));
                Vec::new()
            }),
            None => Vec::new(),
        };

        let status = match cell(columns[5]) {
            status if status.is_empty() => STATUS_SUBMITTED.to_string(),
            status => status,
        };

        records.push(Submission {
            timestamp: SubmittedAt::parse(&cell(columns[0])),
            learner_name: cell(columns[1]),
            module_task: cell(columns[2]),
            filename: cell(columns[3]),
            file_path: cell(columns[4]),
            status,
            chat,
        });
    }

    Ok((records, warnings))
}

/// Overwrites `path` with every record, leaving out the chat column.
pub fn write_submissions(path: &Path, records: &[Submission]) -> Result<(), ServiceError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(PERSISTED_COLUMNS)?;
    for record in records {
        let timestamp = record.timestamp.to_csv();
        writer.write_record([
            timestamp.as_str(),
            record.learner_name.as_str(),
            record.module_task.as_str(),
            record.filename.as_str(),
            record.file_path.as_str(),
            record.status.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Only JSON arrays are chat; any other non-empty text is ignored.
fn decode_chat(raw: &[u8]) -> Result<Vec<ChatMessage>, String> {
    let raw = std::str::from_utf8(raw).map_err(|e| e.to_string())?.trim();
    if raw.starts_with('[') {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    } else {
        Ok(Vec::new())
    }
}

fn chat_file(dir: &Path, file_path: &str) -> Option<PathBuf> {
    let name = Path::new(file_path).file_name()?;
    Some(dir.join(format!("{}.chat.json", name.to_string_lossy())))
}

fn write_chat(dir: &Path, file_path: &str, chat: &[ChatMessage]) -> Result<(), ServiceError> {
    let Some(path) = chat_file(dir, file_path) else {
        return Ok(());
    };
    fs::write(path, serde_json::to_vec_pretty(chat)?)?;
    Ok(())
}
