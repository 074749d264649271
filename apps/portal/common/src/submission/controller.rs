use super::store::SubmissionStore;
use super::upload::{PreviewKind, preview_kind, stored_filename, write_upload};
use super::{MODULE_OPTIONS, OTHER_MODULE, STATUS_SUBMITTED, Submission};
use crate::ServiceError;
use crate::config::SubmissionConfig;
use crate::notice::Notice;
use chrono::Local;
use slog::Logger;
use std::path::Path;
use tracing::{error, info};

pub const DEFAULT_CHAT_AUTHOR: &str = "Mentor";

/// One browser session's copy of the submission table plus pending notices.
pub struct SubmissionSession {
    pub store: SubmissionStore,
    notices: Vec<Notice>,
}

impl SubmissionSession {
    pub fn open(config: &SubmissionConfig, logger: Logger) -> Result<Self, ServiceError> {
        let (store, notices) = SubmissionStore::initialize(config, logger)?;
        Ok(Self { store, notices })
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }
}

#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionForm {
    pub learner_name: String,
    pub module_option: String,
    pub custom_module: String,
    pub file: Option<UploadedFile>,
}

impl SubmissionForm {
    /// The selected module, or the free-text one when "Other" is picked.
    pub fn final_module(&self) -> &str {
        if self.module_option == OTHER_MODULE {
            self.custom_module.trim()
        } else {
            self.module_option.trim()
        }
    }
}

pub async fn submit_work(session: &mut SubmissionSession, form: SubmissionForm) {
    let learner_name = form.learner_name.trim();
    let module_task = form.final_module();

    if learner_name.is_empty() {
        session.push_notice(Notice::warning("Please enter your name."));
        return;
    }
    if module_task.is_empty() {
        session.push_notice(Notice::warning("Please select or specify the module/task."));
        return;
    }
    let Some(file) = form.file.as_ref().filter(|f| !f.filename.is_empty()) else {
        session.push_notice(Notice::warning("Please upload a file."));
        return;
    };

    let now = Local::now().naive_local();
    let unique_filename = stored_filename(&now, learner_name, module_task, &file.filename);
    let save_path = match write_upload(session.store.upload_dir(), &unique_filename, &file.bytes).await {
        Ok(path) => path,
        Err(e) => {
            error!("Failed to write upload {}: {}", unique_filename, e);
            session.push_notice(Notice::error(format!(
                "An error occurred during submission: {}",
                e
            )));
            return;
        }
    };
    let save_path = save_path.display().to_string();

    if let Err(e) = session.store.add_submission_to_state(
        now,
        learner_name,
        module_task,
        &file.filename,
        &save_path,
        STATUS_SUBMITTED,
    ) {
        session.push_notice(Notice::error(format!(
            "Error saving submission record to CSV: {}",
            e
        )));
    }

    info!("Stored {} for {} at {}", file.filename, learner_name, save_path);
    session.push_notice(Notice::success(format!(
        "Success! Your work '{}' for '{}' has been submitted.",
        file.filename, module_task
    )));
}

pub fn send_comment(session: &mut SubmissionSession, index: usize, author: &str, comment: &str) {
    if comment.trim().is_empty() {
        session.push_notice(Notice::warning("Please enter a comment before sending."));
        return;
    }
    let author = match author.trim() {
        "" => DEFAULT_CHAT_AUTHOR,
        author => author,
    };

    match session.store.add_chat_message(index, author, comment) {
        Ok(_) => {}
        Err(ServiceError::InvalidSubmissionIndex(_)) => {
            session.push_notice(Notice::error(
                "Could not add chat message: Invalid submission index.",
            ));
        }
        Err(e) => {
            error!("Failed to save chat for submission {}: {}", index, e);
            session.push_notice(Notice::error(format!("Could not save chat history: {}", e)));
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedSubmission {
    pub index: usize,
    pub submission: Submission,
    pub preview: PreviewKind,
    /// Set when the stored file is gone.
    pub file_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPage {
    pub notices: Vec<Notice>,
    pub module_options: Vec<&'static str>,
    pub entries: Vec<(usize, String)>,
    pub selected: Option<SelectedSubmission>,
}

/// Builds the page without touching state beyond draining notices.
pub fn build_page(session: &mut SubmissionSession, selected: Option<usize>) -> SubmissionPage {
    let entries = session
        .store
        .records()
        .iter()
        .enumerate()
        .map(|(i, s)| (i, s.label()))
        .collect();

    let selected = selected.and_then(|index| {
        let submission = session.store.get(index)?.clone();
        let file_error = (!Path::new(&submission.file_path).is_file()).then(|| {
            format!(
                "Error: File not found at path '{}'. It might have been moved or deleted.",
                submission.file_path
            )
        });
        Some(SelectedSubmission {
            index,
            preview: preview_kind(&submission.filename),
            submission,
            file_error,
        })
    });

    SubmissionPage {
        notices: session.take_notices(),
        module_options: MODULE_OPTIONS.to_vec(),
        entries,
        selected,
    }
}
