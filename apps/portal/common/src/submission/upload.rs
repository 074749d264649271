use crate::ServiceError;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

const MODULE_NAME_CHARS: usize = 20;

const IMAGE_EXTENSIONS: [&str; 4] = [".png", ".jpg", ".jpeg", ".gif"];
const VIDEO_EXTENSIONS: [&str; 4] = [".mp4", ".mov", ".avi", ".webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewKind {
    Image,
    Video,
    None,
}

/// Replaces every non-alphanumeric character with `_`.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// Extension of `filename` including the leading dot, or an empty string.
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// Browsers may send a full client path; keep only the final component.
pub fn client_filename(raw: &str) -> String {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw).to_string()
}

pub fn stored_filename(
    now: &NaiveDateTime,
    learner_name: &str,
    module_task: &str,
    original_filename: &str,
) -> String {
    let module_prefix: String = module_task.chars().take(MODULE_NAME_CHARS).collect();
    format!(
        "{}_{}_{}{}",
        now.format("%Y%m%d_%H%M%S"),
        sanitize(learner_name),
        sanitize(&module_prefix),
        file_extension(original_filename)
    )
}

/// Writes the uploaded bytes as `dir/filename`, replacing any existing file.
pub async fn write_upload(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf, ServiceError> {
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

pub fn preview_kind(filename: &str) -> PreviewKind {
    let ext = file_extension(filename).to_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        PreviewKind::Image
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        PreviewKind::Video
    } else {
        PreviewKind::None
    }
}

pub fn content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .to_string()
}
