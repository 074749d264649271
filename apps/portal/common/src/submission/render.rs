use super::controller::{DEFAULT_CHAT_AUTHOR, SelectedSubmission, SubmissionPage};
use super::upload::PreviewKind;
use super::OTHER_MODULE;
use crate::html::{escape, layout, notices, paragraphs};

pub fn render_page(page: &SubmissionPage) -> String {
    let body = format!(
        "{}\n<h1>Work Sample Submission Portal</h1>\n<p>Upload your work samples here for progress verification.</p>\n{}\n<hr>\n{}\n<hr>\n<p class=\"caption\">Cross-Generation Knowledge Transfer Platform</p>",
        notices(&page.notices),
        submission_form(&page.module_options),
        review_section(page)
    );
    layout("Work Sample Submission Portal", None, &body)
}

fn submission_form(module_options: &[&str]) -> String {
    let options: String = module_options
        .iter()
        .map(|m| format!(r#"<option value="{0}">{0}</option>"#, escape(m)))
        .collect();

    format!(
        r#"<h2>Submit Your Work</h2>
<form method="post" action="/submissions" enctype="multipart/form-data">
<label>Your Name <input type="text" name="learner_name"></label>
<label>Module / Task <select name="module_option">{}</select></label>
<label>If '{}', please specify <input type="text" name="custom_module"></label>
<label>Upload your work sample (image, video, document) <input type="file" name="file"></label>
<button type="submit">Submit Work Sample</button>
</form>"#,
        options,
        OTHER_MODULE
    )
}

fn review_section(page: &SubmissionPage) -> String {
    let mut out = String::from(
        "<h2>Submission History &amp; Feedback</h2>\n<p class=\"caption\">Select a submission to view details, download the file, and add comments.</p>\n",
    );

    if page.entries.is_empty() {
        out.push_str(r#"<div class="notice notice-info">No submissions recorded yet.</div>"#);
        return out;
    }

    let selected_index = page.selected.as_ref().map(|s| s.index);
    let placeholder = format!(
        r#"<option value=""{}>Choose a submission to view...</option>"#,
        if selected_index.is_none() { " selected" } else { "" }
    );
    let options: String = page
        .entries
        .iter()
        .map(|(i, label)| {
            let marker = if Some(*i) == selected_index { " selected" } else { "" };
            format!(r#"<option value="{}"{}>{}</option>"#, i, marker, escape(label))
        })
        .collect();
    out.push_str(&format!(
        r#"<form method="get" action="/">
<label>Select a submission: <select name="selected">{}{}</select></label>
<button type="submit">Open</button>
</form>
"#,
        placeholder, options
    ));

    match &page.selected {
        Some(selected) => {
            out.push_str(&details(selected));
            out.push_str(&chat(selected));
        }
        None => out.push_str(
            r#"<div class="notice notice-info">Select a submission from the dropdown above to view details and chat.</div>"#,
        ),
    }
    out
}

fn details(selected: &SelectedSubmission) -> String {
    let s = &selected.submission;
    let mut out = format!(
        r#"<div class="card">
<h3>Submission Details &amp; Preview</h3>
<p><b>Learner:</b> {}</p>
<p><b>Module/Task:</b> {}</p>
<p><b>Submitted:</b> {}</p>
<p><b>Original Filename:</b> {}</p>
<p><b>Status:</b> {}</p>
"#,
        escape(&s.learner_name),
        escape(&s.module_task),
        escape(&s.timestamp.format("%Y-%m-%d %H:%M:%S")),
        escape(&s.filename),
        escape(&s.status)
    );

    match &selected.file_error {
        Some(error) => out.push_str(&format!(
            r#"<div class="notice notice-error">{}</div>"#,
            escape(error)
        )),
        None => {
            let href = format!("/submissions/{}/file", selected.index);
            match selected.preview {
                PreviewKind::Image => out.push_str(&format!(
                    r#"<img src="{}?inline=1" alt="{}" style="max-width:100%">"#,
                    href,
                    escape(&s.filename)
                )),
                PreviewKind::Video => out.push_str(&format!(
                    r#"<video src="{}?inline=1" controls style="max-width:100%"></video>"#,
                    href
                )),
                PreviewKind::None => {}
            }
            out.push_str(&format!(
                r#"<p><a href="{}">Download {}</a></p>"#,
                href,
                escape(&s.filename)
            ));
        }
    }
    out.push_str("</div>\n");
    out
}

fn chat(selected: &SelectedSubmission) -> String {
    let mut out = String::from("<h3>Mentor Feedback / Chat</h3>\n<div class=\"chat\">\n");

    if selected.submission.chat.is_empty() {
        out.push_str("<p class=\"caption\">No comments yet for this submission.</p>\n");
    }
    for msg in &selected.submission.chat {
        out.push_str(&format!(
            r#"<div class="card"><span class="stamp">{}</span><p><b>{}</b></p><div>{}</div></div>
"#,
            escape(&msg.timestamp),
            escape(&msg.author),
            paragraphs(&msg.message)
        ));
    }
    out.push_str("</div>\n");

    out.push_str(&format!(
        r#"<form method="post" action="/submissions/{}/chat">
<label>Your Name (for chat) <input type="text" name="author" value="{}"></label>
<label>Your comment / feedback<br><textarea name="message" rows="4"></textarea></label>
<button type="submit">Send Comment</button>
</form>"#,
        selected.index, DEFAULT_CHAT_AUTHOR
    ));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::{ChatMessage, MODULE_OPTIONS, STATUS_SUBMITTED, Submission, SubmittedAt};

    fn selected(preview: PreviewKind, chat: Vec<ChatMessage>) -> SelectedSubmission {
        SelectedSubmission {
            index: 0,
            submission: Submission {
                timestamp: SubmittedAt::Raw("2025-04-12 09:30:00".into()),
                learner_name: "Ana <3".into(),
                module_task: MODULE_OPTIONS[0].into(),
                filename: "bowl.png".into(),
                file_path: "uploads/bowl.png".into(),
                status: STATUS_SUBMITTED.into(),
                chat,
            },
            preview,
            file_error: None,
        }
    }

    fn page(selected: Option<SelectedSubmission>) -> SubmissionPage {
        SubmissionPage {
            notices: vec![],
            module_options: MODULE_OPTIONS.to_vec(),
            entries: vec![(0, "[2025-04-12 09:30] Ana <3 - Module 1 (Submitted)".into())],
            selected,
        }
    }

    #[test]
    fn test_empty_table() {
        let mut p = page(None);
        p.entries.clear();

        let html = render_page(&p);

        assert!(html.contains("No submissions recorded yet."));
        assert!(html.contains(r#"<option value="Other">Other</option>"#));
        assert!(html.contains("Cross-Generation Knowledge Transfer Platform"));
    }

    #[test]
    fn test_image_preview_and_empty_chat() {
        let html = render_page(&page(Some(selected(PreviewKind::Image, vec![]))));

        assert!(html.contains(r#"<img src="/submissions/0/file?inline=1""#));
        assert!(html.contains(r#"<a href="/submissions/0/file">"#));
        assert!(html.contains("No comments yet for this submission."));
        assert!(html.contains("Ana &lt;3"));
        assert!(html.contains(r#"<option value="0" selected>"#));
    }

    #[test]
    fn test_missing_file_replaces_download() {
        let mut s = selected(PreviewKind::Video, vec![ChatMessage {
            author: "Mentor".into(),
            message: "Nice rim".into(),
            timestamp: "2025-04-12 10:00:00".into(),
        }]);
        s.file_error = Some("Error: File not found at path 'uploads/bowl.png'.".into());

        let html = render_page(&page(Some(s)));

        assert!(html.contains("notice-error"));
        assert!(!html.contains("<video"));
        assert!(!html.contains("Download bowl.png"));
        assert!(html.contains("Nice rim"));
        assert!(!html.contains("No comments yet"));
    }

    #[test]
    fn test_nothing_selected() {
        let html = render_page(&page(None));
        assert!(html.contains("Select a submission from the dropdown above"));
        assert!(html.contains(r#"<option value="" selected>Choose a submission to view...</option>"#));
        assert!(html.contains("<h2>Submission History &amp; Feedback</h2>"));
    }
}
