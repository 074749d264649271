use super::controller::{
    SubmissionForm, SubmissionSession, UploadedFile, build_page, send_comment, submit_work,
};
use super::render::render_page;
use super::upload::{client_filename, content_type};
use crate::ServiceError;
use crate::config::SubmissionConfig;
use crate::error::PortalError;
use crate::logger::create_child_logger;
use crate::session::{SessionHandle, SessionRegistry, session_cookie, session_id};
use actix_multipart::Multipart;
use actix_web::http::header::{
    self, ContentDisposition, DispositionParam, DispositionType, HeaderMap,
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use slog::Logger;
use std::io::ErrorKind;
use std::time::Duration;

pub struct SubmissionState {
    pub config: SubmissionConfig,
    pub logger: Logger,
    pub sessions: SessionRegistry<SubmissionSession>,
}

impl SubmissionState {
    pub fn new(config: SubmissionConfig, logger: Logger) -> Self {
        let sessions = SessionRegistry::with_limits(
            Duration::from_secs(config.session_idle_secs),
            config.max_sessions,
        );
        Self {
            config,
            logger,
            sessions,
        }
    }
}

/// `selected` is empty when the placeholder option is submitted.
#[derive(Debug, Deserialize)]
pub struct IndexQuery {
    #[serde(default)]
    selected: Option<String>,
}

impl IndexQuery {
    fn selected(&self) -> Option<usize> {
        self.selected.as_deref().and_then(|s| s.trim().parse().ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    #[serde(default)]
    inline: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    author: String,
    #[serde(default)]
    message: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/submissions", web::post().to(submit))
        .route("/submissions/{index}/file", web::get().to(download))
        .route("/submissions/{index}/chat", web::post().to(chat))
        .route("/health", web::get().to(health_check));
}

async fn session(
    req: &HttpRequest,
    state: &SubmissionState,
) -> Result<SessionHandle<SubmissionSession>, ServiceError> {
    let id = session_id(req);
    state
        .sessions
        .resolve(id.as_deref(), || async {
            SubmissionSession::open(
                &state.config,
                create_child_logger(&state.logger, "submission_store"),
            )
        })
        .await
}

fn redirect(handle: &SessionHandle<SubmissionSession>, location: &str) -> HttpResponse {
    let mut builder = HttpResponse::SeeOther();
    builder.insert_header((header::LOCATION, location));
    if handle.is_new {
        builder.cookie(session_cookie(&handle.id));
    }
    builder.finish()
}

async fn index(
    req: HttpRequest,
    state: web::Data<SubmissionState>,
    query: web::Query<IndexQuery>,
) -> Result<HttpResponse, PortalError> {
    let handle = session(&req, &state).await?;
    let page = {
        let mut session = handle.state.lock().await;
        build_page(&mut session, query.selected())
    };

    let mut builder = HttpResponse::Ok();
    if handle.is_new {
        builder.cookie(session_cookie(&handle.id));
    }
    Ok(builder
        .content_type("text/html; charset=utf-8")
        .body(render_page(&page)))
}

/// `filename` parameter as the client wrote it. The parsed header treats
/// `\` as an escape, which loses the separators of Windows paths.
fn raw_filename(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::CONTENT_DISPOSITION)?.to_str().ok()?;
    let start = raw
        .match_indices("filename=")
        .find(|(i, _)| raw[..*i].ends_with([';', ' ', '\t']))
        .map(|(i, m)| i + m.len())?;
    let value = &raw[start..];

    match value.strip_prefix('"') {
        Some(quoted) => quoted.split('"').next().map(str::to_string),
        None => value.split(';').next().map(|v| v.trim().to_string()),
    }
}

fn multipart_error(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Multipart(e.to_string())
}

/// Collects the submission form fields. A file part without a filename
/// counts as no upload.
async fn read_form(mut payload: Multipart) -> Result<SubmissionForm, ServiceError> {
    let mut form = SubmissionForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(multipart_error)?;
        let disposition = field.content_disposition().clone();
        let name = disposition.get_name().unwrap_or_default().to_string();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            bytes.extend_from_slice(&chunk.map_err(multipart_error)?);
        }

        match name.as_str() {
            "learner_name" => form.learner_name = String::from_utf8_lossy(&bytes).into_owned(),
            "module_option" => form.module_option = String::from_utf8_lossy(&bytes).into_owned(),
            "custom_module" => form.custom_module = String::from_utf8_lossy(&bytes).into_owned(),
            "file" => {
                form.file = raw_filename(field.headers())
                    .or_else(|| disposition.get_filename().map(str::to_string))
                    .map(|f| client_filename(&f))
                    .filter(|f| !f.is_empty())
                    .map(|filename| UploadedFile { filename, bytes });
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn submit(
    req: HttpRequest,
    state: web::Data<SubmissionState>,
    payload: Multipart,
) -> Result<HttpResponse, PortalError> {
    let form = read_form(payload).await?;
    let handle = session(&req, &state).await?;
    {
        let mut session = handle.state.lock().await;
        submit_work(&mut session, form).await;
    }
    Ok(redirect(&handle, "/"))
}

async fn download(
    req: HttpRequest,
    state: web::Data<SubmissionState>,
    path: web::Path<usize>,
    query: web::Query<FileQuery>,
) -> Result<HttpResponse, PortalError> {
    let index = path.into_inner();
    let handle = session(&req, &state).await?;
    let (filename, file_path) = {
        let session = handle.state.lock().await;
        let record = session
            .store
            .get(index)
            .ok_or(ServiceError::InvalidSubmissionIndex(index))?;
        (record.filename.clone(), record.file_path.clone())
    };

    let bytes = match tokio::fs::read(&file_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PortalError::NotFound(format!(
                "File not found at path '{}'",
                file_path
            )));
        }
        Err(e) => return Err(ServiceError::from(e).into()),
    };

    let disposition = if query.inline.unwrap_or(0) != 0 {
        DispositionType::Inline
    } else {
        DispositionType::Attachment
    };
    Ok(HttpResponse::Ok()
        .content_type(content_type(&filename))
        .insert_header(ContentDisposition {
            disposition,
            parameters: vec![DispositionParam::Filename(filename)],
        })
        .body(bytes))
}

async fn chat(
    req: HttpRequest,
    state: web::Data<SubmissionState>,
    path: web::Path<usize>,
    form: web::Form<ChatForm>,
) -> Result<HttpResponse, PortalError> {
    let index = path.into_inner();
    let form = form.into_inner();
    let handle = session(&req, &state).await?;
    {
        let mut session = handle.state.lock().await;
        send_comment(&mut session, index, &form.author, &form.message);
    }
    Ok(redirect(&handle, &format!("/?selected={}", index)))
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": Utc::now()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::discard;
    use crate::session::SESSION_COOKIE;
    use crate::submission::MODULE_OPTIONS;
    use actix_web::cookie::Cookie;
    use actix_web::{App, http::StatusCode, test};
    use tempfile::TempDir;

    const BOUNDARY: &str = "----portal-test-boundary";

    fn state(dir: &TempDir) -> web::Data<SubmissionState> {
        let config = SubmissionConfig {
            upload_dir: dir.path().join("uploads").display().to_string(),
            submissions_file: dir.path().join("submissions.csv").display().to_string(),
            chat_dir: dir.path().join("chats").display().to_string(),
            ..SubmissionConfig::default()
        };
        web::Data::new(SubmissionState::new(config, discard()))
    }

    fn multipart_body(learner: &str, module: &str, filename: &str, bytes: &str) -> String {
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"learner_name\"\r\n\r\n{learner}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"module_option\"\r\n\r\n{module}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"custom_module\"\r\n\r\n\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{bytes}\r\n\
             --{b}--\r\n",
            b = BOUNDARY
        )
    }

    fn upload(body: String) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/submissions")
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    fn cookie_of(resp: &actix_web::dev::ServiceResponse) -> Cookie<'static> {
        resp.response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .map(|c| c.into_owned())
            .unwrap()
    }

    async fn body_text(resp: actix_web::dev::ServiceResponse) -> String {
        String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
    }

    #[::core::prelude::v1::test]
    fn test_raw_filename_keeps_windows_paths() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_DISPOSITION,
            header::HeaderValue::from_static(
                r#"form-data; name="file"; filename="C:\fakepath\bowl.png""#,
            ),
        );
        assert_eq!(raw_filename(&headers).as_deref(), Some(r"C:\fakepath\bowl.png"));

        headers.insert(
            header::CONTENT_DISPOSITION,
            header::HeaderValue::from_static("form-data; name=file; filename=plain.gif"),
        );
        assert_eq!(raw_filename(&headers).as_deref(), Some("plain.gif"));

        headers.insert(
            header::CONTENT_DISPOSITION,
            header::HeaderValue::from_static(r#"form-data; name="learner_name""#),
        );
        assert_eq!(raw_filename(&headers), None);
    }

    #[actix_web::test]
    async fn test_empty_portal() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let _ = cookie_of(&resp);
        assert!(body_text(resp).await.contains("No submissions recorded yet."));
        assert!(dir.path().join("uploads").is_dir());
    }

    #[actix_web::test]
    async fn test_submit_download_and_chat() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;

        let resp = test::call_service(
            &app,
            upload(multipart_body("Ana", MODULE_OPTIONS[1], r"C:\fakepath\bowl.png", "PNGDATA"))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let cookie = cookie_of(&resp);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/").cookie(cookie.clone()).to_request(),
        )
        .await;
        let body = body_text(resp).await;
        assert!(body.contains("Success! Your work &#39;bowl.png&#39;"));
        assert!(body.contains("Ana - Module 2: Introduction to Pottery Wheel (Submitted)"));
        assert!(std::fs::read_to_string(dir.path().join("submissions.csv"))
            .unwrap()
            .contains("bowl.png"));

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/submissions/0/file?inline=1")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "image/png"
        );
        assert!(resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("inline"));
        assert_eq!(test::read_body(resp).await.as_ref(), b"PNGDATA");

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/submissions/0/chat")
                .cookie(cookie.clone())
                .set_form([("author", ""), ("message", "Thin the walls a little.")])
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/?selected=0");

        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/?selected=0")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        let body = body_text(resp).await;
        assert!(body.contains("Thin the walls a little."));
        assert!(body.contains("<b>Mentor</b>"));
    }

    #[actix_web::test]
    async fn test_submit_without_file_warns() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;

        let resp = test::call_service(
            &app,
            upload(multipart_body("Ana", MODULE_OPTIONS[0], "", "")).to_request(),
        )
        .await;
        let cookie = cookie_of(&resp);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/").cookie(cookie).to_request(),
        )
        .await;
        let body = body_text(resp).await;
        assert!(body.contains("Please upload a file."));
        assert!(body.contains("No submissions recorded yet."));
    }

    #[actix_web::test]
    async fn test_unknown_submission_file_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/submissions/3/file").to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_cookieless_visits_are_capped() {
        let dir = tempfile::tempdir().unwrap();
        let config = SubmissionConfig {
            upload_dir: dir.path().join("uploads").display().to_string(),
            submissions_file: dir.path().join("submissions.csv").display().to_string(),
            max_sessions: 5,
            ..SubmissionConfig::default()
        };
        let state = web::Data::new(SubmissionState::new(config, discard()));
        let app = test::init_service(App::new().app_data(state.clone()).configure(configure)).await;

        for _ in 0..40 {
            let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }

        assert_eq!(state.sessions.len().await, 5);
    }

    #[actix_web::test]
    async fn test_placeholder_selection_shows_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;

        let resp = test::call_service(
            &app,
            upload(multipart_body("Ana", MODULE_OPTIONS[0], "bowl.png", "PNGDATA")).to_request(),
        )
        .await;
        let cookie = cookie_of(&resp);

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/?selected=").cookie(cookie).to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        assert!(body.contains(r#"<option value="" selected>Choose a submission to view...</option>"#));
        assert!(!body.contains("Submission Details"));
    }

    #[actix_web::test]
    async fn test_health_check() {
        let dir = tempfile::tempdir().unwrap();
        let app = test::init_service(App::new().app_data(state(&dir)).configure(configure)).await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
