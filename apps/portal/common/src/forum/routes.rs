use super::controller::{ForumAction, ForumController, ForumSession};
use super::render::render_page;
use crate::session::{SessionHandle, SessionRegistry, session_cookie, session_id};
use actix_web::{HttpRequest, HttpResponse, http::header, web};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::convert::Infallible;

pub struct ForumState {
    pub controller: ForumController,
    pub sessions: SessionRegistry<ForumSession>,
}

impl ForumState {
    pub fn new(controller: ForumController) -> Self {
        Self::with_sessions(controller, SessionRegistry::new())
    }

    pub fn with_sessions(
        controller: ForumController,
        sessions: SessionRegistry<ForumSession>,
    ) -> Self {
        Self {
            controller,
            sessions,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UsernameForm {
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyForm {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
pub struct TopicForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/username", web::post().to(set_username))
        .route("/view/topics", web::post().to(view_topics))
        .route("/view/create", web::post().to(view_create))
        .route("/view/thread/{topic_id}", web::post().to(view_thread))
        .route("/reply", web::post().to(reply))
        .route("/topics", web::post().to(create_topic))
        .route("/health", web::get().to(health_check));
}

async fn session(req: &HttpRequest, state: &ForumState) -> SessionHandle<ForumSession> {
    let id = session_id(req);
    match state
        .sessions
        .resolve(id.as_deref(), || async { Ok::<_, Infallible>(ForumSession::new()) })
        .await
    {
        Ok(handle) => handle,
        Err(never) => match never {},
    }
}

async fn index(req: HttpRequest, state: web::Data<ForumState>) -> HttpResponse {
    let handle = session(&req, &state).await;
    let page = {
        let mut session = handle.state.lock().await;
        state.controller.render(&mut session).await
    };

    let mut builder = HttpResponse::Ok();
    if handle.is_new {
        builder.cookie(session_cookie(&handle.id));
    }
    builder
        .content_type("text/html; charset=utf-8")
        .body(render_page(&page))
}

/// Runs one action against the caller's session, then sends them back to `/`.
async fn apply(req: HttpRequest, state: web::Data<ForumState>, action: ForumAction) -> HttpResponse {
    let handle = session(&req, &state).await;
    {
        let mut session = handle.state.lock().await;
        state.controller.handle(&mut session, action).await;
    }

    let mut builder = HttpResponse::SeeOther();
    builder.insert_header((header::LOCATION, "/"));
    if handle.is_new {
        builder.cookie(session_cookie(&handle.id));
    }
    builder.finish()
}

async fn set_username(
    req: HttpRequest,
    state: web::Data<ForumState>,
    form: web::Form<UsernameForm>,
) -> HttpResponse {
    let form = form.into_inner();
    apply(req, state, ForumAction::SetUsername(form.username)).await
}

async fn view_topics(req: HttpRequest, state: web::Data<ForumState>) -> HttpResponse {
    apply(req, state, ForumAction::ViewAllTopics).await
}

async fn view_create(req: HttpRequest, state: web::Data<ForumState>) -> HttpResponse {
    apply(req, state, ForumAction::OpenCreateTopic).await
}

async fn view_thread(
    req: HttpRequest,
    state: web::Data<ForumState>,
    path: web::Path<String>,
) -> HttpResponse {
    apply(req, state, ForumAction::ViewThread(path.into_inner())).await
}

async fn reply(
    req: HttpRequest,
    state: web::Data<ForumState>,
    form: web::Form<ReplyForm>,
) -> HttpResponse {
    let form = form.into_inner();
    apply(
        req,
        state,
        ForumAction::Reply {
            content: form.content,
        },
    )
    .await
}

async fn create_topic(
    req: HttpRequest,
    state: web::Data<ForumState>,
    form: web::Form<TopicForm>,
) -> HttpResponse {
    let form = form.into_inner();
    apply(
        req,
        state,
        ForumAction::CreateTopic {
            title: form.title,
            content: form.content,
        },
    )
    .await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": Utc::now()
    }))
}
