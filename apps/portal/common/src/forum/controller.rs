use super::store::ForumStore;
use super::{ForumData, ForumTopic, TopicCreation, create_topic, load_forum_data, save_post};
use crate::notice::Notice;
use crate::utils::generate_prefixed_id;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ForumView {
    #[default]
    ListTopics,
    ViewThread(String),
    CreateTopic,
}

/// UI state of one browser session.
#[derive(Debug, Default)]
pub struct ForumSession {
    pub view: ForumView,
    pub username: String,
    notices: Vec<Notice>,
}

impl ForumSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn has_username(&self) -> bool {
        !self.username.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForumAction {
    ViewAllTopics,
    OpenCreateTopic,
    ViewThread(String),
    SetUsername(String),
    Reply { content: String },
    CreateTopic { title: String, content: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopicSummary {
    pub id: String,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub reply_count: usize,
}

impl From<&ForumTopic> for TopicSummary {
    fn from(topic: &ForumTopic) -> Self {
        Self {
            id: topic.id.clone(),
            title: topic.title.clone(),
            author: topic.author.clone(),
            created_at: topic.created_at,
            reply_count: topic.reply_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForumScreen {
    Topics(Vec<TopicSummary>),
    Thread { topic: ForumTopic, can_reply: bool },
    CreateTopic { username_missing: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForumPage {
    pub notices: Vec<Notice>,
    pub username: String,
    pub can_create_topic: bool,
    pub screen: ForumScreen,
}

pub struct ForumController {
    store: Arc<dyn ForumStore>,
}

impl ForumController {
    pub fn new(store: Arc<dyn ForumStore>) -> Self {
        Self { store }
    }

    pub async fn handle(&self, session: &mut ForumSession, action: ForumAction) {
        match action {
            ForumAction::ViewAllTopics => session.view = ForumView::ListTopics,
            ForumAction::ViewThread(topic_id) => session.view = ForumView::ViewThread(topic_id),
            ForumAction::OpenCreateTopic => {
                if session.has_username() {
                    session.view = ForumView::CreateTopic;
                } else {
                    session.push_notice(Notice::warning("Enter a username to create topics."));
                }
            }
            ForumAction::SetUsername(name) => {
                let name = name.trim();
                if !name.is_empty() {
                    session.username = name.to_string();
                }
            }
            ForumAction::Reply { content } => self.reply(session, &content).await,
            ForumAction::CreateTopic { title, content } => {
                self.create_topic(session, &title, &content).await
            }
        }
    }

    async fn reply(&self, session: &mut ForumSession, content: &str) {
        let ForumView::ViewThread(topic_id) = session.view.clone() else {
            session.push_notice(Notice::warning("Open a topic before replying."));
            return;
        };
        if !session.has_username() {
            session.push_notice(Notice::warning(
                "Please enter your username in the sidebar to reply.",
            ));
            return;
        }
        if content.trim().is_empty() {
            session.push_notice(Notice::warning("Reply cannot be empty."));
            return;
        }

        let post_id = generate_prefixed_id("post");
        match save_post(
            self.store.as_ref(),
            &post_id,
            &topic_id,
            &session.username,
            content,
            false,
        )
        .await
        {
            Ok(()) => session.push_notice(Notice::success("Reply posted successfully!")),
            Err(e) => session.push_notice(Notice::error(format!(
                "Database error saving post: {}",
                e
            ))),
        }
    }

    async fn create_topic(&self, session: &mut ForumSession, title: &str, content: &str) {
        if !session.has_username() {
            session.push_notice(Notice::error(
                "Error: Username is required to create a topic. Please enter it in the sidebar.",
            ));
            return;
        }
        if title.trim().is_empty() {
            session.push_notice(Notice::warning("Topic title cannot be empty."));
            return;
        }
        if content.trim().is_empty() {
            session.push_notice(Notice::warning("The first post cannot be empty."));
            return;
        }

        match create_topic(self.store.as_ref(), title, &session.username, content).await {
            Ok(TopicCreation::Created { topic_id }) => {
                info!("Topic {} created by {}", topic_id, session.username);
                session.push_notice(Notice::success("Topic created successfully!"));
                session.view = ForumView::ViewThread(topic_id);
            }
            Ok(TopicCreation::Orphaned { topic_id, error }) => {
                warn!("Topic {} left without posts: {}", topic_id, error);
                session.push_notice(Notice::error(format!("Database error saving post: {}", error)));
                session.push_notice(Notice::error(
                    "Topic metadata was saved, but the initial post failed to save. Please try adding the post as a reply.",
                ));
                session.view = ForumView::ListTopics;
            }
            Err(e) => {
                error!("Topic creation aborted: {}", e);
                session.push_notice(Notice::error(format!("Database error saving topic: {}", e)));
                session.push_notice(Notice::error(
                    "Failed to save topic metadata. Post was not saved.",
                ));
            }
        }
    }

    /// Reloads everything from the store and builds the page for the
    /// session's current view.
    pub async fn render(&self, session: &mut ForumSession) -> ForumPage {
        let data = match load_forum_data(self.store.as_ref()).await {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to load forum data: {}", e);
                session.push_notice(Notice::error(format!("Database error loading data: {}", e)));
                ForumData::default()
            }
        };

        let screen = match session.view.clone() {
            ForumView::ListTopics => Self::topics_screen(&data),
            ForumView::ViewThread(topic_id) => match data.get(&topic_id) {
                Some(topic) => ForumScreen::Thread {
                    topic: topic.clone(),
                    can_reply: session.has_username(),
                },
                None => {
                    warn!("Selected topic {} is not in the loaded data", topic_id);
                    session.push_notice(Notice::error("Topic not found or failed to load!"));
                    session.view = ForumView::ListTopics;
                    Self::topics_screen(&data)
                }
            },
            ForumView::CreateTopic => ForumScreen::CreateTopic {
                username_missing: !session.has_username(),
            },
        };

        ForumPage {
            notices: session.take_notices(),
            username: session.username.clone(),
            can_create_topic: session.has_username(),
            screen,
        }
    }

    fn topics_screen(data: &ForumData) -> ForumScreen {
        ForumScreen::Topics(data.iter().map(TopicSummary::from).collect())
    }
}
