//! Forum data shaping: flat `topics`/`posts` rows in, nested threads out.

pub mod controller;
pub mod render;
pub mod routes;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

use crate::ServiceError;
use crate::utils::generate_prefixed_id;
use chrono::{DateTime, Utc};
use entity::{Post, Topic};
use std::collections::HashMap;
use store::{ForumStore, NewPost, NewTopic};
use tracing::{error, info, warn};

/// A topic together with its posts, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ForumTopic {
    pub id: String,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub posts: Vec<Post>,
}

impl ForumTopic {
    fn from_row(topic: Topic, posts: Vec<Post>) -> Self {
        Self {
            id: topic.id,
            title: topic.title,
            author: topic.author,
            created_at: topic.created_at,
            posts,
        }
    }

    /// The post flagged as original. Rows written before the flag existed
    /// fall back to the earliest post.
    pub fn original_post(&self) -> Option<&Post> {
        self.posts
            .iter()
            .find(|p| p.is_original)
            .or_else(|| self.posts.first())
    }

    pub fn replies(&self) -> Vec<&Post> {
        let original_id = self.original_post().map(|p| p.id.as_str());
        self.posts
            .iter()
            .filter(|p| Some(p.id.as_str()) != original_id)
            .collect()
    }

    pub fn reply_count(&self) -> usize {
        self.replies().len()
    }
}

/// Topics keyed by id, iterated newest first.
#[derive(Debug, Clone, Default)]
pub struct ForumData {
    topics: Vec<ForumTopic>,
    index: HashMap<String, usize>,
}

impl ForumData {
    pub fn get(&self, topic_id: &str) -> Option<&ForumTopic> {
        self.index.get(topic_id).map(|&i| &self.topics[i])
    }

    pub fn contains(&self, topic_id: &str) -> bool {
        self.index.contains_key(topic_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ForumTopic> {
        self.topics.iter()
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// Groups posts under their topics. Expects topics newest first and posts
/// oldest first; both orders are kept. Posts without a known topic are dropped.
pub fn group_forum(topics: Vec<Topic>, posts: Vec<Post>) -> ForumData {
    let mut posts_by_topic: HashMap<String, Vec<Post>> = HashMap::new();
    for post in posts {
        if post.topic_id.is_empty() {
            continue;
        }
        posts_by_topic
            .entry(post.topic_id.clone())
            .or_default()
            .push(post);
    }

    let mut data = ForumData::default();
    for topic in topics {
        if data.index.contains_key(&topic.id) {
            continue;
        }
        let posts = posts_by_topic.remove(&topic.id).unwrap_or_default();
        data.index.insert(topic.id.clone(), data.topics.len());
        data.topics.push(ForumTopic::from_row(topic, posts));
    }

    if !posts_by_topic.is_empty() {
        warn!(
            "Dropped posts for {} unknown topic(s): {:?}",
            posts_by_topic.len(),
            posts_by_topic.keys().collect::<Vec<_>>()
        );
    }

    data
}

pub async fn load_forum_data(store: &dyn ForumStore) -> Result<ForumData, ServiceError> {
    let topics = store.topics_newest_first().await?;
    let posts = store.posts_oldest_first().await?;
    Ok(group_forum(topics, posts))
}

pub async fn save_topic(
    store: &dyn ForumStore,
    topic_id: &str,
    title: &str,
    author: &str,
) -> Result<(), ServiceError> {
    let topic = NewTopic {
        id: topic_id.to_string(),
        title: title.to_string(),
        author: author.to_string(),
    };

    match store.insert_topic(topic).await {
        Ok(saved) => {
            info!("Saved topic {} by {}", saved.id, saved.author);
            Ok(())
        }
        Err(e) => {
            error!("Database error saving topic {}: {}", topic_id, e);
            Err(e)
        }
    }
}

pub async fn save_post(
    store: &dyn ForumStore,
    post_id: &str,
    topic_id: &str,
    author: &str,
    content: &str,
    is_original: bool,
) -> Result<(), ServiceError> {
    let post = NewPost {
        id: post_id.to_string(),
        topic_id: topic_id.to_string(),
        author: author.to_string(),
        content: content.to_string(),
        is_original,
    };

    match store.insert_post(post).await {
        Ok(saved) => {
            info!("Saved post {} in topic {}", saved.id, saved.topic_id);
            Ok(())
        }
        Err(e) => {
            error!("Database error saving post {}: {}", post_id, e);
            Err(e)
        }
    }
}

#[derive(Debug)]
pub enum TopicCreation {
    Created {
        topic_id: String,
    },
    /// The topic row exists but its first post could not be written.
    Orphaned {
        topic_id: String,
        error: ServiceError,
    },
}

/// Saves the topic, then its first post. A failed topic save aborts with the
/// error; a failed post save leaves the topic in place and reports it.
pub async fn create_topic(
    store: &dyn ForumStore,
    title: &str,
    author: &str,
    content: &str,
) -> Result<TopicCreation, ServiceError> {
    let topic_id = generate_prefixed_id("topic");
    let first_post_id = generate_prefixed_id("post");

    save_topic(store, &topic_id, title, author).await?;

    match save_post(store, &first_post_id, &topic_id, author, content, true).await {
        Ok(()) => Ok(TopicCreation::Created { topic_id }),
        Err(error) => {
            warn!("Topic {} saved without its first post", topic_id);
            Ok(TopicCreation::Orphaned { topic_id, error })
        }
    }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %I:%M %p (UTC)").to_string()
}
