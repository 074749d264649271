//! In-memory `ForumStore` with switchable failures.

use super::store::{ForumStore, NewPost, NewTopic};
use crate::ServiceError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use entity::{Post, Topic};
use sea_orm::DbErr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// 2025-04-12 01:00 UTC plus `minutes`.
pub fn at(minutes: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 12, 1, 0, 0).unwrap() + Duration::minutes(minutes as i64)
}

#[derive(Default)]
pub struct MemoryForumStore {
    topics: Mutex<Vec<Topic>>,
    posts: Mutex<Vec<Post>>,
    fail_topic_reads: AtomicBool,
    fail_post_reads: AtomicBool,
    fail_topic_inserts: AtomicBool,
    fail_post_inserts: AtomicBool,
}

impl MemoryForumStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_topic(&self, topic: Topic) {
        self.topics.lock().unwrap().push(topic);
    }

    pub fn seed_post(&self, post: Post) {
        self.posts.lock().unwrap().push(post);
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    pub fn fail_topic_reads(&self, fail: bool) {
        self.fail_topic_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_post_reads(&self, fail: bool) {
        self.fail_post_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_topic_inserts(&self, fail: bool) {
        self.fail_topic_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_post_inserts(&self, fail: bool) {
        self.fail_post_inserts.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool, what: &str) -> Result<(), ServiceError> {
        if flag.load(Ordering::SeqCst) {
            return Err(ServiceError::Database(DbErr::Custom(format!(
                "{} unavailable",
                what
            ))));
        }
        Ok(())
    }
}

#[async_trait]
impl ForumStore for MemoryForumStore {
    async fn topics_newest_first(&self) -> Result<Vec<Topic>, ServiceError> {
        Self::check(&self.fail_topic_reads, "topics")?;
        let mut topics = self.topics.lock().unwrap().clone();
        topics.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(topics)
    }

    async fn posts_oldest_first(&self) -> Result<Vec<Post>, ServiceError> {
        Self::check(&self.fail_post_reads, "posts")?;
        let mut posts = self.posts.lock().unwrap().clone();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(posts)
    }

    async fn insert_topic(&self, topic: NewTopic) -> Result<Topic, ServiceError> {
        Self::check(&self.fail_topic_inserts, "topics")?;
        let row = Topic {
            id: topic.id,
            title: topic.title,
            author: topic.author,
            created_at: Utc::now(),
        };
        self.topics.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn insert_post(&self, post: NewPost) -> Result<Post, ServiceError> {
        Self::check(&self.fail_post_inserts, "posts")?;
        let row = Post {
            id: post.id,
            topic_id: post.topic_id,
            author: post.author,
            content: post.content,
            created_at: Utc::now(),
            is_original: post.is_original,
        };
        self.posts.lock().unwrap().push(row.clone());
        Ok(row)
    }
}
