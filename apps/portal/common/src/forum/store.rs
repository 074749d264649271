use crate::ServiceError;
use async_trait::async_trait;
use chrono::Utc;
use entity::{Post, Topic, post, topic};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};

#[derive(Debug, Clone)]
pub struct NewTopic {
    pub id: String,
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub id: String,
    pub topic_id: String,
    pub author: String,
    pub content: String,
    pub is_original: bool,
}

/// Table access the forum needs: ordered selects and single-row inserts.
#[async_trait]
pub trait ForumStore: Send + Sync {
    async fn topics_newest_first(&self) -> Result<Vec<Topic>, ServiceError>;

    async fn posts_oldest_first(&self) -> Result<Vec<Post>, ServiceError>;

    async fn insert_topic(&self, topic: NewTopic) -> Result<Topic, ServiceError>;

    async fn insert_post(&self, post: NewPost) -> Result<Post, ServiceError>;
}

#[derive(Clone)]
pub struct SeaOrmForumStore {
    db: DatabaseConnection,
}

impl SeaOrmForumStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ForumStore for SeaOrmForumStore {
    async fn topics_newest_first(&self) -> Result<Vec<Topic>, ServiceError> {
        let topics = topic::Entity::find()
            .order_by_desc(topic::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(topics)
    }

    async fn posts_oldest_first(&self) -> Result<Vec<Post>, ServiceError> {
        let posts = post::Entity::find()
            .order_by_asc(post::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(posts)
    }

    async fn insert_topic(&self, new_topic: NewTopic) -> Result<Topic, ServiceError> {
        let model = topic::ActiveModel {
            id: Set(new_topic.id),
            title: Set(new_topic.title),
            author: Set(new_topic.author),
            created_at: Set(Utc::now()),
        };

        Ok(model.insert(&self.db).await?)
    }

    async fn insert_post(&self, new_post: NewPost) -> Result<Post, ServiceError> {
        let model = post::ActiveModel {
            id: Set(new_post.id),
            topic_id: Set(new_post.topic_id),
            author: Set(new_post.author),
            content: Set(new_post.content),
            created_at: Set(Utc::now()),
            is_original: Set(new_post.is_original),
        };

        Ok(model.insert(&self.db).await?)
    }
}
