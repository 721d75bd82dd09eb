//! 类型化的实体集合访问器（纯透传，没有本地逻辑）

use crate::app::models::{
    ChatMessage, Favorite, Notification, RecurringSeries, Session, StreamingGoal, User,
    ViewerPreference,
};
use crate::app::platform::{EntityClient, Query};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// 平台实体：关联平台上的集合名称
pub trait Entity: DeserializeOwned + Serialize + Send + Sync {
    const NAME: &'static str;
}

impl Entity for User {
    const NAME: &'static str = "User";
}
impl Entity for Session {
    const NAME: &'static str = "Session";
}
impl Entity for Favorite {
    const NAME: &'static str = "Favorite";
}
impl Entity for StreamingGoal {
    const NAME: &'static str = "StreamingGoal";
}
impl Entity for ViewerPreference {
    const NAME: &'static str = "ViewerPreference";
}
impl Entity for RecurringSeries {
    const NAME: &'static str = "RecurringSeries";
}
impl Entity for Notification {
    const NAME: &'static str = "Notification";
}
impl Entity for ChatMessage {
    const NAME: &'static str = "ChatMessage";
}

/// 单个实体集合的类型化访问器
pub struct Collection<T: Entity> {
    client: Arc<dyn EntityClient>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new(client: Arc<dyn EntityClient>) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }

    pub async fn filter(
        &self,
        query: &Query,
        sort: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<T>> {
        let records = self.client.filter(T::NAME, query, sort, limit).await?;
        decode_all(records)
    }

    pub async fn list(&self, sort: Option<&str>, limit: Option<usize>) -> Result<Vec<T>> {
        let records = self.client.list(T::NAME, sort, limit).await?;
        decode_all(records)
    }

    pub async fn create<R: Serialize + Sync>(&self, record: &R) -> Result<T> {
        let record = serde_json::to_value(record).context("序列化记录失败")?;
        let created = self.client.create(T::NAME, record).await?;
        serde_json::from_value(created).with_context(|| format!("解析 {} 记录失败", T::NAME))
    }

    pub async fn update(&self, id: &str, patch: Value) -> Result<T> {
        let updated = self.client.update(T::NAME, id, patch).await?;
        serde_json::from_value(updated).with_context(|| format!("解析 {} 记录失败", T::NAME))
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(T::NAME, id).await
    }
}

fn decode_all<T: Entity>(records: Vec<Value>) -> Result<Vec<T>> {
    records
        .into_iter()
        .map(|r| serde_json::from_value(r).with_context(|| format!("解析 {} 记录失败", T::NAME)))
        .collect()
}

/// 全部实体集合
#[derive(Clone)]
pub struct Entities {
    pub users: Collection<User>,
    pub sessions: Collection<Session>,
    pub favorites: Collection<Favorite>,
    pub streaming_goals: Collection<StreamingGoal>,
    pub viewer_preferences: Collection<ViewerPreference>,
    pub recurring_series: Collection<RecurringSeries>,
    pub notifications: Collection<Notification>,
    pub chat_messages: Collection<ChatMessage>,
}

impl Entities {
    pub fn new(client: Arc<dyn EntityClient>) -> Self {
        Self {
            users: Collection::new(client.clone()),
            sessions: Collection::new(client.clone()),
            favorites: Collection::new(client.clone()),
            streaming_goals: Collection::new(client.clone()),
            viewer_preferences: Collection::new(client.clone()),
            recurring_series: Collection::new(client.clone()),
            notifications: Collection::new(client.clone()),
            chat_messages: Collection::new(client),
        }
    }
}
