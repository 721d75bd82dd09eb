//! 主播发现服务
//!
//! 拉取审核通过的主播列表（经查询缓存），再交给筛选状态在本地过滤。
//! 拉取失败时返回空列表，不向上抛错。

use crate::app::cache::{Fetcher, QueryCache, Revalidator};
use crate::app::filter::BroadcasterFilter;
use crate::app::models::{Broadcaster, Favorite, StreamingGoal};
use crate::app::platform::{Entities, Query};
use anyhow::{Context, Result};
use futures_util::FutureExt;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const BROADCASTERS_KEY: &str = "broadcasters";
/// 单次拉取的主播上限
const BROADCASTER_FETCH_LIMIT: usize = 200;

fn favorites_key(viewer_id: &str) -> String {
    format!("favorites:{}", viewer_id)
}

/// 拉取全部审核通过的主播（客户端再校验一次审核标记）
async fn fetch_approved(entities: &Entities) -> Result<Vec<Broadcaster>> {
    let mut list = entities
        .users
        .filter(
            &Query::new().eq("broadcaster_approved", true),
            Some("-created_date"),
            Some(BROADCASTER_FETCH_LIMIT),
        )
        .await
        .context("拉取主播列表失败")?;
    list.retain(Broadcaster::is_listed);
    Ok(list)
}

/// 主播发现服务
pub struct DiscoveryService {
    entities: Entities,
    broadcasters: Arc<QueryCache<Vec<Broadcaster>>>,
    favorites: QueryCache<Vec<Favorite>>,
}

impl DiscoveryService {
    pub fn new(entities: Entities, ttl: Duration) -> Self {
        Self {
            entities,
            broadcasters: Arc::new(QueryCache::new(ttl)),
            favorites: QueryCache::new(ttl),
        }
    }

    /// 审核通过的全部主播（未筛选）
    pub async fn approved_broadcasters(&self) -> Vec<Broadcaster> {
        let entities = &self.entities;
        match self
            .broadcasters
            .get_or_fetch(BROADCASTERS_KEY, || fetch_approved(entities))
            .await
        {
            Ok(list) => list,
            Err(e) => {
                warn!("[Discovery] 获取主播列表失败，返回空列表: {:?}", e);
                Vec::new()
            }
        }
    }

    /// 按筛选条件返回主播，在线优先
    pub async fn broadcasters(&self, filter: &BroadcasterFilter) -> Vec<Broadcaster> {
        let all = self.approved_broadcasters().await;
        let total = all.len();
        let result = filter.apply(all);
        info!(
            "[Discovery] 筛选完成，{} / {} 个主播",
            result.len(),
            total
        );
        result
    }

    pub async fn broadcaster(&self, id: &str) -> Option<Broadcaster> {
        self.approved_broadcasters()
            .await
            .into_iter()
            .find(|b| b.id == id)
    }

    /// 下次读取时强制重新拉取
    pub async fn refresh(&self) {
        self.broadcasters.invalidate(BROADCASTERS_KEY).await;
        self.favorites.invalidate_prefix("favorites:").await;
    }

    /// 定时刷新主播列表，订阅返回的 `Revalidator` 获取最新数据
    pub fn watch_broadcasters(&self, interval: Duration) -> Revalidator<Vec<Broadcaster>> {
        let entities = self.entities.clone();
        let fetch: Fetcher<Vec<Broadcaster>> = Arc::new(move || {
            let entities = entities.clone();
            async move { fetch_approved(&entities).await }.boxed()
        });
        info!("[Discovery] 🔄 启动主播列表定时刷新，间隔: {:?}", interval);
        Revalidator::spawn(
            self.broadcasters.clone(),
            BROADCASTERS_KEY.to_string(),
            interval,
            fetch,
        )
    }

    /// 观众的收藏记录
    pub async fn favorites(&self, viewer_id: &str) -> Vec<Favorite> {
        let query = Query::new().eq("user_id", viewer_id);
        let collection = &self.entities.favorites;
        match self
            .favorites
            .get_or_fetch(&favorites_key(viewer_id), || {
                collection.filter(&query, None, None)
            })
            .await
        {
            Ok(list) => list,
            Err(e) => {
                warn!("[Discovery] 获取收藏失败，返回空列表: {:?}", e);
                Vec::new()
            }
        }
    }

    /// 收藏的主播（同样经过筛选和排序）
    pub async fn favorite_broadcasters(
        &self,
        viewer_id: &str,
        filter: &BroadcasterFilter,
    ) -> Vec<Broadcaster> {
        let ids: HashSet<String> = self
            .favorites(viewer_id)
            .await
            .into_iter()
            .map(|f| f.broadcaster_id)
            .collect();
        let all = self.approved_broadcasters().await;
        filter.apply(all.into_iter().filter(|b| ids.contains(&b.id)))
    }

    pub async fn is_favorite(&self, viewer_id: &str, broadcaster_id: &str) -> bool {
        self.favorites(viewer_id)
            .await
            .iter()
            .any(|f| f.broadcaster_id == broadcaster_id)
    }

    /// 收藏主播；已收藏时直接返回已有记录
    pub async fn add_favorite(&self, viewer_id: &str, broadcaster_id: &str) -> Result<Favorite> {
        if viewer_id.is_empty() || broadcaster_id.is_empty() {
            anyhow::bail!("收藏必须同时指定用户和主播");
        }

        let existing = self
            .entities
            .favorites
            .filter(
                &Query::new()
                    .eq("user_id", viewer_id)
                    .eq("broadcaster_id", broadcaster_id),
                None,
                Some(1),
            )
            .await
            .context("查询收藏失败")?;
        if let Some(favorite) = existing.into_iter().next() {
            debug!("[Discovery] 主播 {} 已在收藏中", broadcaster_id);
            return Ok(favorite);
        }

        let favorite = self
            .entities
            .favorites
            .create(&json!({
                "user_id": viewer_id,
                "broadcaster_id": broadcaster_id,
            }))
            .await
            .context("创建收藏失败")?;
        self.favorites.invalidate(&favorites_key(viewer_id)).await;
        info!("[Discovery] ⭐ 收藏主播: {}", broadcaster_id);
        Ok(favorite)
    }

    /// 取消收藏，返回是否确实删除了记录
    pub async fn remove_favorite(&self, viewer_id: &str, broadcaster_id: &str) -> Result<bool> {
        let existing = self
            .entities
            .favorites
            .filter(
                &Query::new()
                    .eq("user_id", viewer_id)
                    .eq("broadcaster_id", broadcaster_id),
                None,
                None,
            )
            .await
            .context("查询收藏失败")?;
        for favorite in &existing {
            self.entities
                .favorites
                .delete(&favorite.id)
                .await
                .context("删除收藏失败")?;
        }
        self.favorites.invalidate(&favorites_key(viewer_id)).await;
        Ok(!existing.is_empty())
    }

    /// 主播公开的直播目标
    pub async fn public_goals(&self, broadcaster_id: &str) -> Vec<StreamingGoal> {
        let query = Query::new()
            .eq("broadcaster_id", broadcaster_id)
            .eq("is_public", true);
        match self
            .entities
            .streaming_goals
            .filter(&query, Some("-deadline"), None)
            .await
        {
            Ok(goals) => goals,
            Err(e) => {
                warn!("[Discovery] 获取直播目标失败: {:?}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::UserStatus;
    use crate::app::platform::MemoryPlatform;

    fn platform_with_broadcasters() -> Arc<MemoryPlatform> {
        let platform = Arc::new(MemoryPlatform::new());
        platform.insert_all(
            "User",
            vec![
                json!({"id": "b1", "display_name": "Ana", "gender": "female", "status": "offline", "broadcaster_approved": true}),
                json!({"id": "b2", "display_name": "Bea", "gender": "female", "status": "online", "broadcaster_approved": true}),
                json!({"id": "b3", "display_name": "Cal", "gender": "male", "status": "online", "broadcaster_approved": true}),
                json!({"id": "b4", "display_name": "Dee", "gender": "female", "status": "online", "broadcaster_approved": false}),
            ],
        );
        platform
    }

    fn service(platform: Arc<MemoryPlatform>) -> DiscoveryService {
        DiscoveryService::new(Entities::new(platform), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn lists_only_approved_and_filters() {
        let discovery = service(platform_with_broadcasters());
        let all = discovery.broadcasters(&BroadcasterFilter::new()).await;
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|b| b.broadcaster_approved));
        assert_eq!(all[0].status, UserStatus::Online);

        let female = discovery
            .broadcasters(&BroadcasterFilter::new().gender("female"))
            .await;
        let ids: Vec<_> = female.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "b1"]);
    }

    #[tokio::test]
    async fn fetch_failure_yields_empty_list() {
        let platform = platform_with_broadcasters();
        platform.set_entities_failing(true);
        let discovery = service(platform);
        assert!(discovery.broadcasters(&BroadcasterFilter::new()).await.is_empty());
    }

    #[tokio::test]
    async fn cached_list_survives_outage() {
        let platform = platform_with_broadcasters();
        let discovery = service(platform.clone());
        assert_eq!(discovery.approved_broadcasters().await.len(), 3);
        platform.set_entities_failing(true);
        assert_eq!(discovery.approved_broadcasters().await.len(), 3);
    }

    #[tokio::test]
    async fn favorites_are_unique_per_pair() {
        let platform = platform_with_broadcasters();
        let discovery = service(platform.clone());

        let first = discovery.add_favorite("v1", "b1").await.unwrap();
        let again = discovery.add_favorite("v1", "b1").await.unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(platform.records("Favorite").len(), 1);
        assert!(discovery.is_favorite("v1", "b1").await);

        let favorites = discovery
            .favorite_broadcasters("v1", &BroadcasterFilter::new())
            .await;
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, "b1");

        assert!(discovery.remove_favorite("v1", "b1").await.unwrap());
        assert!(!discovery.is_favorite("v1", "b1").await);
        assert!(!discovery.remove_favorite("v1", "b1").await.unwrap());
    }

    #[tokio::test]
    async fn favorite_requires_both_ids() {
        let discovery = service(platform_with_broadcasters());
        assert!(discovery.add_favorite("", "b1").await.is_err());
    }

    #[tokio::test]
    async fn public_goals_exclude_private_ones() {
        let platform = platform_with_broadcasters();
        platform.insert_all(
            "StreamingGoal",
            vec![
                json!({"id": "g1", "broadcaster_id": "b1", "is_public": true, "current_value": 5, "target_value": 10}),
                json!({"id": "g2", "broadcaster_id": "b1", "is_public": false}),
            ],
        );
        let discovery = service(platform);
        let goals = discovery.public_goals("b1").await;
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].progress_percent(), 50.0);
    }

    #[tokio::test]
    async fn watch_publishes_fresh_lists() {
        let platform = platform_with_broadcasters();
        let discovery = service(platform);
        let revalidator = discovery.watch_broadcasters(Duration::from_millis(20));
        let mut rx = revalidator.subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        let latest = rx.borrow().clone();
        assert_eq!(latest.map(|list| list.len()), Some(3));
    }
}
