//! 警告通知轮询
//!
//! 每个警告通知只展示一次：已展示的 ID 记在本地存储里，跨进程保留。

use crate::app::models::Notification;
use crate::app::platform::{Collection, Query};
use crate::app::storage::LocalStore;
use anyhow::{Context, Result};
use tracing::{info, warn};

pub const WARNING_KIND: &str = "warning";

/// 未读警告监控
pub struct WarningMonitor {
    notifications: Collection<Notification>,
    store: LocalStore,
}

impl WarningMonitor {
    pub fn new(notifications: Collection<Notification>, store: LocalStore) -> Self {
        Self {
            notifications,
            store,
        }
    }

    async fn fetch_new(&self, user_id: &str) -> Result<Vec<Notification>> {
        let query = Query::new()
            .eq("user_id", user_id)
            .eq("type", WARNING_KIND)
            .eq("read", false);
        let unread = self
            .notifications
            .filter(&query, Some("-created_date"), None)
            .await
            .context("拉取警告通知失败")?;

        let shown = self.store.shown_warning_ids().await?;
        let fresh: Vec<Notification> = unread
            .into_iter()
            .filter(|n| !n.id.is_empty() && !shown.contains(&n.id))
            .collect();

        let ids: Vec<String> = fresh.iter().map(|n| n.id.clone()).collect();
        self.store.mark_warnings_shown(&ids).await?;
        Ok(fresh)
    }

    /// 返回尚未展示过的未读警告，并记为已展示；失败时返回空列表
    pub async fn poll(&self, user_id: &str) -> Vec<Notification> {
        if user_id.is_empty() {
            return Vec::new();
        }
        match self.fetch_new(user_id).await {
            Ok(fresh) => {
                if !fresh.is_empty() {
                    info!("[Warnings] ⚠️ {} 条新警告", fresh.len());
                }
                fresh
            }
            Err(e) => {
                warn!("[Warnings] 轮询警告失败: {:?}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::platform::{Entities, MemoryPlatform};
    use crate::app::storage::memory_store;
    use serde_json::json;
    use std::sync::Arc;

    fn platform() -> Arc<MemoryPlatform> {
        let platform = Arc::new(MemoryPlatform::new());
        platform.insert_all(
            "Notification",
            vec![
                json!({"id": "n1", "user_id": "u1", "type": "warning", "read": false, "message": "first"}),
                json!({"id": "n2", "user_id": "u1", "type": "warning", "read": true, "message": "old"}),
                json!({"id": "n3", "user_id": "u1", "type": "message", "read": false}),
                json!({"id": "n4", "user_id": "u2", "type": "warning", "read": false}),
            ],
        );
        platform
    }

    async fn monitor(platform: Arc<MemoryPlatform>) -> WarningMonitor {
        WarningMonitor::new(
            Entities::new(platform).notifications,
            memory_store().await,
        )
    }

    #[tokio::test]
    async fn each_warning_is_shown_once() {
        let platform = platform();
        let monitor = monitor(platform.clone()).await;

        let first = monitor.poll("u1").await;
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].message, "first");
        assert!(monitor.poll("u1").await.is_empty());

        platform.insert_all(
            "Notification",
            vec![json!({"id": "n5", "user_id": "u1", "type": "warning", "read": false})],
        );
        let next = monitor.poll("u1").await;
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, "n5");
        assert_eq!(
            monitor.store.shown_warning_ids().await.unwrap(),
            vec!["n1".to_string(), "n5".to_string()]
        );
    }

    #[tokio::test]
    async fn fetch_failure_is_empty_and_marks_nothing() {
        let platform = platform();
        platform.set_entities_failing(true);
        let monitor = monitor(platform.clone()).await;
        assert!(monitor.poll("u1").await.is_empty());
        assert!(monitor.store.shown_warning_ids().await.unwrap().is_empty());

        platform.set_entities_failing(false);
        assert_eq!(monitor.poll("u1").await.len(), 1);
    }
}
