//! 客户端本地持久化（键值存储）
//!
//! 只保存两类数据：访客模式标记、已经展示过的警告通知 ID 列表。
//! 值都是简单字符串/JSON 数组，没有 schema 版本。

use anyhow::{Context, Result};
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;

pub const GUEST_MODE_KEY: &str = "guest_mode";
pub const SHOWN_WARNINGS_KEY: &str = "shown_warning_ids";

/// 本地键值存储（基于 sqlx）
#[derive(Clone)]
pub struct LocalStore {
    db: Pool<Sqlite>,
}

impl LocalStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query(
            r#"
            SELECT storage_value FROM local_storage WHERE storage_key = ?
            "#,
        )
        .bind(key)
        .fetch_optional(&self.db)
        .await
        .with_context(|| format!("读取本地存储失败: {}", key))?;

        Ok(row.map(|r| r.get::<String, _>("storage_value")))
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let sql = r#"
            INSERT INTO local_storage (storage_key, storage_value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(storage_key) DO UPDATE SET
                storage_value = excluded.storage_value,
                updated_at = excluded.updated_at
        "#;

        sqlx::query(sql)
            .bind(key)
            .bind(value)
            .bind(chrono::Utc::now().timestamp_millis())
            .execute(&self.db)
            .await
            .with_context(|| format!("写入本地存储失败: {}", key))?;
        debug!("[Storage] 写入 {} = {}", key, value);
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM local_storage WHERE storage_key = ?")
            .bind(key)
            .execute(&self.db)
            .await
            .with_context(|| format!("删除本地存储失败: {}", key))?;
        Ok(())
    }

    /// 布尔标记，仅 `"true"` 视为真
    pub async fn get_flag(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.as_deref() == Some("true"))
    }

    pub async fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        self.set(key, if value { "true" } else { "false" }).await
    }

    /// 已展示过的警告通知 ID；内容损坏时按空列表处理
    pub async fn shown_warning_ids(&self) -> Result<Vec<String>> {
        let raw = self.get(SHOWN_WARNINGS_KEY).await?;
        Ok(raw
            .and_then(|s| serde_json::from_str::<Vec<String>>(&s).ok())
            .unwrap_or_default())
    }

    pub async fn mark_warnings_shown(&self, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut shown = self.shown_warning_ids().await?;
        for id in ids {
            if !shown.contains(id) {
                shown.push(id.clone());
            }
        }
        let json = serde_json::to_string(&shown).context("序列化警告 ID 失败")?;
        self.set(SHOWN_WARNINGS_KEY, &json).await
    }
}

#[cfg(test)]
pub(crate) async fn memory_store() -> LocalStore {
    let pool = crate::app::db::create_sqlite_pool_with_migration("sqlite::memory:")
        .await
        .expect("创建内存数据库失败");
    LocalStore::new(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn flags_default_to_false() {
        let store = memory_store().await;
        assert!(!store.get_flag(GUEST_MODE_KEY).await.unwrap());
        store.set_flag(GUEST_MODE_KEY, true).await.unwrap();
        assert!(store.get_flag(GUEST_MODE_KEY).await.unwrap());
        store.remove(GUEST_MODE_KEY).await.unwrap();
        assert!(!store.get_flag(GUEST_MODE_KEY).await.unwrap());
    }

    #[tokio::test]
    async fn shown_warning_ids_are_deduplicated() {
        let store = memory_store().await;
        store
            .mark_warnings_shown(&["n1".to_string(), "n2".to_string()])
            .await
            .unwrap();
        store
            .mark_warnings_shown(&["n2".to_string(), "n3".to_string()])
            .await
            .unwrap();
        assert_eq!(store.shown_warning_ids().await.unwrap(), vec!["n1", "n2", "n3"]);
    }

    #[tokio::test]
    async fn corrupt_warning_list_reads_as_empty() {
        let store = memory_store().await;
        store.set(SHOWN_WARNINGS_KEY, "not json").await.unwrap();
        assert!(store.shown_warning_ids().await.unwrap().is_empty());
    }
}
