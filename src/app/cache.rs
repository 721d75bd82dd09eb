//! 查询缓存
//!
//! 带 TTL 的键值缓存，加上按固定间隔重新拉取的后台任务。
//! 数据最多过期 `ttl + interval`：缓存命中时不超过 ttl，后台任务每个 interval 刷新一次。

use anyhow::Result;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

/// 带 TTL 的查询缓存
pub struct QueryCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone + Send + Sync + 'static> QueryCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 未过期的缓存值
    pub async fn get_fresh(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.value.clone())
    }

    pub async fn put(&self, key: &str, value: V) {
        self.entries.write().await.insert(
            key.to_string(),
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// 命中未过期缓存直接返回，否则重新拉取
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get_fresh(key).await {
            debug!("[Cache] 命中缓存: {}", key);
            return Ok(value);
        }
        self.revalidate(key, fetch).await
    }

    /// 强制重新拉取；失败时若有旧值则返回旧值
    pub async fn revalidate<F, Fut>(&self, key: &str, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        match fetch().await {
            Ok(value) => {
                self.put(key, value.clone()).await;
                debug!("[Cache] 已刷新: {}", key);
                Ok(value)
            }
            Err(e) => {
                let entries = self.entries.read().await;
                match entries.get(key) {
                    Some(stale) => {
                        warn!("[Cache] 刷新 {} 失败，返回旧数据: {:?}", key, e);
                        Ok(stale.value.clone())
                    }
                    None => Err(e),
                }
            }
        }
    }

    pub async fn invalidate(&self, key: &str) {
        self.entries.write().await.remove(key);
    }

    /// 删除指定前缀的全部键
    pub async fn invalidate_prefix(&self, prefix: &str) {
        self.entries
            .write()
            .await
            .retain(|k, _| !k.starts_with(prefix));
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

/// 拉取函数
pub type Fetcher<V> = Arc<dyn Fn() -> BoxFuture<'static, Result<V>> + Send + Sync>;

/// 后台定时刷新任务，drop 或 stop 时停止
///
/// 只推送成功拉取到的新值
pub struct Revalidator<V> {
    handle: JoinHandle<()>,
    updates: watch::Receiver<Option<V>>,
}

impl<V: Clone + Send + Sync + 'static> Revalidator<V> {
    /// 启动后立即拉取一次，之后每个 interval 拉取一次
    pub fn spawn(
        cache: Arc<QueryCache<V>>,
        key: String,
        interval: Duration,
        fetch: Fetcher<V>,
    ) -> Self {
        let (tx, updates) = watch::channel(None);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                // 失败时缓存保留旧值，但不向订阅者重复推送
                match fetch().await {
                    Ok(value) => {
                        cache.put(&key, value.clone()).await;
                        if tx.send(Some(value)).is_err() {
                            debug!("[Cache] {} 没有订阅者，停止刷新", key);
                            break;
                        }
                    }
                    Err(e) => warn!("[Cache] 定时刷新 {} 失败，保留旧数据: {:?}", key, e),
                }
            }
        });
        Self { handle, updates }
    }

    /// 订阅刷新结果
    pub fn subscribe(&self) -> watch::Receiver<Option<V>> {
        self.updates.clone()
    }

    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl<V> Drop for Revalidator<V> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn fresh_entries_are_not_refetched() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let value = cache
                .get_or_fetch("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2, 3]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let cache = QueryCache::new(Duration::ZERO);
        cache.put("k", 1).await;
        let value = cache.get_or_fetch("k", || async { Ok(2) }).await.unwrap();
        assert_eq!(value, 2);
    }

    #[tokio::test]
    async fn failed_refresh_serves_stale_value() {
        let cache = QueryCache::new(Duration::ZERO);
        cache.put("k", "old".to_string()).await;
        let value = cache
            .get_or_fetch("k", || async { Err(anyhow::anyhow!("offline")) })
            .await
            .unwrap();
        assert_eq!(value, "old");

        cache.invalidate("k").await;
        let missing = cache
            .get_or_fetch("k", || async { Err::<String, _>(anyhow::anyhow!("offline")) })
            .await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn prefix_invalidation() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.put("favorites:v1", 1).await;
        cache.put("favorites:v2", 2).await;
        cache.put("broadcasters", 3).await;
        cache.invalidate_prefix("favorites:").await;
        assert!(cache.get_fresh("favorites:v1").await.is_none());
        assert_eq!(cache.get_fresh("broadcasters").await, Some(3));
    }

    #[tokio::test]
    async fn revalidator_skips_failed_refreshes() {
        let cache = Arc::new(QueryCache::new(Duration::from_secs(60)));
        let counter = Arc::new(AtomicUsize::new(0));
        let fetch_counter = counter.clone();
        let fetch: Fetcher<String> = Arc::new(move || {
            let attempt = fetch_counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Ok("first".to_string())
                } else {
                    Err(anyhow::anyhow!("offline"))
                }
            }
            .boxed()
        });

        let revalidator =
            Revalidator::spawn(cache.clone(), "list".to_string(), Duration::from_millis(10), fetch);
        let mut rx = revalidator.subscribe();
        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rx.borrow_and_update().clone(), Some("first".to_string()));

        tokio::time::timeout(Duration::from_secs(2), async {
            while counter.load(Ordering::SeqCst) < 4 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(!rx.has_changed().unwrap());
        assert_eq!(cache.get_fresh("list").await, Some("first".to_string()));
        revalidator.stop();
    }

    #[tokio::test]
    async fn revalidator_refreshes_on_interval() {
        let cache = Arc::new(QueryCache::new(Duration::from_secs(60)));
        let counter = Arc::new(AtomicUsize::new(0));
        let fetch_counter = counter.clone();
        let fetch: Fetcher<usize> = Arc::new(move || {
            let counter = fetch_counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) }.boxed()
        });

        let revalidator =
            Revalidator::spawn(cache.clone(), "count".to_string(), Duration::from_millis(10), fetch);
        let mut rx = revalidator.subscribe();
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let current = rx.borrow_and_update().unwrap_or(0);
                if current >= 3 {
                    break;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();

        revalidator.stop();
        assert!(cache.get_fresh("count").await.unwrap() >= 3);
    }
}
