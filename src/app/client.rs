//! 客户端门面
//!
//! 把平台访问层、本地存储和各个服务组装到一起，对外只暴露这一个入口。

use crate::app::auth::{AuthContext, AuthState, EmptySessionListener, SessionListener};
use crate::app::cache::Revalidator;
use crate::app::db::create_sqlite_pool_with_migration;
use crate::app::discovery::DiscoveryService;
use crate::app::journey::{milestones, JourneyStats, Milestone};
use crate::app::language::{LanguageContext, Locale};
use crate::app::models::Broadcaster;
use crate::app::platform::{Entities, HttpPlatform, Platform, PlatformFunctions, Query};
use crate::app::recommendation::{
    CandidateScope, RecommendationComposer, RecommendationConfig, Recommendations,
};
use crate::app::storage::LocalStore;
use crate::app::warnings::WarningMonitor;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// 客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 平台 API 基础地址
    pub api_base_url: String,
    /// 应用 ID（每个请求都带 `x-app-id`）
    pub app_id: String,
    /// 访问 token，为空时以访客身份访问
    pub token: Option<String>,
    /// 本地 SQLite 数据库 URL
    ///
    /// 例如：`sqlite://camaraderie.db?mode=rwc`
    pub storage_db_url: String,
    /// 查询缓存的有效期
    pub cache_ttl: Duration,
    /// 主播列表定时刷新间隔
    pub poll_interval: Duration,
    pub locale: Locale,
    pub candidate_scope: CandidateScope,
    /// 推理失败时是否使用兜底排序
    pub fallback_recommendations: bool,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(api_base_url: String, app_id: String) -> Self {
        Self {
            api_base_url,
            app_id,
            token: None,
            storage_db_url: "sqlite://camaraderie.db?mode=rwc".to_string(),
            cache_ttl: Duration::from_secs(30),
            poll_interval: Duration::from_secs(10),
            locale: Locale::En,
            candidate_scope: CandidateScope::OnlineOrOffline,
            fallback_recommendations: true,
        }
    }

    fn recommendation_config(&self) -> RecommendationConfig {
        RecommendationConfig {
            candidate_scope: self.candidate_scope,
            fallback_on_inference_error: self.fallback_recommendations,
        }
    }
}

/// Camaraderie 客户端
pub struct CamaraderieClient {
    config: ClientConfig,
    pub entities: Entities,
    pub functions: PlatformFunctions,
    pub auth: AuthContext,
    pub language: LanguageContext,
    pub discovery: DiscoveryService,
    pub recommendations: RecommendationComposer,
    pub warnings: WarningMonitor,
}

impl CamaraderieClient {
    /// 连接远端平台并打开本地数据库
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let platform = Arc::new(
            HttpPlatform::new(&config.api_base_url, &config.app_id, config.token.as_deref())
                .context("创建平台客户端失败")?,
        );
        let pool = create_sqlite_pool_with_migration(&config.storage_db_url)
            .await
            .context("打开本地数据库失败")?;
        Ok(Self::with_platform(
            config,
            platform,
            LocalStore::new(pool),
            Arc::new(EmptySessionListener),
        ))
    }

    /// 使用任意平台实现组装客户端（离线 fixture、测试）
    pub fn with_platform<P: Platform + 'static>(
        config: ClientConfig,
        platform: Arc<P>,
        store: LocalStore,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        let entities = Entities::new(platform.clone());
        let functions = PlatformFunctions::new(platform.clone());
        let auth = AuthContext::new(platform.clone(), functions.clone(), store.clone(), listener);
        let recommendations = RecommendationComposer::new(
            entities.clone(),
            platform,
            config.recommendation_config(),
        );

        info!(
            "[Client] 🚀 客户端已组装，API: {}, 语言: {}",
            config.api_base_url,
            config.locale.code()
        );

        Self {
            functions,
            auth,
            language: LanguageContext::new(config.locale),
            discovery: DiscoveryService::new(entities.clone(), config.cache_ttl),
            recommendations,
            warnings: WarningMonitor::new(entities.notifications.clone(), store),
            entities,
            config,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 加载访客标记并拉取当前用户
    pub async fn init(&self) -> Arc<AuthState> {
        self.auth.init().await
    }

    /// 按配置的间隔定时刷新主播列表
    pub fn watch_broadcasters(&self) -> Revalidator<Vec<Broadcaster>> {
        self.discovery.watch_broadcasters(self.config.poll_interval)
    }

    /// 为当前登录用户生成推荐；未登录时为空
    pub async fn recommend_for_current_user(&self) -> Recommendations {
        match self.auth.snapshot().user.as_ref() {
            Some(user) => self.recommendations.recommend(&user.id).await,
            None => Recommendations::default(),
        }
    }

    async fn load_journey(&self, viewer_id: &str) -> Result<JourneyStats> {
        let sessions_query = Query::new().eq("customer_id", viewer_id);
        let favorites_query = Query::new().eq("user_id", viewer_id);
        let series_query = Query::new().eq("viewer_id", viewer_id);

        let (sessions, favorites, series) = tokio::try_join!(
            self.entities.sessions.filter(&sessions_query, None, None),
            self.entities.favorites.filter(&favorites_query, None, None),
            self.entities.recurring_series.filter(&series_query, None, None),
        )
        .context("拉取观众记录失败")?;
        Ok(JourneyStats::from_records(&sessions, &favorites, &series))
    }

    /// 观众统计与里程碑；拉取失败时返回空统计
    pub async fn journey(&self, viewer_id: &str) -> (JourneyStats, Vec<Milestone>) {
        let stats = match self.load_journey(viewer_id).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("[Client] 获取观众统计失败: {:?}", e);
                JourneyStats::default()
            }
        };
        let milestones = milestones(&stats);
        (stats, milestones)
    }
}
