//! 推荐服务层
//!
//! 拉取观众历史和候选主播 → 组装提示词 → 调用推理服务 → 映射回主播记录。
//! 拉取失败返回空推荐；推理失败时按配置走兜底排序或返回空推荐。

use crate::app::models::{Broadcaster, Favorite, Session, UserStatus, ViewerPreference};
use crate::app::platform::{Entities, InferenceClient, Query};
use crate::app::recommendation::prompt::{
    build_prompt, derive_signals, fallback_ranking, resolve, response_schema,
};
use crate::app::recommendation::types::{
    CandidateScope, RecommendationResponse, Recommendations, ViewerSignals,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 单次拉取的历史记录上限
const HISTORY_LIMIT: usize = 50;
const CANDIDATE_LIMIT: usize = 100;

/// 推荐配置
#[derive(Debug, Clone, Copy)]
pub struct RecommendationConfig {
    pub candidate_scope: CandidateScope,
    /// 推理失败时是否使用兜底排序
    pub fallback_on_inference_error: bool,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            candidate_scope: CandidateScope::OnlineOrOffline,
            fallback_on_inference_error: true,
        }
    }
}

/// 观众历史 + 候选主播
struct ViewerContext {
    sessions: Vec<Session>,
    favorites: Vec<Favorite>,
    preferences: Vec<ViewerPreference>,
    candidates: Vec<Broadcaster>,
}

/// 推荐组装器
pub struct RecommendationComposer {
    entities: Entities,
    inference: Arc<dyn InferenceClient>,
    config: RecommendationConfig,
}

impl RecommendationComposer {
    pub fn new(
        entities: Entities,
        inference: Arc<dyn InferenceClient>,
        config: RecommendationConfig,
    ) -> Self {
        Self {
            entities,
            inference,
            config,
        }
    }

    fn candidate_query(&self) -> Query {
        let query = Query::new().eq("broadcaster_approved", true);
        match self.config.candidate_scope {
            CandidateScope::OnlineOrOffline => {
                query.is_in("status", &[UserStatus::Online, UserStatus::Offline])
            }
            CandidateScope::All => query,
        }
    }

    /// 并发拉取观众历史和候选主播
    async fn load_context(&self, viewer_id: &str) -> Result<ViewerContext> {
        let sessions_query = Query::new().eq("customer_id", viewer_id);
        let favorites_query = Query::new().eq("user_id", viewer_id);
        let preferences_query = Query::new().eq("viewer_id", viewer_id);
        let candidates_query = self.candidate_query();

        let (sessions, favorites, preferences, candidates) = futures_util::future::try_join4(
            self.entities
                .sessions
                .filter(&sessions_query, Some("-created_date"), Some(HISTORY_LIMIT)),
            self.entities.favorites.filter(&favorites_query, None, None),
            self.entities.viewer_preferences.filter(
                &preferences_query,
                Some("-created_date"),
                Some(HISTORY_LIMIT),
            ),
            self.entities
                .users
                .filter(&candidates_query, Some("-rating"), Some(CANDIDATE_LIMIT)),
        )
        .await
        .context("拉取推荐输入失败")?;

        let mut candidates = candidates;
        // 不推荐自己，也不推荐未审核的主播
        candidates.retain(|b| b.is_listed() && b.id != viewer_id);

        Ok(ViewerContext {
            sessions,
            favorites,
            preferences,
            candidates,
        })
    }

    /// 调用推理服务并解析
    async fn infer(
        &self,
        signals: &ViewerSignals,
        candidates: &[Broadcaster],
    ) -> Result<Recommendations> {
        let prompt = build_prompt(signals, candidates);
        debug!("[Recommend] 提示词:\n{}", prompt);

        let raw = self
            .inference
            .invoke_llm(&prompt, response_schema())
            .await
            .context("LLM 推理失败")?;
        let response: RecommendationResponse =
            serde_json::from_value(raw).context("解析推荐结果失败")?;
        info!(
            "[Recommend] 推理返回 {} 条推荐",
            response.recommendations.len()
        );
        Ok(resolve(&response, candidates))
    }

    /// 为观众生成推荐（不返回错误）
    pub async fn recommend(&self, viewer_id: &str) -> Recommendations {
        info!("[Recommend] 🤖 为观众 {} 生成推荐", viewer_id);

        let ctx = match self.load_context(viewer_id).await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("[Recommend] 拉取数据失败，返回空推荐: {:?}", e);
                return Recommendations::default();
            }
        };
        if ctx.candidates.is_empty() {
            info!("[Recommend] 没有候选主播");
            return Recommendations::default();
        }

        let signals = derive_signals(&ctx.sessions, &ctx.favorites, &ctx.preferences);
        debug!("[Recommend] 观众信号: {:?}", signals);

        match self.infer(&signals, &ctx.candidates).await {
            Ok(result) => {
                info!(
                    "[Recommend] ✅ 推荐完成，匹配到 {} 个主播",
                    result.broadcasters.len()
                );
                result
            }
            Err(e) if self.config.fallback_on_inference_error => {
                warn!("[Recommend] 推理不可用，使用兜底排序: {:?}", e);
                fallback_ranking(&signals, &ctx.candidates)
            }
            Err(e) => {
                error!("[Recommend] 推理失败，返回空推荐: {:?}", e);
                Recommendations::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::platform::MemoryPlatform;
    use crate::app::recommendation::types::RecommendationSource;
    use serde_json::json;

    fn seeded_platform() -> Arc<MemoryPlatform> {
        let platform = Arc::new(MemoryPlatform::new());
        platform.insert_all(
            "User",
            vec![
                json!({"id": "b1", "display_name": "Ana", "status": "online", "categories": ["music"], "broadcaster_approved": true}),
                json!({"id": "b2", "display_name": "Bea", "status": "offline", "broadcaster_approved": true}),
                json!({"id": "b3", "display_name": "Cal", "status": "live", "broadcaster_approved": true}),
                json!({"id": "b4", "display_name": "Dee", "status": "online", "broadcaster_approved": false}),
            ],
        );
        platform.insert_all(
            "Session",
            vec![json!({"id": "s1", "customer_id": "v1", "broadcaster_id": "b2", "session_type": "audio"})],
        );
        platform.insert_all(
            "ViewerPreference",
            vec![json!({"id": "p1", "viewer_id": "v1", "category": "music", "language": "es"})],
        );
        platform
    }

    fn composer(platform: Arc<MemoryPlatform>, config: RecommendationConfig) -> RecommendationComposer {
        RecommendationComposer::new(Entities::new(platform.clone()), platform, config)
    }

    #[tokio::test]
    async fn inference_results_are_joined_to_candidates() {
        let platform = seeded_platform();
        platform.set_llm_response(Some(json!({
            "recommendations": [
                {"name": "Cal", "reason": "live now", "score": 90, "type": "trending"},
                {"name": "Bea", "reason": "you chatted before", "score": 80, "type": "similar_interests"},
                {"name": "Nobody", "reason": "?", "score": 70, "type": "new_discovery"},
                {"name": "Ana", "reason": "music fan", "score": 75, "type": "favorite_category"}
            ]
        })));

        let result = composer(platform.clone(), RecommendationConfig::default())
            .recommend("v1")
            .await;
        assert_eq!(result.source, RecommendationSource::Inference);
        // Cal 正在直播，不在默认候选范围内
        let ids: Vec<_> = result.broadcasters.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "b1"]);
        assert_eq!(result.reason_for("b1"), Some("music fan"));

        let prompt = &platform.prompts()[0];
        assert!(prompt.contains("Sessions attended: 1"));
        assert!(prompt.contains("Browsed categories: music"));
        assert!(prompt.contains("Session types used: audio"));
        assert!(!prompt.contains("Dee"));
    }

    #[tokio::test]
    async fn one_bad_item_keeps_the_inferred_matches() {
        let platform = seeded_platform();
        platform.set_llm_response(Some(json!({
            "recommendations": [
                {"name": "Bea", "reason": "you chatted before", "score": 80, "type": "similar_interests"},
                {"name": null, "reason": "?", "score": 10, "type": "trending"}
            ]
        })));
        let result = composer(platform, RecommendationConfig::default())
            .recommend("v1")
            .await;
        assert_eq!(result.source, RecommendationSource::Inference);
        let ids: Vec<_> = result.broadcasters.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b2"]);
    }

    #[tokio::test]
    async fn all_scope_includes_live_broadcasters() {
        let platform = seeded_platform();
        platform.set_llm_response(Some(json!({
            "recommendations": [{"name": "Cal", "reason": "live now", "score": 90, "type": "trending"}]
        })));
        let config = RecommendationConfig {
            candidate_scope: CandidateScope::All,
            ..Default::default()
        };
        let result = composer(platform, config).recommend("v1").await;
        assert_eq!(result.broadcasters[0].id, "b3");
    }

    #[tokio::test]
    async fn inference_failure_uses_fallback_ranking() {
        let platform = seeded_platform();
        let result = composer(platform, RecommendationConfig::default())
            .recommend("v1")
            .await;
        assert_eq!(result.source, RecommendationSource::Fallback);
        assert_eq!(result.broadcasters[0].id, "b1");
    }

    #[tokio::test]
    async fn inference_failure_without_fallback_is_empty() {
        let platform = seeded_platform();
        let config = RecommendationConfig {
            fallback_on_inference_error: false,
            ..Default::default()
        };
        let result = composer(platform, config).recommend("v1").await;
        assert!(result.is_empty());
        assert_eq!(result.source, RecommendationSource::Empty);
    }

    #[tokio::test]
    async fn fetch_failure_is_empty() {
        let platform = seeded_platform();
        platform.set_entities_failing(true);
        let result = composer(platform.clone(), RecommendationConfig::default())
            .recommend("v1")
            .await;
        assert!(result.is_empty());
        assert!(platform.prompts().is_empty());
    }
}
