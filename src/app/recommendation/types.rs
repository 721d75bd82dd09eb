//! 推荐相关的数据结构

use crate::app::models::Broadcaster;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 推荐类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    SimilarInterests,
    Trending,
    NewDiscovery,
    FavoriteCategory,
}

impl RecommendationType {
    pub const ALL: [RecommendationType; 4] = [
        RecommendationType::SimilarInterests,
        RecommendationType::Trending,
        RecommendationType::NewDiscovery,
        RecommendationType::FavoriteCategory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationType::SimilarInterests => "similar_interests",
            RecommendationType::Trending => "trending",
            RecommendationType::NewDiscovery => "new_discovery",
            RecommendationType::FavoriteCategory => "favorite_category",
        }
    }
}

/// LLM 返回的单条推荐
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedItem {
    pub name: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub score: f64,
    /// 未知标签按缺失处理
    #[serde(default, deserialize_with = "lenient_type")]
    #[serde(rename = "type")]
    pub kind: Option<RecommendationType>,
}

fn lenient_type<'de, D>(deserializer: D) -> Result<Option<RecommendationType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// LLM 响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecommendationResponse {
    /// 格式不对的单条推荐直接丢弃，不影响其他条目
    #[serde(default, deserialize_with = "lenient_items")]
    pub recommendations: Vec<RecommendedItem>,
}

fn lenient_items<'de, D>(deserializer: D) -> Result<Vec<RecommendedItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect())
}

/// 推荐结果来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Inference,
    Fallback,
    #[default]
    Empty,
}

/// 候选主播的状态范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CandidateScope {
    /// 仅在线/离线（排除直播中、会话中）
    #[default]
    OnlineOrOffline,
    /// 全部审核通过的主播
    All,
}

/// 观众行为统计（提示词的输入）
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ViewerSignals {
    pub session_count: usize,
    pub favorite_broadcaster_ids: Vec<String>,
    pub categories: Vec<String>,
    pub languages: Vec<String>,
    pub session_types: Vec<String>,
}

/// 最终推荐结果
#[derive(Debug, Clone, Default, Serialize)]
pub struct Recommendations {
    pub broadcasters: Vec<Broadcaster>,
    /// 主播 ID → 推荐理由
    pub reasons: HashMap<String, String>,
    /// 主播 ID → 匹配分（0-100）
    pub scores: HashMap<String, u32>,
    pub source: RecommendationSource,
}

impl Recommendations {
    pub fn is_empty(&self) -> bool {
        self.broadcasters.is_empty()
    }

    pub fn reason_for(&self, broadcaster_id: &str) -> Option<&str> {
        self.reasons.get(broadcaster_id).map(String::as_str)
    }
}
