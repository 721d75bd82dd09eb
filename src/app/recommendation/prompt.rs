//! 提示词组装与结果解析
//!
//! 全部是纯函数：统计观众信号、拼提示词、声明响应结构、把返回的名字映射回主播记录、
//! 以及推理不可用时的确定性兜底排序。

use crate::app::models::{Broadcaster, Favorite, Session, ViewerPreference};
use crate::app::recommendation::types::{
    RecommendationResponse, RecommendationSource, RecommendationType, Recommendations,
    ViewerSignals,
};
use serde_json::{json, Value};
use std::cmp::Reverse;
use std::collections::HashMap;

/// 推荐数量
pub const RECOMMENDATION_COUNT: usize = 6;
/// 提示词中最多放入的主播样本数
pub const MAX_PROMPT_SAMPLES: usize = 20;
/// 推荐理由最大长度（字符）
pub const MAX_REASON_CHARS: usize = 100;

fn push_distinct(list: &mut Vec<String>, value: &str) {
    let value = value.trim();
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}

/// 统计观众信号（去重并保留首次出现顺序）
pub fn derive_signals(
    sessions: &[Session],
    favorites: &[Favorite],
    preferences: &[ViewerPreference],
) -> ViewerSignals {
    let mut signals = ViewerSignals {
        session_count: sessions.len(),
        ..Default::default()
    };
    for favorite in favorites {
        push_distinct(&mut signals.favorite_broadcaster_ids, &favorite.broadcaster_id);
    }
    for preference in preferences {
        push_distinct(&mut signals.categories, &preference.category);
        push_distinct(&mut signals.languages, &preference.language);
    }
    for session in sessions {
        push_distinct(&mut signals.session_types, session.session_type.as_str());
    }
    signals
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none yet".to_string()
    } else {
        values.join(", ")
    }
}

fn summarize(b: &Broadcaster) -> String {
    format!(
        "- {} | status: {} | country: {} | languages: {} | categories: {} | level: {} | rating: {:.1}",
        b.name(),
        b.status.as_str(),
        if b.country.is_empty() { "unknown" } else { b.country.as_str() },
        join_or_none(&b.languages),
        join_or_none(&b.categories),
        b.level,
        b.rating,
    )
}

/// 组装提示词：观众统计 + 最多 20 个主播摘要，要求恰好 6 条推荐
pub fn build_prompt(signals: &ViewerSignals, candidates: &[Broadcaster]) -> String {
    let samples = candidates
        .iter()
        .take(MAX_PROMPT_SAMPLES)
        .map(summarize)
        .collect::<Vec<_>>()
        .join("\n");

    let types = RecommendationType::ALL
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a recommendation assistant for a live-streaming social platform.\n\
         Viewer history:\n\
         - Sessions attended: {}\n\
         - Favorited broadcasters: {}\n\
         - Browsed categories: {}\n\
         - Preferred languages: {}\n\
         - Session types used: {}\n\
         \n\
         Available broadcasters:\n\
         {}\n\
         \n\
         Recommend exactly {} broadcasters from the list above, ranked best first. \
         Use each broadcaster's name exactly as written. For each give a reason of at most {} characters, \
         a match score from 0 to 100, and a type from: {}.",
        signals.session_count,
        signals.favorite_broadcaster_ids.len(),
        join_or_none(&signals.categories),
        join_or_none(&signals.languages),
        join_or_none(&signals.session_types),
        if samples.is_empty() { "(none)".to_string() } else { samples },
        RECOMMENDATION_COUNT,
        MAX_REASON_CHARS,
        types,
    )
}

/// 声明给推理服务的响应结构
pub fn response_schema() -> Value {
    let types: Vec<&str> = RecommendationType::ALL.iter().map(|t| t.as_str()).collect();
    json!({
        "type": "object",
        "properties": {
            "recommendations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "reason": { "type": "string", "maxLength": MAX_REASON_CHARS },
                        "score": { "type": "number", "minimum": 0, "maximum": 100 },
                        "type": { "type": "string", "enum": types },
                    },
                    "required": ["name", "reason", "score", "type"],
                },
            },
        },
        "required": ["recommendations"],
    })
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// 把推理结果映射回候选主播：名字精确匹配，未匹配的直接丢弃，最多 6 个
pub fn resolve(response: &RecommendationResponse, pool: &[Broadcaster]) -> Recommendations {
    let mut result = Recommendations {
        source: RecommendationSource::Inference,
        ..Default::default()
    };

    for item in &response.recommendations {
        if result.broadcasters.len() >= RECOMMENDATION_COUNT {
            break;
        }
        if item.name.trim().is_empty() {
            continue;
        }
        let Some(broadcaster) = pool.iter().find(|b| b.name() == item.name) else {
            continue;
        };
        if result.reasons.contains_key(&broadcaster.id) {
            continue;
        }
        result.reasons.insert(
            broadcaster.id.clone(),
            truncate_chars(&item.reason, MAX_REASON_CHARS),
        );
        result.scores.insert(
            broadcaster.id.clone(),
            item.score.clamp(0.0, 100.0).round() as u32,
        );
        result.broadcasters.push(broadcaster.clone());
    }
    result
}

/// 推理不可用时的兜底排序
///
/// 偏好分类重合数 → 偏好语言重合数 → 在线状态 → 评分 → 等级，取前 6 个
pub fn fallback_ranking(signals: &ViewerSignals, pool: &[Broadcaster]) -> Recommendations {
    let overlap = |have: &[String], wanted: &[String]| {
        have.iter()
            .filter(|h| wanted.iter().any(|w| w.eq_ignore_ascii_case(h)))
            .count()
    };

    let mut ranked: Vec<(usize, usize, &Broadcaster)> = pool
        .iter()
        .map(|b| {
            (
                overlap(&b.categories, &signals.categories),
                overlap(&b.languages, &signals.languages),
                b,
            )
        })
        .collect();
    ranked.sort_by(|(ca, la, a), (cb, lb, b)| {
        (Reverse(*ca), Reverse(*la), a.status.rank())
            .cmp(&(Reverse(*cb), Reverse(*lb), b.status.rank()))
            .then_with(|| b.rating.total_cmp(&a.rating))
            .then_with(|| b.level.cmp(&a.level))
    });

    let mut result = Recommendations {
        source: RecommendationSource::Fallback,
        ..Default::default()
    };
    let mut reasons = HashMap::new();
    let mut scores = HashMap::new();
    for (categories, languages, b) in ranked.into_iter().take(RECOMMENDATION_COUNT) {
        let reason = if categories > 0 {
            "Matches the categories you browse"
        } else if languages > 0 {
            "Speaks your preferred language"
        } else {
            "Popular on the platform right now"
        };
        reasons.insert(b.id.clone(), reason.to_string());
        scores.insert(
            b.id.clone(),
            (50 + categories * 15 + languages * 10).min(100) as u32,
        );
        result.broadcasters.push(b.clone());
    }
    result.reasons = reasons;
    result.scores = scores;
    result
}
