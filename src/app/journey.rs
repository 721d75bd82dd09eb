//! 观众成长统计与里程碑

use crate::app::models::{Favorite, RecurringSeries, Session};
use serde::Serialize;
use std::collections::HashSet;

/// 观众统计
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JourneyStats {
    pub completed_sessions: usize,
    pub total_minutes: f64,
    pub total_spent: f64,
    pub distinct_broadcasters: usize,
    pub favorite_count: usize,
    pub active_series: usize,
}

impl JourneyStats {
    /// 只统计已完成的会话
    pub fn from_records(
        sessions: &[Session],
        favorites: &[Favorite],
        series: &[RecurringSeries],
    ) -> Self {
        let completed: Vec<&Session> = sessions.iter().filter(|s| s.is_completed()).collect();
        let broadcasters: HashSet<&str> = completed
            .iter()
            .map(|s| s.broadcaster_id.as_str())
            .collect();
        let favorites: HashSet<&str> = favorites
            .iter()
            .map(|f| f.broadcaster_id.as_str())
            .collect();

        Self {
            completed_sessions: completed.len(),
            total_minutes: completed.iter().map(|s| s.duration_minutes.max(0.0)).sum(),
            total_spent: completed.iter().map(|s| s.total_price.max(0.0)).sum(),
            distinct_broadcasters: broadcasters.len(),
            favorite_count: favorites.len(),
            active_series: series.iter().filter(|s| s.is_active()).count(),
        }
    }
}

/// 里程碑定义
struct MilestoneDef {
    key: &'static str,
    title: &'static str,
    target: f64,
    measure: fn(&JourneyStats) -> f64,
}

const MILESTONES: &[MilestoneDef] = &[
    MilestoneDef {
        key: "first_session",
        title: "First session",
        target: 1.0,
        measure: |s| s.completed_sessions as f64,
    },
    MilestoneDef {
        key: "regular",
        title: "10 sessions",
        target: 10.0,
        measure: |s| s.completed_sessions as f64,
    },
    MilestoneDef {
        key: "first_hour",
        title: "60 minutes together",
        target: 60.0,
        measure: |s| s.total_minutes,
    },
    MilestoneDef {
        key: "collector",
        title: "5 favorites",
        target: 5.0,
        measure: |s| s.favorite_count as f64,
    },
    MilestoneDef {
        key: "explorer",
        title: "5 different broadcasters",
        target: 5.0,
        measure: |s| s.distinct_broadcasters as f64,
    },
    MilestoneDef {
        key: "series",
        title: "First active series",
        target: 1.0,
        measure: |s| s.active_series as f64,
    },
];

/// 里程碑进度
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Milestone {
    pub key: &'static str,
    pub title: &'static str,
    pub achieved: bool,
    /// 进度百分比，不超过 100
    pub progress: f64,
}

pub fn milestones(stats: &JourneyStats) -> Vec<Milestone> {
    MILESTONES
        .iter()
        .map(|def| {
            let value = (def.measure)(stats);
            Milestone {
                key: def.key,
                title: def.title,
                achieved: value >= def.target,
                progress: (value / def.target * 100.0).clamp(0.0, 100.0),
            }
        })
        .collect()
}
