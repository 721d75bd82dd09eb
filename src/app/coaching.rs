//! 直播辅导评分表
//!
//! 纯函数：综合评分、曝光加权、提示语、提示是否被忽略、功能开关。
//! 提示/警告历史由调用方保存。

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// 单场直播的各项行为评分（0-100），缺失项不参与计算
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionScores {
    pub engagement_score: Option<f64>,
    pub smile_score: Option<f64>,
    pub voice_score: Option<f64>,
    pub movement_score: Option<f64>,
    pub chat_responsiveness_score: Option<f64>,
    pub retention_score: Option<f64>,
    pub warmth_score: Option<f64>,
    pub idle_reduction_score: Option<f64>,
}

/// 权重表
pub const SCORE_WEIGHTS: [(&str, f64); 8] = [
    ("engagement", 0.20),
    ("smile", 0.15),
    ("voice", 0.15),
    ("movement", 0.10),
    ("chat_responsiveness", 0.20),
    ("retention", 0.10),
    ("warmth", 0.05),
    ("idle_reduction", 0.05),
];

impl SessionScores {
    /// 按权重表顺序排列的评分
    fn weighted(&self) -> [(Option<f64>, f64); 8] {
        let w = |i: usize| SCORE_WEIGHTS[i].1;
        [
            (self.engagement_score, w(0)),
            (self.smile_score, w(1)),
            (self.voice_score, w(2)),
            (self.movement_score, w(3)),
            (self.chat_responsiveness_score, w(4)),
            (self.retention_score, w(5)),
            (self.warmth_score, w(6)),
            (self.idle_reduction_score, w(7)),
        ]
    }
}

/// 综合评分：仅对出现的分项加权平均，除数为出现分项的权重之和，四舍五入；没有分项时为 0
pub fn overall_score(scores: &SessionScores) -> u32 {
    let (sum, weight) = scores
        .weighted()
        .into_iter()
        .filter_map(|(score, weight)| score.filter(|s| s.is_finite()).map(|s| (s, weight)))
        .fold((0.0, 0.0), |(sum, total), (s, w)| (sum + s * w, total + w));

    if weight <= 0.0 {
        return 0;
    }
    (sum / weight).round().max(0.0) as u32
}

/// 曝光加权档位
pub const VISIBILITY_TIERS: [(u32, f64); 5] = [(90, 2.0), (80, 1.5), (70, 1.2), (60, 1.0), (50, 0.8)];

/// 低于所有档位时的加权
pub const VISIBILITY_FLOOR: f64 = 0.5;

/// 评分到曝光加权的阶梯函数（阈值含边界）
pub fn visibility_boost(score: u32) -> f64 {
    VISIBILITY_TIERS
        .iter()
        .find(|(min, _)| score >= *min)
        .map_or(VISIBILITY_FLOOR, |(_, boost)| *boost)
}

/// 提示类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintType {
    Smile,
    Voice,
    Movement,
    ChatResponse,
    Idle,
    Engagement,
    Retention,
    Warmth,
    Lighting,
}

impl HintType {
    pub const ALL: [HintType; 9] = [
        HintType::Smile,
        HintType::Voice,
        HintType::Movement,
        HintType::ChatResponse,
        HintType::Idle,
        HintType::Engagement,
        HintType::Retention,
        HintType::Warmth,
        HintType::Lighting,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HintType::Smile => "smile",
            HintType::Voice => "voice",
            HintType::Movement => "movement",
            HintType::ChatResponse => "chat_response",
            HintType::Idle => "idle",
            HintType::Engagement => "engagement",
            HintType::Retention => "retention",
            HintType::Warmth => "warmth",
            HintType::Lighting => "lighting",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }

    /// 每种类型固定 3 条提示语
    pub fn messages(self) -> &'static [&'static str; 3] {
        match self {
            HintType::Smile => &[
                "A warm smile goes a long way. Let your viewers see it!",
                "Smiling makes viewers feel welcome. Try a big one now.",
                "Your smile is your best feature on camera. Show it off!",
            ],
            HintType::Voice => &[
                "Speak up a little so everyone can hear you clearly.",
                "Vary your tone. A lively voice keeps people listening.",
                "Your viewers love hearing you. Say hi to the room!",
            ],
            HintType::Movement => &[
                "Move around a bit. Small gestures keep the stream lively.",
                "Try leaning in toward the camera when you talk.",
                "Use your hands when you speak. It adds energy!",
            ],
            HintType::ChatResponse => &[
                "Someone is chatting. Reply to keep the conversation going!",
                "Read a message out loud and answer it.",
                "Viewers stay longer when you respond to their messages.",
            ],
            HintType::Idle => &[
                "It has been quiet for a while. Ask your viewers a question!",
                "Break the silence with a fun topic or a quick story.",
                "Keep the energy up. Say something to the room.",
            ],
            HintType::Engagement => &[
                "Ask viewers where they are watching from.",
                "Start a mini poll in chat to get everyone involved.",
                "Call out a viewer by name to make them feel seen.",
            ],
            HintType::Retention => &[
                "Tease what is coming up next to keep viewers around.",
                "Thank people for staying. It makes them want to stay longer.",
                "Invite viewers to favorite you so they do not miss your next stream.",
            ],
            HintType::Warmth => &[
                "Welcome new viewers warmly as they join.",
                "A little compliment can brighten someone's day.",
                "Share something personal to build a connection.",
            ],
            HintType::Lighting => &[
                "Your face looks a bit dark. Try facing a light source.",
                "Adjust your lighting so viewers can see you clearly.",
                "Good lighting makes a big difference. Check your setup!",
            ],
        }
    }
}

/// 未知提示类型时的提示语
pub const FALLBACK_HINT: &str = "Keep up the great work!";

/// 随机挑选一条提示语
pub fn hint_message(hint_type: &str) -> &'static str {
    hint_message_with(hint_type, &mut rand::thread_rng())
}

/// 使用指定随机源挑选提示语
pub fn hint_message_with<R: Rng + ?Sized>(hint_type: &str, rng: &mut R) -> &'static str {
    HintType::parse(hint_type)
        .and_then(|t| t.messages().choose(rng).copied())
        .unwrap_or(FALLBACK_HINT)
}

/// 提示后 10 秒内没有改善视为被忽略
pub const HINT_IGNORE_WINDOW_MS: i64 = 10_000;

/// 提示是否被忽略：没有改善时间，或改善晚于提示超过 10 秒
pub fn hint_ignored(hint_time_ms: i64, improvement_time_ms: Option<i64>) -> bool {
    match improvement_time_ms {
        None => true,
        Some(improved) => improved - hint_time_ms > HINT_IGNORE_WINDOW_MS,
    }
}

/// 至少有 1 名观众时才启用 AI 辅导
pub fn activation_gate(viewer_count: u32) -> bool {
    viewer_count >= 1
}

/// 连续忽略提示后的警告等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    None,
    Notice,
    Warning,
    VisibilityReduced,
}

/// 警告阈值表（忽略次数下限, 等级）
pub const WARNING_THRESHOLDS: [(u32, WarningLevel); 3] = [
    (8, WarningLevel::VisibilityReduced),
    (5, WarningLevel::Warning),
    (3, WarningLevel::Notice),
];

pub fn warning_level(ignored_hints: u32) -> WarningLevel {
    WARNING_THRESHOLDS
        .iter()
        .find(|(min, _)| ignored_hints >= *min)
        .map_or(WarningLevel::None, |(_, level)| *level)
}

/// 曝光加权档位名称
pub fn coaching_tier(score: u32) -> &'static str {
    match score {
        90.. => "superstar",
        80..=89 => "rising_star",
        70..=79 => "engaging",
        60..=69 => "steady",
        50..=59 => "warming_up",
        _ => "needs_attention",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn overall_score_of_nothing_is_zero() {
        assert_eq!(overall_score(&SessionScores::default()), 0);
    }

    #[test]
    fn single_score_renormalizes_to_itself() {
        let scores = SessionScores {
            engagement_score: Some(80.0),
            ..Default::default()
        };
        assert_eq!(overall_score(&scores), 80);
    }

    #[test]
    fn weights_are_renormalized_over_present_scores() {
        // (90*0.20 + 60*0.05) / 0.25 = 84
        let scores = SessionScores {
            engagement_score: Some(90.0),
            warmth_score: Some(60.0),
            ..Default::default()
        };
        assert_eq!(overall_score(&scores), 84);

        let all = SessionScores {
            engagement_score: Some(100.0),
            smile_score: Some(100.0),
            voice_score: Some(100.0),
            movement_score: Some(100.0),
            chat_responsiveness_score: Some(100.0),
            retention_score: Some(100.0),
            warmth_score: Some(100.0),
            idle_reduction_score: Some(100.0),
        };
        assert_eq!(overall_score(&all), 100);
    }

    #[test]
    fn weight_table_sums_to_one() {
        let total: f64 = SCORE_WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn visibility_boost_thresholds_are_inclusive() {
        assert_eq!(visibility_boost(95), 2.0);
        assert_eq!(visibility_boost(90), 2.0);
        assert_eq!(visibility_boost(89), 1.5);
        assert_eq!(visibility_boost(85), 1.5);
        assert_eq!(visibility_boost(80), 1.5);
        assert_eq!(visibility_boost(70), 1.2);
        assert_eq!(visibility_boost(60), 1.0);
        assert_eq!(visibility_boost(50), 0.8);
        assert_eq!(visibility_boost(49), 0.5);
        assert_eq!(visibility_boost(10), 0.5);
    }

    #[test]
    fn hint_messages_come_from_the_pool() {
        let mut rng = StdRng::seed_from_u64(7);
        for hint_type in HintType::ALL {
            let msg = hint_message_with(hint_type.as_str(), &mut rng);
            assert!(hint_type.messages().contains(&msg));
        }
        assert_eq!(hint_message("dance"), FALLBACK_HINT);
        assert!(HintType::Smile.messages().contains(&hint_message("smile")));
    }

    #[test]
    fn hint_ignored_window() {
        let t = 1_700_000_000_000;
        assert!(hint_ignored(t, None));
        assert!(!hint_ignored(t, Some(t + 5_000)));
        assert!(!hint_ignored(t, Some(t + 10_000)));
        assert!(hint_ignored(t, Some(t + 10_001)));
    }

    #[test]
    fn activation_requires_a_viewer() {
        assert!(!activation_gate(0));
        assert!(activation_gate(1));
        assert!(activation_gate(40));
    }

    #[test]
    fn warning_levels_escalate() {
        assert_eq!(warning_level(0), WarningLevel::None);
        assert_eq!(warning_level(3), WarningLevel::Notice);
        assert_eq!(warning_level(6), WarningLevel::Warning);
        assert_eq!(warning_level(8), WarningLevel::VisibilityReduced);
    }

    #[test]
    fn tiers_line_up_with_boosts() {
        assert_eq!(coaching_tier(90), "superstar");
        assert_eq!(coaching_tier(59), "warming_up");
        assert_eq!(coaching_tier(0), "needs_attention");
    }
}
