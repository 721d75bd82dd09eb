//! 平台实体模型定义
//!
//! 所有实体都由远端平台持有和持久化，这里只保存一次拉取得到的临时副本。
//! 缺失字段一律使用默认值，未知的枚举字符串反序列化为 `Other`。

use crate::app::types::deserialize_vec_or_null;
use serde::{Deserialize, Serialize};

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Guest,
    #[default]
    User,
    Streamer,
    Moderator,
    Admin,
    Broadcaster,
    #[serde(other)]
    Other,
}

/// 在线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Online,
    #[default]
    Offline,
    Live,
    InSession,
    #[serde(other)]
    Other,
}

impl UserStatus {
    /// 列表排序权重：online=0, in_session=1, 其他=2
    pub fn rank(self) -> u8 {
        match self {
            UserStatus::Online => 0,
            UserStatus::InSession => 1,
            _ => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Online => "online",
            UserStatus::Offline => "offline",
            UserStatus::Live => "live",
            UserStatus::InSession => "in_session",
            UserStatus::Other => "other",
        }
    }
}

/// 用户 / 主播（平台的 User 实体，主播只是带主播字段的用户）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub display_name: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub gender: String,
    pub country: String,
    pub ethnicity: String,
    #[serde(deserialize_with = "deserialize_vec_or_null")]
    pub languages: Vec<String>,
    #[serde(deserialize_with = "deserialize_vec_or_null")]
    pub categories: Vec<String>,
    #[serde(deserialize_with = "deserialize_vec_or_null")]
    pub goals: Vec<String>,
    pub level: u32,
    pub rating: f64,
    pub price_per_minute: f64,
    pub broadcaster_approved: bool,
    pub created_date: Option<String>,
}

/// 主播与用户共用同一实体
pub type Broadcaster = User;

impl User {
    /// 展示名称：优先 display_name，没有时退回 full_name
    pub fn name(&self) -> &str {
        if self.display_name.is_empty() {
            &self.full_name
        } else {
            &self.display_name
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// 是否可以看到审核相关入口
    pub fn can_moderate(&self) -> bool {
        matches!(self.role, UserRole::Moderator | UserRole::Admin)
    }

    /// 是否可以开播
    pub fn can_broadcast(&self) -> bool {
        matches!(
            self.role,
            UserRole::Streamer | UserRole::Broadcaster | UserRole::Admin
        )
    }

    /// 出现在主播列表中的前提：审核通过
    pub fn is_listed(&self) -> bool {
        self.broadcaster_approved
    }
}

/// 会话类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    #[default]
    Video,
    Audio,
    Text,
    #[serde(other)]
    Other,
}

impl SessionType {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionType::Video => "video",
            SessionType::Audio => "audio",
            SessionType::Text => "text",
            SessionType::Other => "other",
        }
    }
}

/// 付费会话记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub id: String,
    pub broadcaster_id: String,
    pub customer_id: String,
    pub status: String,
    pub session_type: SessionType,
    pub duration_minutes: f64,
    pub total_price: f64,
    pub created_date: Option<String>,
}

impl Session {
    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// 收藏（用户与主播的多对多关联，无排序语义）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub broadcaster_id: String,
}

/// 直播目标
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingGoal {
    pub id: String,
    pub broadcaster_id: String,
    pub goal_type: String,
    pub current_value: f64,
    pub target_value: f64,
    pub is_public: bool,
    pub status: String,
    pub deadline: Option<String>,
}

impl StreamingGoal {
    /// 完成进度百分比，永远不超过 100
    pub fn progress_percent(&self) -> f64 {
        if self.target_value <= 0.0 {
            return 0.0;
        }
        (self.current_value / self.target_value * 100.0).clamp(0.0, 100.0)
    }
}

/// 观众偏好记录（推荐提示词的信号来源）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerPreference {
    pub id: String,
    pub viewer_id: String,
    pub category: String,
    pub language: String,
    pub created_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurringSeries {
    pub id: String,
    pub viewer_id: String,
    pub status: String,
}

impl RecurringSeries {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// 站内通知
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub read: bool,
    pub message: String,
    pub created_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_date: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_enum_values_fall_back_to_other() {
        let user: User = serde_json::from_value(serde_json::json!({
            "id": "u1",
            "role": "superhero",
            "status": "away",
            "languages": null,
        }))
        .unwrap();
        assert_eq!(user.role, UserRole::Other);
        assert_eq!(user.status, UserStatus::Other);
        assert!(user.languages.is_empty());
        assert!(!user.broadcaster_approved);
    }

    #[test]
    fn goal_progress_is_clamped() {
        let mut goal = StreamingGoal {
            current_value: 150.0,
            target_value: 100.0,
            ..Default::default()
        };
        assert_eq!(goal.progress_percent(), 100.0);
        goal.current_value = 25.0;
        assert_eq!(goal.progress_percent(), 25.0);
        goal.target_value = 0.0;
        assert_eq!(goal.progress_percent(), 0.0);
    }

    #[test]
    fn role_gates() {
        let mut user = User {
            role: UserRole::Moderator,
            ..Default::default()
        };
        assert!(user.can_moderate());
        assert!(!user.can_broadcast());
        user.role = UserRole::Broadcaster;
        assert!(user.can_broadcast());
        assert!(!user.can_moderate());
        user.role = UserRole::Admin;
        assert!(user.can_moderate() && user.can_broadcast() && user.is_admin());
    }

    #[test]
    fn name_falls_back_to_full_name() {
        let user = User {
            full_name: "Ana Lima".to_string(),
            ..Default::default()
        };
        assert_eq!(user.name(), "Ana Lima");
    }
}
