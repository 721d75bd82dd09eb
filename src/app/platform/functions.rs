//! 远程函数的类型化封装
//!
//! 支付、审核、通话房间等逻辑都在平台侧执行，这里只负责组装参数和解析结果。

use crate::app::models::SessionType;
use crate::app::platform::FunctionClient;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// 通话房间（会议组件只需要房间号和角色参数）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRoom {
    pub room_id: String,
    pub broadcaster_id: String,
    #[serde(default)]
    pub session_type: SessionType,
}

/// 审核操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationAction {
    Warn,
    Suspend,
    Ban,
    Approve,
}

/// 远程函数调用集合
#[derive(Clone)]
pub struct PlatformFunctions {
    client: Arc<dyn FunctionClient>,
}

impl PlatformFunctions {
    pub fn new(client: Arc<dyn FunctionClient>) -> Self {
        Self { client }
    }

    /// 主播提现
    pub async fn process_withdrawal(&self, amount: f64, method: &str) -> Result<Value> {
        if !(amount > 0.0) {
            anyhow::bail!("提现金额必须大于 0: {}", amount);
        }
        info!("[Functions] 💰 提交提现: {} via {}", amount, method);
        self.client
            .invoke(
                "processWithdrawal",
                json!({ "amount": amount, "method": method }),
            )
            .await
    }

    /// 让平台重新计算目标进度
    pub async fn check_goal_progress(&self, goal_id: &str) -> Result<Value> {
        self.client
            .invoke("checkGoalProgress", json!({ "goal_id": goal_id }))
            .await
    }

    /// 创建通话房间
    pub async fn create_call_room(
        &self,
        broadcaster_id: &str,
        session_type: SessionType,
    ) -> Result<CallRoom> {
        info!(
            "[Functions] 📞 创建通话房间，主播: {}, 类型: {}",
            broadcaster_id,
            session_type.as_str()
        );
        let value = self
            .client
            .invoke(
                "createCallRoom",
                json!({
                    "broadcaster_id": broadcaster_id,
                    "session_type": session_type,
                }),
            )
            .await?;
        serde_json::from_value(value).context("解析通话房间失败")
    }

    /// 导出指定日期区间的结算记录
    pub async fn export_payouts(&self, from: &str, to: &str) -> Result<Value> {
        self.client
            .invoke("exportPayouts", json!({ "from": from, "to": to }))
            .await
    }

    pub async fn moderate(
        &self,
        action: ModerationAction,
        target_user_id: &str,
        reason: &str,
    ) -> Result<Value> {
        info!(
            "[Functions] 🛡️ 审核操作 {:?}，目标用户: {}",
            action, target_user_id
        );
        self.client
            .invoke(
                "moderateUser",
                json!({
                    "action": action,
                    "target_user_id": target_user_id,
                    "reason": reason,
                }),
            )
            .await
    }

    pub async fn delete_account(&self) -> Result<Value> {
        self.client.invoke("deleteAccount", json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::platform::MemoryPlatform;

    #[tokio::test]
    async fn create_call_room_parses_result() {
        let platform = Arc::new(MemoryPlatform::new());
        platform.set_function_result(
            "createCallRoom",
            json!({"room_id": "r-1", "broadcaster_id": "b1", "session_type": "audio"}),
        );
        let functions = PlatformFunctions::new(platform.clone());
        let room = functions
            .create_call_room("b1", SessionType::Audio)
            .await
            .unwrap();
        assert_eq!(room.room_id, "r-1");
        assert_eq!(room.session_type, SessionType::Audio);

        let calls = platform.function_calls();
        assert_eq!(calls[0].0, "createCallRoom");
        assert_eq!(calls[0].1["session_type"], "audio");
    }

    #[tokio::test]
    async fn withdrawal_rejects_non_positive_amounts() {
        let platform = Arc::new(MemoryPlatform::new());
        let functions = PlatformFunctions::new(platform.clone());
        assert!(functions.process_withdrawal(0.0, "paypal").await.is_err());
        assert!(platform.function_calls().is_empty());
    }
}
