//! 登录态监听器回调接口

use async_trait::async_trait;

/// 登录态监听器
#[async_trait]
pub trait SessionListener: Send + Sync {
    /// 当前用户变更，参数为用户 JSON（未登录时为 "null"）
    async fn on_user_changed(&self, user_json: String);

    /// 访客模式切换
    async fn on_guest_mode_changed(&self, is_guest: bool);
}

/// 默认空实现（无操作）
pub struct EmptySessionListener;

#[async_trait]
impl SessionListener for EmptySessionListener {
    async fn on_user_changed(&self, _user_json: String) {}
    async fn on_guest_mode_changed(&self, _is_guest: bool) {}
}
