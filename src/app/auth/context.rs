//! 登录态上下文
//!
//! 状态是不可变快照（`Arc<AuthState>`），通过 watch 通道发布。
//! 只有本模块的更新协议（set_user / clear_user / set_guest / toggle_guest）会替换快照，
//! 其他地方只读。

use crate::app::auth::listener::SessionListener;
use crate::app::models::{User, UserRole};
use crate::app::platform::{AuthClient, PlatformFunctions};
use crate::app::storage::{LocalStore, GUEST_MODE_KEY};
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// 登录态快照
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<User>,
    pub is_guest: bool,
    pub is_loading: bool,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// 未登录时视为访客角色
    pub fn role(&self) -> UserRole {
        self.user.as_ref().map_or(UserRole::Guest, |u| u.role)
    }

    pub fn can_moderate(&self) -> bool {
        self.user.as_ref().is_some_and(User::can_moderate)
    }

    pub fn can_broadcast(&self) -> bool {
        self.user.as_ref().is_some_and(User::can_broadcast)
    }

    /// 可以浏览主播列表：已登录或处于访客模式
    pub fn can_browse(&self) -> bool {
        self.is_authenticated() || self.is_guest
    }
}

/// 登录态上下文
pub struct AuthContext {
    auth: Arc<dyn AuthClient>,
    functions: PlatformFunctions,
    store: LocalStore,
    state: watch::Sender<Arc<AuthState>>,
    listener: Arc<dyn SessionListener>,
}

impl AuthContext {
    pub fn new(
        auth: Arc<dyn AuthClient>,
        functions: PlatformFunctions,
        store: LocalStore,
        listener: Arc<dyn SessionListener>,
    ) -> Self {
        let (state, _) = watch::channel(Arc::new(AuthState {
            is_loading: true,
            ..Default::default()
        }));
        Self {
            auth,
            functions,
            store,
            state,
            listener,
        }
    }

    /// 当前快照
    pub fn snapshot(&self) -> Arc<AuthState> {
        self.state.borrow().clone()
    }

    /// 订阅快照变更
    pub fn subscribe(&self) -> watch::Receiver<Arc<AuthState>> {
        self.state.subscribe()
    }

    /// 原子地读改写当前快照，返回新快照
    fn update(&self, f: impl FnOnce(&AuthState) -> AuthState) -> Arc<AuthState> {
        let mut next = None;
        self.state.send_modify(|state| {
            let updated = Arc::new(f(&**state));
            *state = updated.clone();
            next = Some(updated);
        });
        next.unwrap_or_else(|| self.snapshot())
    }

    /// 启动时初始化：读取本地访客标记，再向平台确认登录态
    pub async fn init(&self) -> Arc<AuthState> {
        let is_guest = match self.store.get_flag(GUEST_MODE_KEY).await {
            Ok(flag) => flag,
            Err(e) => {
                warn!("[Auth] 读取访客标记失败，按非访客处理: {:?}", e);
                false
            }
        };
        self.update(|current| AuthState {
            is_guest,
            ..current.clone()
        });
        self.refresh().await
    }

    /// 重新获取当前用户；认证失败时转为未登录状态，不返回错误
    pub async fn refresh(&self) -> Arc<AuthState> {
        match self.auth.me().await {
            Ok(user) => {
                info!("[Auth] ✅ 当前用户: {} ({:?})", user.id, user.role);
                self.set_user(user).await
            }
            Err(e) => {
                warn!("[Auth] 未登录或认证失败: {:?}", e);
                self.clear_user().await
            }
        }
    }

    /// 设置当前用户（登录成功后访客模式自动关闭）
    pub async fn set_user(&self, user: User) -> Arc<AuthState> {
        let user_json = serde_json::to_string(&user).unwrap_or_else(|_| "null".to_string());
        let mut was_guest = false;
        let next = self.update(|current| {
            was_guest = current.is_guest;
            AuthState {
                user: Some(user),
                is_guest: false,
                is_loading: false,
            }
        });
        if was_guest {
            if let Err(e) = self.store.set_flag(GUEST_MODE_KEY, false).await {
                warn!("[Auth] 清除访客标记失败: {:?}", e);
            }
        }
        self.listener.on_user_changed(user_json).await;
        if was_guest {
            self.listener.on_guest_mode_changed(false).await;
        }
        next
    }

    /// 清除当前用户（保留访客标记）
    pub async fn clear_user(&self) -> Arc<AuthState> {
        let mut had_user = false;
        let next = self.update(|current| {
            had_user = current.user.is_some();
            AuthState {
                user: None,
                is_guest: current.is_guest,
                is_loading: false,
            }
        });
        if had_user {
            self.listener.on_user_changed("null".to_string()).await;
        }
        next
    }

    /// 设置访客模式并持久化
    pub async fn set_guest(&self, is_guest: bool) -> Result<Arc<AuthState>> {
        self.store
            .set_flag(GUEST_MODE_KEY, is_guest)
            .await
            .context("保存访客标记失败")?;
        let next = self.update(|current| AuthState {
            is_guest,
            ..current.clone()
        });
        info!("[Auth] 访客模式: {}", is_guest);
        self.listener.on_guest_mode_changed(is_guest).await;
        Ok(next)
    }

    pub async fn toggle_guest(&self) -> Result<Arc<AuthState>> {
        let is_guest = self.snapshot().is_guest;
        self.set_guest(!is_guest).await
    }

    /// 登录跳转地址
    pub fn login_redirect(&self, return_path: &str) -> String {
        self.auth.login_url(return_path)
    }

    /// 登出；平台请求失败时仍然清除本地登录态
    pub async fn logout(&self, return_path: &str) -> String {
        let redirect = match self.auth.logout(return_path).await {
            Ok(redirect) => redirect,
            Err(e) => {
                warn!("[Auth] 平台登出失败，仅清除本地状态: {:?}", e);
                return_path.to_string()
            }
        };
        self.clear_user().await;
        redirect
    }

    /// 注销账号：唯一会把失败信息返回给调用方的流程
    pub async fn delete_account(&self) -> Result<()> {
        let user_id = self
            .snapshot()
            .user
            .as_ref()
            .map(|u| u.id.clone())
            .context("当前未登录，无法注销账号")?;

        info!("[Auth] ⚠️ 注销账号: {}", user_id);
        if let Err(e) = self.functions.delete_account().await {
            error!("[Auth] 注销账号失败: {:?}", e);
            return Err(e.context("注销账号失败"));
        }

        if let Err(e) = self.store.remove(GUEST_MODE_KEY).await {
            warn!("[Auth] 清除访客标记失败: {:?}", e);
        }
        self.clear_user().await;
        Ok(())
    }
}
