//! 平台访问层
//!
//! 远端平台是唯一的 I/O 边界：实体集合、认证、远程函数、LLM 推理。
//! 这里只定义接口和透传实现，不做任何业务逻辑。

pub mod api;
pub mod collection;
pub mod functions;
pub mod memory;
pub mod query;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::app::models::User;

// 重新导出主要类型
pub use api::HttpPlatform;
pub use collection::{Collection, Entities, Entity};
pub use functions::{CallRoom, ModerationAction, PlatformFunctions};
pub use memory::MemoryPlatform;
pub use query::{Query, SortKey};

/// 实体集合接口（记录均为 JSON 对象）
#[async_trait]
pub trait EntityClient: Send + Sync {
    /// 按条件查询
    async fn filter(
        &self,
        entity: &str,
        query: &Query,
        sort: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>>;

    /// 全量列表
    async fn list(&self, entity: &str, sort: Option<&str>, limit: Option<usize>)
        -> Result<Vec<Value>>;

    async fn create(&self, entity: &str, record: Value) -> Result<Value>;

    async fn update(&self, entity: &str, id: &str, patch: Value) -> Result<Value>;

    async fn delete(&self, entity: &str, id: &str) -> Result<()>;
}

/// 认证接口
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// 当前登录用户，未登录时返回错误
    async fn me(&self) -> Result<User>;

    /// 登录跳转地址，登录完成后回到 `return_path`
    fn login_url(&self, return_path: &str) -> String;

    /// 登出，返回登出后的跳转地址
    async fn logout(&self, return_path: &str) -> Result<String>;
}

/// 远程函数调用接口
#[async_trait]
pub trait FunctionClient: Send + Sync {
    async fn invoke(&self, name: &str, payload: Value) -> Result<Value>;
}

/// LLM 推理接口：自由文本提示词 + 声明的 JSON 响应结构
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn invoke_llm(&self, prompt: &str, response_schema: Value) -> Result<Value>;
}

/// 同时具备全部能力的平台实现
pub trait Platform: EntityClient + AuthClient + FunctionClient + InferenceClient {}

impl<T> Platform for T where T: EntityClient + AuthClient + FunctionClient + InferenceClient {}
