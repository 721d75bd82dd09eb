//! 进程内平台实现
//!
//! 用于离线 fixture 和单元测试：按等值/`$in` 条件过滤，按排序键排序，支持 limit。
//! 远程函数和 LLM 推理返回预先设置的结果，并记录调用。

use crate::app::models::User;
use crate::app::platform::{
    AuthClient, EntityClient, FunctionClient, InferenceClient, Query, SortKey,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    collections: HashMap<String, Vec<Value>>,
    current_user: Option<User>,
    function_results: HashMap<String, Value>,
    function_calls: Vec<(String, Value)>,
    llm_response: Option<Value>,
    prompts: Vec<String>,
    fail_entities: bool,
}

/// 进程内平台
#[derive(Default)]
pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 fixture 创建：`{"User": [...], "Session": [...], "me": {...}, "llm": {...}}`
    pub fn from_fixture(fixture: Value) -> Result<Self> {
        let platform = Self::new();
        let Value::Object(map) = fixture else {
            anyhow::bail!("fixture 必须是 JSON 对象");
        };
        for (key, value) in map {
            match key.as_str() {
                "me" => {
                    let user: User = serde_json::from_value(value).context("解析 me 失败")?;
                    platform.set_current_user(Some(user));
                }
                "llm" => platform.set_llm_response(Some(value)),
                entity => {
                    let records = match value {
                        Value::Array(records) => records,
                        _ => anyhow::bail!("fixture 中 {} 必须是数组", entity),
                    };
                    platform.insert_all(entity, records);
                }
            }
        }
        Ok(platform)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // 持锁期间不会 panic，poison 时直接取回内部数据
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_all(&self, entity: &str, records: Vec<Value>) {
        self.lock()
            .collections
            .entry(entity.to_string())
            .or_default()
            .extend(records);
    }

    pub fn records(&self, entity: &str) -> Vec<Value> {
        self.lock()
            .collections
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_current_user(&self, user: Option<User>) {
        self.lock().current_user = user;
    }

    pub fn set_function_result(&self, name: &str, result: Value) {
        self.lock()
            .function_results
            .insert(name.to_string(), result);
    }

    pub fn function_calls(&self) -> Vec<(String, Value)> {
        self.lock().function_calls.clone()
    }

    /// 设置 LLM 返回值，None 表示推理不可用
    pub fn set_llm_response(&self, response: Option<Value>) {
        self.lock().llm_response = response;
    }

    pub fn prompts(&self) -> Vec<String> {
        self.lock().prompts.clone()
    }

    /// 模拟网络故障：之后所有实体请求都返回错误
    pub fn set_entities_failing(&self, failing: bool) {
        self.lock().fail_entities = failing;
    }

    fn select(
        &self,
        entity: &str,
        query: Option<&Query>,
        sort: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        let state = self.lock();
        if state.fail_entities {
            anyhow::bail!("模拟网络错误: {}", entity);
        }
        let mut records: Vec<Value> = state
            .collections
            .get(entity)
            .map(|all| {
                all.iter()
                    .filter(|r| query.map_or(true, |q| q.matches(r)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if let Some(sort) = sort {
            let key = SortKey::parse(sort);
            records.sort_by(|a, b| key.compare(a, b));
        }
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        debug!("[Memory] {} 查询结果: {} 条", entity, records.len());
        Ok(records)
    }
}

#[async_trait]
impl EntityClient for MemoryPlatform {
    async fn filter(
        &self,
        entity: &str,
        query: &Query,
        sort: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        self.select(entity, Some(query), sort, limit)
    }

    async fn list(
        &self,
        entity: &str,
        sort: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        self.select(entity, None, sort, limit)
    }

    async fn create(&self, entity: &str, mut record: Value) -> Result<Value> {
        let mut state = self.lock();
        if state.fail_entities {
            anyhow::bail!("模拟网络错误: {}", entity);
        }
        let obj = record
            .as_object_mut()
            .context("记录必须是 JSON 对象")?;
        let has_id = obj
            .get("id")
            .and_then(Value::as_str)
            .is_some_and(|id| !id.is_empty());
        if !has_id {
            obj.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        }
        obj.entry("created_date")
            .or_insert_with(|| Value::String(chrono::Utc::now().to_rfc3339()));
        state
            .collections
            .entry(entity.to_string())
            .or_default()
            .push(record.clone());
        Ok(record)
    }

    async fn update(&self, entity: &str, id: &str, patch: Value) -> Result<Value> {
        let mut state = self.lock();
        let record = state
            .collections
            .get_mut(entity)
            .and_then(|all| all.iter_mut().find(|r| r["id"] == id))
            .with_context(|| format!("{} 不存在: {}", entity, id))?;
        if let (Some(target), Value::Object(fields)) = (record.as_object_mut(), patch) {
            target.extend(fields);
        }
        Ok(record.clone())
    }

    async fn delete(&self, entity: &str, id: &str) -> Result<()> {
        let mut state = self.lock();
        if let Some(all) = state.collections.get_mut(entity) {
            all.retain(|r| r["id"] != id);
        }
        Ok(())
    }
}

#[async_trait]
impl AuthClient for MemoryPlatform {
    async fn me(&self) -> Result<User> {
        self.lock()
            .current_user
            .clone()
            .context("未登录")
    }

    fn login_url(&self, return_path: &str) -> String {
        format!("memory://login?from_url={}", return_path)
    }

    async fn logout(&self, return_path: &str) -> Result<String> {
        self.lock().current_user = None;
        Ok(return_path.to_string())
    }
}

#[async_trait]
impl FunctionClient for MemoryPlatform {
    async fn invoke(&self, name: &str, payload: Value) -> Result<Value> {
        let mut state = self.lock();
        state.function_calls.push((name.to_string(), payload));
        state
            .function_results
            .get(name)
            .cloned()
            .with_context(|| format!("远程函数不存在: {}", name))
    }
}

#[async_trait]
impl InferenceClient for MemoryPlatform {
    async fn invoke_llm(&self, prompt: &str, _response_schema: Value) -> Result<Value> {
        let mut state = self.lock();
        state.prompts.push(prompt.to_string());
        state.llm_response.clone().context("LLM 推理不可用")
    }
}
