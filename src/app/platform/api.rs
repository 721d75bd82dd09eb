//! 平台 HTTP API 客户端
//!
//! 负责所有实体、认证、远程函数、LLM 推理相关的 HTTP 请求

use crate::app::models::User;
use crate::app::platform::{
    AuthClient, EntityClient, FunctionClient, InferenceClient, Query,
};
use crate::app::types::handle_http_response;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 基于 reqwest 的平台客户端
pub struct HttpPlatform {
    client: reqwest::Client,
    api_base_url: String,
    app_id: String,
}

impl HttpPlatform {
    /// 创建平台客户端
    ///
    /// `token` 为空时以访客身份访问，否则通过 default_headers 自动附带认证头
    pub fn new(api_base_url: &str, app_id: &str, token: Option<&str>) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::HeaderName::from_static("x-app-id"),
            reqwest::header::HeaderValue::from_str(app_id).context("无效的 app_id")?,
        );
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .context("无效的 token")?,
            );
        }

        let client = reqwest::ClientBuilder::new()
            .default_headers(headers)
            .build()
            .context("创建 HTTP 客户端失败")?;

        info!(
            "[Platform] 创建平台客户端，API: {}, AppID: {}",
            api_base_url, app_id
        );

        Ok(Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            app_id: app_id.to_string(),
        })
    }

    fn app_url(&self, path: &str) -> String {
        format!("{}/apps/{}/{}", self.api_base_url, self.app_id, path)
    }

    fn entity_url(&self, entity: &str) -> String {
        self.app_url(&format!("entities/{}", entity))
    }

    fn query_params(
        query: Option<&Query>,
        sort: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            params.push(("q", query.to_json().to_string()));
        }
        if let Some(sort) = sort {
            params.push(("sort", sort.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        params
    }

    async fn fetch_records(
        &self,
        entity: &str,
        query: Option<&Query>,
        sort: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.entity_url(entity);

        debug!("[Platform]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .query(&Self::query_params(query, sort, limit))
            .send()
            .await
            .context("请求失败")?;

        let records: Vec<Value> =
            handle_http_response(response, &format!("查询{}", entity)).await?;
        info!("[Platform] ✅ {} 查询完成，记录数: {}", entity, records.len());
        Ok(records)
    }
}

#[async_trait]
impl EntityClient for HttpPlatform {
    async fn filter(
        &self,
        entity: &str,
        query: &Query,
        sort: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        info!("[Platform] 📡 按条件查询 {}: {}", entity, query.to_json());
        self.fetch_records(entity, Some(query), sort, limit).await
    }

    async fn list(
        &self,
        entity: &str,
        sort: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        info!("[Platform] 📡 查询 {} 列表", entity);
        self.fetch_records(entity, None, sort, limit).await
    }

    async fn create(&self, entity: &str, record: Value) -> Result<Value> {
        let operation_id = Uuid::new_v4().to_string();
        info!("[Platform] 📡 创建 {}", entity);

        let response = self
            .client
            .post(self.entity_url(entity))
            .header("operationID", &operation_id)
            .json(&record)
            .send()
            .await
            .context("请求失败")?;

        handle_http_response(response, &format!("创建{}", entity)).await
    }

    async fn update(&self, entity: &str, id: &str, patch: Value) -> Result<Value> {
        let operation_id = Uuid::new_v4().to_string();
        info!("[Platform] 📡 更新 {}: {}", entity, id);

        let response = self
            .client
            .put(format!("{}/{}", self.entity_url(entity), id))
            .header("operationID", &operation_id)
            .json(&patch)
            .send()
            .await
            .context("请求失败")?;

        handle_http_response(response, &format!("更新{}", entity)).await
    }

    async fn delete(&self, entity: &str, id: &str) -> Result<()> {
        let operation_id = Uuid::new_v4().to_string();
        info!("[Platform] 📡 删除 {}: {}", entity, id);

        let response = self
            .client
            .delete(format!("{}/{}", self.entity_url(entity), id))
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        let _: Value = handle_http_response(response, &format!("删除{}", entity)).await?;
        Ok(())
    }
}

#[async_trait]
impl AuthClient for HttpPlatform {
    async fn me(&self) -> Result<User> {
        let operation_id = Uuid::new_v4().to_string();
        debug!("[Platform] 🔐 获取当前用户，操作ID: {}", operation_id);

        let response = self
            .client
            .get(self.entity_url("User/me"))
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        handle_http_response(response, "获取当前用户").await
    }

    fn login_url(&self, return_path: &str) -> String {
        let base = self.app_url("login");
        match reqwest::Url::parse_with_params(&base, &[("from_url", return_path)]) {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!("[Platform] 构造登录地址失败: {}", e);
                base
            }
        }
    }

    async fn logout(&self, return_path: &str) -> Result<String> {
        let operation_id = Uuid::new_v4().to_string();
        info!("[Platform] 🔐 登出");

        let response = self
            .client
            .post(self.app_url("auth/logout"))
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        let _: Value = handle_http_response(response, "登出").await?;
        Ok(return_path.to_string())
    }
}

#[async_trait]
impl FunctionClient for HttpPlatform {
    async fn invoke(&self, name: &str, payload: Value) -> Result<Value> {
        let operation_id = Uuid::new_v4().to_string();
        info!("[Platform] 📡 调用远程函数: {}", name);
        debug!("[Platform]   参数: {}, 操作ID: {}", payload, operation_id);

        let response = self
            .client
            .post(self.app_url(&format!("functions/{}", name)))
            .header("operationID", &operation_id)
            .json(&payload)
            .send()
            .await
            .context("请求失败")?;

        handle_http_response(response, &format!("远程函数{}", name)).await
    }
}

#[async_trait]
impl InferenceClient for HttpPlatform {
    async fn invoke_llm(&self, prompt: &str, response_schema: Value) -> Result<Value> {
        let operation_id = Uuid::new_v4().to_string();
        info!(
            "[Platform] 🤖 请求 LLM 推理，提示词长度: {}",
            prompt.chars().count()
        );

        let response = self
            .client
            .post(self.app_url("integration-endpoints/Core/InvokeLLM"))
            .header("operationID", &operation_id)
            .json(&serde_json::json!({
                "prompt": prompt,
                "response_json_schema": response_schema,
            }))
            .send()
            .await
            .context("请求失败")?;

        handle_http_response(response, "LLM 推理").await
    }
}
