use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

/// 平台错误响应结构（非 2xx 时返回）
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PlatformError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

/// 通用 HTTP 响应处理函数：检查状态码并直接反序列化 body
///
/// 平台接口直接返回实体 JSON（没有统一包装），错误时返回 `PlatformError`。
/// 所有 API 都共用此方法。
pub async fn handle_http_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> anyhow::Result<T> {
    use anyhow::Context;

    let status = response.status();

    // 读取 body bytes（只能读取一次）
    let body_bytes = response.bytes().await.context("读取响应 body 失败")?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        let message = serde_json::from_slice::<PlatformError>(&body_bytes)
            .map(|e| e.message)
            .unwrap_or_else(|_| body_str.to_string());
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 错误信息: {}",
            operation_name, status, message
        );
        return Err(anyhow::anyhow!("HTTP 错误 {}: {}", status, message));
    }
    info!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    // 部分接口（删除、登出）返回空 body，按 JSON null 处理
    let body: &[u8] = if body_bytes.is_empty() {
        b"null"
    } else {
        &body_bytes
    };

    serde_json::from_slice::<T>(body).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        anyhow::anyhow!("反序列化响应失败: {:?}", e)
    })
}

/// 反序列化数组字段，处理 null 值
pub(crate) fn deserialize_vec_or_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    let opt = Option::<Vec<T>>::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}
