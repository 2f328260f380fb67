//! Telegram Bot API 客户端
//!
//! 覆盖机器人运行所需的最小方法集合：身份查询、长轮询取更新、
//! 发送/编辑/删除消息、文件定位与下载。
//! 所有方法共用统一的响应信封解包逻辑。

use crate::error::{ApiError, AppError, AppResult};
use crate::models::telegram::{ApiResponse, Message, TelegramFile, Update, User};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

const API_BASE: &str = "https://api.telegram.org";

/// 普通方法的请求超时
const CALL_TIMEOUT: Duration = Duration::from_secs(30);
/// 文件下载的请求超时
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Telegram 客户端
#[derive(Debug, Clone)]
pub struct TelegramClient {
    client: Client,
    token: String,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(token: String, poll_timeout_secs: u64) -> Self {
        Self {
            client: Client::new(),
            token,
            poll_timeout_secs,
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    /// 调用一个 Bot API 方法并解包响应信封
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &Value,
        timeout: Duration,
    ) -> AppResult<T> {
        let response = self
            .client
            .post(self.endpoint(method))
            .json(payload)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(method, e))?;

        let status = response.status().as_u16();
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| AppError::api_request_failed(method, e))?;

        unwrap_envelope(method, status, envelope)
    }

    /// 查询机器人身份
    pub async fn get_me(&self) -> AppResult<User> {
        self.call("getMe", &json!({}), CALL_TIMEOUT).await
    }

    /// 长轮询获取更新
    ///
    /// # 参数
    /// - `offset`: 确认点，只返回 update_id 不小于 offset 的更新
    pub async fn get_updates(&self, offset: i64) -> AppResult<Vec<Update>> {
        let payload = json!({
            "offset": offset,
            "timeout": self.poll_timeout_secs,
            "allowed_updates": ["message"],
        });
        // 客户端超时要长于服务端长轮询窗口
        let timeout = Duration::from_secs(self.poll_timeout_secs + 10);
        self.call("getUpdates", &payload, timeout).await
    }

    /// 发送文本消息
    ///
    /// 命中频率限制时按服务器给出的 retry_after 等待一次后重试。
    pub async fn send_message(&self, chat_id: i64, text: &str) -> AppResult<Message> {
        let payload = json!({ "chat_id": chat_id, "text": text });
        match self.call("sendMessage", &payload, CALL_TIMEOUT).await {
            Err(AppError::Api(ApiError::RateLimited { retry_after, .. })) => {
                let wait = retry_after.unwrap_or(3);
                warn!("⚠️ 发送消息被限流，等待 {} 秒后重试", wait);
                sleep(Duration::from_secs(wait)).await;
                self.call("sendMessage", &payload, CALL_TIMEOUT).await
            }
            other => other,
        }
    }

    /// 编辑已发送消息的文本
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> AppResult<Message> {
        let payload = json!({
            "chat_id": chat_id,
            "message_id": message_id,
            "text": text,
        });
        self.call("editMessageText", &payload, CALL_TIMEOUT).await
    }

    /// 删除消息
    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> AppResult<bool> {
        let payload = json!({ "chat_id": chat_id, "message_id": message_id });
        self.call("deleteMessage", &payload, CALL_TIMEOUT).await
    }

    /// 定位文件，取得服务器上的下载路径
    pub async fn get_file(&self, file_id: &str) -> AppResult<TelegramFile> {
        let payload = json!({ "file_id": file_id });
        self.call("getFile", &payload, CALL_TIMEOUT).await
    }

    /// 下载文件内容
    pub async fn download_file(&self, file_path: &str) -> AppResult<Vec<u8>> {
        let url = format!("{}/file/bot{}/{}", API_BASE, self.token, file_path);
        let response = self
            .client
            .get(&url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| AppError::api_request_failed("downloadFile", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Api(ApiError::BadResponse {
                endpoint: "downloadFile".to_string(),
                code: Some(status.as_u16() as i64),
                message: None,
            }));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::api_request_failed("downloadFile", e))?;
        debug!("📥 下载完成: {} 字节", bytes.len());
        Ok(bytes.to_vec())
    }
}

/// 解包 Bot API 响应信封
fn unwrap_envelope<T>(method: &str, status: u16, envelope: ApiResponse<T>) -> AppResult<T> {
    if envelope.ok {
        return envelope.result.ok_or_else(|| {
            AppError::Api(ApiError::EmptyResponse {
                endpoint: method.to_string(),
            })
        });
    }

    let retry_after = envelope.parameters.as_ref().and_then(|p| p.retry_after);
    if status == 429 || retry_after.is_some() {
        return Err(AppError::Api(ApiError::RateLimited {
            endpoint: method.to_string(),
            retry_after,
        }));
    }

    Err(AppError::Api(ApiError::BadResponse {
        endpoint: method.to_string(),
        code: envelope.error_code,
        message: envelope.description,
    }))
}
