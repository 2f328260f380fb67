//! Gemini 生成服务适配器
//!
//! 直接调用 Generative Language REST API。
//! 除文本生成外还提供文档转写：把原始文件字节以 inline_data
//! 方式上传，请求模型输出其中的纯文本。

use crate::api::{Provider, ProviderError};
use crate::utils::logging::truncate_text;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// 文档转写指令
const TRANSCRIBE_PROMPT: &str = "Transcribe the full text content of the attached document verbatim. Output only the plain text, preserving the original line breaks and question numbering.";

/// Gemini 适配器
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", API_BASE, self.model)
    }

    /// 发送一次 generateContent 请求并提取首个候选文本
    async fn generate(&self, body: Value, timeout: Duration) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(timeout.as_secs())
                } else {
                    ProviderError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
            });
        }

        let payload: Value = response.json().await?;
        extract_candidate_text(&payload)
    }

    /// 把原始文档字节交给模型转写为纯文本
    pub async fn transcribe(
        &self,
        bytes: &[u8],
        mime_type: &str,
        timeout: Duration,
    ) -> Result<String, ProviderError> {
        debug!("📤 上传 {} 字节文档请求转写 (mime: {})", bytes.len(), mime_type);
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": TRANSCRIBE_PROMPT },
                    { "inline_data": { "mime_type": mime_type, "data": BASE64.encode(bytes) } }
                ]
            }]
        });
        self.generate(body, timeout).await
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn attempt(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        debug!("调用 Gemini API，模型: {}", self.model);
        let body = json!({ "contents": [{ "parts": [{ "text": prompt }] }] });
        self.generate(body, timeout).await
    }
}

/// 提取 candidates[0].content.parts[0].text
fn extract_candidate_text(payload: &Value) -> Result<String, ProviderError> {
    let text = payload
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .ok_or_else(|| ProviderError::MalformedResponse(truncate_text(&payload.to_string(), 200)))?;

    let text = text.trim();
    if text.is_empty() {
        return Err(ProviderError::EmptyText);
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_candidate_text() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "  An explanation.  " }] }
            }]
        });
        let text = extract_candidate_text(&payload).expect("应当解析出文本");
        assert_eq!(text, "An explanation.");
    }

    #[test]
    fn test_extract_candidate_text_malformed() {
        let payload = json!({ "error": { "message": "quota exceeded" } });
        assert!(matches!(
            extract_candidate_text(&payload),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_extract_candidate_text_empty() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "   " }] }
            }]
        });
        assert!(matches!(
            extract_candidate_text(&payload),
            Err(ProviderError::EmptyText)
        ));
    }

    #[tokio::test]
    #[ignore] // 需要真实 GEMINI_API_KEY：cargo test -- --ignored
    async fn test_gemini_attempt_real() {
        let _ = tracing_subscriber::fmt::try_init();

        let api_key = std::env::var("GEMINI_API_KEY").expect("请设置 GEMINI_API_KEY");
        let provider = GeminiProvider::new(api_key, "gemini-pro".to_string());

        let text = provider
            .attempt("Reply with a single word: hello", Duration::from_secs(30))
            .await
            .expect("Gemini 调用失败");

        println!("========== Gemini 返回 ==========");
        println!("{}", text);
        assert!(!text.is_empty());
    }
}
