//! HuggingFace Inference API 适配器

use crate::api::{Provider, ProviderError};
use crate::utils::logging::truncate_text;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api-inference.huggingface.co/models";

/// HuggingFace 适配器
#[derive(Debug, Clone)]
pub struct HuggingFaceProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl HuggingFaceProvider {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }
}

#[async_trait]
impl Provider for HuggingFaceProvider {
    fn name(&self) -> &'static str {
        "HuggingFace"
    }

    async fn attempt(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        debug!("调用 HuggingFace API，模型: {}", self.model);

        let body = json!({
            "inputs": prompt,
            "parameters": {
                "max_new_tokens": 500,
                "temperature": 0.7,
                "do_sample": true
            }
        });

        let response = self
            .client
            .post(format!("{}/{}", API_BASE, self.model))
            .bearer_auth(&self.api_key)
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
        extract_generated_text(&payload)
    }
}

/// 提取 [0].generated_text
fn extract_generated_text(payload: &Value) -> Result<String, ProviderError> {
    let text = payload
        .get(0)
        .and_then(|item| item.get("generated_text"))
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
    fn test_extract_generated_text() {
        let payload = json!([{ "generated_text": " model output " }]);
        assert_eq!(
            extract_generated_text(&payload).expect("应当解析出文本"),
            "model output"
        );
    }

    #[test]
    fn test_extract_generated_text_malformed() {
        let payload = json!({ "error": "Model is currently loading" });
        assert!(matches!(
            extract_generated_text(&payload),
            Err(ProviderError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_extract_generated_text_empty() {
        let payload = json!([{ "generated_text": "" }]);
        assert!(matches!(
            extract_generated_text(&payload),
            Err(ProviderError::EmptyText)
        ));
    }
}
