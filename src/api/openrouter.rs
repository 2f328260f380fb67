//! OpenRouter 生成服务适配器
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用（OpenRouter 兼容 OpenAI API）
//! - 自定义 API 端点
//! - 按次超时由 tokio 计时器包裹（SDK 本身不暴露单次超时）

use crate::api::{Provider, ProviderError};
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

const API_BASE: &str = "https://openrouter.ai/api/v1";

/// OpenRouter 适配器
pub struct OpenRouterProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenRouterProvider {
    pub fn new(api_key: &str, model: String) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(API_BASE);

        let client = Client::with_config(openai_config);

        Self { client, model }
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "OpenRouter"
    }

    async fn attempt(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError> {
        debug!("调用 OpenRouter API，模型: {}", self.model);

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| ProviderError::Build(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::User(user_msg)])
            .max_tokens(1000u32)
            .build()
            .map_err(|e| ProviderError::Build(e.to_string()))?;

        let response = tokio::time::timeout(timeout, self.client.chat().create(request))
            .await
            .map_err(|_| ProviderError::Timeout(timeout.as_secs()))?
            .map_err(|e| {
                warn!("OpenRouter API 调用失败: {}", e);
                ProviderError::ApiCallFailed(e.to_string())
            })?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        let content = content.trim();
        if content.is_empty() {
            return Err(ProviderError::EmptyText);
        }
        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let provider = OpenRouterProvider::new("test-key", "google/gemini-pro".to_string());
        assert_eq!(provider.name(), "OpenRouter");
    }

    #[tokio::test]
    #[ignore] // 需要真实 OPENROUTER_API_KEY：cargo test -- --ignored
    async fn test_openrouter_attempt_real() {
        let _ = tracing_subscriber::fmt::try_init();

        let api_key = std::env::var("OPENROUTER_API_KEY").expect("请设置 OPENROUTER_API_KEY");
        let provider = OpenRouterProvider::new(&api_key, "google/gemini-pro".to_string());

        let result = provider
            .attempt("Reply with a single word: hello", Duration::from_secs(30))
            .await;

        match result {
            Ok(text) => {
                println!("\n========== OpenRouter 响应 ==========");
                println!("{}", text);
                println!("====================================\n");
                assert!(!text.is_empty());
            }
            Err(e) => panic!("OpenRouter 调用失败: {}", e),
        }
    }
}
