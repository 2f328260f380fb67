//! API 模块
//!
//! 负责所有与外部系统的交互：三个文本生成服务适配器与
//! Telegram Bot API 客户端。生成服务统一实现 [`Provider`]，
//! 由 [`provider_chain`] 按配置组装成固定顺序的尝试链。

pub mod gemini;
pub mod huggingface;
pub mod openrouter;
pub mod telegram;

// 重新导出常用类型
pub use gemini::GeminiProvider;
pub use huggingface::HuggingFaceProvider;
pub use openrouter::OpenRouterProvider;
pub use telegram::TelegramClient;

use crate::config::Config;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// 单次生成尝试的失败原因
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 请求超时
    #[error("请求超时 ({0} 秒)")]
    Timeout(u64),
    /// 传输层失败
    #[error("请求失败: {0}")]
    Request(#[from] reqwest::Error),
    /// 非成功状态码
    #[error("HTTP 状态异常: {status}")]
    Http { status: u16 },
    /// 上游 SDK 调用失败
    #[error("API 调用失败: {0}")]
    ApiCallFailed(String),
    /// 响应中找不到生成文本
    #[error("响应格式异常: {0}")]
    MalformedResponse(String),
    /// 返回文本为空
    #[error("返回文本为空")]
    EmptyText,
    /// 请求构建失败
    #[error("请求构建失败: {0}")]
    Build(String),
}

/// 文本生成服务的统一接口
///
/// 每个适配器只关心自己的请求与响应形态，调用方只看 `attempt`：
/// 在给定超时内要么产出非空文本，要么报告失败原因。
#[async_trait]
pub trait Provider: Send + Sync {
    /// 服务名（用于日志）
    fn name(&self) -> &'static str;

    /// 发起一次生成尝试
    async fn attempt(&self, prompt: &str, timeout: Duration) -> Result<String, ProviderError>;
}

/// 按配置组装生成服务链
///
/// 顺序固定：Gemini → OpenRouter → HuggingFace。
/// 凭据缺省的服务在组装时被跳过，运行期不再检查。
pub fn provider_chain(config: &Config) -> Vec<Box<dyn Provider>> {
    let mut chain: Vec<Box<dyn Provider>> = Vec::new();

    if let Some(key) = &config.gemini_api_key {
        chain.push(Box::new(GeminiProvider::new(
            key.clone(),
            config.gemini_model.clone(),
        )));
    }
    if let Some(key) = &config.openrouter_api_key {
        chain.push(Box::new(OpenRouterProvider::new(
            key,
            config.openrouter_model.clone(),
        )));
    }
    if let Some(key) = &config.huggingface_api_key {
        chain.push(Box::new(HuggingFaceProvider::new(
            key.clone(),
            config.huggingface_model.clone(),
        )));
    }

    let names: Vec<&str> = chain.iter().map(|p| p.name()).collect();
    info!("💡 已启用 {} 个生成服务: [{}]", chain.len(), names.join(" → "));
    chain
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_chain_empty_without_credentials() {
        let chain = provider_chain(&Config::default());
        assert!(chain.is_empty());
    }

    #[test]
    fn test_provider_chain_respects_configured_credentials() {
        let config = Config {
            gemini_api_key: Some("k1".to_string()),
            huggingface_api_key: Some("k3".to_string()),
            ..Config::default()
        };
        let chain = provider_chain(&config);
        let names: Vec<&str> = chain.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Gemini", "HuggingFace"]);
    }

    #[test]
    fn test_provider_chain_full_order() {
        let config = Config {
            gemini_api_key: Some("k1".to_string()),
            openrouter_api_key: Some("k2".to_string()),
            huggingface_api_key: Some("k3".to_string()),
            ..Config::default()
        };
        let chain = provider_chain(&config);
        let names: Vec<&str> = chain.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Gemini", "OpenRouter", "HuggingFace"]);
    }
}
