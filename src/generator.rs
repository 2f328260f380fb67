//! 讲解生成模块
//!
//! 对单个题目构造与服务无关的统一提示词，按固定优先级尝试
//! 生成服务链，第一个产出非空文本的服务胜出；全部失败时返回
//! 固定兜底文案。本层永不向上抛错，单次失败只记日志。

use crate::api::{self, GeminiProvider, Provider};
use crate::config::Config;
use crate::models::{ExplainedQuestion, QuestionRecord};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// 所有生成服务都失败时返回的固定文案
pub const FALLBACK_EXPLANATION: &str =
    "Could not generate explanation at this time. Please try again later.";

/// 讲解生成器
pub struct ExplanationGenerator {
    providers: Vec<Box<dyn Provider>>,
    ocr: Option<GeminiProvider>,
    attempt_timeout: Duration,
    pause: Duration,
}

impl ExplanationGenerator {
    /// 按配置创建生成器
    ///
    /// 服务链按凭据有无在此刻一次性确定。
    pub fn new(config: &Config) -> Self {
        let providers = api::provider_chain(config);
        let ocr = config
            .gemini_api_key
            .as_ref()
            .map(|key| GeminiProvider::new(key.clone(), config.gemini_model.clone()));

        Self {
            providers,
            ocr,
            attempt_timeout: Duration::from_secs(config.provider_timeout_secs),
            pause: Duration::from_secs(config.generation_pause_secs),
        }
    }

    /// 为单个题目生成讲解
    ///
    /// 永不失败：链上全部尝试失败时返回 [`FALLBACK_EXPLANATION`]。
    pub async fn generate(&self, record: &QuestionRecord) -> String {
        let prompt = build_prompt(record);

        for provider in &self.providers {
            debug!("尝试 {} 生成讲解 (题号 {})", provider.name(), record.ordinal);
            match provider.attempt(&prompt, self.attempt_timeout).await {
                Ok(text) if !text.trim().is_empty() => {
                    debug!("✓ {} 生成成功 ({} 字符)", provider.name(), text.chars().count());
                    return text;
                }
                Ok(_) => {
                    warn!("⚠️ {} 返回空文本，尝试下一个服务", provider.name());
                }
                Err(e) => {
                    warn!("⚠️ {} 生成失败: {}", provider.name(), e);
                }
            }
        }

        warn!("⚠️ 所有生成服务均失败 (题号 {})，使用兜底文案", record.ordinal);
        FALLBACK_EXPLANATION.to_string()
    }

    /// 按上限顺序处理一批题目
    ///
    /// # 参数
    /// - `records`: 抽取结果（文档顺序）
    /// - `limit`: 本次处理的题目数上限
    pub async fn generate_batch(
        &self,
        records: &[QuestionRecord],
        limit: usize,
    ) -> Vec<ExplainedQuestion> {
        let total = records.len().min(limit);
        let mut explained = Vec::with_capacity(total);

        for (i, record) in records.iter().take(limit).enumerate() {
            info!("[题目 {}/{}] 生成讲解...", i + 1, total);
            let explanation = self.generate(record).await;
            explained.push(ExplainedQuestion {
                record: record.clone(),
                explanation,
            });

            if i + 1 < total {
                sleep(self.pause).await;
            }
        }

        explained
    }

    /// 把原始文档字节转写为纯文本
    ///
    /// 直接提取失败时的兜底路径，仅在配置了 Gemini 时可用；
    /// 转写失败返回 None。
    pub async fn transcribe_document(&self, bytes: &[u8], mime_type: &str) -> Option<String> {
        let ocr = self.ocr.as_ref()?;
        info!("🔍 直接提取的文本不像题目文档，尝试模型转写...");
        match ocr.transcribe(bytes, mime_type, self.attempt_timeout).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!("⚠️ 文档转写失败: {}", e);
                None
            }
        }
    }
}

/// 构造与服务无关的统一提示词
pub fn build_prompt(record: &QuestionRecord) -> String {
    format!(
        "Please provide a clear and educational explanation for this multiple-choice question:\n\
         \n\
         Question: {}\n\
         \n\
         Options:\n\
         A) {}\n\
         B) {}\n\
         C) {}\n\
         D) {}\n\
         \n\
         Correct Answer: {}\n\
         \n\
         Original Explanation: {}\n\
         \n\
         Please provide:\n\
         1. A clear explanation of why the correct answer is right\n\
         2. Brief explanation of why other options are wrong (if applicable)\n\
         3. Additional context or examples to help understand the concept\n\
         4. Keep the explanation concise but informative\n\
         \n\
         Format your response in a clear, easy-to-read way.",
        record.stem,
        record.options.a,
        record.options.b,
        record.options.c,
        record.options.d,
        record.correct_label,
        record.source_explanation.as_deref().unwrap_or("")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ProviderError;
    use crate::models::{Label, OptionSet};
    use async_trait::async_trait;

    /// 固定行为的测试服务
    struct StubProvider {
        name: &'static str,
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn attempt(&self, _prompt: &str, _timeout: Duration) -> Result<String, ProviderError> {
            match self.reply {
                Some(text) => Ok(text.to_string()),
                None => Err(ProviderError::Http { status: 500 }),
            }
        }
    }

    fn stub(name: &'static str, reply: Option<&'static str>) -> Box<dyn Provider> {
        Box::new(StubProvider { name, reply })
    }

    fn generator_with(providers: Vec<Box<dyn Provider>>) -> ExplanationGenerator {
        ExplanationGenerator {
            providers,
            ocr: None,
            attempt_timeout: Duration::from_secs(1),
            pause: Duration::ZERO,
        }
    }

    fn sample_record(ordinal: u32) -> QuestionRecord {
        QuestionRecord {
            ordinal,
            stem: "What is 2+2?".to_string(),
            options: OptionSet {
                a: "3".to_string(),
                b: "4".to_string(),
                c: "5".to_string(),
                d: "6".to_string(),
            },
            correct_label: Label::B,
            source_explanation: Some("Basic addition".to_string()),
        }
    }

    fn sample_records(count: u32) -> Vec<QuestionRecord> {
        (1..=count).map(sample_record).collect()
    }

    #[tokio::test]
    async fn test_first_successful_provider_wins() {
        let generator = generator_with(vec![
            stub("first", None),
            stub("second", Some("From the second service.")),
            stub("third", Some("Never reached.")),
        ]);
        let text = generator.generate(&sample_record(1)).await;
        assert_eq!(text, "From the second service.");
    }

    #[tokio::test]
    async fn test_empty_reply_counts_as_failure() {
        let generator = generator_with(vec![
            stub("blank", Some("   ")),
            stub("useful", Some("Real explanation.")),
        ]);
        let text = generator.generate(&sample_record(1)).await;
        assert_eq!(text, "Real explanation.");
    }

    #[tokio::test]
    async fn test_exhausted_chain_returns_fallback() {
        let generator = generator_with(vec![stub("a", None), stub("b", None)]);
        let text = generator.generate(&sample_record(1)).await;
        assert_eq!(text, FALLBACK_EXPLANATION);
    }

    #[test]
    fn test_empty_chain_returns_fallback() {
        let generator = generator_with(vec![]);
        let text = tokio_test::block_on(generator.generate(&sample_record(1)));
        assert_eq!(text, FALLBACK_EXPLANATION);
    }

    #[tokio::test]
    async fn test_batch_respects_limit() {
        let generator = generator_with(vec![stub("only", Some("ok"))]);
        let explained = generator.generate_batch(&sample_records(10), 5).await;
        assert_eq!(explained.len(), 5);
        let ordinals: Vec<u32> = explained.iter().map(|e| e.record.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_batch_smaller_than_limit() {
        let generator = generator_with(vec![stub("only", Some("ok"))]);
        let explained = generator.generate_batch(&sample_records(2), 5).await;
        assert_eq!(explained.len(), 2);
    }

    #[tokio::test]
    async fn test_transcribe_without_gemini_credential() {
        let generator = generator_with(vec![]);
        assert!(generator.transcribe_document(b"%PDF-", "application/pdf").await.is_none());
    }

    #[test]
    fn test_build_prompt_includes_fields() {
        let prompt = build_prompt(&sample_record(1));
        assert!(prompt.contains("Question: What is 2+2?"));
        assert!(prompt.contains("A) 3"));
        assert!(prompt.contains("D) 6"));
        assert!(prompt.contains("Correct Answer: B"));
        assert!(prompt.contains("Original Explanation: Basic addition"));
    }

    #[test]
    fn test_build_prompt_without_source_explanation() {
        let mut record = sample_record(1);
        record.source_explanation = None;
        let prompt = build_prompt(&record);
        assert!(prompt.contains("Original Explanation: \n"));
    }
}
