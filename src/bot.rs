//! 机器人消息处理模块
//!
//! 定义单条更新的完整处理流程：
//! 命令应答、/quiz 抽题，以及文档流水线
//! （下载 → 取文本 → 抽取 → 生成讲解 → 逐题回复 → 入库）。
//! 轮询循环本身由 app 层负责。

use crate::acquire;
use crate::api::TelegramClient;
use crate::bank::QuestionBank;
use crate::config::Config;
use crate::extractor::{self, QuestionExtractor};
use crate::generator::ExplanationGenerator;
use crate::models::{Document, ExplainedQuestion, Message, QuestionRecord, StoredQuestion, Update};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// 单条消息的长度上限，超出的回复按此切分
const MAX_MESSAGE_LEN: usize = 4000;

/// /start 欢迎文案
const WELCOME_TEXT: &str = "🤖 Welcome to the Q&A Explanation Bot!\n\nSend me a PDF or text file with multiple-choice questions.\n\nUse /help for more information.";

/// /help 使用说明
const HELP_TEXT: &str = "📚 How to use:\n\n1. Send a PDF/TXT file with questions like:\n   1. Question text?\n   a) Option A\n   b) Option B\n   c) Option C\n   d) Option D\n   Ex: Explanation\n\n2. I'll extract questions and generate explanations\n\nCommands:\n/start - Welcome\n/help - This help\n/about - About bot\n/quiz - Random stored question";

/// /about 简介
const ABOUT_TEXT: &str = "🎓 Q&A Explanation Bot\n\nExtracts questions from files and provides explanations.";

/// 单个文档的处理统计
#[derive(Debug, Default)]
struct DocumentStats {
    found: usize,
    processed: usize,
}

/// 问答机器人
pub struct QaBot {
    client: TelegramClient,
    extractor: QuestionExtractor,
    generator: ExplanationGenerator,
    bank: QuestionBank,
    max_questions: usize,
}

impl QaBot {
    pub fn new(config: &Config, client: TelegramClient) -> Self {
        Self {
            client,
            extractor: QuestionExtractor::new(config),
            generator: ExplanationGenerator::new(config),
            bank: QuestionBank::new(config),
            max_questions: config.max_questions_per_request,
        }
    }

    /// 处理一条更新，错误只记日志，不向轮询循环传播
    pub async fn process(&self, update: &Update) {
        if let Err(e) = self.handle_update(update).await {
            error!("[消息 {}] ❌ 处理失败: {}", update.update_id, e);
        }
    }

    async fn handle_update(&self, update: &Update) -> Result<()> {
        let message = match &update.message {
            Some(message) => message,
            None => return Ok(()),
        };

        if let Some(document) = &message.document {
            return self.handle_document(message, document).await;
        }
        if let Some(text) = &message.text {
            return self.handle_command(message, text).await;
        }
        Ok(())
    }

    /// 处理文本命令
    async fn handle_command(&self, message: &Message, text: &str) -> Result<()> {
        let chat_id = message.chat.id;
        let command = text.split_whitespace().next().unwrap_or("");

        match command {
            "/start" => {
                self.client.send_message(chat_id, WELCOME_TEXT).await?;
            }
            "/help" => {
                self.client.send_message(chat_id, HELP_TEXT).await?;
            }
            "/about" => {
                self.client.send_message(chat_id, ABOUT_TEXT).await?;
            }
            "/quiz" => {
                self.handle_quiz(chat_id, text).await?;
            }
            // 其余文本不响应
            _ => debug!("忽略非命令文本 (chat {})", chat_id),
        }
        Ok(())
    }

    /// /quiz [folder]：随机抽一道已入库的题目
    async fn handle_quiz(&self, chat_id: i64, text: &str) -> Result<()> {
        let requested = text.split_whitespace().nth(1);
        let drawn = match requested {
            Some(folder) => self
                .bank
                .random_question(folder)
                .await
                .map(|q| q.map(|q| (folder.to_string(), q))),
            None => self.bank.random_question_any().await,
        };

        match drawn {
            Ok(Some((folder, question))) => {
                info!("🎲 抽题: 文件夹 {}", folder);
                self.client
                    .send_message(chat_id, &format_quiz_question(&question, &folder))
                    .await?;
            }
            Ok(None) => {
                self.client
                    .send_message(chat_id, "📭 No questions stored yet. Send me a file first!")
                    .await?;
            }
            Err(e) => {
                warn!("⚠️ 题库读取失败: {}", e);
                self.client
                    .send_message(chat_id, "❌ Could not read the question bank.")
                    .await?;
            }
        }
        Ok(())
    }

    /// 处理文档上传
    ///
    /// 流水线内的错误在此兜住，编辑进度消息向用户反馈。
    async fn handle_document(&self, message: &Message, document: &Document) -> Result<()> {
        let chat_id = message.chat.id;
        let file_name = document.file_name.as_deref().unwrap_or("document");

        info!("{}", "=".repeat(60));
        info!("📥 收到文档: {} (chat {})", file_name, chat_id);

        let progress = self
            .client
            .send_message(chat_id, "📥 Processing file...")
            .await?;

        if let Err(e) = self
            .run_document_pipeline(chat_id, progress.message_id, file_name, document)
            .await
        {
            error!("[文档 {}] ❌ 处理失败: {}", file_name, e);
            if let Err(send_err) = self
                .client
                .send_message(chat_id, &format!("❌ Error: {}", e))
                .await
            {
                warn!("⚠️ 错误提示发送失败: {}", send_err);
            }
        }
        Ok(())
    }

    async fn run_document_pipeline(
        &self,
        chat_id: i64,
        progress_id: i64,
        file_name: &str,
        document: &Document,
    ) -> Result<()> {
        // 1. 扩展名检查
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if extension != "pdf" && extension != "txt" {
            warn!("[文档 {}] ⚠️ 不支持的文件类型", file_name);
            self.edit_progress(chat_id, progress_id, "❌ Please send PDF or TXT file.")
                .await;
            return Ok(());
        }

        // 2. 下载到临时文件
        let bytes = self.download_document(document).await?;
        let temp_path = temp_file_path(&extension);
        tokio::fs::write(&temp_path, &bytes)
            .await
            .with_context(|| format!("无法写入临时文件: {}", temp_path.display()))?;

        self.edit_progress(chat_id, progress_id, "🔍 Extracting questions...")
            .await;

        // 3. 取文本并抽取题目
        let extracted = self.extract_questions(&temp_path, &bytes, &extension).await;

        // 无论成败都清理临时文件
        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            warn!("⚠️ 临时文件删除失败 {}: {}", temp_path.display(), e);
        }

        let records = extracted?;
        if records.is_empty() {
            warn!("[文档 {}] ⚠️ 没有找到题目", file_name);
            self.edit_progress(chat_id, progress_id, "❌ No questions found. Check format.")
                .await;
            return Ok(());
        }
        for record in &records {
            debug!("  {}", record);
        }

        let stats = DocumentStats {
            found: records.len(),
            processed: records.len().min(self.max_questions),
        };
        log_questions_found(file_name, &stats);

        self.edit_progress(
            chat_id,
            progress_id,
            &format!(
                "📚 Found {} questions. Generating explanations...",
                stats.found
            ),
        )
        .await;

        // 4. 生成讲解（带上限）
        let explained = self.generator.generate_batch(&records, self.max_questions).await;

        // 5. 逐题回复
        for (i, item) in explained.iter().enumerate() {
            let response = format_question_response(item, i + 1);
            for part in split_message(&response, MAX_MESSAGE_LEN) {
                self.client.send_message(chat_id, &part).await?;
            }
        }

        // 6. 入库，文件名作为文件夹名
        let folder = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("default");
        match self.bank.add_questions(folder, &explained).await {
            Ok(total) => info!("✓ 已入库: 文件夹 {} 现共 {} 题", folder, total),
            Err(e) => warn!("⚠️ 入库失败: {}", e),
        }

        // 7. 收尾
        if let Err(e) = self.client.delete_message(chat_id, progress_id).await {
            warn!("⚠️ 进度消息删除失败: {}", e);
        }
        self.client
            .send_message(chat_id, &format!("✅ Processed {} questions!", explained.len()))
            .await?;

        log_document_complete(file_name, &stats);
        Ok(())
    }

    /// 取文本并抽取题目，必要时走模型转写兜底
    async fn extract_questions(
        &self,
        path: &Path,
        bytes: &[u8],
        extension: &str,
    ) -> Result<Vec<QuestionRecord>> {
        let mut text = acquire::acquire(path).await?;
        info!("🔍 提取到 {} 字符原始文本", text.chars().count());

        // 直接提取的结果不像题目文档时，尝试一次模型转写
        if extension == "pdf" && !extractor::looks_like_question_text(&text) {
            if let Some(transcribed) = self
                .generator
                .transcribe_document(bytes, "application/pdf")
                .await
            {
                if extractor::looks_like_question_text(&transcribed) {
                    info!("✓ 转写文本可用 ({} 字符)", transcribed.chars().count());
                    text = transcribed;
                }
            }
        }

        Ok(self.extractor.extract(&text))
    }

    async fn download_document(&self, document: &Document) -> Result<Vec<u8>> {
        let file = self
            .client
            .get_file(&document.file_id)
            .await
            .context("文件定位失败")?;
        let file_path = file.file_path.context("服务器未返回文件路径")?;
        let bytes = self
            .client
            .download_file(&file_path)
            .await
            .context("文件下载失败")?;
        Ok(bytes)
    }

    /// 编辑进度消息，失败只记日志
    async fn edit_progress(&self, chat_id: i64, message_id: i64, text: &str) {
        if let Err(e) = self.client.edit_message_text(chat_id, message_id, text).await {
            warn!("⚠️ 进度消息更新失败: {}", e);
        }
    }
}

// ========== 回复格式化 ==========

/// 格式化单题回复
fn format_question_response(item: &ExplainedQuestion, index: usize) -> String {
    let record = &item.record;
    let mut response = format!(
        "Question {}\n\nQ: {}\n\nOptions:\nA) {}\nB) {}\nC) {}\nD) {}\n\nCorrect Answer: {}\n\nExplanation:\n{}",
        index,
        record.stem,
        record.options.a,
        record.options.b,
        record.options.c,
        record.options.d,
        record.correct_label,
        item.explanation
    );
    if let Some(original) = &record.source_explanation {
        response.push_str(&format!("\n\nOriginal Explanation:\n{}", original));
    }
    response
}

/// 格式化 /quiz 抽到的题目
fn format_quiz_question(question: &StoredQuestion, folder: &str) -> String {
    let mut text = format!(
        "🎲 Random question from \"{}\"\n\nQ: {}\n\nOptions:\nA) {}\nB) {}\nC) {}\nD) {}\n\nCorrect Answer: {}",
        folder,
        question.stem,
        question.options.a,
        question.options.b,
        question.options.c,
        question.options.d,
        question.correct
    );
    if let Some(explanation) = &question.explanation {
        text.push_str(&format!("\n\nExplanation:\n{}", explanation));
    }
    text
}

/// 按长度上限切分消息，尽量在换行处断开
fn split_message(text: &str, max_length: usize) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = text.to_string();

    while rest.chars().count() > max_length {
        let window_end = rest
            .char_indices()
            .nth(max_length)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        // 上限范围内的最后一个换行；没有则硬切
        let split_pos = rest[..window_end].rfind('\n').unwrap_or(window_end);
        parts.push(rest[..split_pos].to_string());
        rest = rest[split_pos..].trim_start().to_string();
    }

    parts.push(rest);
    parts
}

/// 生成临时文件路径，时间戳避免并发冲突
fn temp_file_path(extension: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d%H%M%S%3f");
    std::env::temp_dir().join(format!("qa_doc_{}.{}", stamp, extension))
}

// ========== 日志辅助函数 ==========

fn log_questions_found(file_name: &str, stats: &DocumentStats) {
    info!(
        "[文档 {}] 📚 找到 {} 道题目，本次处理 {} 道",
        file_name, stats.found, stats.processed
    );
}

fn log_document_complete(file_name: &str, stats: &DocumentStats) {
    info!(
        "[文档 {}] ✅ 处理完成 (找到 {} / 处理 {})",
        file_name, stats.found, stats.processed
    );
    info!("{}", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Label, OptionSet, QuestionRecord};

    fn explained_item(with_source: bool) -> ExplainedQuestion {
        ExplainedQuestion {
            record: QuestionRecord {
                ordinal: 1,
                stem: "What is 2+2?".to_string(),
                options: OptionSet {
                    a: "3".to_string(),
                    b: "4".to_string(),
                    c: "5".to_string(),
                    d: "6".to_string(),
                },
                correct_label: Label::B,
                source_explanation: with_source.then(|| "Basic addition".to_string()),
            },
            explanation: "Because 2+2 equals 4.".to_string(),
        }
    }

    #[test]
    fn test_format_question_response_with_source() {
        let text = format_question_response(&explained_item(true), 1);
        assert!(text.starts_with("Question 1\n"));
        assert!(text.contains("Q: What is 2+2?"));
        assert!(text.contains("B) 4"));
        assert!(text.contains("Correct Answer: B"));
        assert!(text.contains("Explanation:\nBecause 2+2 equals 4."));
        assert!(text.ends_with("Original Explanation:\nBasic addition"));
    }

    #[test]
    fn test_format_question_response_without_source() {
        let text = format_question_response(&explained_item(false), 3);
        assert!(text.starts_with("Question 3\n"));
        assert!(!text.contains("Original Explanation"));
    }

    #[test]
    fn test_format_quiz_question() {
        let stored = StoredQuestion::from(&explained_item(false));
        let text = format_quiz_question(&stored, "math_quiz");
        assert!(text.contains("Random question from \"math_quiz\""));
        assert!(text.contains("Correct Answer: B"));
        assert!(text.contains("Explanation:\nBecause 2+2 equals 4."));
    }

    #[test]
    fn test_split_message_short_passthrough() {
        let parts = split_message("short text", MAX_MESSAGE_LEN);
        assert_eq!(parts, vec!["short text".to_string()]);
    }

    #[test]
    fn test_split_message_prefers_newline() {
        let line = "a".repeat(50);
        let text = vec![line; 100].join("\n");
        let parts = split_message(&text, 4000);

        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.chars().count() <= 4000));
        assert_eq!(parts.join("\n"), text);
    }

    #[test]
    fn test_split_message_hard_cut_without_newlines() {
        let text = "x".repeat(9000);
        let parts = split_message(&text, 4000);

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].chars().count(), 4000);
        assert_eq!(parts[1].chars().count(), 4000);
        assert_eq!(parts[2].chars().count(), 1000);
        assert_eq!(parts.concat(), text);
    }

    #[test]
    fn test_split_message_exact_limit() {
        let text = "y".repeat(4000);
        let parts = split_message(&text, 4000);
        assert_eq!(parts.len(), 1);
    }

    #[test]
    fn test_temp_file_path_extension() {
        let path = temp_file_path("pdf");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("qa_doc_"))
            .unwrap_or(false));
    }
}
