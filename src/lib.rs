//! # QA Explain Bot
//!
//! 一个从文档中抽取选择题并生成讲解的 Telegram 机器人
//!
//! ## 架构设计
//!
//! 本系统采用四层处理流水线：
//!
//! ### ① 获取层（Acquisition）
//! - `acquire` - 把 PDF/TXT 文件变成纯文本
//! - PDF 双后端提取，失败时降级，必要时走模型转写
//!
//! ### ② 抽取层（Extraction）
//! - `extractor` - 按模式表把文本切成结构化题目
//! - `QuestionExtractor` - 模式命中、归一化、正确答案推断
//!
//! ### ③ 生成层（Generation）
//! - `generator` - 为每道题生成讲解
//! - `api/` - Gemini / OpenRouter / HuggingFace 服务链与 Telegram 客户端
//!
//! ### ④ 应用层（Application）
//! - `bot` - 单条更新的处理流程（命令、/quiz、文档流水线）
//! - `bank` - TOML 题库的存取与随机抽题
//! - `app` - 初始化与长轮询主循环
//!
//! ## 模块结构

pub mod acquire;
pub mod api;
pub mod app;
pub mod bank;
pub mod bot;
pub mod config;
pub mod error;
pub mod extractor;
pub mod generator;
pub mod logger;
pub mod models;
pub mod utils;

// 重新导出常用类型
pub use api::{Provider, ProviderError, TelegramClient};
pub use app::App;
pub use bank::QuestionBank;
pub use bot::QaBot;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use extractor::QuestionExtractor;
pub use generator::{ExplanationGenerator, FALLBACK_EXPLANATION};
pub use models::{ExplainedQuestion, Label, OptionSet, QuestionRecord};
