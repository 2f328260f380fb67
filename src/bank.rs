//! 题库存储模块
//!
//! 以 TOML 文件实现的文件夹式题库：每个文件夹对应一个文件，
//! 支持追加入库与随机抽题。文件夹通常以上传文件名命名。

use crate::config::Config;
use crate::error::{AppError, AppResult, FileError};
use crate::models::{BankFolder, ExplainedQuestion, StoredQuestion};
use rand::seq::SliceRandom;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

/// 文件题库
#[derive(Debug, Clone)]
pub struct QuestionBank {
    root: PathBuf,
}

impl QuestionBank {
    pub fn new(config: &Config) -> Self {
        Self {
            root: PathBuf::from(&config.bank_folder),
        }
    }

    /// 确保题库目录存在
    pub async fn ensure_root(&self) -> AppResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    fn folder_path(&self, folder: &str) -> PathBuf {
        self.root.join(format!("{}.toml", sanitize_folder_name(folder)))
    }

    /// 读取一个文件夹，不存在时返回空文件夹
    async fn load_folder(&self, folder: &str) -> AppResult<BankFolder> {
        let path = self.folder_path(folder);
        if !path.exists() {
            return Ok(BankFolder {
                name: folder.to_string(),
                questions: Vec::new(),
            });
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let bank: BankFolder = toml::from_str(&content)?;
        Ok(bank)
    }

    /// 追加一批已讲解的题目
    ///
    /// 文件夹不存在时自动创建。
    ///
    /// # 返回
    /// 入库后该文件夹的题目总数
    pub async fn add_questions(
        &self,
        folder: &str,
        questions: &[ExplainedQuestion],
    ) -> AppResult<usize> {
        self.ensure_root().await?;

        let mut bank = self.load_folder(folder).await?;
        for question in questions {
            bank.questions.push(StoredQuestion::from(question));
        }

        let path = self.folder_path(folder);
        let content = toml::to_string_pretty(&bank)
            .map_err(|e| AppError::Other(format!("题库序列化失败: {}", e)))?;
        fs::write(&path, content).await.map_err(|e| {
            AppError::File(FileError::WriteFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })?;

        info!(
            "📦 已入库 {} 题 → {} (现共 {} 题)",
            questions.len(),
            path.display(),
            bank.questions.len()
        );
        Ok(bank.questions.len())
    }

    /// 从指定文件夹随机抽一题
    ///
    /// 文件夹不存在或为空时返回 None。
    pub async fn random_question(&self, folder: &str) -> AppResult<Option<StoredQuestion>> {
        let bank = self.load_folder(folder).await?;
        if bank.questions.is_empty() {
            debug!("题库文件夹 {} 为空", folder);
            return Ok(None);
        }
        Ok(bank.questions.choose(&mut rand::thread_rng()).cloned())
    }

    /// 从全部文件夹随机抽一题
    ///
    /// 逐个读取文件夹文件，单个文件损坏时告警跳过。
    /// 返回 (文件夹名, 题目)。
    pub async fn random_question_any(&self) -> AppResult<Option<(String, StoredQuestion)>> {
        if !self.root.exists() {
            return Ok(None);
        }

        let mut pool: Vec<(String, StoredQuestion)> = Vec::new();
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|e| AppError::file_read_failed(self.root.display().to_string(), e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::file_read_failed(self.root.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                continue;
            }

            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("⚠️ 读取题库文件失败 {}: {}", path.display(), e);
                    continue;
                }
            };
            match toml::from_str::<BankFolder>(&content) {
                Ok(bank) => {
                    let name = bank.name;
                    for question in bank.questions {
                        pool.push((name.clone(), question));
                    }
                }
                Err(e) => warn!("⚠️ 题库文件解析失败 {}: {}", path.display(), e),
            }
        }

        Ok(pool.choose(&mut rand::thread_rng()).cloned())
    }
}

/// 把文件夹名清洗为安全的文件名
fn sanitize_folder_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "default".to_string()
    } else {
        cleaned
    }
}
