use crate::models::label::Label;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 四个选项的固定集合
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSet {
    pub a: String,
    pub b: String,
    pub c: String,
    pub d: String,
}

impl OptionSet {
    /// 按标签取选项文本
    pub fn get(&self, label: Label) -> &str {
        match label {
            Label::A => &self.a,
            Label::B => &self.b,
            Label::C => &self.c,
            Label::D => &self.d,
        }
    }

    /// 按标签取可变引用
    pub fn get_mut(&mut self, label: Label) -> &mut String {
        match label {
            Label::A => &mut self.a,
            Label::B => &mut self.b,
            Label::C => &mut self.c,
            Label::D => &mut self.d,
        }
    }

    /// 按 A → D 顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = (Label, &str)> {
        [
            (Label::A, self.a.as_str()),
            (Label::B, self.b.as_str()),
            (Label::C, self.c.as_str()),
            (Label::D, self.d.as_str()),
        ]
        .into_iter()
    }

    /// 四个选项是否全部非空
    pub fn all_non_empty(&self) -> bool {
        self.iter().all(|(_, text)| !text.is_empty())
    }
}

/// 一道结构化的选择题
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    /// 文档中的题号
    pub ordinal: u32,
    /// 题干
    pub stem: String,
    /// 四个选项
    pub options: OptionSet,
    /// 正确答案标签
    pub correct_label: Label,
    /// 文档自带的原始讲解
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_explanation: Option<String>,
}

impl fmt::Display for QuestionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview = if self.stem.chars().count() > 80 {
            format!("{}...", self.stem.chars().take(80).collect::<String>())
        } else {
            self.stem.clone()
        };
        write!(f, "{}. {} [答案: {}]", self.ordinal, preview, self.correct_label)
    }
}

/// 附带生成讲解的题目
#[derive(Debug, Clone, Serialize)]
pub struct ExplainedQuestion {
    /// 原始记录
    pub record: QuestionRecord,
    /// 生成的讲解文本
    pub explanation: String,
}

/// 题库文件中的一道题
///
/// options 放在最后，保证 TOML 序列化时子表位于标量字段之后。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredQuestion {
    pub stem: String,
    pub correct: Label,
    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub options: OptionSet,
}

impl From<&ExplainedQuestion> for StoredQuestion {
    fn from(item: &ExplainedQuestion) -> Self {
        Self {
            stem: item.record.stem.clone(),
            correct: item.record.correct_label,
            explanation: Some(item.explanation.clone()),
            options: item.record.options.clone(),
        }
    }
}

/// 一个题库文件夹的完整内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankFolder {
    /// 文件夹名
    pub name: String,
    /// 题目列表
    #[serde(default)]
    pub questions: Vec<StoredQuestion>,
}
