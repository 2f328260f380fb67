//! 题目抽取模块
//!
//! 把原始文本解析为结构化的选择题记录：
//! - 模式表按固定优先级排列，第一个在全文命中至少一个题目块的模式
//!   独占本次解析，后续模式不再尝试
//! - 所有捕获片段统一做空白归一化，可选严格模式再过滤字符白名单
//! - 正确答案按 选项内标记 → 讲解短语 → 默认 A 三级推断
//!
//! 对格式不符的文本永不报错：解析不到题目时返回空列表，
//! 字段不完整的题目块被静默丢弃。

use crate::config::Config;
use crate::models::{Label, OptionSet, QuestionRecord};
use regex::Regex;
use tracing::{debug, warn};

/// 题目块起始标记：行首的 "数字." 编号
const BLOCK_MARKER: &str = r"(?m)^\d+\.";

/// 一种题目书写约定
#[derive(Debug, Clone, Copy)]
pub struct PatternSpec {
    /// 模式名（用于日志）
    pub name: &'static str,
    /// 单个题目块的整块匹配正则
    pub block_re: &'static str,
    /// 是否带 "Ex:" 讲解捕获组
    pub has_explanation: bool,
}

/// 模式表，按优先级排列
pub const PATTERNS: &[PatternSpec] = &[
    PatternSpec {
        name: "lower_paren_ex",
        block_re: r"(?s)^(\d+)\.\s*(.*?)\s*a\)\s*(.*?)\s*b\)\s*(.*?)\s*c\)\s*(.*?)\s*d\)\s*(.*?)\s*Ex:\s*(.*)$",
        has_explanation: true,
    },
    PatternSpec {
        name: "upper_paren_ex",
        block_re: r"(?s)^(\d+)\.\s*(.*?)\s*\(A\)\s*(.*?)\s*\(B\)\s*(.*?)\s*\(C\)\s*(.*?)\s*\(D\)\s*(.*?)\s*Ex:\s*(.*)$",
        has_explanation: true,
    },
    PatternSpec {
        name: "lower_paren",
        block_re: r"(?s)^(\d+)\.\s*(.*?)\s*a\)\s*(.*?)\s*b\)\s*(.*?)\s*c\)\s*(.*?)\s*d\)\s*(.*)$",
        has_explanation: false,
    },
];

/// 选项文本中的正确答案符号
const CORRECT_GLYPHS: &[&str] = &["✅", "✔", "✓"];
/// 选项文本中的正确答案标记词
const CORRECT_KEYWORDS: &[&str] = &["correct", "right"];

struct CompiledPattern {
    name: &'static str,
    re: Regex,
    has_explanation: bool,
}

/// 题目抽取器
pub struct QuestionExtractor {
    patterns: Vec<CompiledPattern>,
    marker: Option<Regex>,
    strict: bool,
}

impl QuestionExtractor {
    pub fn new(config: &Config) -> Self {
        let patterns = PATTERNS
            .iter()
            .filter_map(|spec| match Regex::new(spec.block_re) {
                Ok(re) => Some(CompiledPattern {
                    name: spec.name,
                    re,
                    has_explanation: spec.has_explanation,
                }),
                Err(e) => {
                    warn!("⚠️ 模式 {} 编译失败: {}", spec.name, e);
                    None
                }
            })
            .collect();

        Self {
            patterns,
            marker: Regex::new(BLOCK_MARKER).ok(),
            strict: config.strict_normalize,
        }
    }

    /// 从原始文本抽取题目记录
    ///
    /// 结果保持文档顺序（ordinal 来自文档编号，不重新排序）。
    pub fn extract(&self, text: &str) -> Vec<QuestionRecord> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let marker = match &self.marker {
            Some(marker) => marker,
            None => return Vec::new(),
        };

        let blocks = split_blocks(text, marker);
        if blocks.is_empty() {
            debug!("文本中没有题目编号标记");
            return Vec::new();
        }

        for pattern in &self.patterns {
            let mut raw_matches = 0usize;
            let mut records = Vec::new();

            for block in &blocks {
                let caps = match pattern.re.captures(block) {
                    Some(caps) => caps,
                    None => continue,
                };
                raw_matches += 1;
                if let Some(record) = self.record_from_captures(&caps, pattern.has_explanation) {
                    records.push(record);
                }
            }

            // 第一个有原始命中的模式独占结果，即使其中有记录被丢弃
            if raw_matches > 0 {
                debug!(
                    "✓ 模式 {} 命中 {} 个题目块，产出 {} 条记录",
                    pattern.name,
                    raw_matches,
                    records.len()
                );
                return records;
            }
        }

        debug!("所有模式都未命中");
        Vec::new()
    }

    /// 把一次整块匹配转换为题目记录
    ///
    /// 题干或任一选项为空时返回 None（静默丢弃）。
    fn record_from_captures(
        &self,
        caps: &regex::Captures<'_>,
        has_explanation: bool,
    ) -> Option<QuestionRecord> {
        let ordinal: u32 = caps.get(1)?.as_str().parse().ok()?;
        let stem = self.clean(caps.get(2)?.as_str());
        let mut options = OptionSet {
            a: self.clean(caps.get(3)?.as_str()),
            b: self.clean(caps.get(4)?.as_str()),
            c: self.clean(caps.get(5)?.as_str()),
            d: self.clean(caps.get(6)?.as_str()),
        };
        let source_explanation = if has_explanation {
            Some(self.clean(caps.get(7)?.as_str())).filter(|e| !e.is_empty())
        } else {
            None
        };

        let correct_label = infer_correct_label(&mut options, source_explanation.as_deref());

        if stem.is_empty() || !options.all_non_empty() {
            warn!("⚠️ 丢弃字段不完整的题目块 (题号 {})", ordinal);
            return None;
        }

        Some(QuestionRecord {
            ordinal,
            stem,
            options,
            correct_label,
            source_explanation,
        })
    }

    fn clean(&self, text: &str) -> String {
        if self.strict {
            normalize_strict(text)
        } else {
            normalize(text)
        }
    }
}

// ========== 文本归一化 ==========

/// 空白归一化：所有空白串压成单个空格并去除首尾空白
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 严格归一化：先过滤字符白名单再做空白归一化
///
/// 白名单为字母数字、下划线、空白以及 `. ? ! - : , / \ ( )`。
pub fn normalize_strict(text: &str) -> String {
    let filtered: String = text.chars().filter(|c| is_allowed_char(*c)).collect();
    normalize(&filtered)
}

fn is_allowed_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c.is_whitespace() || ".?!-:,/\\()".contains(c)
}

// ========== 正确答案推断 ==========

/// 三级推断正确答案：选项内标记 → 讲解短语 → 默认 A
///
/// 命中标记的选项文本会被去掉标记并重新归一化。
fn infer_correct_label(options: &mut OptionSet, explanation: Option<&str>) -> Label {
    for label in Label::ALL {
        if let Some(stripped) = strip_marker(options.get(label)) {
            *options.get_mut(label) = stripped;
            return label;
        }
    }

    if let Some(text) = explanation {
        if let Some(label) = Label::find_in_text(text) {
            return label;
        }
    }

    Label::A
}

/// 选项文本含正确标记时，返回去掉标记并重新归一化的文本
fn strip_marker(text: &str) -> Option<String> {
    for glyph in CORRECT_GLYPHS {
        if text.contains(glyph) {
            return Some(normalize(&text.replace(glyph, " ")));
        }
    }
    for keyword in CORRECT_KEYWORDS {
        if let Some(pos) = find_ascii_ci(text, keyword) {
            let stripped = format!("{} {}", &text[..pos], &text[pos + keyword.len()..]);
            return Some(normalize(&stripped));
        }
    }
    None
}

/// ASCII 大小写不敏感的子串查找
///
/// needle 必须是纯 ASCII，返回的字节偏移保证落在字符边界上。
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len())
        .find(|&i| haystack[i..i + needle.len()].eq_ignore_ascii_case(needle))
}

// ========== 题目块切分 ==========

/// 按行首编号标记把全文切分为题目块
///
/// 每个块从一个编号标记延伸到下一个编号标记之前（或文本结尾）。
fn split_blocks<'a>(text: &'a str, marker: &Regex) -> Vec<&'a str> {
    let starts: Vec<usize> = marker.find_iter(text).map(|m| m.start()).collect();
    let mut blocks = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        blocks.push(&text[start..end]);
    }
    blocks
}

/// 粗略判断文本是否像一份选择题文档
///
/// 要求至少出现一个行首编号标记和一个选项标记。
pub fn looks_like_question_text(text: &str) -> bool {
    let has_marker = Regex::new(BLOCK_MARKER)
        .map(|re| re.is_match(text))
        .unwrap_or(false);
    let has_option = text.contains("a)") || text.contains("(A)");
    has_marker && has_option
}
