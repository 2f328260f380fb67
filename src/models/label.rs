use serde::{Deserialize, Serialize};
use std::fmt;

/// 选项标签
///
/// 四个固定选项字母，贯穿抽取、生成与存储各层。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// 选项 A
    A,
    /// 选项 B
    B,
    /// 选项 C
    C,
    /// 选项 D
    D,
}

impl Label {
    /// 按 A → D 顺序排列的全部标签
    pub const ALL: [Label; 4] = [Label::A, Label::B, Label::C, Label::D];

    /// 获取标签字母
    pub fn as_str(self) -> &'static str {
        match self {
            Label::A => "A",
            Label::B => "B",
            Label::C => "C",
            Label::D => "D",
        }
    }

    /// 从字母解析标签（大小写均可）
    pub fn from_letter(s: &str) -> Option<Self> {
        match s {
            "A" | "a" => Some(Label::A),
            "B" | "b" => Some(Label::B),
            "C" | "c" => Some(Label::C),
            "D" | "d" => Some(Label::D),
            _ => None,
        }
    }

    /// 在讲解文字中查找点名的选项字母
    ///
    /// 识别 "option x" / "answer x" / "answer is x" 形式的短语，
    /// 按 A → D 顺序检查，第一个命中的标签胜出。
    /// 短语后必须是非字母数字字符，避免 "option and" 之类的误报。
    pub fn find_in_text(text: &str) -> Option<Self> {
        let lower = text.to_lowercase();
        for label in Self::ALL {
            let letter = label.as_str().to_ascii_lowercase();
            for prefix in ["option ", "answer ", "answer is "] {
                let phrase = format!("{}{}", prefix, letter);
                if contains_phrase(&lower, &phrase) {
                    return Some(label);
                }
            }
        }
        None
    }
}

/// 短语匹配，要求命中处之后是单词边界
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let mut search_from = 0;
    while let Some(rel) = haystack[search_from..].find(phrase) {
        let end = search_from + rel + phrase.len();
        let at_boundary = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        if at_boundary {
            return true;
        }
        search_from = end;
    }
    false
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_letter() {
        assert_eq!(Label::from_letter("A"), Some(Label::A));
        assert_eq!(Label::from_letter("c"), Some(Label::C));
        assert_eq!(Label::from_letter("E"), None);
        assert_eq!(Label::from_letter(""), None);
    }

    #[test]
    fn test_find_in_text_option_phrase() {
        assert_eq!(
            Label::find_in_text("The key point is option b, not the others."),
            Some(Label::B)
        );
    }

    #[test]
    fn test_find_in_text_answer_phrase() {
        assert_eq!(
            Label::find_in_text("Answer C is right because of geography."),
            Some(Label::C)
        );
        assert_eq!(
            Label::find_in_text("The answer is d here."),
            Some(Label::D)
        );
    }

    #[test]
    fn test_find_in_text_label_order_wins() {
        // A 与 C 同时被点名时按 A → D 顺序取前者
        assert_eq!(
            Label::find_in_text("Both option c and option a are discussed."),
            Some(Label::A)
        );
    }

    #[test]
    fn test_find_in_text_requires_word_boundary() {
        // "option and" 不应被当作 "option a"
        assert_eq!(Label::find_in_text("This option and the next one."), None);
        // 边界之后的真实命中仍然有效
        assert_eq!(
            Label::find_in_text("One option anyway, but option a, really."),
            Some(Label::A)
        );
    }

    #[test]
    fn test_find_in_text_none() {
        assert_eq!(Label::find_in_text("No letters are named here."), None);
        assert_eq!(Label::find_in_text(""), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Label::B.to_string(), "B");
    }
}
