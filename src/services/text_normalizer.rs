//! 题干归一化 - 业务能力层
//!
//! 把题目文本化简为比较用的键：小写、去标点、合并空白、去首尾空白

use regex::Regex;
use serde_json::Value as JsonValue;
use std::sync::OnceLock;

/// 需要去掉的标点：引号、句读、各类括号
const PUNCTUATION: &str = r#"['",.?!;:()\[\]{}]"#;

fn punctuation_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PUNCTUATION).expect("标点正则非法"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("空白正则非法"))
}

/// 归一化题目文本
///
/// 先去标点再合并空白，保证 `normalize(normalize(x)) == normalize(x)`
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = punctuation_re().replace_all(&lowered, "");
    let collapsed = whitespace_re().replace_all(&stripped, " ");
    collapsed.trim().to_string()
}

/// 归一化任意 JSON 值；非字符串一律视为空文本
pub fn normalize_value(value: Option<&JsonValue>) -> String {
    match value {
        Some(JsonValue::String(text)) => normalize(text),
        _ => String::new(),
    }
}
