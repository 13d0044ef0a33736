//! 录题草稿
//!
//! 表单式的松散输入（字符串或数字都可以），校验后得到 `QuestionPayload`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ValidationError;
use crate::models::question::{
    CodingPayload, Language, McqPayload, QuestionKind, QuestionPayload, StarterCode, TestCase,
};

/// 选择题默认分值
pub const DEFAULT_MCQ_MARKS: u32 = 1;
/// 测试用例默认超时（秒）
pub const DEFAULT_TEST_TIMEOUT_SECS: u32 = 2;
/// 测试用例默认内存限制（MB）
pub const DEFAULT_MEMORY_LIMIT_MB: u32 = 256;

/// 选择题草稿
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McqDraft {
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub question: Option<String>,
    /// 逗号分隔的选项
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub options: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub correct_answer: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub marks: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub classification: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub level: Option<String>,
}

/// 测试用例草稿
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestCaseDraft {
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub input: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub expected_output: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub is_public: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub timeout: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub memory_limit: Option<String>,
}

/// 编程题草稿
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodingDraft {
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub constraints: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub input_format: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub output_format: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub sample_input: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub sample_output: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub max_marks: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub classification: Option<String>,
    #[serde(default, deserialize_with = "deserialize_loose_text")]
    pub level: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCaseDraft>,
    /// 语言名 -> 代码
    #[serde(default)]
    pub starter_code: BTreeMap<String, String>,
}

/// 任意题型的草稿
#[derive(Debug, Clone)]
pub enum QuestionDraft {
    Mcq(McqDraft),
    Coding(CodingDraft),
}

impl QuestionDraft {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionDraft::Mcq(_) => QuestionKind::Mcq,
            QuestionDraft::Coding(_) => QuestionKind::Coding,
        }
    }

    pub fn validate(&self) -> Result<QuestionPayload, ValidationError> {
        match self {
            QuestionDraft::Mcq(draft) => draft.validate().map(QuestionPayload::Mcq),
            QuestionDraft::Coding(draft) => draft.validate().map(QuestionPayload::Coding),
        }
    }
}

impl From<McqDraft> for QuestionDraft {
    fn from(draft: McqDraft) -> Self {
        QuestionDraft::Mcq(draft)
    }
}

impl From<CodingDraft> for QuestionDraft {
    fn from(draft: CodingDraft) -> Self {
        QuestionDraft::Coding(draft)
    }
}

impl McqDraft {
    pub fn validate(&self) -> Result<McqPayload, ValidationError> {
        let question = required(&self.question, "question")?;
        let options_raw = required(&self.options, "options")?;
        let correct_answer = required(&self.correct_answer, "correct_answer")?;
        let classification = required(&self.classification, "classification")?;
        let level = required(&self.level, "level")?;

        let options: Vec<String> = options_raw
            .split(',')
            .map(str::trim)
            .filter(|opt| !opt.is_empty())
            .map(str::to_string)
            .collect();
        if options.is_empty() {
            return Err(ValidationError::NoOptions);
        }

        let marks = match blank_to_none(&self.marks) {
            Some(raw) => parse_number("marks", raw)?,
            None => DEFAULT_MCQ_MARKS,
        };

        Ok(McqPayload {
            question,
            options,
            correct_answer: correct_answer.trim().to_string(),
            marks,
            classification,
            level,
        })
    }
}

impl CodingDraft {
    pub fn validate(&self) -> Result<CodingPayload, ValidationError> {
        let title = required(&self.title, "title")?;
        let text = required(&self.text, "text")?;
        let max_marks_raw = required(&self.max_marks, "max_marks")?;
        let classification = required(&self.classification, "classification")?;
        let level = required(&self.level, "level")?;
        let max_marks = parse_number("max_marks", &max_marks_raw)?;

        // 缺少输入或期望输出的用例直接丢弃
        let test_cases: Vec<TestCase> = self.test_cases.iter().filter_map(TestCaseDraft::build).collect();
        if test_cases.is_empty() {
            return Err(ValidationError::NoTestCases);
        }

        let starter_code = Language::ALL
            .iter()
            .filter_map(|lang| {
                let code = self.starter_code.get(lang.name())?.trim();
                (!code.is_empty()).then(|| StarterCode {
                    language: *lang,
                    code: code.to_string(),
                })
            })
            .collect();

        Ok(CodingPayload {
            title,
            text,
            constraints: optional(&self.constraints),
            input_format: optional(&self.input_format),
            output_format: optional(&self.output_format),
            sample_input: optional(&self.sample_input),
            sample_output: optional(&self.sample_output),
            max_marks,
            test_cases,
            starter_code,
            classification,
            level,
        })
    }
}

impl TestCaseDraft {
    fn build(&self) -> Option<TestCase> {
        let input = blank_to_none(&self.input)?;
        let expected_output = blank_to_none(&self.expected_output)?;
        Some(TestCase {
            input: input.to_string(),
            expected_output: expected_output.to_string(),
            is_public: blank_to_none(&self.is_public) == Some("true"),
            timeout: lenient_number(&self.timeout, DEFAULT_TEST_TIMEOUT_SECS),
            memory_limit: lenient_number(&self.memory_limit, DEFAULT_MEMORY_LIMIT_MB),
        })
    }
}

// ========== 字段辅助函数 ==========

fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// 必填字段：去掉首尾空白后不能为空，返回原值
fn required(value: &Option<String>, field: &'static str) -> Result<String, ValidationError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(ValidationError::MissingField { field }),
    }
}

fn optional(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn parse_number(field: &'static str, raw: &str) -> Result<u32, ValidationError> {
    raw.trim().parse::<u32>().map_err(|e| ValidationError::Malformed {
        field,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

/// 非法或缺失时回落到默认值
fn lenient_number(value: &Option<String>, default: u32) -> u32 {
    blank_to_none(value)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

/// 把字符串 / 整数 / 浮点 / 布尔统一读成字符串
fn deserialize_loose_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct LooseTextVisitor;

    impl<'de> Visitor<'de> for LooseTextVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number or boolean")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(None)
        }
    }

    deserializer.deserialize_any(LooseTextVisitor)
}
