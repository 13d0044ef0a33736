use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::StoreError;
use crate::infrastructure::Document;

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    /// 选择题
    Mcq,
    /// 编程题
    Coding,
}

impl QuestionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Mcq => "mcq",
            QuestionKind::Coding => "coding",
        }
    }

    /// 试卷文档中保存该题型题目 ID 的数组字段
    pub fn exam_field(self) -> &'static str {
        match self {
            QuestionKind::Mcq => "mcqQuestions",
            QuestionKind::Coding => "codingQuestions",
        }
    }

    /// 题目文档中参与去重的文本字段
    pub fn text_field(self) -> &'static str {
        match self {
            QuestionKind::Mcq => "question",
            QuestionKind::Coding => "text",
        }
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 起始代码支持的语言（顺序即输出顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Cpp,
    C,
    Java,
    Python,
    CSharp,
    JavaScript,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::Cpp,
        Language::C,
        Language::Java,
        Language::Python,
        Language::CSharp,
        Language::JavaScript,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Java => "java",
            Language::Python => "python",
            Language::CSharp => "csharp",
            Language::JavaScript => "javascript",
        }
    }
}

/// 编程题测试用例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_public: bool,
    /// 超时（秒）
    pub timeout: u32,
    /// 内存限制（MB）
    pub memory_limit: u32,
}

/// 某种语言的起始代码
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarterCode {
    pub language: Language,
    pub code: String,
}

/// 选择题内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqPayload {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
    pub marks: u32,
    pub classification: String,
    pub level: String,
}

/// 编程题内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingPayload {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub constraints: String,
    #[serde(default)]
    pub input_format: String,
    #[serde(default)]
    pub output_format: String,
    #[serde(default)]
    pub sample_input: String,
    #[serde(default)]
    pub sample_output: String,
    pub max_marks: u32,
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub starter_code: Vec<StarterCode>,
    pub classification: String,
    pub level: String,
}

/// 完整题目内容，按 `kind` 字段区分题型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QuestionPayload {
    Mcq(McqPayload),
    Coding(CodingPayload),
}

impl QuestionPayload {
    pub fn kind(&self) -> QuestionKind {
        match self {
            QuestionPayload::Mcq(_) => QuestionKind::Mcq,
            QuestionPayload::Coding(_) => QuestionKind::Coding,
        }
    }

    /// 参与去重比较的原始文本
    pub fn text(&self) -> &str {
        match self {
            QuestionPayload::Mcq(mcq) => &mcq.question,
            QuestionPayload::Coding(coding) => &coding.text,
        }
    }

    /// 日志中展示的简短标题
    pub fn headline(&self) -> &str {
        match self {
            QuestionPayload::Mcq(mcq) => &mcq.question,
            QuestionPayload::Coding(coding) => &coding.title,
        }
    }
}

/// 题库中的标准题目（创建后内容不再变化）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalQuestion {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(flatten)]
    pub payload: QuestionPayload,
    /// 归一化文本；为空文本时不写入，不参与唯一索引
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl CanonicalQuestion {
    pub fn kind(&self) -> QuestionKind {
        self.payload.kind()
    }
}

/// 试卷内的题目副本，可独立于题库编辑
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamQuestion {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub exam_id: String,
    /// 去重命中或导入来源的题库题目
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_id: Option<String>,
    #[serde(flatten)]
    pub payload: QuestionPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ExamQuestion {
    pub fn kind(&self) -> QuestionKind {
        self.payload.kind()
    }
}

/// 试卷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub required_mcq_count: usize,
    pub required_coding_count: usize,
    #[serde(default)]
    pub mcq_questions: Vec<String>,
    #[serde(default)]
    pub coding_questions: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Exam {
    /// 该题型要求的题目数量（导入配额）
    pub fn required_count(&self, kind: QuestionKind) -> usize {
        match kind {
            QuestionKind::Mcq => self.required_mcq_count,
            QuestionKind::Coding => self.required_coding_count,
        }
    }

    /// 已关联的该题型题目 ID（按关联顺序）
    pub fn linked(&self, kind: QuestionKind) -> &[String] {
        match kind {
            QuestionKind::Mcq => &self.mcq_questions,
            QuestionKind::Coding => &self.coding_questions,
        }
    }
}

/// 新建试卷参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExam {
    /// 指定 ID；为空时由存储生成
    pub id: Option<String>,
    pub name: String,
    pub required_mcq_count: usize,
    pub required_coding_count: usize,
}

/// 已解析的操作人
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

// ========== 文档转换 ==========

/// 模型转为存储文档
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        JsonValue::Object(map) => Ok(map),
        other => Err(StoreError::Serialization(<serde_json::Error as serde::ser::Error>::custom(
            format!("期望 JSON 对象，实际为: {}", other),
        ))),
    }
}

/// 存储文档转为模型
pub fn from_document<T: DeserializeOwned>(doc: Document) -> Result<T, StoreError> {
    Ok(serde_json::from_value(JsonValue::Object(doc))?)
}
