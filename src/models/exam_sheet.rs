use serde::{Deserialize, Serialize};

use crate::models::draft::{CodingDraft, McqDraft};

/// 一张试卷的批处理输入（对应一个 TOML 文件）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExamSheet {
    /// 已存在试卷的 ID；为空时新建试卷
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub required_mcq: usize,
    #[serde(default)]
    pub required_coding: usize,
    /// 录题人；为空时使用配置中的默认操作人
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub mcq: Vec<McqDraft>,
    #[serde(default)]
    pub coding: Vec<CodingDraft>,
    /// 从题库导入的题目
    #[serde(default)]
    pub import: ImportSelection,
    #[serde(skip_serializing, skip_deserializing)]
    pub file_path: Option<String>,
}

/// 按题型列出的待导入题库题目 ID（顺序即导入优先级）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSelection {
    #[serde(default)]
    pub mcq: Vec<String>,
    #[serde(default)]
    pub coding: Vec<String>,
}

impl ExamSheet {
    /// 待录入的题目总数
    pub fn draft_count(&self) -> usize {
        self.mcq.len() + self.coding.len()
    }

    pub fn with_file_path(mut self, file_path: String) -> Self {
        self.file_path = Some(file_path);
        self
    }
}
