//! 录题上下文
//!
//! 封装"我正在处理哪张试卷的第几题"这一信息

use std::fmt::Display;

use crate::models::question::{Actor, QuestionKind};

/// 录题上下文
#[derive(Debug, Clone)]
pub struct QuestionCtx {
    /// 试卷ID
    pub exam_id: String,

    /// 试卷索引（仅用于日志显示）
    pub exam_index: usize,

    /// 题目在本批次中的索引（从1开始）
    pub question_index: usize,

    pub kind: QuestionKind,

    /// 录题人
    pub actor: Actor,
}

impl QuestionCtx {
    pub fn new(
        exam_id: String,
        exam_index: usize,
        question_index: usize,
        kind: QuestionKind,
        actor: Actor,
    ) -> Self {
        Self {
            exam_id,
            exam_index,
            question_index,
            kind,
            actor,
        }
    }
}

impl Display for QuestionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[试卷 ID#{} 题目#{} 题型#{}]",
            self.exam_id, self.question_index, self.kind
        )
    }
}
