//! 题库镜像 - 业务能力层
//!
//! 新录入的试卷题目写入成功后，尽力同步到题库并回填来源。
//! 同步失败只体现在返回值里，不影响已经写入的试卷题目

use std::sync::Arc;
use tracing::{info, warn};

use crate::models::question::{CanonicalQuestion, ExamQuestion};
use crate::services::exam_service::ExamService;
use crate::services::question_bank::QuestionBank;

/// 镜像结果
#[derive(Debug, Clone, PartialEq)]
pub enum MirrorOutcome {
    /// 已关联到题库题目
    Linked {
        canonical: CanonicalQuestion,
        /// 是否为本次新建
        created: bool,
    },
    /// 同步失败；`canonical_id` 为已确定但回填失败的题库题目
    Failed {
        canonical_id: Option<String>,
        reason: String,
    },
}

impl MirrorOutcome {
    pub fn is_linked(&self) -> bool {
        matches!(self, MirrorOutcome::Linked { .. })
    }

    pub fn canonical_id(&self) -> Option<&str> {
        match self {
            MirrorOutcome::Linked { canonical, .. } => Some(&canonical.id),
            MirrorOutcome::Failed { canonical_id, .. } => canonical_id.as_deref(),
        }
    }
}

/// 题库镜像服务
pub struct QuestionBankMirror {
    bank: Arc<QuestionBank>,
    exams: Arc<ExamService>,
}

impl QuestionBankMirror {
    pub fn new(bank: Arc<QuestionBank>, exams: Arc<ExamService>) -> Self {
        Self { bank, exams }
    }

    /// 把刚录入的试卷题目同步到题库
    ///
    /// 成功时回填 `exam_question.canonical_id`
    pub async fn mirror_from_authored(&self, exam_question: &mut ExamQuestion) -> MirrorOutcome {
        let entry = match self
            .bank
            .ensure_canonical(&exam_question.payload, exam_question.created_by.as_deref())
            .await
        {
            Ok(entry) => entry,
            Err(e) => {
                warn!("⚠️ 题目 {} 同步题库失败: {}", exam_question.id, e);
                return MirrorOutcome::Failed {
                    canonical_id: None,
                    reason: e.to_string(),
                };
            }
        };

        let canonical_id = entry.question.id.clone();
        if let Err(e) = self
            .exams
            .set_canonical_id(&exam_question.id, &canonical_id)
            .await
        {
            warn!(
                "⚠️ 题目 {} 回填题库来源 {} 失败: {}",
                exam_question.id, canonical_id, e
            );
            return MirrorOutcome::Failed {
                canonical_id: Some(canonical_id),
                reason: e.to_string(),
            };
        }

        exam_question.canonical_id = Some(canonical_id.clone());
        if entry.created {
            info!("✓ 题目 {} 已写入题库 {}", exam_question.id, canonical_id);
        } else {
            info!("✓ 题目 {} 关联到已有题库题目 {}", exam_question.id, canonical_id);
        }
        MirrorOutcome::Linked {
            canonical: entry.question,
            created: entry.created,
        }
    }
}
