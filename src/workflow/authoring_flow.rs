//! 录题流程 - 流程层
//!
//! 核心职责：定义"录入一道题"的完整流程
//!
//! 流程顺序：
//! 1. 校验草稿（失败时不产生任何写入）
//! 2. 持有试卷锁：写入试卷题目副本 → 关联到试卷
//! 3. 同步题库（失败不影响录题结果）

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::draft::QuestionDraft;
use crate::models::question::{Actor, ExamQuestion};
use crate::services::{BankEntry, ExamService, MirrorOutcome, QuestionBank, QuestionBankMirror};
use crate::utils::logging::truncate_text;

/// 录题结果：主结果（试卷题目）加题库同步结果
#[derive(Debug, Clone, PartialEq)]
pub struct AuthoredQuestion {
    pub question: ExamQuestion,
    pub mirror: MirrorOutcome,
}

/// 录题流程
///
/// - 试卷题目是主要产出，题库只是次要索引
/// - 不持有存储，只依赖业务能力（services）
pub struct AuthoringFlow {
    exams: Arc<ExamService>,
    bank: Arc<QuestionBank>,
    mirror: QuestionBankMirror,
}

impl AuthoringFlow {
    pub fn new(exams: Arc<ExamService>, bank: Arc<QuestionBank>) -> Self {
        Self {
            mirror: QuestionBankMirror::new(bank.clone(), exams.clone()),
            exams,
            bank,
        }
    }

    /// 向试卷录入一道新题
    pub async fn author(
        &self,
        exam_id: &str,
        draft: &QuestionDraft,
        actor: &Actor,
    ) -> AppResult<AuthoredQuestion> {
        let payload = draft.validate()?;
        let kind = payload.kind();

        let mut question = {
            let _guard = self.exams.locks().lock(exam_id).await;
            self.exams.get_exam(exam_id).await?;

            let question = self
                .exams
                .create_question(exam_id, payload, None, Some(&actor.id))
                .await?;
            if let Err(e) = self.exams.link(exam_id, kind, &question.id).await {
                warn!("⚠️ 关联题目 {} 失败，撤销写入: {}", question.id, e);
                if let Err(cleanup) = self.exams.discard_question(&question.id).await {
                    warn!("⚠️ 撤销题目 {} 失败: {}", question.id, cleanup);
                }
                return Err(e.into());
            }
            question
        };
        info!(
            "[试卷 {}] ✓ 已录入 {} 题 {}: {}",
            exam_id,
            kind,
            question.id,
            truncate_text(question.payload.headline(), 40)
        );

        let mirror = self.mirror.mirror_from_authored(&mut question).await;
        Ok(AuthoredQuestion { question, mirror })
    }

    /// 直接录入题库（题库是主存储，写入失败即失败）
    pub async fn add_to_bank(&self, draft: &QuestionDraft, actor: &Actor) -> AppResult<BankEntry> {
        let payload = draft.validate()?;
        let entry = self.bank.ensure_canonical(&payload, Some(&actor.id)).await?;
        Ok(entry)
    }
}
