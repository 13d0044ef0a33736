//! 工作台 - 流程层
//!
//! 把各项业务能力装配到同一个存储上，对外暴露录题与组卷入口。
//! 入参是普通数据，出参是带类型的结果

use std::sync::Arc;

use crate::error::AppResult;
use crate::infrastructure::{DocumentStore, ExamLocks};
use crate::models::draft::QuestionDraft;
use crate::models::question::{Actor, CanonicalQuestion, Exam, ExamQuestion, NewExam, QuestionKind};
use crate::services::{BankEntry, ExamComposer, ExamQuestionSet, ExamService, ImportReport, QuestionBank};
use crate::workflow::authoring_flow::{AuthoredQuestion, AuthoringFlow};

/// 工作台
pub struct Workbench {
    exams: Arc<ExamService>,
    bank: Arc<QuestionBank>,
    authoring: AuthoringFlow,
    composer: ExamComposer,
}

impl Workbench {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let locks = Arc::new(ExamLocks::new());
        let exams = Arc::new(ExamService::new(store.clone(), locks));
        let bank = Arc::new(QuestionBank::new(store));
        Self {
            authoring: AuthoringFlow::new(exams.clone(), bank.clone()),
            composer: ExamComposer::new(bank.clone(), exams.clone()),
            exams,
            bank,
        }
    }

    pub fn exams(&self) -> &ExamService {
        &self.exams
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    pub async fn create_exam(&self, new_exam: NewExam) -> AppResult<Exam> {
        self.exams.create_exam(new_exam).await
    }

    pub async fn get_exam(&self, exam_id: &str) -> AppResult<Exam> {
        self.exams.get_exam(exam_id).await
    }

    /// 向试卷录入新题，并尽力同步题库
    pub async fn author(
        &self,
        exam_id: &str,
        draft: &QuestionDraft,
        actor: &Actor,
    ) -> AppResult<AuthoredQuestion> {
        self.authoring.author(exam_id, draft, actor).await
    }

    /// 直接向题库录题
    pub async fn add_to_bank(&self, draft: &QuestionDraft, actor: &Actor) -> AppResult<BankEntry> {
        self.authoring.add_to_bank(draft, actor).await
    }

    /// 从题库导入题目到试卷
    pub async fn import_questions(
        &self,
        exam_id: &str,
        kind: QuestionKind,
        candidate_ids: &[String],
        actor: &Actor,
    ) -> AppResult<ImportReport> {
        self.composer
            .import_questions(exam_id, kind, candidate_ids, actor)
            .await
    }

    pub async fn list_questions(&self, exam_id: &str) -> AppResult<ExamQuestionSet> {
        self.exams.list_questions(exam_id).await
    }

    /// 编辑试卷中的题目；只改试卷副本，不回写题库
    pub async fn update_question(
        &self,
        exam_id: &str,
        question_id: &str,
        draft: &QuestionDraft,
    ) -> AppResult<ExamQuestion> {
        let payload = draft.validate()?;
        let _guard = self.exams.locks().lock(exam_id).await;
        self.exams
            .update_question(exam_id, question_id, payload)
            .await
    }

    pub async fn delete_question(&self, exam_id: &str, question_id: &str) -> AppResult<()> {
        self.exams.delete_question(exam_id, question_id).await
    }

    /// 列出题库中某题型的全部题目
    pub async fn bank_questions(&self, kind: QuestionKind) -> AppResult<Vec<CanonicalQuestion>> {
        Ok(self.bank.list(kind).await?)
    }

    pub async fn bank_question(&self, id: &str) -> AppResult<Option<CanonicalQuestion>> {
        Ok(self.bank.get(id).await?)
    }
}
