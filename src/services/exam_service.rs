//! 试卷服务 - 业务能力层
//!
//! 负责试卷聚合及其题目副本的读写。修改题目列表的方法不自行加锁，
//! 调用方必须先持有 `ExamLocks` 中该试卷的锁

use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppError, AppResult, StoreError, ValidationError};
use crate::infrastructure::{collections, Document, DocumentStore, ExamLocks, Filter, Projection};
use crate::models::question::{
    from_document, to_document, Exam, ExamQuestion, NewExam, QuestionKind, QuestionPayload,
};

/// 试卷的题目列表（按关联顺序）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExamQuestionSet {
    pub mcq: Vec<ExamQuestion>,
    pub coding: Vec<ExamQuestion>,
}

/// 已关联题目的去重信息（投影读取）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedRef {
    pub question_id: String,
    pub canonical_id: Option<String>,
    /// 题干原文
    pub text: String,
}

/// 试卷服务
pub struct ExamService {
    store: Arc<dyn DocumentStore>,
    locks: Arc<ExamLocks>,
}

impl ExamService {
    pub fn new(store: Arc<dyn DocumentStore>, locks: Arc<ExamLocks>) -> Self {
        Self { store, locks }
    }

    pub fn locks(&self) -> &ExamLocks {
        &self.locks
    }

    /// 新建试卷
    pub async fn create_exam(&self, new_exam: NewExam) -> AppResult<Exam> {
        let mut exam = Exam {
            id: new_exam.id.unwrap_or_default(),
            name: new_exam.name,
            required_mcq_count: new_exam.required_mcq_count,
            required_coding_count: new_exam.required_coding_count,
            mcq_questions: Vec::new(),
            coding_questions: Vec::new(),
            created_at: Utc::now(),
        };
        exam.id = self.store.create(collections::EXAMS, to_document(&exam)?).await?;
        info!("✓ 新建试卷 {} ({})", exam.name, exam.id);
        Ok(exam)
    }

    /// 读取试卷，不存在时返回 `NotFound`
    pub async fn get_exam(&self, exam_id: &str) -> AppResult<Exam> {
        let doc = self
            .store
            .find_one(collections::EXAMS, &Filter::by_id(exam_id))
            .await?
            .ok_or_else(|| AppError::exam_not_found(exam_id))?;
        Ok(from_document(doc)?)
    }

    /// 读取试卷题目
    pub async fn get_question(&self, question_id: &str) -> AppResult<ExamQuestion> {
        let doc = self
            .store
            .find_one(collections::EXAM_QUESTIONS, &Filter::by_id(question_id))
            .await?
            .ok_or_else(|| AppError::exam_question_not_found(question_id))?;
        Ok(from_document(doc)?)
    }

    /// 列出试卷的全部题目
    ///
    /// 已失效的引用（题目文档已不存在）会被跳过
    pub async fn list_questions(&self, exam_id: &str) -> AppResult<ExamQuestionSet> {
        let exam = self.get_exam(exam_id).await?;
        let docs = self
            .store
            .find_many(
                collections::EXAM_QUESTIONS,
                &Filter::new().eq("examId", exam_id),
                &Projection::All,
            )
            .await?;
        let questions: Vec<ExamQuestion> = docs
            .into_iter()
            .map(from_document)
            .collect::<Result<_, StoreError>>()?;

        let pick = |ids: &[String]| -> Vec<ExamQuestion> {
            ids.iter()
                .filter_map(|id| questions.iter().find(|q| &q.id == id).cloned())
                .collect()
        };
        Ok(ExamQuestionSet {
            mcq: pick(&exam.mcq_questions),
            coding: pick(&exam.coding_questions),
        })
    }

    /// 读取已关联题目的来源与题干（只投影需要的字段）
    pub async fn linked_refs(&self, exam: &Exam, kind: QuestionKind) -> AppResult<Vec<LinkedRef>> {
        let linked = exam.linked(kind);
        if linked.is_empty() {
            return Ok(Vec::new());
        }
        let docs = self
            .store
            .find_many(
                collections::EXAM_QUESTIONS,
                &Filter::new().eq("examId", exam.id.as_str()).eq("kind", kind.as_str()),
                &Projection::fields(["canonicalId", kind.text_field()]),
            )
            .await?;

        Ok(docs
            .iter()
            .filter_map(|doc| {
                let question_id = string_field(doc, "_id")?;
                linked.contains(&question_id).then(|| LinkedRef {
                    question_id,
                    canonical_id: string_field(doc, "canonicalId"),
                    text: string_field(doc, kind.text_field()).unwrap_or_default(),
                })
            })
            .collect())
    }

    /// 写入一条试卷题目副本（不关联到试卷）
    pub async fn create_question(
        &self,
        exam_id: &str,
        payload: QuestionPayload,
        canonical_id: Option<String>,
        created_by: Option<&str>,
    ) -> Result<ExamQuestion, StoreError> {
        let mut question = ExamQuestion {
            id: String::new(),
            exam_id: exam_id.to_string(),
            canonical_id,
            payload,
            created_by: created_by.map(str::to_string),
            created_at: Utc::now(),
        };
        question.id = self
            .store
            .create(collections::EXAM_QUESTIONS, to_document(&question)?)
            .await?;
        Ok(question)
    }

    /// 找到本试卷中来源为 `canonical_id`、但尚未关联的副本
    pub async fn find_unlinked_copy(
        &self,
        exam: &Exam,
        canonical_id: &str,
    ) -> Result<Option<ExamQuestion>, StoreError> {
        let docs = self
            .store
            .find_many(
                collections::EXAM_QUESTIONS,
                &Filter::new()
                    .eq("examId", exam.id.as_str())
                    .eq("canonicalId", canonical_id),
                &Projection::All,
            )
            .await?;
        for doc in docs {
            let question: ExamQuestion = from_document(doc)?;
            if !exam.linked(question.kind()).contains(&question.id) {
                return Ok(Some(question));
            }
        }
        Ok(None)
    }

    /// 把题目关联到试卷（追加到对应题型数组）
    pub async fn link(&self, exam_id: &str, kind: QuestionKind, question_id: &str) -> Result<(), StoreError> {
        self.store
            .append_to_array_field(collections::EXAMS, exam_id, kind.exam_field(), json!(question_id))
            .await
    }

    /// 回填题目副本的题库来源
    pub async fn set_canonical_id(&self, question_id: &str, canonical_id: &str) -> Result<(), StoreError> {
        let mut patch = Document::new();
        patch.insert("canonicalId".into(), json!(canonical_id));
        self.store
            .update_by_id(collections::EXAM_QUESTIONS, question_id, patch)
            .await
    }

    /// 编辑试卷题目副本（不影响题库），题型不可修改
    pub async fn update_question(
        &self,
        exam_id: &str,
        question_id: &str,
        payload: QuestionPayload,
    ) -> AppResult<ExamQuestion> {
        let mut question = self.owned_question(exam_id, question_id).await?;
        if question.kind() != payload.kind() {
            return Err(ValidationError::KindChanged {
                from: question.kind().to_string(),
                to: payload.kind().to_string(),
            }
            .into());
        }

        question.payload = payload;
        let mut patch = to_document(&question.payload)?;
        patch.remove("kind");
        self.store
            .update_by_id(collections::EXAM_QUESTIONS, question_id, patch)
            .await?;
        info!("✓ 已更新试卷 {} 的题目 {}", exam_id, question_id);
        Ok(question)
    }

    /// 删除试卷题目并从试卷中移除引用；题库题目不受影响
    pub async fn delete_question(&self, exam_id: &str, question_id: &str) -> AppResult<()> {
        let _guard = self.locks.lock(exam_id).await;

        let question = self.owned_question(exam_id, question_id).await?;
        self.store
            .remove_from_array_field(
                collections::EXAMS,
                exam_id,
                question.kind().exam_field(),
                JsonValue::String(question_id.to_string()),
            )
            .await?;
        if !self
            .store
            .delete_by_id(collections::EXAM_QUESTIONS, question_id)
            .await?
        {
            warn!("⚠️ 题目 {} 已被并发删除", question_id);
        }
        info!("✓ 已从试卷 {} 删除题目 {}", exam_id, question_id);
        Ok(())
    }

    /// 删除尚未关联到试卷的题目副本（不加锁）
    pub async fn discard_question(&self, question_id: &str) -> Result<bool, StoreError> {
        self.store
            .delete_by_id(collections::EXAM_QUESTIONS, question_id)
            .await
    }

    /// 读取属于该试卷的题目
    async fn owned_question(&self, exam_id: &str, question_id: &str) -> AppResult<ExamQuestion> {
        self.get_exam(exam_id).await?;
        let question = self.get_question(question_id).await?;
        if question.exam_id != exam_id {
            return Err(AppError::exam_question_not_found(question_id));
        }
        Ok(question)
    }
}

fn string_field(doc: &Document, field: &str) -> Option<String> {
    doc.get(field).and_then(JsonValue::as_str).map(str::to_string)
}
