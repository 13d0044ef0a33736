//! 组卷服务 - 业务能力层
//!
//! 把题库题目导入试卷：按调用方给出的顺序逐个处理，
//! 达到该题型的配额即停止，已关联的题目不会重复关联

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::models::question::{Actor, CanonicalQuestion, Exam, QuestionKind};
use crate::services::exam_service::ExamService;
use crate::services::question_bank::QuestionBank;
use crate::services::text_normalizer::normalize;

/// 候选题目被跳过的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 配额已满
    QuotaReached,
    /// 试卷中已有这道题
    AlreadyLinked,
    /// 题库中不存在该 ID
    NotFound,
    /// 题型与本次导入不一致
    KindMismatch { actual: QuestionKind },
    /// 读写题库 / 试卷副本失败，只影响这一题
    BankWrite(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::QuotaReached => write!(f, "quota"),
            SkipReason::AlreadyLinked => write!(f, "already-linked"),
            SkipReason::NotFound => write!(f, "not-found"),
            SkipReason::KindMismatch { actual } => write!(f, "kind-mismatch({})", actual),
            SkipReason::BankWrite(msg) => write!(f, "bank-write: {}", msg),
        }
    }
}

/// 被跳过的候选题目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCandidate {
    pub id: String,
    pub reason: SkipReason,
}

/// 导入结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// 本次关联的题库题目 ID（按导入顺序）
    pub linked: Vec<String>,
    pub skipped: Vec<SkippedCandidate>,
}

impl ImportReport {
    fn skip(&mut self, id: &str, reason: SkipReason) {
        self.skipped.push(SkippedCandidate {
            id: id.to_string(),
            reason,
        });
    }

    /// 某个候选题目被跳过的原因
    pub fn skip_reason(&self, id: &str) -> Option<&SkipReason> {
        self.skipped.iter().find(|s| s.id == id).map(|s| &s.reason)
    }
}

/// 本次导入过程中试卷已包含的题目
struct LinkedIndex {
    canonical_ids: HashSet<String>,
    keys: HashSet<String>,
}

impl LinkedIndex {
    fn contains(&self, canonical: &CanonicalQuestion, key: &str) -> bool {
        self.canonical_ids.contains(&canonical.id) || (!key.is_empty() && self.keys.contains(key))
    }

    fn insert(&mut self, canonical_id: &str, key: String) {
        self.canonical_ids.insert(canonical_id.to_string());
        if !key.is_empty() {
            self.keys.insert(key);
        }
    }
}

/// 组卷服务
pub struct ExamComposer {
    bank: Arc<QuestionBank>,
    exams: Arc<ExamService>,
}

impl ExamComposer {
    pub fn new(bank: Arc<QuestionBank>, exams: Arc<ExamService>) -> Self {
        Self { bank, exams }
    }

    /// 从题库导入题目到试卷
    ///
    /// 整个过程持有试卷锁。配额已满时直接返回，全部候选记为 `QuotaReached`
    pub async fn import_questions(
        &self,
        exam_id: &str,
        kind: QuestionKind,
        candidate_ids: &[String],
        actor: &Actor,
    ) -> AppResult<ImportReport> {
        let _guard = self.exams.locks().lock(exam_id).await;

        let exam = self.exams.get_exam(exam_id).await?;
        let required = exam.required_count(kind);
        let current = exam.linked(kind).len();
        let remaining = required.saturating_sub(current);

        let mut report = ImportReport::default();
        if remaining == 0 {
            info!(
                "[试卷 {}] {} 题已有 {} 道，要求 {} 道，不再导入",
                exam_id, kind, current, required
            );
            for id in candidate_ids {
                report.skip(id, SkipReason::QuotaReached);
            }
            return Ok(report);
        }
        info!(
            "[试卷 {}] 最多还可导入 {} 道 {} 题 (候选 {} 道)",
            exam_id,
            remaining,
            kind,
            candidate_ids.len()
        );

        let mut index = self.linked_index(&exam, kind).await?;
        let mut candidates = candidate_ids.iter();

        while report.linked.len() < remaining {
            let Some(candidate_id) = candidates.next() else {
                break;
            };
            match self
                .import_one(&exam, kind, candidate_id, actor, &mut index)
                .await
            {
                Ok(()) => {
                    report.linked.push(candidate_id.clone());
                    debug!(
                        "[试卷 {}] 已导入 {} ({}/{})",
                        exam_id,
                        candidate_id,
                        report.linked.len(),
                        remaining
                    );
                }
                Err(reason) => {
                    debug!("[试卷 {}] 跳过 {}: {}", exam_id, candidate_id, reason);
                    report.skip(candidate_id, reason);
                }
            }
        }

        for candidate_id in candidates {
            report.skip(candidate_id, SkipReason::QuotaReached);
        }

        info!(
            "[试卷 {}] ✓ 导入完成: 关联 {}, 跳过 {}",
            exam_id,
            report.linked.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    async fn linked_index(&self, exam: &Exam, kind: QuestionKind) -> AppResult<LinkedIndex> {
        let refs = self.exams.linked_refs(exam, kind).await?;
        Ok(LinkedIndex {
            canonical_ids: refs.iter().filter_map(|r| r.canonical_id.clone()).collect(),
            keys: refs
                .iter()
                .map(|r| normalize(&r.text))
                .filter(|k| !k.is_empty())
                .collect(),
        })
    }

    /// 处理单个候选题目；失败只影响这一题
    async fn import_one(
        &self,
        exam: &Exam,
        kind: QuestionKind,
        candidate_id: &str,
        actor: &Actor,
        index: &mut LinkedIndex,
    ) -> Result<(), SkipReason> {
        let canonical = match self.bank.get(candidate_id).await {
            Ok(Some(canonical)) => canonical,
            Ok(None) => return Err(SkipReason::NotFound),
            Err(e) => {
                warn!("⚠️ 读取题库题目 {} 失败: {}", candidate_id, e);
                return Err(SkipReason::BankWrite(e.to_string()));
            }
        };
        if canonical.kind() != kind {
            return Err(SkipReason::KindMismatch {
                actual: canonical.kind(),
            });
        }

        let key = normalize(canonical.payload.text());
        if index.contains(&canonical, &key) {
            return Err(SkipReason::AlreadyLinked);
        }

        let copy = match self.exams.find_unlinked_copy(exam, &canonical.id).await {
            Ok(Some(copy)) => {
                debug!("复用未关联的试卷副本 {}", copy.id);
                copy
            }
            Ok(None) => self
                .exams
                .create_question(
                    &exam.id,
                    canonical.payload.clone(),
                    Some(canonical.id.clone()),
                    Some(&actor.id),
                )
                .await
                .map_err(|e| {
                    warn!("⚠️ 为题库题目 {} 创建试卷副本失败: {}", canonical.id, e);
                    SkipReason::BankWrite(e.to_string())
                })?,
            Err(e) => {
                warn!("⚠️ 查询题库题目 {} 的试卷副本失败: {}", canonical.id, e);
                return Err(SkipReason::BankWrite(e.to_string()));
            }
        };

        self.exams
            .link(&exam.id, kind, &copy.id)
            .await
            .map_err(|e| {
                warn!("⚠️ 关联题目 {} 到试卷 {} 失败: {}", copy.id, exam.id, e);
                SkipReason::BankWrite(e.to_string())
            })?;

        index.insert(&canonical.id, key);
        Ok(())
    }
}
