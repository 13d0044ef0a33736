//! 题库服务 - 业务能力层
//!
//! 题库是"这道题是否出现过"的唯一依据：只在查不到等价题目时新建

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{BankWriteError, StoreError};
use crate::infrastructure::{collections, DocumentStore, Filter, Projection};
use crate::models::question::{from_document, to_document, CanonicalQuestion, QuestionKind, QuestionPayload};
use crate::services::duplicate_matcher::DuplicateMatcher;
use crate::services::text_normalizer::normalize;
use crate::utils::logging::truncate_text;

/// `ensure_canonical` 的结果
#[derive(Debug, Clone, PartialEq)]
pub struct BankEntry {
    pub question: CanonicalQuestion,
    /// 本次调用是否新建了题库题目
    pub created: bool,
}

/// 题库服务
pub struct QuestionBank {
    store: Arc<dyn DocumentStore>,
    matcher: DuplicateMatcher,
}

impl QuestionBank {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            matcher: DuplicateMatcher::new(store.clone()),
            store,
        }
    }

    /// 确保题库中存在与 `payload` 等价的题目
    ///
    /// 命中则原样返回；否则新建。并发新建时由存储的唯一索引兜底，
    /// 冲突视为"已存在"，读取对方写入的那一条
    pub async fn ensure_canonical(
        &self,
        payload: &QuestionPayload,
        created_by: Option<&str>,
    ) -> Result<BankEntry, BankWriteError> {
        let kind = payload.kind();
        let key = normalize(payload.text());

        if let Some(existing) = self
            .matcher
            .find_by_key(&key, kind)
            .await
            .map_err(|e| BankWriteError::new("find_duplicate", e))?
        {
            debug!("题库已有等价题目: {}", existing.id);
            return Ok(BankEntry {
                question: existing,
                created: false,
            });
        }

        let mut question = CanonicalQuestion {
            id: String::new(),
            payload: payload.clone(),
            normalized_key: (!key.is_empty()).then(|| key.clone()),
            created_by: created_by.map(str::to_string),
            created_at: Utc::now(),
        };
        let record = to_document(&question).map_err(|e| BankWriteError::new("create", e))?;

        match self.store.create(collections::CANONICAL_QUESTIONS, record).await {
            Ok(id) => {
                info!(
                    "✓ 题库新增 {} 题目 {}: {}",
                    kind,
                    id,
                    truncate_text(payload.headline(), 40)
                );
                question.id = id;
                Ok(BankEntry {
                    question,
                    created: true,
                })
            }
            Err(StoreError::Conflict { existing_id, .. }) => {
                debug!("并发写入冲突，改用已存在的题库题目: {}", existing_id);
                let existing = self
                    .get(&existing_id)
                    .await?
                    .ok_or_else(|| {
                        BankWriteError::new(
                            "resolve_conflict",
                            StoreError::Missing {
                                collection: collections::CANONICAL_QUESTIONS.to_string(),
                                id: existing_id.clone(),
                            },
                        )
                    })?;
                Ok(BankEntry {
                    question: existing,
                    created: false,
                })
            }
            Err(e) => Err(BankWriteError::new("create", e)),
        }
    }

    /// 按 ID 读取题库题目
    pub async fn get(&self, id: &str) -> Result<Option<CanonicalQuestion>, BankWriteError> {
        let doc = self
            .store
            .find_one(collections::CANONICAL_QUESTIONS, &Filter::by_id(id))
            .await
            .map_err(|e| BankWriteError::new("get", e))?;
        doc.map(from_document)
            .transpose()
            .map_err(|e| BankWriteError::new("get", e))
    }

    /// 列出某题型的全部题库题目（供导入时挑选）
    pub async fn list(&self, kind: QuestionKind) -> Result<Vec<CanonicalQuestion>, BankWriteError> {
        let docs = self
            .store
            .find_many(
                collections::CANONICAL_QUESTIONS,
                &Filter::new().eq("kind", kind.as_str()),
                &Projection::All,
            )
            .await
            .map_err(|e| BankWriteError::new("list", e))?;
        docs.into_iter()
            .map(from_document)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| BankWriteError::new("list", e))
    }
}
