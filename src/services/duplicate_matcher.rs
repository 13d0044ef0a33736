//! 题库查重 - 业务能力层
//!
//! 只负责"题库里是否已有同一道题"，不负责写入

use std::sync::Arc;
use tracing::debug;

use crate::error::StoreError;
use crate::infrastructure::{collections, Document, DocumentStore, Filter, Projection};
use crate::models::question::{from_document, CanonicalQuestion, QuestionKind};
use crate::services::text_normalizer::{normalize, normalize_value};

/// 题库查重服务
///
/// 先按 `normalizedKey` 索引查找；历史数据可能没有该字段，再对这部分逐条归一化比较
pub struct DuplicateMatcher {
    store: Arc<dyn DocumentStore>,
}

impl DuplicateMatcher {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// 查找与候选文本等价的同题型题库题目
    ///
    /// 空文本永远不算重复；多条命中时返回最早创建的一条
    pub async fn find_duplicate(
        &self,
        candidate_text: &str,
        kind: QuestionKind,
    ) -> Result<Option<CanonicalQuestion>, StoreError> {
        let key = normalize(candidate_text);
        if key.is_empty() {
            debug!("候选文本归一化后为空，跳过查重");
            return Ok(None);
        }
        self.find_by_key(&key, kind).await
    }

    /// 按已归一化的键查找
    pub async fn find_by_key(
        &self,
        key: &str,
        kind: QuestionKind,
    ) -> Result<Option<CanonicalQuestion>, StoreError> {
        if key.is_empty() {
            return Ok(None);
        }

        let indexed = self
            .store
            .find_many(
                collections::CANONICAL_QUESTIONS,
                &Filter::new().eq("kind", kind.as_str()).eq("normalizedKey", key),
                &Projection::All,
            )
            .await?;
        if let Some(hit) = earliest(indexed)? {
            debug!("索引命中题库题目: {}", hit.id);
            return Ok(Some(hit));
        }

        let legacy = self
            .store
            .find_many(
                collections::CANONICAL_QUESTIONS,
                &Filter::new().eq("kind", kind.as_str()).missing("normalizedKey"),
                &Projection::All,
            )
            .await?;
        let matched: Vec<Document> = legacy
            .into_iter()
            .filter(|doc| normalize_value(doc.get(kind.text_field())) == key)
            .collect();
        let hit = earliest(matched)?;
        if let Some(hit) = &hit {
            debug!("逐条比较命中题库题目: {}", hit.id);
        }
        Ok(hit)
    }
}

/// 取最早创建的一条；创建时间相同按存储顺序
fn earliest(docs: Vec<Document>) -> Result<Option<CanonicalQuestion>, StoreError> {
    let mut best: Option<CanonicalQuestion> = None;
    for doc in docs {
        let question: CanonicalQuestion = from_document(doc)?;
        match &best {
            Some(current) if current.created_at <= question.created_at => {}
            _ => best = Some(question),
        }
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;
    use crate::models::question::to_document;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn mcq_doc(question: &str, key: Option<&str>, age_secs: i64) -> Document {
        let mut doc = json!({
            "kind": "mcq",
            "question": question,
            "options": ["a", "b"],
            "correctAnswer": "a",
            "marks": 1,
            "classification": "c",
            "level": "l",
            "createdAt": Utc::now() - Duration::seconds(age_secs),
        })
        .as_object()
        .cloned()
        .unwrap();
        if let Some(key) = key {
            doc.insert("normalizedKey".into(), json!(key));
        }
        doc
    }

    #[tokio::test]
    async fn empty_text_is_never_a_duplicate() {
        let store = Arc::new(MemoryStore::new());
        store
            .create(collections::CANONICAL_QUESTIONS, mcq_doc("", None, 0))
            .await
            .unwrap();

        let matcher = DuplicateMatcher::new(store);
        assert!(matcher.find_duplicate("  ?! ", QuestionKind::Mcq).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn finds_legacy_entries_without_key() {
        let store = Arc::new(MemoryStore::new());
        let id = store
            .create(collections::CANONICAL_QUESTIONS, mcq_doc("what is 2+2", None, 0))
            .await
            .unwrap();

        let matcher = DuplicateMatcher::new(store);
        let hit = matcher
            .find_duplicate("  What is 2+2?  ", QuestionKind::Mcq)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.id, id);

        assert!(matcher
            .find_duplicate("What is 2+2?", QuestionKind::Coding)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn earliest_created_wins_on_ties() {
        // 无唯一索引的存储，模拟历史上已经产生的重复
        let store = Arc::new(MemoryStore::new());
        store
            .create(collections::CANONICAL_QUESTIONS, mcq_doc("Same?", Some("same"), 10))
            .await
            .unwrap();
        let oldest = store
            .create(collections::CANONICAL_QUESTIONS, mcq_doc("same", Some("same"), 100))
            .await
            .unwrap();

        let matcher = DuplicateMatcher::new(store);
        let hit = matcher.find_duplicate("SAME", QuestionKind::Mcq).await.unwrap().unwrap();
        assert_eq!(hit.id, oldest);
    }

    #[tokio::test]
    async fn malformed_entry_surfaces_as_error() {
        let store = Arc::new(MemoryStore::new());
        let broken = to_document(&json!({"kind": "mcq", "normalizedKey": "x"})).unwrap();
        store
            .create(collections::CANONICAL_QUESTIONS, broken)
            .await
            .unwrap();

        let matcher = DuplicateMatcher::new(store);
        let err = matcher.find_duplicate("x", QuestionKind::Mcq).await.unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
