//! 文档存储接口 - 基础设施层
//!
//! 核心只依赖这一组能力，不关心背后是内存、文件还是数据库

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};

use crate::error::StoreError;

/// 一条文档（JSON 对象）
pub type Document = Map<String, JsonValue>;

/// 文档主键字段
pub const ID_FIELD: &str = "_id";

/// 集合名称
pub mod collections {
    /// 题库（去重后的标准题目）
    pub const CANONICAL_QUESTIONS: &str = "canonical_questions";
    /// 试卷内题目副本
    pub const EXAM_QUESTIONS: &str = "exam_questions";
    /// 试卷
    pub const EXAMS: &str = "exams";
}

/// 单个查询条件
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// 字段等于给定值
    Eq(String, JsonValue),
    /// 字段不存在或为 null
    Missing(String),
}

impl Condition {
    fn matches(&self, doc: &Document) -> bool {
        match self {
            Condition::Eq(field, expected) => doc.get(field) == Some(expected),
            Condition::Missing(field) => doc.get(field).map_or(true, JsonValue::is_null),
        }
    }
}

/// 查询条件（所有条件同时满足）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按主键查询
    pub fn by_id(id: &str) -> Self {
        Self::new().eq(ID_FIELD, id)
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.conditions.push(Condition::Eq(field.into(), value.into()));
        self
    }

    pub fn missing(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(Condition::Missing(field.into()));
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

/// 返回字段投影
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Projection {
    #[default]
    All,
    /// 只返回列出的字段（`_id` 总是保留）
    Fields(Vec<String>),
}

impl Projection {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection::Fields(fields.into_iter().map(Into::into).collect())
    }

    pub fn apply(&self, doc: &Document) -> Document {
        match self {
            Projection::All => doc.clone(),
            Projection::Fields(fields) => doc
                .iter()
                .filter(|(key, _)| key.as_str() == ID_FIELD || fields.iter().any(|f| f == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

/// 文档存储能力
///
/// 职责：
/// - 只提供增删改查与数组字段的原子追加 / 移除
/// - 不认识题目 / 试卷
/// - `find_many` 按插入顺序返回
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError>;

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Vec<Document>, StoreError>;

    /// 写入文档，返回其 ID；文档未带 `_id` 时由存储生成
    async fn create(&self, collection: &str, record: Document) -> Result<String, StoreError>;

    /// 合并更新指定字段
    async fn update_by_id(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError>;

    async fn append_to_array_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: JsonValue,
    ) -> Result<(), StoreError>;

    async fn remove_from_array_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: JsonValue,
    ) -> Result<(), StoreError>;

    /// 删除文档，返回是否确实删除了
    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}

/// 读取文档主键
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(JsonValue::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: JsonValue) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn filter_combines_conditions() {
        let d = doc(json!({"_id": "1", "kind": "mcq", "normalizedKey": null}));

        assert!(Filter::new().eq("kind", "mcq").missing("normalizedKey").matches(&d));
        assert!(!Filter::new().eq("kind", "coding").matches(&d));
        assert!(!Filter::new().missing("kind").matches(&d));
        assert!(Filter::by_id("1").matches(&d));
    }

    #[test]
    fn projection_keeps_id() {
        let d = doc(json!({"_id": "1", "kind": "mcq", "question": "q", "marks": 2}));
        let projected = Projection::fields(["question"]).apply(&d);

        assert_eq!(projected.len(), 2);
        assert_eq!(document_id(&projected), Some("1"));
        assert!(projected.contains_key("question"));
    }
}
