//! 内存文档存储 - 基础设施层
//!
//! 持有所有集合的数据，支持唯一索引和 JSON 快照

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreError;
use crate::infrastructure::document_store::{
    collections, document_id, Document, DocumentStore, Filter, Projection, ID_FIELD,
};

/// 单个集合
#[derive(Debug, Default)]
struct Collection {
    /// 按插入顺序保存
    docs: Vec<Document>,
    /// 唯一索引（每个索引是一组字段）
    unique_indexes: Vec<Vec<String>>,
}

impl Collection {
    fn position(&self, id: &str) -> Option<usize> {
        self.docs.iter().position(|d| document_id(d) == Some(id))
    }

    /// 检查 `candidate` 是否与除 `skip_id` 外的文档违反唯一索引
    ///
    /// 任一索引字段缺失或为 null 的文档不参与索引
    fn conflicting_id(&self, candidate: &Document, skip_id: Option<&str>) -> Option<String> {
        for index in &self.unique_indexes {
            let Some(key) = index_key(index, candidate) else {
                continue;
            };
            let hit = self.docs.iter().find(|doc| {
                document_id(doc) != skip_id.or(document_id(candidate))
                    && index_key(index, doc).as_ref() == Some(&key)
            });
            if let Some(doc) = hit {
                return Some(document_id(doc).unwrap_or_default().to_string());
            }
        }
        None
    }
}

fn index_key(fields: &[String], doc: &Document) -> Option<Vec<JsonValue>> {
    fields
        .iter()
        .map(|f| doc.get(f).filter(|v| !v.is_null()).cloned())
        .collect()
}

/// 内存文档存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建带有题库默认唯一索引（题型 + 归一化文本）的存储
    pub fn with_default_indexes() -> Self {
        Self::new().with_unique_index(collections::CANONICAL_QUESTIONS, &["kind", "normalizedKey"])
    }

    /// 声明唯一索引
    pub fn with_unique_index(mut self, collection: &str, fields: &[&str]) -> Self {
        self.collections
            .get_mut()
            .entry(collection.to_string())
            .or_default()
            .unique_indexes
            .push(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    /// 从快照文件加载；文件不存在时返回空存储
    pub async fn load_snapshot(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self::with_default_indexes();
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await? {
            debug!("快照文件不存在，使用空存储: {}", path.display());
            return Ok(store);
        }

        let content = tokio::fs::read_to_string(path).await?;
        let snapshot: HashMap<String, Vec<Document>> = serde_json::from_str(&content)?;
        {
            let mut map = store.collections.write().await;
            for (name, docs) in snapshot {
                map.entry(name).or_default().docs = docs;
            }
        }
        Ok(store)
    }

    /// 保存快照文件
    pub async fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let snapshot: HashMap<String, Vec<Document>> = {
            let map = self.collections.read().await;
            map.iter()
                .map(|(name, coll)| (name.clone(), coll.docs.clone()))
                .collect()
        };
        let content = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// 集合中的文档数量
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |c| c.docs.len())
    }
}

fn missing(collection: &str, id: &str) -> StoreError {
    StoreError::Missing {
        collection: collection.to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        let map = self.collections.read().await;
        Ok(map
            .get(collection)
            .and_then(|c| c.docs.iter().find(|d| filter.matches(d)).cloned()))
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Vec<Document>, StoreError> {
        let map = self.collections.read().await;
        Ok(map
            .get(collection)
            .map(|c| {
                c.docs
                    .iter()
                    .filter(|d| filter.matches(d))
                    .map(|d| projection.apply(d))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, collection: &str, mut record: Document) -> Result<String, StoreError> {
        let id = match document_id(&record) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        record.insert(ID_FIELD.to_string(), JsonValue::String(id.clone()));

        let mut map = self.collections.write().await;
        let coll = map.entry(collection.to_string()).or_default();

        if coll.position(&id).is_some() {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                existing_id: id,
            });
        }
        if let Some(existing_id) = coll.conflicting_id(&record, None) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                existing_id,
            });
        }

        coll.docs.push(record);
        Ok(id)
    }

    async fn update_by_id(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
        let mut map = self.collections.write().await;
        let coll = map.get_mut(collection).ok_or_else(|| missing(collection, id))?;
        let pos = coll.position(id).ok_or_else(|| missing(collection, id))?;

        let mut updated = coll.docs[pos].clone();
        for (key, value) in patch {
            if key != ID_FIELD {
                updated.insert(key, value);
            }
        }
        if let Some(existing_id) = coll.conflicting_id(&updated, Some(id)) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                existing_id,
            });
        }

        coll.docs[pos] = updated;
        Ok(())
    }

    async fn append_to_array_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: JsonValue,
    ) -> Result<(), StoreError> {
        let mut map = self.collections.write().await;
        let coll = map.get_mut(collection).ok_or_else(|| missing(collection, id))?;
        let pos = coll.position(id).ok_or_else(|| missing(collection, id))?;

        let slot = coll.docs[pos]
            .entry(field.to_string())
            .or_insert_with(|| JsonValue::Array(Vec::new()));
        match slot {
            JsonValue::Array(items) => {
                items.push(value);
                Ok(())
            }
            _ => Err(StoreError::NotAnArray {
                collection: collection.to_string(),
                id: id.to_string(),
                field: field.to_string(),
            }),
        }
    }

    async fn remove_from_array_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: JsonValue,
    ) -> Result<(), StoreError> {
        let mut map = self.collections.write().await;
        let coll = map.get_mut(collection).ok_or_else(|| missing(collection, id))?;
        let pos = coll.position(id).ok_or_else(|| missing(collection, id))?;

        match coll.docs[pos].get_mut(field) {
            Some(JsonValue::Array(items)) => {
                items.retain(|item| item != &value);
                Ok(())
            }
            None => Ok(()),
            Some(_) => Err(StoreError::NotAnArray {
                collection: collection.to_string(),
                id: id.to_string(),
                field: field.to_string(),
            }),
        }
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut map = self.collections.write().await;
        let Some(coll) = map.get_mut(collection) else {
            return Ok(false);
        };
        match coll.position(id) {
            Some(pos) => {
                coll.docs.remove(pos);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
