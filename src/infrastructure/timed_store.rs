//! 带超时的存储包装 - 基础设施层
//!
//! 每次调用都由调用方限定最长等待时间，超时作为瞬时故障返回

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::StoreError;
use crate::infrastructure::document_store::{Document, DocumentStore, Filter, Projection};

/// 超时包装
pub struct TimedStore {
    inner: Arc<dyn DocumentStore>,
    timeout: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn DocumentStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn guarded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                let millis = self.timeout.as_millis() as u64;
                warn!("⏱️ 存储调用 {} 超时 ({}ms)", operation, millis);
                Err(StoreError::Timeout { operation, millis })
            }
        }
    }
}

#[async_trait]
impl DocumentStore for TimedStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.guarded("find_one", self.inner.find_one(collection, filter)).await
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Vec<Document>, StoreError> {
        self.guarded("find_many", self.inner.find_many(collection, filter, projection))
            .await
    }

    async fn create(&self, collection: &str, record: Document) -> Result<String, StoreError> {
        self.guarded("create", self.inner.create(collection, record)).await
    }

    async fn update_by_id(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
        self.guarded("update_by_id", self.inner.update_by_id(collection, id, patch))
            .await
    }

    async fn append_to_array_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: JsonValue,
    ) -> Result<(), StoreError> {
        self.guarded(
            "append_to_array_field",
            self.inner.append_to_array_field(collection, id, field, value),
        )
        .await
    }

    async fn remove_from_array_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: JsonValue,
    ) -> Result<(), StoreError> {
        self.guarded(
            "remove_from_array_field",
            self.inner.remove_from_array_field(collection, id, field, value),
        )
        .await
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.guarded("delete_by_id", self.inner.delete_by_id(collection, id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;

    /// 每次调用都先睡一会儿的存储
    struct SlowStore {
        delay: Duration,
    }

    #[async_trait]
    impl DocumentStore for SlowStore {
        async fn find_one(&self, _: &str, _: &Filter) -> Result<Option<Document>, StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(None)
        }

        async fn find_many(&self, _: &str, _: &Filter, _: &Projection) -> Result<Vec<Document>, StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(Vec::new())
        }

        async fn create(&self, _: &str, _: Document) -> Result<String, StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok("slow".into())
        }

        async fn update_by_id(&self, _: &str, _: &str, _: Document) -> Result<(), StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }

        async fn append_to_array_field(&self, _: &str, _: &str, _: &str, _: JsonValue) -> Result<(), StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }

        async fn remove_from_array_field(&self, _: &str, _: &str, _: &str, _: JsonValue) -> Result<(), StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(())
        }

        async fn delete_by_id(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            tokio::time::sleep(self.delay).await;
            Ok(false)
        }
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let store = TimedStore::new(
            Arc::new(SlowStore {
                delay: Duration::from_millis(500),
            }),
            Duration::from_millis(20),
        );

        let err = store
            .find_many("canonical_questions", &Filter::new(), &Projection::All)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Timeout { operation: "find_many", .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn fast_call_passes_through() {
        let store = TimedStore::new(Arc::new(MemoryStore::new()), Duration::from_secs(1));
        let id = store.create("exams", Document::new()).await.unwrap();
        assert!(store.find_one("exams", &Filter::by_id(&id)).await.unwrap().is_some());
    }
}
