#![allow(dead_code)]

use async_trait::async_trait;
use dashmap::DashSet;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;

use exam_question_bank::error::StoreError;
use exam_question_bank::infrastructure::{Document, DocumentStore, Filter, MemoryStore, Projection};
use exam_question_bank::models::{CodingDraft, McqDraft, NewExam, QuestionDraft, TestCaseDraft};
use exam_question_bank::{logger, Actor, Workbench};

/// 可注入故障的存储：对指定集合的指定操作返回 `Unavailable`
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    failing: DashSet<(String, &'static str)>,
    slow: DashSet<(String, &'static str)>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::with_default_indexes(),
            ..Default::default()
        }
    }

    /// 让 `collection` 上的 `operation` 失败
    pub fn fail(&self, collection: &str, operation: &'static str) {
        self.failing.insert((collection.to_string(), operation));
    }

    /// 让 `collection` 上的 `operation` 挂起很久
    pub fn stall(&self, collection: &str, operation: &'static str) {
        self.slow.insert((collection.to_string(), operation));
    }

    pub fn heal(&self) {
        self.failing.clear();
        self.slow.clear();
    }

    async fn check(&self, collection: &str, operation: &'static str) -> Result<(), StoreError> {
        let key = (collection.to_string(), operation);
        if self.slow.contains(&key) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.failing.contains(&key) {
            return Err(StoreError::Unavailable(format!("{} {} 注入故障", operation, collection)));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FaultyStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.check(collection, "find_one").await?;
        self.inner.find_one(collection, filter).await
    }

    async fn find_many(
        &self,
        collection: &str,
        filter: &Filter,
        projection: &Projection,
    ) -> Result<Vec<Document>, StoreError> {
        self.check(collection, "find_many").await?;
        self.inner.find_many(collection, filter, projection).await
    }

    async fn create(&self, collection: &str, record: Document) -> Result<String, StoreError> {
        self.check(collection, "create").await?;
        self.inner.create(collection, record).await
    }

    async fn update_by_id(&self, collection: &str, id: &str, patch: Document) -> Result<(), StoreError> {
        self.check(collection, "update_by_id").await?;
        self.inner.update_by_id(collection, id, patch).await
    }

    async fn append_to_array_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: JsonValue,
    ) -> Result<(), StoreError> {
        self.check(collection, "append_to_array_field").await?;
        self.inner.append_to_array_field(collection, id, field, value).await
    }

    async fn remove_from_array_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: JsonValue,
    ) -> Result<(), StoreError> {
        self.check(collection, "remove_from_array_field").await?;
        self.inner.remove_from_array_field(collection, id, field, value).await
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        self.check(collection, "delete_by_id").await?;
        self.inner.delete_by_id(collection, id).await
    }
}

/// 基于可注入故障存储的工作台
pub fn workbench() -> (Arc<FaultyStore>, Workbench) {
    logger::init();
    let store = Arc::new(FaultyStore::new());
    let workbench = Workbench::new(store.clone());
    (store, workbench)
}

pub fn actor() -> Actor {
    Actor::new("author-1")
}

pub async fn new_exam(workbench: &Workbench, required_mcq: usize, required_coding: usize) -> String {
    workbench
        .create_exam(NewExam {
            id: None,
            name: "期中考试".to_string(),
            required_mcq_count: required_mcq,
            required_coding_count: required_coding,
        })
        .await
        .expect("新建试卷失败")
        .id
}

pub fn mcq(question: &str) -> QuestionDraft {
    McqDraft {
        question: Some(question.to_string()),
        options: Some("3, 4, 5".to_string()),
        correct_answer: Some("4".to_string()),
        marks: None,
        classification: Some("math".to_string()),
        level: Some("easy".to_string()),
    }
    .into()
}

pub fn coding(title: &str, text: &str) -> QuestionDraft {
    CodingDraft {
        title: Some(title.to_string()),
        text: Some(text.to_string()),
        max_marks: Some("10".to_string()),
        classification: Some("basics".to_string()),
        level: Some("easy".to_string()),
        test_cases: vec![TestCaseDraft {
            input: Some("1 2".to_string()),
            expected_output: Some("3".to_string()),
            ..Default::default()
        }],
        ..Default::default()
    }
    .into()
}
