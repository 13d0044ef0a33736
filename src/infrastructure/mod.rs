//! 基础设施层（Infrastructure）
//!
//! 持有稀缺资源（存储、锁），只暴露能力，不认识题目流程

pub mod document_store;
pub mod exam_locks;
pub mod memory_store;
pub mod timed_store;

pub use document_store::{collections, Document, DocumentStore, Filter, Projection};
pub use exam_locks::{ExamGuard, ExamLocks};
pub use memory_store::MemoryStore;
pub use timed_store::TimedStore;
