//! # Exam Question Bank
//!
//! 试卷录题与组卷：共享题库去重，试卷题目按副本保存
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（存储、锁），只暴露能力
//! - `DocumentStore` - 文档存储接口；`MemoryStore` 为内存实现，支持唯一索引和快照
//! - `TimedStore` - 为每次存储调用加超时
//! - `ExamLocks` - 按试卷互斥
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单道题目
//! - `text_normalizer` - 题干归一化
//! - `DuplicateMatcher` - 题库查重
//! - `QuestionBank` - 题库写入（查不到才新建）
//! - `QuestionBankMirror` - 新录入题目同步到题库
//! - `ExamComposer` - 按配额从题库导入试卷
//! - `ExamService` - 试卷及其题目副本的读写
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"录入一道题"的完整流程
//! - `QuestionCtx` - 上下文封装（exam_id + question_index）
//! - `AuthoringFlow` - 校验 → 写入副本 → 关联试卷 → 同步题库
//! - `Workbench` - 装配好的对外入口
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 批量试卷处理器，管理资源和并发
//! - `orchestrator/exam_processor` - 单张试卷处理器，遍历草稿和导入列表
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{DocumentStore, MemoryStore, TimedStore};
pub use models::question::{Actor, QuestionKind};
pub use models::{ExamSheet, QuestionDraft};
pub use orchestrator::{process_exam, App};
pub use services::{ImportReport, MirrorOutcome, SkipReason};
pub use workflow::{AuthoredQuestion, QuestionCtx, Workbench};
