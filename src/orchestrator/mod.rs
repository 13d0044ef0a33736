//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量试卷处理器
//! - 管理应用生命周期（初始化、运行、写回快照）
//! - 批量加载试卷文件（Vec<ExamSheet>）
//! - 控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ### `exam_processor` - 单张试卷处理器
//! - 定位或新建试卷
//! - 逐题录入草稿，按配额导入题库题目
//! - 清理文件
//! - 输出单张试卷的统计信息
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<ExamSheet>)
//!     ↓
//! exam_processor (处理单张试卷)
//!     ↓
//! workflow::Workbench (录题 / 导入入口)
//!     ↓
//! services (能力层：bank / matcher / mirror / composer)
//!     ↓
//! infrastructure (基础设施：DocumentStore / ExamLocks)
//! ```

pub mod batch_processor;
pub mod exam_processor;

// 重新导出主要类型
pub use batch_processor::{App, RunSummary};
pub use exam_processor::{process_exam, ExamStats};
