//! 批量试卷处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量试卷的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：初始化日志文件、加载存储快照、装配工作台
//! 2. **批量加载**：扫描并加载所有待处理的试卷（`Vec<ExamSheet>`）
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：将试卷分批次处理，每批完成后再开始下一批
//! 5. **资源管理**：持有存储，每批完成后写回快照，快照落盘后才删除该批试卷文件
//! 6. **全局统计**：汇总所有试卷的处理结果
//!
//! ## 设计特点
//!
//! - **顶层编排**：不处理单张试卷的细节
//! - **资源所有者**：唯一持有 `MemoryStore` 的模块
//! - **向下委托**：委托 exam_processor 处理单张试卷

use crate::config::Config;
use crate::error::AppError;
use crate::infrastructure::{DocumentStore, MemoryStore, TimedStore};
use crate::models::exam_sheet::ExamSheet;
use crate::orchestrator::exam_processor::{self, ExamStats};
use crate::utils::logging::{
    init_log_file, log_batch_complete, log_batch_start, log_exams_loaded, log_startup,
    print_final_stats,
};
use crate::workflow::Workbench;
use anyhow::{Context, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// 应用主结构
pub struct App {
    config: Config,
    store: Arc<MemoryStore>,
    workbench: Arc<Workbench>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate().map_err(AppError::from)?;

        init_log_file(&config.output_log_file)?;

        log_startup(config.max_concurrent_exams, &config.snapshot_path);

        let store = Arc::new(
            MemoryStore::load_snapshot(&config.snapshot_path)
                .await
                .with_context(|| format!("无法加载存储快照: {}", config.snapshot_path))?,
        );
        let timed: Arc<dyn DocumentStore> =
            Arc::new(TimedStore::new(store.clone(), config.store_timeout()));
        let workbench = Arc::new(Workbench::new(timed));

        Ok(Self {
            config,
            store,
            workbench,
        })
    }

    pub fn workbench(&self) -> &Workbench {
        &self.workbench
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<RunSummary> {
        let all_sheets = self.load_sheets().await?;

        if all_sheets.is_empty() {
            warn!("⚠️ 没有找到待处理的TOML文件，程序结束");
            return Ok(RunSummary::default());
        }

        log_exams_loaded(all_sheets.len(), self.config.max_concurrent_exams);

        let summary = self.process_all_exams(all_sheets).await?;

        print_final_stats(
            summary.success,
            summary.failed,
            summary.total,
            &self.config.output_log_file,
        );
        info!(
            "📝 录入 {} 道 (失败 {}, 未同步题库 {}), 导入 {} 道 (跳过 {})",
            summary.questions.authored,
            summary.questions.rejected,
            summary.questions.mirror_failed,
            summary.questions.imported,
            summary.questions.import_skipped
        );

        Ok(summary)
    }

    /// 加载试卷
    async fn load_sheets(&self) -> Result<Vec<ExamSheet>> {
        info!("\n📁 正在扫描待处理的试卷...");
        crate::models::load_all_exam_sheets(&self.config.exam_folder).await
    }

    /// 处理所有试卷
    async fn process_all_exams(&self, all_sheets: Vec<ExamSheet>) -> Result<RunSummary> {
        let max_concurrent = self.config.max_concurrent_exams.max(1);
        let semaphore = Arc::new(Semaphore::new(max_concurrent));
        let total = all_sheets.len();
        let total_batches = total.div_ceil(max_concurrent);
        let mut summary = RunSummary {
            total,
            ..Default::default()
        };

        for (batch_idx, batch) in all_sheets.chunks(max_concurrent).enumerate() {
            let batch_start = batch_idx * max_concurrent;
            let batch_num = batch_idx + 1;

            log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            let batch_result = self
                .process_batch(batch, batch_start, semaphore.clone())
                .await?;

            summary.success += batch_result.success;
            summary.failed += batch_result.failed;
            summary.questions.merge(&batch_result.questions);

            self.save_snapshot().await?;
            cleanup_processed(&batch_result.processed_files);

            log_batch_complete(batch_num, batch_result.success, batch.len());
        }

        Ok(summary)
    }

    /// 写回存储快照
    async fn save_snapshot(&self) -> Result<()> {
        self.store
            .save_snapshot(&self.config.snapshot_path)
            .await
            .with_context(|| format!("无法保存存储快照: {}", self.config.snapshot_path))?;
        info!("💾 存储快照已保存: {}", self.config.snapshot_path);
        Ok(())
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch: &[ExamSheet],
        batch_start: usize,
        semaphore: Arc<Semaphore>,
    ) -> Result<BatchResult> {
        let mut handles = Vec::with_capacity(batch.len());

        for (idx, sheet) in batch.iter().enumerate() {
            let exam_index = batch_start + idx + 1;
            let permit = semaphore.clone().acquire_owned().await?;
            let workbench = self.workbench.clone();
            let config = self.config.clone();
            let sheet = sheet.clone();

            let file_path = sheet.file_path.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                exam_processor::process_exam(&workbench, sheet, exam_index, &config).await
            });
            handles.push((exam_index, file_path, handle));
        }

        let (meta, tasks): (Vec<_>, Vec<_>) = handles
            .into_iter()
            .map(|(index, file_path, handle)| ((index, file_path), handle))
            .unzip();
        let outcomes = join_all(tasks).await;

        let mut result = BatchResult::default();
        for ((exam_index, file_path), outcome) in meta.into_iter().zip(outcomes) {
            match outcome {
                Ok(Ok(stats)) => {
                    result.success += 1;
                    result.questions.merge(&stats);
                    if let Some(file_path) = file_path {
                        result.processed_files.push((exam_index, file_path));
                    }
                }
                Ok(Err(e)) => {
                    error!("[试卷 {}] ❌ 处理过程中发生错误: {:#}", exam_index, e);
                    result.failed += 1;
                }
                Err(e) => {
                    error!("[试卷 {}] 任务执行失败: {}", exam_index, e);
                    result.failed += 1;
                }
            }
        }

        Ok(result)
    }
}

/// 一次运行的汇总
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub success: usize,
    pub failed: usize,
    pub total: usize,
    /// 全部试卷的题目统计之和
    pub questions: ExamStats,
}

/// 批次处理结果
#[derive(Debug, Default)]
struct BatchResult {
    success: usize,
    failed: usize,
    questions: ExamStats,
    /// 处理成功的试卷文件 (试卷序号, 路径)
    processed_files: Vec<(usize, String)>,
}

/// 删除已落盘试卷的源文件；删除失败只记录日志
fn cleanup_processed(files: &[(usize, String)]) {
    for (exam_index, file_path) in files {
        if let Err(e) = exam_processor::cleanup_file(file_path, *exam_index) {
            error!("[试卷 {}] {:#}", exam_index, e);
        }
    }
}

impl ExamStats {
    fn merge(&mut self, other: &ExamStats) {
        self.authored += other.authored;
        self.rejected += other.rejected;
        self.mirror_failed += other.mirror_failed;
        self.imported += other.imported;
        self.import_skipped += other.import_skipped;
    }
}
