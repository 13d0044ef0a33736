//! 单张试卷处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责处理一张试卷文件，是试卷级别的编排器。
//!
//! ## 核心功能
//!
//! 1. **定位试卷**：按 ID 读取已有试卷，不存在时新建
//! 2. **逐题录入**：循环处理选择题和编程题草稿，委托 `Workbench::author`
//! 3. **组卷导入**：按 `[import]` 中的顺序从题库导入
//! 4. **统计输出**：记录录入 / 同步 / 导入数量
//!
//! 试卷文件由批量处理器在快照落盘后通过 [`cleanup_file`] 删除

use crate::config::Config;
use crate::error::{AppError, NotFoundError};
use crate::models::draft::QuestionDraft;
use crate::models::exam_sheet::ExamSheet;
use crate::models::question::{Actor, Exam, NewExam, QuestionKind};
use crate::workflow::{QuestionCtx, Workbench};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{error, info, warn};

/// 单张试卷的处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExamStats {
    /// 录入成功的题目
    pub authored: usize,
    /// 录入失败的题目（校验 / 存储错误）
    pub rejected: usize,
    /// 同步题库失败的题目（已录入）
    pub mirror_failed: usize,
    /// 从题库导入的题目
    pub imported: usize,
    /// 导入时跳过的候选题目
    pub import_skipped: usize,
}

/// 处理单张试卷
///
/// 只有定位 / 新建试卷失败才返回错误；单题失败计入统计
pub async fn process_exam(
    workbench: &Workbench,
    sheet: ExamSheet,
    exam_index: usize,
    config: &Config,
) -> Result<ExamStats> {
    log_exam_start(exam_index, &sheet);

    let actor = Actor::new(
        sheet
            .author
            .clone()
            .unwrap_or_else(|| config.default_actor.clone()),
    );
    let exam = resolve_exam(workbench, &sheet)
        .await
        .with_context(|| format!("无法定位试卷: {}", sheet.name))?;
    info!("[试卷 {}] ID: {}", exam_index, exam.id);

    let mut stats = ExamStats::default();

    let drafts: Vec<QuestionDraft> = sheet
        .mcq
        .iter()
        .cloned()
        .map(QuestionDraft::from)
        .chain(sheet.coding.iter().cloned().map(QuestionDraft::from))
        .collect();

    for (index, draft) in drafts.iter().enumerate() {
        let ctx = QuestionCtx::new(
            exam.id.clone(),
            exam_index,
            index + 1,
            draft.kind(),
            actor.clone(),
        );
        author_one(workbench, draft, &ctx, &mut stats).await;
    }

    for (kind, candidates) in [
        (QuestionKind::Mcq, &sheet.import.mcq),
        (QuestionKind::Coding, &sheet.import.coding),
    ] {
        if candidates.is_empty() {
            continue;
        }
        match workbench
            .import_questions(&exam.id, kind, candidates, &actor)
            .await
        {
            Ok(report) => {
                stats.imported += report.linked.len();
                stats.import_skipped += report.skipped.len();
                for skipped in &report.skipped {
                    info!(
                        "[试卷 {}] 跳过候选题目 {}: {}",
                        exam_index, skipped.id, skipped.reason
                    );
                }
            }
            Err(e) => {
                error!("[试卷 {}] {} 题导入失败: {}", exam_index, kind, e);
                stats.import_skipped += candidates.len();
            }
        }
    }

    log_exam_complete(exam_index, &stats);
    Ok(stats)
}

/// 录入一道题并更新统计
async fn author_one(
    workbench: &Workbench,
    draft: &QuestionDraft,
    ctx: &QuestionCtx,
    stats: &mut ExamStats,
) {
    match workbench.author(&ctx.exam_id, draft, &ctx.actor).await {
        Ok(authored) => {
            stats.authored += 1;
            if !authored.mirror.is_linked() {
                stats.mirror_failed += 1;
                warn!("{} ⚠️ 已录入，但未能同步到题库", ctx);
            }
        }
        Err(e) => {
            stats.rejected += 1;
            error!("{} 录入失败: {}", ctx, e);
        }
    }
}

/// 读取试卷文件指定的试卷；未指定或不存在时新建
async fn resolve_exam(workbench: &Workbench, sheet: &ExamSheet) -> Result<Exam, AppError> {
    if let Some(exam_id) = &sheet.exam_id {
        match workbench.get_exam(exam_id).await {
            Ok(exam) => return Ok(exam),
            Err(AppError::NotFound(NotFoundError::Exam { .. })) => {
                info!("试卷 {} 不存在，将新建", exam_id);
            }
            Err(e) => return Err(e),
        }
    }

    workbench
        .create_exam(NewExam {
            id: sheet.exam_id.clone(),
            name: sheet.name.clone(),
            required_mcq_count: sheet.required_mcq,
            required_coding_count: sheet.required_coding,
        })
        .await
}

/// 清理已处理的文件
///
/// 只能在处理结果写入快照之后调用
pub fn cleanup_file(file_path: &str, exam_index: usize) -> Result<()> {
    info!("[试卷 {}] 🗑️ 清理已处理的文件...", exam_index);
    let path = Path::new(file_path);
    if path.exists() {
        std::fs::remove_file(path).with_context(|| format!("无法删除文件: {}", file_path))?;
        info!(
            "[试卷 {}] ✓ 文件已删除: {}",
            exam_index,
            path.file_name().unwrap_or_default().to_string_lossy()
        );
    } else {
        warn!("[试卷 {}] ⚠️ 文件不存在: {}", exam_index, file_path);
    }
    Ok(())
}

// ========== 日志辅助函数 ==========

fn log_exam_start(exam_index: usize, sheet: &ExamSheet) {
    info!("[试卷 {}] 开始处理", exam_index);
    info!("[试卷 {}] 名称: {}", exam_index, sheet.name);
    info!(
        "[试卷 {}] 待录入: 选择题 {}, 编程题 {}; 待导入: 选择题 {}, 编程题 {}",
        exam_index,
        sheet.mcq.len(),
        sheet.coding.len(),
        sheet.import.mcq.len(),
        sheet.import.coding.len()
    );
}

fn log_exam_complete(exam_index: usize, stats: &ExamStats) {
    info!(
        "[试卷 {}] 录入统计: 成功 {}, 失败 {}, 未同步题库 {}",
        exam_index, stats.authored, stats.rejected, stats.mirror_failed
    );
    info!(
        "[试卷 {}] 导入统计: 关联 {}, 跳过 {}",
        exam_index, stats.imported, stats.import_skipped
    );
    info!("\n[试卷 {}] ✅ 试卷处理完成\n", exam_index);
}
