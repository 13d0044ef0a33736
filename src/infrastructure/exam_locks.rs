//! 试卷级互斥锁 - 基础设施层
//!
//! 同一张试卷的题目列表修改必须串行，不同试卷之间互不阻塞

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// 按试卷 ID 划分的锁表
///
/// 只在当前进程内生效；多进程部署需要由存储层提供版本号校验。
/// 没有持有者也没有等待者的条目在释放时移除
#[derive(Debug, Default)]
pub struct ExamLocks {
    locks: Arc<LockTable>,
}

/// 试卷锁的持有凭证，drop 时释放
#[derive(Debug)]
pub struct ExamGuard {
    exam_id: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockTable>,
}

impl ExamLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指定试卷的锁，持有返回的 guard 期间独占该试卷
    pub async fn lock(&self, exam_id: &str) -> ExamGuard {
        let mutex = self
            .locks
            .entry(exam_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ExamGuard {
            exam_id: exam_id.to_string(),
            guard: Some(mutex.lock_owned().await),
            locks: self.locks.clone(),
        }
    }

    /// 当前登记的试卷数量
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for ExamGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // 新的加锁方只在分片锁内 clone，计数检查与之互斥
        self.locks
            .remove_if(&self.exam_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_exam_is_exclusive() {
        let locks = ExamLocks::new();
        let _guard = locks.lock("exam-1").await;

        let second = tokio::time::timeout(Duration::from_millis(50), locks.lock("exam-1")).await;
        assert!(second.is_err(), "同一试卷不应同时获得两把锁");
    }

    #[tokio::test]
    async fn different_exams_do_not_block() {
        let locks = ExamLocks::new();
        let _guard = locks.lock("exam-1").await;

        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock("exam-2")).await;
        assert!(other.is_ok());
    }

    #[tokio::test]
    async fn released_locks_leave_no_entries() {
        let locks = ExamLocks::new();
        for i in 0..100 {
            let _guard = locks.lock(&format!("exam-{i}")).await;
        }
        assert!(locks.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn entry_survives_while_someone_waits() {
        let locks = Arc::new(ExamLocks::new());
        let guard = locks.lock("exam-1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("exam-1").await;
                tokio::time::sleep(Duration::from_millis(20)).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
