mod common;

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;

use exam_question_bank::error::{AppError, NotFoundError};
use exam_question_bank::infrastructure::collections;
use exam_question_bank::{QuestionKind, SkipReason, Workbench};
use tokio_test::assert_ok;

use common::{actor, coding, mcq, new_exam, workbench};

/// 向题库录入若干编程题，返回题库 ID
async fn seed_coding(workbench: &Workbench, texts: &[&str]) -> Vec<String> {
    let mut ids = Vec::new();
    for (i, text) in texts.iter().enumerate() {
        let entry = workbench
            .add_to_bank(&coding(&format!("P{}", i + 1), text), &actor())
            .await
            .unwrap();
        ids.push(entry.question.id);
    }
    ids
}

#[tokio::test]
async fn import_stops_at_quota() {
    let (_store, workbench) = workbench();
    let ids = seed_coding(&workbench, &["Reverse a string", "Sum an array", "Find the max"]).await;
    let exam_id = new_exam(&workbench, 0, 2).await;

    let report = workbench
        .import_questions(&exam_id, QuestionKind::Coding, &ids, &actor())
        .await
        .unwrap();

    assert_eq!(report.linked, vec![ids[0].clone(), ids[1].clone()]);
    assert_eq!(report.skip_reason(&ids[2]), Some(&SkipReason::QuotaReached));

    let exam = workbench.get_exam(&exam_id).await.unwrap();
    assert_eq!(exam.coding_questions.len(), 2);

    let set = workbench.list_questions(&exam_id).await.unwrap();
    let sources: Vec<_> = set
        .coding
        .iter()
        .map(|q| q.canonical_id.clone().unwrap())
        .collect();
    assert_eq!(sources, report.linked);
}

#[tokio::test]
async fn already_linked_candidates_are_skipped() {
    let (_store, workbench) = workbench();
    let ids = seed_coding(&workbench, &["Reverse a string", "Sum an array"]).await;
    let exam_id = new_exam(&workbench, 0, 3).await;

    assert_ok!(
        workbench
            .import_questions(&exam_id, QuestionKind::Coding, &ids[..1], &actor())
            .await
    );
    let report = workbench
        .import_questions(&exam_id, QuestionKind::Coding, &ids, &actor())
        .await
        .unwrap();

    assert_eq!(report.linked, vec![ids[1].clone()]);
    assert_eq!(report.skip_reason(&ids[0]), Some(&SkipReason::AlreadyLinked));
}

#[tokio::test]
async fn repeating_an_import_adds_nothing() {
    let (store, workbench) = workbench();
    let ids = seed_coding(&workbench, &["Reverse a string", "Sum an array"]).await;
    let exam_id = new_exam(&workbench, 0, 5).await;

    let first = workbench
        .import_questions(&exam_id, QuestionKind::Coding, &ids, &actor())
        .await
        .unwrap();
    let second = workbench
        .import_questions(&exam_id, QuestionKind::Coding, &ids, &actor())
        .await
        .unwrap();

    assert_eq!(first.linked.len(), 2);
    assert!(second.linked.is_empty());
    assert!(second
        .skipped
        .iter()
        .all(|s| s.reason == SkipReason::AlreadyLinked));
    assert_eq!(store.inner.count(collections::EXAM_QUESTIONS).await, 2);
}

#[tokio::test]
async fn full_exam_imports_nothing() {
    let (store, workbench) = workbench();
    let ids = seed_coding(&workbench, &["Reverse a string"]).await;
    let exam_id = new_exam(&workbench, 0, 1).await;
    workbench
        .author(&exam_id, &coding("Own", "Count the vowels"), &actor())
        .await
        .unwrap();

    let report = workbench
        .import_questions(&exam_id, QuestionKind::Coding, &ids, &actor())
        .await
        .unwrap();

    assert!(report.linked.is_empty());
    assert_eq!(report.skip_reason(&ids[0]), Some(&SkipReason::QuotaReached));
    assert_eq!(store.inner.count(collections::EXAM_QUESTIONS).await, 1);
}

#[tokio::test]
async fn equivalent_text_counts_as_linked() {
    let (store, workbench) = workbench();
    let ids = seed_coding(&workbench, &["Reverse a string"]).await;
    let exam_id = new_exam(&workbench, 0, 3).await;

    // 题库查重失败：副本没有来源，只能靠题干判断
    store.fail(collections::CANONICAL_QUESTIONS, "find_many");
    let authored = workbench
        .author(&exam_id, &coding("Mine", "reverse a STRING!"), &actor())
        .await
        .unwrap();
    assert!(!authored.mirror.is_linked());
    store.heal();

    let report = workbench
        .import_questions(&exam_id, QuestionKind::Coding, &ids, &actor())
        .await
        .unwrap();

    assert!(report.linked.is_empty());
    assert_eq!(report.skip_reason(&ids[0]), Some(&SkipReason::AlreadyLinked));
}

#[tokio::test]
async fn unknown_and_mismatched_candidates_are_skipped() {
    let (_store, workbench) = workbench();
    let coding_ids = seed_coding(&workbench, &["Reverse a string"]).await;
    let mcq_entry = workbench
        .add_to_bank(&mcq("What is 2+2?"), &actor())
        .await
        .unwrap();
    let exam_id = new_exam(&workbench, 0, 2).await;

    let candidates = vec![
        "missing".to_string(),
        mcq_entry.question.id.clone(),
        coding_ids[0].clone(),
    ];
    let report = workbench
        .import_questions(&exam_id, QuestionKind::Coding, &candidates, &actor())
        .await
        .unwrap();

    assert_eq!(report.linked, vec![coding_ids[0].clone()]);
    assert_eq!(report.skip_reason("missing"), Some(&SkipReason::NotFound));
    assert_eq!(
        report.skip_reason(&mcq_entry.question.id),
        Some(&SkipReason::KindMismatch {
            actual: QuestionKind::Mcq
        })
    );
}

#[tokio::test]
async fn storage_failure_only_skips_that_candidate() {
    let (store, workbench) = workbench();
    let ids = seed_coding(&workbench, &["Reverse a string", "Sum an array"]).await;
    let exam_id = new_exam(&workbench, 0, 2).await;

    store.fail(collections::EXAM_QUESTIONS, "create");
    let report = workbench
        .import_questions(&exam_id, QuestionKind::Coding, &ids, &actor())
        .await
        .unwrap();
    assert!(report.linked.is_empty());
    assert!(report
        .skipped
        .iter()
        .all(|s| matches!(s.reason, SkipReason::BankWrite(_))));
    assert!(workbench.get_exam(&exam_id).await.unwrap().coding_questions.is_empty());

    store.heal();
    let retry = workbench
        .import_questions(&exam_id, QuestionKind::Coding, &ids, &actor())
        .await
        .unwrap();
    assert_eq!(retry.linked, ids);
}

#[tokio::test]
async fn unlinked_copy_is_reused() {
    let (store, workbench) = workbench();
    let ids = seed_coding(&workbench, &["Reverse a string"]).await;
    let exam_id = new_exam(&workbench, 0, 1).await;

    // 上一次导入在关联前中断，留下了副本
    let canonical = workbench.bank_question(&ids[0]).await.unwrap().unwrap();
    let orphan = workbench
        .exams()
        .create_question(&exam_id, canonical.payload, Some(ids[0].clone()), Some("author-1"))
        .await
        .unwrap();

    let report = workbench
        .import_questions(&exam_id, QuestionKind::Coding, &ids, &actor())
        .await
        .unwrap();

    assert_eq!(report.linked, ids);
    assert_eq!(store.inner.count(collections::EXAM_QUESTIONS).await, 1);
    let exam = workbench.get_exam(&exam_id).await.unwrap();
    assert_eq!(exam.coding_questions, vec![orphan.id]);
}

#[tokio::test]
async fn unknown_exam_fails_the_import() {
    let (_store, workbench) = workbench();
    let ids = seed_coding(&workbench, &["Reverse a string"]).await;

    let err = workbench
        .import_questions("no-such-exam", QuestionKind::Coding, &ids, &actor())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(NotFoundError::Exam { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_imports_never_exceed_quota() {
    let (_store, workbench) = workbench();
    let texts: Vec<String> = (1..=6).map(|i| format!("Problem number {}", i)).collect();
    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let ids = seed_coding(&workbench, &text_refs).await;
    let exam_id = new_exam(&workbench, 0, 3).await;

    let workbench = Arc::new(workbench);
    let handles = (0..4).map(|shift| {
        let workbench = workbench.clone();
        let exam_id = exam_id.clone();
        let mut candidates = ids.clone();
        candidates.rotate_left(shift);
        tokio::spawn(async move {
            workbench
                .import_questions(&exam_id, QuestionKind::Coding, &candidates, &actor())
                .await
        })
    });
    let reports: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let total_linked: usize = reports.iter().map(|r| r.linked.len()).sum();
    assert_eq!(total_linked, 3);

    let set = workbench.list_questions(&exam_id).await.unwrap();
    assert_eq!(set.coding.len(), 3);
    let sources: HashSet<_> = set.coding.iter().map(|q| q.canonical_id.clone()).collect();
    assert_eq!(sources.len(), 3);
}
