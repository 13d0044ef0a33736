pub mod bank_mirror;
pub mod duplicate_matcher;
pub mod exam_composer;
pub mod exam_service;
pub mod question_bank;
pub mod text_normalizer;

pub use bank_mirror::{MirrorOutcome, QuestionBankMirror};
pub use duplicate_matcher::DuplicateMatcher;
pub use exam_composer::{ExamComposer, ImportReport, SkipReason, SkippedCandidate};
pub use exam_service::{ExamQuestionSet, ExamService, LinkedRef};
pub use question_bank::{BankEntry, QuestionBank};
pub use text_normalizer::normalize;
