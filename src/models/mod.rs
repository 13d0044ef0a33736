pub mod draft;
pub mod exam_sheet;
pub mod loaders;
pub mod question;

pub use draft::{CodingDraft, McqDraft, QuestionDraft, TestCaseDraft};
pub use exam_sheet::{ExamSheet, ImportSelection};
pub use loaders::{load_all_exam_sheets, load_exam_sheet};
pub use question::{
    Actor, CanonicalQuestion, CodingPayload, Exam, ExamQuestion, Language, McqPayload, NewExam,
    QuestionKind, QuestionPayload, StarterCode, TestCase,
};
