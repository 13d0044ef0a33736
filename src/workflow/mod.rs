pub mod authoring_flow;
pub mod question_ctx;
pub mod workbench;

pub use authoring_flow::{AuthoredQuestion, AuthoringFlow};
pub use question_ctx::QuestionCtx;
pub use workbench::Workbench;
