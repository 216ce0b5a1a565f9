pub mod llm_service;
pub mod question_generator;
pub mod report_exporter;
pub mod response_parser;
pub mod text_extractor;

pub use llm_service::{LlmBackend, LlmService};
pub use question_generator::{GenerationRequest, QuestionGenerator};
pub use report_exporter::{ReportDocument, ReviewItem, ReviewOption};
pub use response_parser::{parse_batch, BatchExpectation};
