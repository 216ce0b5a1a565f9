pub mod difficulty;
pub mod question;
pub mod score;

pub use difficulty::Difficulty;
pub use question::{
    normalize_prompt, option_index, option_letter, Question, QuestionSet, MAX_QUESTIONS,
    MIN_QUESTIONS, OPTION_COUNT,
};
pub use score::{AnswerRecord, Score, Verdict};
