pub mod quiz_session;

pub use quiz_session::{QuizSession, SessionState};
