//! 测验会话 - 流程层
//!
//! 核心职责：定义"一次测验"的状态机
//!
//! ```text
//! Configuring --start--> InProgress --submit--> Submitted
//!                          |    ^
//!                          +----+ answer / extend
//! ```

use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::{debug, info};

use crate::error::QuizError;
use crate::models::{
    AnswerRecord, Difficulty, Question, QuestionSet, Score, MAX_QUESTIONS, MIN_QUESTIONS,
    OPTION_COUNT,
};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 已上传课件，尚未生成题目
    Configuring,
    /// 作答中
    InProgress,
    /// 已提交，只读
    Submitted,
}

impl SessionState {
    pub fn name(self) -> &'static str {
        match self {
            SessionState::Configuring => "being configured",
            SessionState::InProgress => "in progress",
            SessionState::Submitted => "submitted",
        }
    }
}

impl Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 测验会话
///
/// 独占题目集合和作答记录，不在会话之间共享
#[derive(Debug, Clone)]
pub struct QuizSession {
    source_text: String,
    difficulty: Difficulty,
    question_count: usize,
    questions: QuestionSet,
    answers: BTreeMap<usize, AnswerRecord>,
    state: SessionState,
}

impl QuizSession {
    /// 上传课件后创建会话，进入 Configuring 状态
    ///
    /// 题数校验与 `set_question_count` 相同
    pub fn new(
        source_text: impl Into<String>,
        difficulty: Difficulty,
        question_count: usize,
    ) -> Result<Self, QuizError> {
        check_question_count(question_count)?;
        Ok(Self {
            source_text: source_text.into(),
            difficulty,
            question_count,
            questions: QuestionSet::new(),
            answers: BTreeMap::new(),
            state: SessionState::Configuring,
        })
    }

    // ========== 只读访问 ==========

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started(&self) -> bool {
        self.state != SessionState::Configuring
    }

    pub fn submitted(&self) -> bool {
        self.state == SessionState::Submitted
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    /// 某题的作答记录，未作答返回 None
    pub fn answer_for(&self, question_index: usize) -> Option<usize> {
        self.answers
            .get(&question_index)
            .and_then(|record| record.selected_option_index)
    }

    pub fn answered_count(&self) -> usize {
        self.answers
            .values()
            .filter(|record| record.selected_option_index.is_some())
            .count()
    }

    // ========== 配置 ==========

    pub fn set_difficulty(&mut self, difficulty: Difficulty) -> Result<(), QuizError> {
        self.require(SessionState::Configuring, "change the difficulty")?;
        self.difficulty = difficulty;
        Ok(())
    }

    pub fn set_question_count(&mut self, count: usize) -> Result<(), QuizError> {
        self.require(SessionState::Configuring, "change the question count")?;
        check_question_count(count)?;
        self.question_count = count;
        Ok(())
    }

    // ========== 状态迁移 ==========

    /// 首批题目生成成功后进入作答状态
    pub fn start(&mut self, batch: Vec<Question>) -> Result<(), QuizError> {
        self.require(SessionState::Configuring, "start")?;
        if batch.is_empty() {
            return Err(QuizError::InvalidState {
                operation: "start without questions",
                state: self.state.name(),
            });
        }
        self.questions.try_extend(batch)?;
        self.state = SessionState::InProgress;
        info!("📝 测验开始，共 {} 道题", self.questions.len());
        Ok(())
    }

    /// 作答（覆盖同一题之前的选择）
    pub fn answer(&mut self, question_index: usize, option_index: usize) -> Result<(), QuizError> {
        match self.state {
            SessionState::Submitted => return Err(QuizError::SessionClosed),
            SessionState::Configuring => {
                return Err(QuizError::InvalidState {
                    operation: "answer",
                    state: self.state.name(),
                })
            }
            SessionState::InProgress => {}
        }

        if question_index >= self.questions.len() {
            return Err(QuizError::QuestionOutOfRange {
                index: question_index,
                total: self.questions.len(),
            });
        }
        if option_index >= OPTION_COUNT {
            return Err(QuizError::OptionOutOfRange {
                option: option_index,
            });
        }

        debug!("第 {} 题选择选项 {}", question_index + 1, option_index);
        self.answers.insert(
            question_index,
            AnswerRecord {
                question_index,
                selected_option_index: Some(option_index),
            },
        );
        Ok(())
    }

    /// 追加题目（"再来几道"），已有作答不受影响
    pub fn extend(&mut self, batch: Vec<Question>) -> Result<(), QuizError> {
        self.require(SessionState::InProgress, "add more questions")?;
        let added = batch.len();
        self.questions.try_extend(batch)?;
        info!("➕ 追加 {} 道题，当前共 {} 道", added, self.questions.len());
        Ok(())
    }

    /// 提交，之后会话只读
    pub fn submit(&mut self) -> Result<(), QuizError> {
        self.require(SessionState::InProgress, "submit")?;
        self.state = SessionState::Submitted;
        info!(
            "✅ 测验已提交，已答 {}/{}",
            self.answered_count(),
            self.questions.len()
        );
        Ok(())
    }

    /// 计算成绩，仅在提交后可用；未作答视为错误
    pub fn score(&self) -> Result<Score, QuizError> {
        self.require(SessionState::Submitted, "score")?;
        let marks = self
            .questions
            .iter()
            .enumerate()
            .map(|(i, q)| q.is_correct(self.answer_for(i)))
            .collect();
        Ok(Score::from_marks(marks))
    }

    fn require(&self, expected: SessionState, operation: &'static str) -> Result<(), QuizError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(QuizError::InvalidState {
                operation,
                state: self.state.name(),
            })
        }
    }
}

fn check_question_count(count: usize) -> Result<(), QuizError> {
    if (MIN_QUESTIONS..=MAX_QUESTIONS).contains(&count) {
        Ok(())
    } else {
        Err(QuizError::InvalidQuestionCount {
            count,
            min: MIN_QUESTIONS,
            max: MAX_QUESTIONS,
        })
    }
}
