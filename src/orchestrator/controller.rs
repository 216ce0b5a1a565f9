//! UI 控制器 - 编排层
//!
//! ## 职责
//!
//! 把用户动作（上传、配置、开始、作答、提交、追加、下载、重新开始）
//! 分发给各业务能力，并在每个动作之后生成一份只读视图快照。
//!
//! ```text
//! Action → Controller::handle → Response { view, notice } → render
//! ```
//!
//! 所有错误都在 `handle` 中被捕获并转换为提示信息，不会向上传播。

use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, QuizError};
use crate::models::{option_letter, Difficulty, Score, Verdict, MAX_QUESTIONS, MIN_QUESTIONS};
use crate::services::report_exporter::{self, ReportDocument, ReviewItem};
use crate::services::{text_extractor, GenerationRequest, QuestionGenerator};
use crate::utils::truncate_text;
use crate::workflow::{QuizSession, SessionState};

/// 默认报告文件名
pub const REPORT_FILE_NAME: &str = "quiz_results.pdf";

/// 用户动作
#[derive(Debug, Clone)]
pub enum Action {
    /// 上传课件 PDF
    Upload { file_name: String, bytes: Vec<u8> },
    SetDifficulty(Difficulty),
    SetQuestionCount(usize),
    /// 生成题目并开始作答
    Start,
    /// 作答，索引均从 0 开始
    Answer { question: usize, option: usize },
    Submit,
    /// 追加新题目
    AddMore { count: usize },
    /// 下载报告，未指定路径时写入报告目录
    Download { path: Option<PathBuf> },
    /// 丢弃当前会话
    NewQuiz,
    /// 仅重新渲染
    Show,
}

/// 提示信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

/// 作答中的题目视图
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionView {
    pub number: usize,
    pub prompt: String,
    pub options: Vec<(char, String)>,
    pub selected: Option<char>,
}

/// 当前界面快照
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    /// 尚未上传课件
    Welcome {
        difficulty: Difficulty,
        question_count: usize,
    },
    /// 已上传，等待开始
    Configuring {
        file_name: String,
        source_chars: usize,
        difficulty: Difficulty,
        question_count: usize,
    },
    /// 作答中
    InProgress {
        difficulty: Difficulty,
        questions: Vec<QuestionView>,
        answered: usize,
    },
    /// 已提交
    Submitted {
        score: Score,
        verdict: Verdict,
        review: Vec<ReviewItem>,
    },
}

/// 一次动作处理的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub view: View,
    pub notice: Option<Notice>,
}

/// UI 控制器
///
/// 持有当前会话（上传时创建，重新开始时丢弃）和下一次上传使用的难度/题数
pub struct Controller {
    generator: QuestionGenerator,
    report_dir: PathBuf,
    difficulty: Difficulty,
    question_count: usize,
    file_name: String,
    session: Option<QuizSession>,
}

impl Controller {
    pub fn new(generator: QuestionGenerator, config: &Config) -> Self {
        Self {
            generator,
            report_dir: config.report_dir.clone(),
            difficulty: config.default_difficulty,
            question_count: config
                .default_question_count
                .clamp(MIN_QUESTIONS, MAX_QUESTIONS),
            file_name: String::new(),
            session: None,
        }
    }

    pub fn session(&self) -> Option<&QuizSession> {
        self.session.as_ref()
    }

    /// 处理一个动作并返回新的视图快照
    pub async fn handle(&mut self, action: Action) -> Response {
        let notice = match self.dispatch(action).await {
            Ok(notice) => notice,
            Err(e) => {
                if e.is_user_facing() {
                    warn!("⚠️ {}", e);
                } else {
                    error!("❌ 非预期的状态错误: {}", e);
                }
                Some(Notice::Error(e.to_string()))
            }
        };

        Response {
            view: self.view(),
            notice,
        }
    }

    async fn dispatch(&mut self, action: Action) -> AppResult<Option<Notice>> {
        match action {
            Action::Upload { file_name, bytes } => {
                info!("📁 上传文件: {} ({} 字节)", file_name, bytes.len());
                let text = text_extractor::extract(&bytes)?;
                debug!("课件开头: {}", truncate_text(&text, 80));
                self.session = Some(QuizSession::new(text, self.difficulty, self.question_count)?);
                self.file_name = file_name;
                Ok(None)
            }

            Action::SetDifficulty(difficulty) => {
                self.difficulty = difficulty;
                match self.session.as_mut() {
                    Some(session) if !session.started() => {
                        session.set_difficulty(difficulty)?;
                        Ok(None)
                    }
                    Some(_) => Ok(Some(Notice::Info(format!(
                        "Difficulty {} will apply to the next quiz",
                        difficulty
                    )))),
                    None => Ok(None),
                }
            }

            Action::SetQuestionCount(count) => {
                if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&count) {
                    return Err(QuizError::InvalidQuestionCount {
                        count,
                        min: MIN_QUESTIONS,
                        max: MAX_QUESTIONS,
                    }
                    .into());
                }
                self.question_count = count;
                match self.session.as_mut() {
                    Some(session) if !session.started() => {
                        session.set_question_count(count)?;
                        Ok(None)
                    }
                    Some(_) => Ok(Some(Notice::Info(format!(
                        "{} questions will be generated for the next quiz",
                        count
                    )))),
                    None => Ok(None),
                }
            }

            Action::Start => {
                let session = self.session.as_mut().ok_or(QuizError::NoSession)?;
                if session.started() {
                    return Err(AppError::invalid_state("start", session.state().name()));
                }

                let batch = {
                    let request = GenerationRequest {
                        source_text: session.source_text(),
                        difficulty: session.difficulty(),
                        count: session.question_count(),
                        exclude_prompts: &[],
                    };
                    self.generator.generate(&request).await?
                };
                session.start(batch)?;
                Ok(None)
            }

            Action::Answer { question, option } => {
                let session = self.session.as_mut().ok_or(QuizError::NoSession)?;
                session.answer(question, option)?;
                Ok(None)
            }

            Action::Submit => {
                let session = self.session.as_mut().ok_or(QuizError::NoSession)?;
                session.submit()?;
                let score = session.score()?;
                Ok(Some(Notice::Info(format!(
                    "Final Score: {} - {}",
                    score,
                    score.verdict().message()
                ))))
            }

            Action::AddMore { count } => {
                let session = self.session.as_mut().ok_or(QuizError::NoSession)?;
                if session.state() != SessionState::InProgress {
                    return Err(AppError::invalid_state(
                        "add more questions",
                        session.state().name(),
                    ));
                }

                let existing = session.questions().prompts();
                let batch = {
                    let request = GenerationRequest {
                        source_text: session.source_text(),
                        difficulty: session.difficulty(),
                        count,
                        exclude_prompts: &existing,
                    };
                    self.generator.generate(&request).await?
                };
                let added = batch.len();
                session.extend(batch)?;
                Ok(Some(Notice::Info(format!("Added {} new question(s)", added))))
            }

            Action::Download { path } => {
                let session = self.session.as_ref().ok_or(QuizError::NoSession)?;
                let path = path.unwrap_or_else(|| self.report_dir.join(REPORT_FILE_NAME));
                report_exporter::export_to_file(session, &path).await?;
                Ok(Some(Notice::Info(format!(
                    "Report saved to {}",
                    path.display()
                ))))
            }

            Action::NewQuiz => {
                if self.session.take().is_some() {
                    info!("🔄 丢弃当前会话");
                }
                self.file_name.clear();
                Ok(None)
            }

            Action::Show => Ok(None),
        }
    }

    /// 当前界面快照
    pub fn view(&self) -> View {
        let Some(session) = self.session.as_ref() else {
            return View::Welcome {
                difficulty: self.difficulty,
                question_count: self.question_count,
            };
        };

        match session.state() {
            SessionState::Configuring => View::Configuring {
                file_name: self.file_name.clone(),
                source_chars: session.source_text().chars().count(),
                difficulty: session.difficulty(),
                question_count: session.question_count(),
            },
            SessionState::InProgress => View::InProgress {
                difficulty: session.difficulty(),
                questions: session
                    .questions()
                    .iter()
                    .enumerate()
                    .map(|(i, q)| QuestionView {
                        number: i + 1,
                        prompt: q.prompt.clone(),
                        options: q
                            .options
                            .iter()
                            .enumerate()
                            .map(|(j, text)| (option_letter(j), text.clone()))
                            .collect(),
                        selected: session.answer_for(i).map(option_letter),
                    })
                    .collect(),
                answered: session.answered_count(),
            },
            SessionState::Submitted => match ReportDocument::build(session) {
                Ok(report) => View::Submitted {
                    score: report.score,
                    verdict: report.verdict,
                    review: report.items,
                },
                Err(e) => {
                    error!("❌ 无法生成成绩视图: {}", e);
                    View::Welcome {
                        difficulty: self.difficulty,
                        question_count: self.question_count,
                    }
                }
            },
        }
    }
}
