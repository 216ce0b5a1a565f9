//! # Lecture Quiz
//!
//! 把课件 PDF 变成一套可作答、可评分、可导出报告的选择题测验
//!
//! ## 架构设计
//!
//! ### ① 数据模型（Models）
//! - `models/` - `Difficulty`、`Question`、`QuestionSet`、`Score`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，彼此独立
//! - `text_extractor` - PDF 文本提取
//! - `LlmService` - LLM 调用能力（`LlmBackend` trait 的默认实现）
//! - `QuestionGenerator` + `response_parser` - 出题与响应校验
//! - `report_exporter` - 成绩报告 PDF
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - `QuizSession` 状态机（Configuring → InProgress → Submitted）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/controller` - 动作分发、视图快照、错误转提示
//! - `orchestrator/terminal` - 终端交互
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Difficulty, Question, QuestionSet, Score, Verdict};
pub use orchestrator::{Action, App, Controller, Notice, Response, View};
pub use services::{LlmBackend, LlmService, QuestionGenerator};
pub use workflow::{QuizSession, SessionState};
