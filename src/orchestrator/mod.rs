//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `controller` - UI 控制器
//! - 接收用户动作（`Action`），调用各业务能力
//! - 持有当前测验会话，生成视图快照（`View`）
//! - 捕获所有错误并转换为提示信息
//!
//! ### `terminal` - 终端前端
//! - 解析命令行输入，渲染视图
//!
//! ## 层次关系
//!
//! ```text
//! App (初始化 + 生命周期)
//!     ↓
//! terminal (输入 / 输出)
//!     ↓
//! controller (处理 Action)
//!     ↓
//! workflow::QuizSession (状态机)
//!     ↓
//! services (能力层：extract / generate / export)
//! ```

pub mod controller;
pub mod terminal;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::Config;
use crate::services::{LlmService, QuestionGenerator};
use crate::utils::logging;

pub use controller::{Action, Controller, Notice, QuestionView, Response, View};

/// 应用主结构
pub struct App {
    controller: Controller,
}

impl App {
    /// 初始化应用：校验配置并创建 LLM 客户端
    pub fn initialize(config: Config) -> Result<Self> {
        config.validate()?;
        logging::log_startup(&config);

        let llm = Arc::new(LlmService::new(&config));
        let generator = QuestionGenerator::new(llm, config.max_source_chars);
        let controller = Controller::new(generator, &config);

        info!("✓ 初始化完成");
        Ok(Self { controller })
    }

    /// 运行交互循环
    pub async fn run(mut self) -> Result<()> {
        terminal::run(&mut self.controller).await
    }
}
