//! LLM 服务 - 业务能力层
//!
//! 只负责"调用 LLM"能力，不关心提示词内容和响应格式
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点）

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GenerationError;

/// LLM 调用接口
///
/// 题目生成只依赖此接口，测试时可替换为脚本化的实现
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// 发送一轮对话，返回模型回复文本
    async fn complete(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, GenerationError>;

    /// 模型名称（用于日志和错误信息）
    fn model_name(&self) -> &str;
}

/// LLM 服务
///
/// 职责：
/// - 持有 OpenAI 兼容客户端
/// - 为每次调用加上超时
/// - 不解析响应内容
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let client = Client::with_config(openai_config);

        Self {
            client,
            model_name: config.llm_model_name.clone(),
            timeout: Duration::from_secs(config.llm_timeout_secs),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, GenerationError> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let build_err = |e: async_openai::error::OpenAIError| {
            GenerationError::RequestBuild(e.to_string())
        };

        // 构建消息列表
        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(build_err)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(build_err)?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        // 构建请求
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(build_err)?;

        // 调用 API（带超时）
        let response = tokio::time::timeout(self.timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                warn!("LLM API 调用超时 ({} 秒)", self.timeout.as_secs());
                GenerationError::Timeout {
                    model: self.model_name.clone(),
                    secs: self.timeout.as_secs(),
                }
            })?
            .map_err(|e| {
                warn!("LLM API 调用失败: {}", e);
                GenerationError::ApiCallFailed {
                    model: self.model_name.clone(),
                    message: e.to_string(),
                }
            })?;

        debug!("LLM API 调用成功");

        // 提取响应内容
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GenerationError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl LlmBackend for LlmService {
    async fn complete(
        &self,
        user_message: &str,
        system_message: Option<&str>,
    ) -> Result<String, GenerationError> {
        self.send_to_llm(user_message, system_message).await
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
