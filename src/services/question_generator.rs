//! 题目生成服务 - 业务能力层
//!
//! 负责"课件文本 → 一批选择题"：拼提示词、调用 LLM、严格解析

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::GenerationError;
use crate::models::{Difficulty, Question, MAX_QUESTIONS, MIN_QUESTIONS};
use crate::services::llm_service::LlmBackend;
use crate::services::response_parser::{parse_batch, BatchExpectation};
use crate::utils::truncate_text;

const SYSTEM_MESSAGE: &str = "You are an experienced teacher who writes clear, unambiguous \
multiple choice questions from lecture material. You always answer with valid JSON only.";

/// 一次生成请求
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub source_text: &'a str,
    pub difficulty: Difficulty,
    pub count: usize,
    /// 已有题干（"再来几道"时填充）
    pub exclude_prompts: &'a [String],
}

/// 校验题目数量是否在允许范围内
pub fn check_count(count: usize) -> Result<(), GenerationError> {
    if (MIN_QUESTIONS..=MAX_QUESTIONS).contains(&count) {
        Ok(())
    } else {
        Err(GenerationError::CountOutOfRange {
            count,
            min: MIN_QUESTIONS,
            max: MAX_QUESTIONS,
        })
    }
}

/// 题目生成服务
///
/// 职责：
/// - 构建出题提示词
/// - 调用 LLM（通过 `LlmBackend`）
/// - 把响应交给解析器，整批成功或整批失败
pub struct QuestionGenerator {
    backend: Arc<dyn LlmBackend>,
    max_source_chars: usize,
}

impl QuestionGenerator {
    pub fn new(backend: Arc<dyn LlmBackend>, max_source_chars: usize) -> Self {
        Self {
            backend,
            max_source_chars,
        }
    }

    /// 生成一批题目
    ///
    /// 成功时恰好返回 `count` 道题，题干不与 `exclude_prompts` 重复
    pub async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<Vec<Question>, GenerationError> {
        check_count(request.count)?;

        info!(
            "🤖 请求 {} 道 {} 难度题目（排除已有 {} 道）...",
            request.count,
            request.difficulty,
            request.exclude_prompts.len()
        );

        let prompt = self.build_prompt(request);
        let response = self
            .backend
            .complete(&prompt, Some(SYSTEM_MESSAGE))
            .await?;

        debug!("LLM 响应预览: {}", truncate_text(&response, 200));

        let expect = BatchExpectation {
            difficulty: request.difficulty,
            count: request.count,
            exclude_prompts: request.exclude_prompts,
        };
        let questions = parse_batch(&response, &expect).map_err(|e| {
            warn!("LLM 响应解析失败 (模型: {}): {}", self.backend.model_name(), e);
            e
        })?;

        info!("✓ 成功生成 {} 道题目", questions.len());
        Ok(questions)
    }

    /// 构建出题提示词
    pub fn build_prompt(&self, request: &GenerationRequest<'_>) -> String {
        let content = truncate_chars(request.source_text, self.max_source_chars);

        let exclusion = if request.exclude_prompts.is_empty() {
            String::new()
        } else {
            let list: Vec<String> = request
                .exclude_prompts
                .iter()
                .map(|p| format!("- {}", p))
                .collect();
            format!(
                "\nDo NOT repeat or rephrase any of these existing questions:\n{}\n",
                list.join("\n")
            )
        };

        format!(
            r#"Generate exactly {count} multiple choice questions based on the following content.
Difficulty level: {difficulty}
{guidance}

Rules:
1. Each question must have exactly one correct answer
2. Each question must have exactly four distinct options labelled A, B, C and D
3. All options must be relevant to the question
4. Every question must be unique
5. Return ONLY valid JSON format
{exclusion}
Format:
{{
    "questions": [
        {{
            "question": "Question text here?",
            "options": {{
                "A": "First option",
                "B": "Second option",
                "C": "Third option",
                "D": "Fourth option"
            }},
            "correct_answer": "A",
            "explanation": "Brief explanation here"
        }}
    ]
}}

Content:
{content}"#,
            count = request.count,
            difficulty = request.difficulty,
            guidance = request.difficulty.guidance(),
            exclusion = exclusion,
            content = content,
        )
    }
}

/// 按字符截断，不在多字节字符中间切开
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// 按顺序返回预设响应的 LLM，并记录收到的提示词
    pub struct ScriptedLlm {
        responses: Mutex<VecDeque<Result<String, GenerationError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        pub fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedLlm {
        async fn complete(
            &self,
            user_message: &str,
            _system_message: Option<&str>,
        ) -> Result<String, GenerationError> {
            self.prompts.lock().unwrap().push(user_message.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(GenerationError::EmptyContent {
                        model: "scripted".to_string(),
                    })
                })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    /// 生成 `count` 道题的合法 JSON 响应，题干为 `{prefix} {n}`
    pub fn batch_json(prefix: &str, count: usize) -> String {
        let questions: Vec<serde_json::Value> = (1..=count)
            .map(|n| {
                serde_json::json!({
                    "question": format!("{} {}?", prefix, n),
                    "options": {
                        "A": format!("{} {} first", prefix, n),
                        "B": format!("{} {} second", prefix, n),
                        "C": format!("{} {} third", prefix, n),
                        "D": format!("{} {} fourth", prefix, n),
                    },
                    "correct_answer": (["A", "B", "C", "D"][(n - 1) % 4]),
                    "explanation": format!("Explanation {}", n),
                })
            })
            .collect();
        serde_json::json!({ "questions": questions }).to_string()
    }
}
