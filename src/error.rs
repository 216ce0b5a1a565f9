use thiserror::Error;

/// 应用程序错误类型
///
/// 所有错误最终都会在 UI 控制器边界被捕获并渲染为用户提示，不会导致进程崩溃。
#[derive(Debug, Error)]
pub enum AppError {
    /// PDF 文本提取错误
    #[error("{0}")]
    Extraction(#[from] ExtractionError),
    /// 题目生成错误（LLM 调用或响应解析）
    #[error("Error generating questions: {0}")]
    Generation(#[from] GenerationError),
    /// 测验会话状态错误
    #[error("{0}")]
    Quiz(#[from] QuizError),
    /// 报告导出错误
    #[error("Error exporting report: {0}")]
    Report(#[from] ReportError),
    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// 文件读写错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// PDF 文本提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 文件头不是 %PDF
    #[error("The uploaded file is not a PDF document")]
    NotPdf,
    /// PDF 解析失败
    #[error("Error reading PDF: {reason}")]
    Unreadable { reason: String },
    /// 没有可提取的文字（扫描件或纯图片）
    #[error("Could not extract text from the PDF. Please make sure it's not scanned or image-based.")]
    NoText,
}

/// 题目生成错误
#[derive(Debug, Error)]
pub enum GenerationError {
    /// 请求的题目数量超出范围
    #[error("question count {count} is outside the allowed range {min}-{max}")]
    CountOutOfRange { count: usize, min: usize, max: usize },
    /// 构建请求失败
    #[error("failed to build LLM request: {0}")]
    RequestBuild(String),
    /// API 调用失败
    #[error("LLM API call failed (model: {model}): {message}")]
    ApiCallFailed { model: String, message: String },
    /// 调用超时
    #[error("LLM API call timed out after {secs}s (model: {model})")]
    Timeout { model: String, secs: u64 },
    /// 返回内容为空
    #[error("LLM returned empty content (model: {model})")]
    EmptyContent { model: String },
    /// 响应无法解析为 JSON 结构
    #[error("LLM response is not valid question JSON: {0}")]
    MalformedResponse(String),
    /// 单个题目记录不合法
    #[error("question {index} is malformed: {reason}")]
    InvalidQuestion { index: usize, reason: String },
    /// 题目数量与请求不一致
    #[error("expected {expected} questions but the LLM returned {actual}")]
    CountMismatch { expected: usize, actual: usize },
    /// 题目重复
    #[error("duplicate question returned: {prompt}")]
    DuplicatePrompt { prompt: String },
}

/// 测验会话错误
#[derive(Debug, Error)]
pub enum QuizError {
    /// 在错误的会话状态下调用操作
    #[error("cannot {operation} while the quiz is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
    /// 提交后继续作答
    #[error("The quiz has already been submitted; answers can no longer be changed")]
    SessionClosed,
    /// 题目索引越界
    #[error("question {index} does not exist (the quiz has {total} questions)")]
    QuestionOutOfRange { index: usize, total: usize },
    /// 题目数量超出范围
    #[error("question count {count} is outside the allowed range {min}-{max}")]
    InvalidQuestionCount { count: usize, min: usize, max: usize },
    /// 选项索引越界
    #[error("option {option} does not exist (choose A-D)")]
    OptionOutOfRange { option: usize },
    /// 追加的题目与已有题目重复
    #[error("question already exists in this quiz: {prompt}")]
    DuplicatePrompt { prompt: String },
    /// 尚未上传 PDF
    #[error("Upload your lecture slides (PDF format) first")]
    NoSession,
}

/// 报告导出错误
#[derive(Debug, Error)]
pub enum ReportError {
    /// PDF 渲染失败
    #[error("failed to render PDF: {0}")]
    Render(String),
    /// 写入文件失败
    #[error("failed to write report to {path}: {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少 API 密钥
    #[error("no LLM API key configured (set LLM_API_KEY or GOOGLE_API_KEY)")]
    MissingApiKey,
    /// 环境变量解析失败
    #[error("environment variable {var_name} has invalid value '{value}', expected {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值不合法
    #[error("invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
    /// 配置文件读取失败
    #[error("failed to read config file {path}: {source}")]
    FileReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("failed to parse config file {path}: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建状态错误
    pub fn invalid_state(operation: &'static str, state: &'static str) -> Self {
        AppError::Quiz(QuizError::InvalidState { operation, state })
    }

    /// 是否为面向用户的错误（其余为程序错误，仅记录日志）
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, AppError::Quiz(QuizError::InvalidState { .. }))
    }
}

impl GenerationError {
    /// 创建题目记录不合法错误
    pub fn invalid_question(index: usize, reason: impl Into<String>) -> Self {
        GenerationError::InvalidQuestion {
            index,
            reason: reason.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_errors_convert_into_app_error() {
        let err: AppError = QuizError::SessionClosed.into();
        assert!(matches!(err, AppError::Quiz(QuizError::SessionClosed)));
        assert!(err.is_user_facing());

        let err = AppError::invalid_state("score", "in progress");
        assert!(!err.is_user_facing());
        assert_eq!(err.to_string(), "cannot score while the quiz is in progress");
    }

    #[test]
    fn test_generation_error_message_mentions_model() {
        let err: AppError = GenerationError::ApiCallFailed {
            model: "gemini-2.0-flash".to_string(),
            message: "connection refused".to_string(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("gemini-2.0-flash"));
        assert!(msg.contains("connection refused"));
    }
}
