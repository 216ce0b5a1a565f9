use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::models::{Difficulty, MAX_QUESTIONS, MIN_QUESTIONS};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "quiz.toml";

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    /// LLM 调用超时（秒）
    pub llm_timeout_secs: u64,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    /// 嵌入提示词的课件文本上限（字符数）
    pub max_source_chars: usize,
    // --- 测验默认值 ---
    pub default_difficulty: Difficulty,
    pub default_question_count: usize,
    /// 报告输出目录
    pub report_dir: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.0-flash".to_string(),
            llm_timeout_secs: 60,
            llm_temperature: 0.3,
            llm_max_tokens: 8192,
            max_source_chars: 60_000,
            default_difficulty: Difficulty::Medium,
            default_question_count: 10,
            report_dir: PathBuf::from("."),
            verbose_logging: false,
        }
    }
}

/// TOML 配置文件内容，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    llm_api_key: Option<String>,
    llm_api_base_url: Option<String>,
    llm_model_name: Option<String>,
    llm_timeout_secs: Option<u64>,
    llm_temperature: Option<f32>,
    llm_max_tokens: Option<u32>,
    max_source_chars: Option<usize>,
    default_difficulty: Option<Difficulty>,
    default_question_count: Option<usize>,
    report_dir: Option<PathBuf>,
    verbose_logging: Option<bool>,
}

impl Config {
    /// 加载配置：默认值 → 配置文件 → 环境变量
    ///
    /// 配置文件路径取 `QUIZ_CONFIG`，未设置时若当前目录存在 `quiz.toml` 则读取
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let explicit = std::env::var("QUIZ_CONFIG").ok().map(PathBuf::from);
        let path = explicit.or_else(|| {
            let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
            fallback.exists().then_some(fallback)
        });
        if let Some(path) = path {
            config = config.merge_file(&path)?;
        }

        config.apply_env()?;
        Ok(config)
    }

    /// 仅从环境变量加载（忽略配置文件）
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// 合并 TOML 配置文件
    pub fn merge_file(self, path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigError::FileReadFailed {
                path: path.display().to_string(),
                source,
            })?;
        info!("📄 读取配置文件: {}", path.display());
        self.merge_toml(&content, &path.display().to_string())
    }

    fn merge_toml(self, content: &str, origin: &str) -> Result<Self, ConfigError> {
        let file: FileConfig =
            toml::from_str(content).map_err(|source| ConfigError::TomlParseFailed {
                path: origin.to_string(),
                source,
            })?;

        Ok(Self {
            llm_api_key: file.llm_api_key.unwrap_or(self.llm_api_key),
            llm_api_base_url: file.llm_api_base_url.unwrap_or(self.llm_api_base_url),
            llm_model_name: file.llm_model_name.unwrap_or(self.llm_model_name),
            llm_timeout_secs: file.llm_timeout_secs.unwrap_or(self.llm_timeout_secs),
            llm_temperature: file.llm_temperature.unwrap_or(self.llm_temperature),
            llm_max_tokens: file.llm_max_tokens.unwrap_or(self.llm_max_tokens),
            max_source_chars: file.max_source_chars.unwrap_or(self.max_source_chars),
            default_difficulty: file.default_difficulty.unwrap_or(self.default_difficulty),
            default_question_count: file
                .default_question_count
                .unwrap_or(self.default_question_count),
            report_dir: file.report_dir.unwrap_or(self.report_dir),
            verbose_logging: file.verbose_logging.unwrap_or(self.verbose_logging),
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(key) = env_string("LLM_API_KEY").or_else(|| env_string("GOOGLE_API_KEY")) {
            self.llm_api_key = key;
        }
        if let Some(url) = env_string("LLM_API_BASE_URL") {
            self.llm_api_base_url = url;
        }
        if let Some(model) = env_string("LLM_MODEL_NAME") {
            self.llm_model_name = model;
        }
        if let Some(secs) = env_parse("LLM_TIMEOUT_SECS", "u64")? {
            self.llm_timeout_secs = secs;
        }
        if let Some(temperature) = env_parse("LLM_TEMPERATURE", "f32")? {
            self.llm_temperature = temperature;
        }
        if let Some(max_tokens) = env_parse("LLM_MAX_TOKENS", "u32")? {
            self.llm_max_tokens = max_tokens;
        }
        if let Some(chars) = env_parse("MAX_SOURCE_CHARS", "usize")? {
            self.max_source_chars = chars;
        }
        if let Some(difficulty) = env_parse("DEFAULT_DIFFICULTY", "easy, medium or hard")? {
            self.default_difficulty = difficulty;
        }
        if let Some(count) = env_parse("DEFAULT_QUESTION_COUNT", "usize")? {
            self.default_question_count = count;
        }
        if let Some(dir) = env_string("REPORT_DIR") {
            self.report_dir = PathBuf::from(dir);
        }
        if let Some(verbose) = env_parse("VERBOSE_LOGGING", "bool")? {
            self.verbose_logging = verbose;
        }
        debug!("环境变量配置已应用");
        Ok(())
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&self.default_question_count) {
            return Err(ConfigError::InvalidValue {
                key: "default_question_count".to_string(),
                reason: format!(
                    "{} is outside {}-{}",
                    self.default_question_count, MIN_QUESTIONS, MAX_QUESTIONS
                ),
            });
        }
        if self.llm_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "llm_timeout_secs".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(
    var_name: &str,
    expected_type: &str,
) -> Result<Option<T>, ConfigError> {
    match env_string(var_name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_toml_overrides_only_present_keys() {
        let config = Config::default()
            .merge_toml(
                r#"
                llm_model_name = "gemini-1.5-pro"
                default_difficulty = "Hard"
                default_question_count = 5
                "#,
                "inline",
            )
            .unwrap();

        assert_eq!(config.llm_model_name, "gemini-1.5-pro");
        assert_eq!(config.default_difficulty, Difficulty::Hard);
        assert_eq!(config.default_question_count, 5);
        assert_eq!(config.llm_timeout_secs, 60);
    }

    #[test]
    fn test_merge_toml_difficulty_ignores_case() {
        let config = Config::default()
            .merge_toml(r#"default_difficulty = "easy""#, "inline")
            .unwrap();
        assert_eq!(config.default_difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_merge_toml_rejects_invalid_file() {
        let err = Config::default()
            .merge_toml("default_question_count = \"many\"", "inline")
            .unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseFailed { .. }));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));

        config.llm_api_key = "key".to_string();
        assert!(config.validate().is_ok());

        config.default_question_count = 31;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
