//! LLM 响应解析 - 纯函数
//!
//! 把模型返回的自由文本解析为题目记录。整批要么全部合法，要么整体拒绝，
//! 不存在"部分成功"的结果。

use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::OnceLock;

use crate::error::GenerationError;
use crate::models::{normalize_prompt, option_index, Difficulty, Question, OPTION_COUNT};

/// 一次解析的期望条件
#[derive(Debug, Clone)]
pub struct BatchExpectation<'a> {
    pub difficulty: Difficulty,
    pub count: usize,
    /// 已存在的题干，返回的题目不得与之重复
    pub exclude_prompts: &'a [String],
}

#[derive(Debug, Deserialize)]
struct RawBatch {
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(alias = "prompt")]
    question: String,
    options: RawOptions,
    #[serde(alias = "answer", alias = "correct_option")]
    correct_answer: Option<RawAnswer>,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOptions {
    Lettered(BTreeMap<String, String>),
    Listed(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAnswer {
    Index(u64),
    Text(String),
}

/// 单独的选项字母："B"、"(b)"、"B."、"B)"、"Option B"
fn bare_letter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\(?\s*(?:(?i:option)\s+)?([A-Da-d])\s*[\).:]?$")
            .expect("bare letter regex is valid")
    })
}

/// 带选项文本的字母："B. Rome"、"B) Rome"
fn labelled_letter_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\(?([A-Da-d])\s*[\).:]\s+(.+)$").expect("labelled letter regex is valid")
    })
}

/// 从响应中截取最外层 JSON 对象
///
/// 模型经常在 JSON 外面包一层 ```json 代码块或说明文字
pub fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (start < end).then(|| &response[start..=end])
}

/// 解析整批题目
///
/// 任何一道题不合法、数量不符或出现重复题干，整批返回错误
pub fn parse_batch(
    response: &str,
    expect: &BatchExpectation<'_>,
) -> Result<Vec<Question>, GenerationError> {
    let json = extract_json_object(response).ok_or_else(|| {
        GenerationError::MalformedResponse("no JSON object found in response".to_string())
    })?;

    let batch: RawBatch = serde_json::from_str(json)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    if batch.questions.len() != expect.count {
        return Err(GenerationError::CountMismatch {
            expected: expect.count,
            actual: batch.questions.len(),
        });
    }

    let mut seen: HashSet<String> = expect
        .exclude_prompts
        .iter()
        .map(|p| normalize_prompt(p))
        .collect();

    let mut questions = Vec::with_capacity(batch.questions.len());
    for (index, raw) in batch.questions.into_iter().enumerate() {
        let question = validate_question(index + 1, raw, expect.difficulty)?;
        if !seen.insert(normalize_prompt(&question.prompt)) {
            return Err(GenerationError::DuplicatePrompt {
                prompt: question.prompt,
            });
        }
        questions.push(question);
    }

    Ok(questions)
}

fn validate_question(
    index: usize,
    raw: RawQuestion,
    difficulty: Difficulty,
) -> Result<Question, GenerationError> {
    let prompt = raw.question.trim().to_string();
    if prompt.is_empty() {
        return Err(GenerationError::invalid_question(index, "empty question text"));
    }

    let options = normalize_options(index, raw.options)?;

    let answer = raw
        .correct_answer
        .ok_or_else(|| GenerationError::invalid_question(index, "missing correct answer"))?;
    let correct_option_index = resolve_answer(&answer, &options).ok_or_else(|| {
        GenerationError::invalid_question(index, format!("unrecognised correct answer {:?}", answer))
    })?;

    Ok(Question {
        prompt,
        options,
        correct_option_index,
        explanation: raw.explanation.trim().to_string(),
        difficulty,
    })
}

fn normalize_options(
    index: usize,
    raw: RawOptions,
) -> Result<[String; OPTION_COUNT], GenerationError> {
    let ordered: Vec<String> = match raw {
        RawOptions::Lettered(map) => {
            let mut slots: [Option<String>; OPTION_COUNT] = Default::default();
            for (key, text) in map {
                let mut chars = key.trim().chars();
                let slot = match (chars.next(), chars.next()) {
                    (Some(c), None) => option_index(c),
                    _ => None,
                };
                let slot = slot.ok_or_else(|| {
                    GenerationError::invalid_question(index, format!("unexpected option key '{}'", key))
                })?;
                if slots[slot].replace(text).is_some() {
                    return Err(GenerationError::invalid_question(
                        index,
                        format!("option '{}' given twice", key),
                    ));
                }
            }
            slots.into_iter().flatten().collect()
        }
        RawOptions::Listed(list) => list,
    };

    if ordered.len() != OPTION_COUNT {
        return Err(GenerationError::invalid_question(
            index,
            format!("expected {} options, got {}", OPTION_COUNT, ordered.len()),
        ));
    }

    let options: Vec<String> = ordered.into_iter().map(|o| o.trim().to_string()).collect();
    if options.iter().any(|o| o.is_empty()) {
        return Err(GenerationError::invalid_question(index, "empty option text"));
    }
    let distinct: HashSet<&str> = options.iter().map(String::as_str).collect();
    if distinct.len() != OPTION_COUNT {
        return Err(GenerationError::invalid_question(index, "options are not distinct"));
    }

    options.try_into().map_err(|_| {
        GenerationError::invalid_question(index, format!("expected {} options", OPTION_COUNT))
    })
}

/// 正确答案支持：
/// - 单独的字母（"B"、"(b)"、"B."、"Option B"）
/// - 字母加文本（"B. Rome"），文本必须与该字母对应的选项一致
/// - 与某个选项相同的文本（忽略大小写和末尾句号）
/// - 0 起始序号
///
/// 其余形式一律无法识别，不猜测
fn resolve_answer(answer: &RawAnswer, options: &[String; OPTION_COUNT]) -> Option<usize> {
    let text = match answer {
        RawAnswer::Index(i) => {
            let i = usize::try_from(*i).ok()?;
            return (i < OPTION_COUNT).then_some(i);
        }
        RawAnswer::Text(text) => text.trim(),
    };

    if let Some(caps) = bare_letter_regex().captures(text) {
        return caps[1].chars().next().and_then(option_index);
    }

    if let Some(caps) = labelled_letter_regex().captures(text) {
        let index = caps[1].chars().next().and_then(option_index)?;
        return same_option_text(&caps[2], &options[index]).then_some(index);
    }

    options.iter().position(|o| same_option_text(text, o))
}

fn same_option_text(given: &str, option: &str) -> bool {
    let trim = |s: &str| s.trim().trim_end_matches('.').trim().to_lowercase();
    trim(given) == trim(option)
}
