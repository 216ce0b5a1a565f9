use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::QuizError;
use crate::models::Difficulty;

/// 每道题的选项数量
pub const OPTION_COUNT: usize = 4;
/// 单次生成的最少题目数
pub const MIN_QUESTIONS: usize = 1;
/// 单次生成的最多题目数
pub const MAX_QUESTIONS: usize = 30;

/// 选项序号转字母（0 → 'A'）
pub fn option_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// 选项字母转序号（'b' → 1），超出 A-D 返回 None
pub fn option_index(letter: char) -> Option<usize> {
    let upper = letter.to_ascii_uppercase();
    if ('A'..='D').contains(&upper) {
        Some(upper as usize - 'A' as usize)
    } else {
        None
    }
}

/// 题干归一化，用于去重比较
///
/// 去掉首尾空白、合并连续空白并转小写
pub fn normalize_prompt(prompt: &str) -> String {
    prompt
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 单道选择题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: [String; OPTION_COUNT],
    pub correct_option_index: usize,
    pub explanation: String,
    pub difficulty: Difficulty,
}

impl Question {
    /// 正确选项文本
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_option_index]
    }

    /// 判断所选选项是否正确，未作答视为错误
    pub fn is_correct(&self, selected: Option<usize>) -> bool {
        selected == Some(self.correct_option_index)
    }
}

/// 题目集合
///
/// 保持生成顺序，同一会话内题干唯一
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }

    pub fn as_slice(&self) -> &[Question] {
        &self.questions
    }

    /// 全部题干（原文）
    pub fn prompts(&self) -> Vec<String> {
        self.questions.iter().map(|q| q.prompt.clone()).collect()
    }

    /// 是否已包含该题干（按归一化比较）
    pub fn contains_prompt(&self, prompt: &str) -> bool {
        let wanted = normalize_prompt(prompt);
        self.questions
            .iter()
            .any(|q| normalize_prompt(&q.prompt) == wanted)
    }

    /// 追加一批题目
    ///
    /// 只要有一道题与已有题目或批内其他题目重复，整批拒绝，集合保持不变
    pub fn try_extend(&mut self, batch: Vec<Question>) -> Result<(), QuizError> {
        let mut seen: HashSet<String> = self
            .questions
            .iter()
            .map(|q| normalize_prompt(&q.prompt))
            .collect();

        for question in &batch {
            if !seen.insert(normalize_prompt(&question.prompt)) {
                return Err(QuizError::DuplicatePrompt {
                    prompt: question.prompt.clone(),
                });
            }
        }

        self.questions.extend(batch);
        Ok(())
    }
}

impl<'a> IntoIterator for &'a QuestionSet {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.questions.iter()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// 构造测试题目，正确答案为 `correct`
    pub fn question(prompt: &str, correct: usize) -> Question {
        Question {
            prompt: prompt.to_string(),
            options: [
                format!("{} option A", prompt),
                format!("{} option B", prompt),
                format!("{} option C", prompt),
                format!("{} option D", prompt),
            ],
            correct_option_index: correct,
            explanation: format!("Because {} says so.", prompt),
            difficulty: Difficulty::Medium,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::question;
    use super::*;

    #[test]
    fn test_option_letter_roundtrip() {
        assert_eq!(option_letter(0), 'A');
        assert_eq!(option_letter(3), 'D');
        assert_eq!(option_index('c'), Some(2));
        assert_eq!(option_index('E'), None);
    }

    #[test]
    fn test_normalize_prompt() {
        assert_eq!(
            normalize_prompt("  What is   Rust?\n"),
            normalize_prompt("what is rust?")
        );
    }

    #[test]
    fn test_try_extend_rejects_duplicates_atomically() {
        let mut set = QuestionSet::new();
        set.try_extend(vec![question("What is TCP?", 0)]).unwrap();

        let err = set
            .try_extend(vec![question("What is UDP?", 1), question("what is  tcp?", 2)])
            .unwrap_err();
        assert!(matches!(err, QuizError::DuplicatePrompt { .. }));
        assert_eq!(set.len(), 1);
        assert!(!set.contains_prompt("What is UDP?"));
    }

    #[test]
    fn test_try_extend_rejects_duplicates_within_batch() {
        let mut set = QuestionSet::new();
        let err = set
            .try_extend(vec![question("Q1", 0), question("Q1", 1)])
            .unwrap_err();
        assert!(matches!(err, QuizError::DuplicatePrompt { .. }));
        assert!(set.is_empty());
    }

    #[test]
    fn test_is_correct() {
        let q = question("Q", 2);
        assert!(q.is_correct(Some(2)));
        assert!(!q.is_correct(Some(1)));
        assert!(!q.is_correct(None));
        assert_eq!(q.correct_option(), "Q option C");
    }
}
