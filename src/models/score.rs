use serde::{Deserialize, Serialize};

/// 作答记录，未作答时 `selected_option_index` 为 None
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_index: usize,
    pub selected_option_index: Option<usize>,
}

/// 成绩（由会话推导，不单独存储）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub correct_count: usize,
    pub total: usize,
    pub per_question_correct: Vec<bool>,
}

impl Score {
    /// 由逐题对错构造
    pub fn from_marks(per_question_correct: Vec<bool>) -> Self {
        Self {
            correct_count: per_question_correct.iter().filter(|c| **c).count(),
            total: per_question_correct.len(),
            per_question_correct,
        }
    }

    /// 百分制得分，空测验为 0
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct_count as f64 * 100.0 / self.total as f64
        }
    }

    pub fn verdict(&self) -> Verdict {
        Verdict::from_percentage(self.percentage())
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} ({:.1}%)",
            self.correct_count,
            self.total,
            self.percentage()
        )
    }
}

/// 成绩评语
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    /// >= 80%
    Excellent,
    /// >= 60%
    GoodJob,
    KeepPracticing,
}

impl Verdict {
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            Verdict::Excellent
        } else if percentage >= 60.0 {
            Verdict::GoodJob
        } else {
            Verdict::KeepPracticing
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Verdict::Excellent => "Excellent!",
            Verdict::GoodJob => "Good job!",
            Verdict::KeepPracticing => "Keep practicing!",
        }
    }
}
