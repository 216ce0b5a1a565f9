/// 难度枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub enum Difficulty {
    /// 简单
    Easy,
    /// 中等
    #[default]
    Medium,
    /// 困难
    Hard,
}

impl Difficulty {
    /// 全部难度（按从易到难排列）
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// 给 LLM 的难度说明
    pub fn guidance(self) -> &'static str {
        match self {
            Difficulty::Easy => {
                "Ask about definitions and facts stated directly in the content."
            }
            Difficulty::Medium => {
                "Ask questions that require understanding and relating concepts from the content."
            }
            Difficulty::Hard => {
                "Ask questions that require applying, analysing or comparing ideas from the content, with plausible distractors."
            }
        }
    }

    /// 尝试从字符串解析难度（忽略大小写，支持首字母缩写）
    pub fn find(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "e" => Some(Difficulty::Easy),
            "medium" | "m" => Some(Difficulty::Medium),
            "hard" | "h" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::find(s).ok_or_else(|| format!("unknown difficulty '{}' (use easy, medium or hard)", s))
    }
}

/// 反序列化与 `FromStr` 一致，忽略大小写
impl<'de> serde::Deserialize<'de> for Difficulty {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = <String as serde::Deserialize>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
