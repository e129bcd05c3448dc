// ==========================================
// 租赁订单装箱标签系统 - 品类识别器
// ==========================================
// 流程: 名称清洗 -> 箱体关键词 -> 优先级正则 -> general 兜底
// 红线: 纯函数,永不失败,只看文本
// ==========================================

use crate::domain::types::Category;
use regex::Regex;
use std::sync::OnceLock;

/// 箱体关键词（有序,首个命中即返回）
pub const CASE_KEYWORDS: &[&str] = &[
    "case",
    "flight case",
    "road case",
    "rack case",
    "peli",
    "pelican",
    "skb",
    "gator",
    "transport case",
    "trunk",
    "flightcase",
    "hard case",
    "rolling case",
    "utility case",
    "equipment case",
];

/// 名称中的租期噪声: "(M/D/YYYY ... - M/D/YYYY ...)" 与 "(YYYY-MM-DD ... - YYYY-MM-DD ...)"
static NOISE_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

/// 品类正则,按优先级排列
static CATEGORY_RULES: OnceLock<Vec<(Category, Regex)>> = OnceLock::new();

fn noise_patterns() -> &'static Vec<Regex> {
    NOISE_PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"\s*\(\d{1,2}/\d{1,2}/\d{2,4}.*?-.*?\d{1,2}/\d{1,2}/\d{2,4}.*?\)\s*")
                .expect("Invalid slash date range pattern"),
            Regex::new(r"\s*\(\d{4}-\d{2}-\d{2}.*?-.*?\d{4}-\d{2}-\d{2}.*?\)\s*")
                .expect("Invalid ISO date range pattern"),
        ]
    })
}

fn category_rules() -> &'static Vec<(Category, Regex)> {
    CATEGORY_RULES.get_or_init(|| {
        vec![
            (
                Category::Cable,
                Regex::new(r"(?i)\b(cable|xlr|dmx|sdi|hdmi|powercon|cat[56])\b")
                    .expect("Invalid cable pattern"),
            ),
            (
                Category::Audio,
                Regex::new(
                    r"(?i)\b(speaker|sub|amp|mixer|mic|monitor|iem|earphone|headphone|di box)\b",
                )
                .expect("Invalid audio pattern"),
            ),
            (
                Category::Lighting,
                Regex::new(r"(?i)\b(light|wash|spot|beam|par|strobe|hazer|haze|fog|dmx)\b")
                    .expect("Invalid lighting pattern"),
            ),
            (
                Category::Video,
                Regex::new(r"(?i)\b(projector|screen|camera|lens|tripod|switcher|recorder)\b")
                    .expect("Invalid video pattern"),
            ),
            (
                Category::Rigging,
                Regex::new(r"(?i)\b(clamp|coupler|truss|stand|rigging|safety|sling)\b")
                    .expect("Invalid rigging pattern"),
            ),
        ]
    })
}

/// 识别结果: 清洗后的名称 + 品类
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedName {
    pub name: String,
    pub category: Category,
}

// ==========================================
// CategoryClassifier - 品类识别器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct CategoryClassifier {
    // 追加在固定关键词之后（小写）
    extra_case_keywords: Vec<String>,
}

impl CategoryClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加自定义箱体关键词（来自配置）
    pub fn with_extra_case_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra_case_keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { extra_case_keywords }
    }

    /// 删除名称中的租期括号,只去掉首尾空白（中间空白原样保留）
    pub fn clean_name(&self, raw_name: &str) -> String {
        let mut cleaned = raw_name.to_string();
        for pattern in noise_patterns() {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }
        cleaned.trim().to_string()
    }

    /// 识别品类（先清洗再匹配）
    pub fn classify(&self, raw_name: &str) -> Category {
        self.match_category(&self.clean_name(raw_name))
    }

    /// 同时返回清洗后的名称与品类
    pub fn classify_item(&self, raw_name: &str) -> ClassifiedName {
        let name = self.clean_name(raw_name);
        let category = self.match_category(&name);
        ClassifiedName { name, category }
    }

    fn match_category(&self, name: &str) -> Category {
        let lower = name.to_lowercase();

        // 1) 箱体关键词短路
        let is_case = CASE_KEYWORDS
            .iter()
            .copied()
            .chain(self.extra_case_keywords.iter().map(String::as_str))
            .any(|keyword| lower.contains(keyword));
        if is_case {
            return Category::Case;
        }

        // 2) 优先级正则
        category_rules()
            .iter()
            .find(|(_, pattern)| pattern.is_match(name))
            .map(|(category, _)| *category)
            .unwrap_or(Category::General)
    }
}
