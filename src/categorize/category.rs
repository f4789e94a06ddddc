//! Change categories and their presentation.

use serde::{Deserialize, Serialize};

/// The kind of change a one-line item describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Feat,
    Fix,
    Perf,
    Refactor,
    Docs,
    /// Breaking changes, deprecations, and anything unrecognized.
    #[serde(other)]
    Other,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Feat,
        Category::Fix,
        Category::Perf,
        Category::Refactor,
        Category::Docs,
        Category::Other,
    ];

    pub fn emoji(&self) -> &'static str {
        match self {
            Category::Feat => "✨",
            Category::Fix => "🐛",
            Category::Perf => "⚡",
            Category::Refactor => "♻️",
            Category::Docs => "📝",
            Category::Other => "📌",
        }
    }

    /// Heading for this category in `lang`. Unknown languages get English.
    pub fn label(&self, lang: &str) -> &'static str {
        match Language::from_name(lang) {
            Language::English => match self {
                Category::Feat => "Features",
                Category::Fix => "Bug Fixes",
                Category::Perf => "Performance",
                Category::Refactor => "Refactoring",
                Category::Docs => "Documentation",
                Category::Other => "Other",
            },
            Language::Chinese => match self {
                Category::Feat => "新功能",
                Category::Fix => "修复",
                Category::Perf => "优化",
                Category::Refactor => "重构",
                Category::Docs => "文档",
                Category::Other => "其他",
            },
            Language::Japanese => match self {
                Category::Feat => "新機能",
                Category::Fix => "修正",
                Category::Perf => "最適化",
                Category::Refactor => "リファクタリング",
                Category::Docs => "ドキュメント",
                Category::Other => "その他",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Language {
    English,
    Chinese,
    Japanese,
}

impl Language {
    fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "chinese" | "zh" | "zh-cn" | "简体中文" | "中文" => Language::Chinese,
            "japanese" | "ja" | "日本語" => Language::Japanese,
            _ => Language::English,
        }
    }
}

/// One category with its one-line items, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryGroup {
    #[serde(rename = "type")]
    pub category: Category,
    pub items: Vec<String>,
}

impl CategoryGroup {
    pub fn new(category: Category, items: Vec<String>) -> Self {
        CategoryGroup { category, items }
    }
}

/// A remote item ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedItem {
    pub identifier: String,
    /// Display timestamp, already in the configured offset.
    pub date: String,
    pub url: String,
    pub categories: Vec<CategoryGroup>,
}
