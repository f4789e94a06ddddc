//! Keyword-based categorization used when the model is unavailable.
//!
//! Bullet lines (`*`, `-`, `•`) of the raw notes are sorted into categories by
//! the first keyword class they match. Notes without bullets become a single
//! `other` group holding an excerpt.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::category::{Category, CategoryGroup};

/// Characters of raw text kept when no bullet lines are found.
pub const EXCERPT_CHARS: usize = 500;

const BULLETS: [char; 3] = ['*', '-', '•'];

/// Ordered keyword classes. The first match wins.
static KEYWORDS: LazyLock<Vec<(Category, Regex, &'static [&'static str])>> = LazyLock::new(|| {
    let word = |pattern: &str| {
        Regex::new(&format!(r"(?i)\b(?:{pattern})\b")).unwrap_or_else(|_| never_matches())
    };
    vec![
        (
            Category::Feat,
            word("feat|feats|feature|features|add|adds|added|new"),
            &["新增", "新功能", "支持"][..],
        ),
        (
            Category::Fix,
            word("fix|fixes|fixed|bug|bugs|bugfix|hotfix|resolve|resolves"),
            &["修复", "纠正"][..],
        ),
        (
            Category::Perf,
            word("perf|performance|optimize|optimise|optimized|optimised|faster|speed"),
            &["性能", "优化", "提速"][..],
        ),
        (
            Category::Refactor,
            word("refactor|refactors|refactored|refactoring|cleanup"),
            &["重构"][..],
        ),
        (
            Category::Docs,
            word("doc|docs|documentation|readme"),
            &["文档"][..],
        ),
    ]
});

fn never_matches() -> Regex {
    // An empty character class matches nothing.
    Regex::new(r"[^\s\S]").unwrap_or_else(|_| unreachable!("static pattern"))
}

/// Infers the category of one line of text.
pub fn infer_category(line: &str) -> Category {
    KEYWORDS
        .iter()
        .find(|(_, ascii, cjk)| ascii.is_match(line) || cjk.iter().any(|kw| line.contains(kw)))
        .map(|(category, _, _)| *category)
        .unwrap_or(Category::Other)
}

/// Categorizes raw notes without a model.
///
/// Groups appear in the order their first item appears in `body`.
pub fn fallback_categories(body: &str) -> Vec<CategoryGroup> {
    let mut groups: Vec<CategoryGroup> = Vec::new();

    for line in bullet_lines(body) {
        let category = infer_category(line);
        match groups.iter_mut().find(|g| g.category == category) {
            Some(group) => group.items.push(line.to_string()),
            None => groups.push(CategoryGroup::new(category, vec![line.to_string()])),
        }
    }

    if groups.is_empty() {
        let excerpt: String = body.chars().take(EXCERPT_CHARS).collect();
        return vec![CategoryGroup::new(Category::Other, vec![excerpt])];
    }
    groups
}

/// Non-empty bullet lines with the bullet marker stripped.
fn bullet_lines(body: &str) -> impl Iterator<Item = &str> {
    body.lines()
        .map(str::trim)
        .filter(|line| line.starts_with(BULLETS))
        .map(|line| line.trim_start_matches(BULLETS).trim())
        .filter(|line| !line.is_empty())
}
