//! Rendering categorized items into Telegram HTML payloads.

use crate::categorize::CategorizedItem;

/// Telegram's message length ceiling, in UTF-16 code units.
pub const TELEGRAM_MAX_LENGTH: usize = 4096;

const ITEM_SEPARATOR: &str = "┄┄┄┄┄┄┄┄┄┄┄┄┄┄┄";

/// Escapes text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Length as Telegram counts it: characters outside the Basic Multilingual
/// Plane (most emoji) count twice.
pub fn telegram_len(text: &str) -> usize {
    text.encode_utf16().count()
}

fn header(repo: &str) -> String {
    format!("<b>{}</b>", escape_html(repo))
}

/// Renders one item: a date and link line, then each category with its bullets.
pub fn format_item(item: &CategorizedItem, lang: &str) -> String {
    let mut lines = vec![format!(
        "{}  <a href=\"{}\">{}</a>",
        item.date,
        escape_html(&item.url),
        escape_html(&item.identifier)
    )];

    for group in &item.categories {
        lines.push(String::new());
        lines.push(format!(
            "{} <b>{}</b>",
            group.category.emoji(),
            group.category.label(lang)
        ));
        lines.extend(group.items.iter().map(|i| format!("• {}", escape_html(i))));
    }

    lines.join("\n")
}

/// Renders all items under one repository header.
pub fn format_message(repo: &str, items: &[CategorizedItem], lang: &str) -> String {
    let mut parts = vec![header(repo)];
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            parts.push(format!("\n{ITEM_SEPARATOR}"));
        }
        parts.push(String::new());
        parts.push(format_item(item, lang));
    }
    parts.join("\n")
}

/// Splits a notification into payloads within [`TELEGRAM_MAX_LENGTH`].
///
/// Everything goes in one payload when it fits. Otherwise each item gets its
/// own payload under the repository header, truncated if it alone is too long.
pub fn split_messages(repo: &str, items: &[CategorizedItem], lang: &str) -> Vec<String> {
    let full = format_message(repo, items, lang);
    if telegram_len(&full) <= TELEGRAM_MAX_LENGTH {
        return vec![full];
    }

    let header = header(repo);
    items
        .iter()
        .map(|item| {
            let message = format!("{header}\n\n{}", format_item(item, lang));
            truncate_to_limit(message, TELEGRAM_MAX_LENGTH)
        })
        .collect()
}

/// Cuts `text` at a character boundary so it is at most `max` UTF-16 units.
fn truncate_to_limit(mut text: String, max: usize) -> String {
    let mut units = 0;
    let cut = text.char_indices().find_map(|(idx, c)| {
        units += c.len_utf16();
        (units > max).then_some(idx)
    });
    if let Some(idx) = cut {
        text.truncate(idx);
    }
    text
}
