//! Notification assembly and delivery.

pub mod format;
pub mod telegram;

pub use format::{
    TELEGRAM_MAX_LENGTH, escape_html, format_item, format_message, split_messages, telegram_len,
};
pub use telegram::{DEFAULT_TELEGRAM_API_URL, DeliveryError, Notifier, TelegramNotifier};
