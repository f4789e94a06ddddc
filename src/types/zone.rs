//! The zone item timestamps are rendered in.

use std::fmt;

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;

/// An IANA zone (daylight-saving aware) or a fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayZone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Default for DisplayZone {
    fn default() -> Self {
        DisplayZone::Named(Tz::UTC)
    }
}

impl DisplayZone {
    /// Parses an IANA name such as `Asia/Shanghai`, falling back to a fixed
    /// offset (see [`parse_offset`]).
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        match raw.parse::<Tz>() {
            Ok(tz) => Some(DisplayZone::Named(tz)),
            Err(_) => parse_offset(raw).map(DisplayZone::Fixed),
        }
    }

    /// Formats `ts` in this zone with a `strftime`-style pattern.
    pub fn format(&self, ts: DateTime<Utc>, pattern: &str) -> String {
        match self {
            DisplayZone::Named(tz) => ts.with_timezone(tz).format(pattern).to_string(),
            DisplayZone::Fixed(offset) => ts.with_timezone(offset).format(pattern).to_string(),
        }
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayZone::Named(tz) => write!(f, "{}", tz.name()),
            DisplayZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// Parses `UTC`, `Z`, `+08:00`, `-0530`, `+8`, optionally prefixed with `UTC`.
pub fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let s = raw.trim();
    let s = s
        .strip_prefix("UTC")
        .or_else(|| s.strip_prefix("GMT"))
        .unwrap_or(s);
    if s.is_empty() || s == "Z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 && rest.is_ascii() => rest.split_at(2),
        None => (rest, "0"),
    };
    if !hours.bytes().chain(minutes.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
