//! Display helpers for counts, relative times and web search links.

use chrono::{DateTime, Local, Utc};
use url::Url;

const WEB_SEARCH_URL: &str = "https://www.google.com/search";

/// "Just now", "5m ago", "3h ago", or a local date for anything older than a day.
pub fn format_relative(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now.signed_duration_since(timestamp).num_seconds();
    if delta < 60 {
        return "Just now".to_string();
    }
    if delta < 60 * 60 {
        return format!("{}m ago", delta / 60);
    }
    if delta < 60 * 60 * 24 {
        return format!("{}h ago", delta / (60 * 60));
    }
    timestamp
        .with_timezone(&Local)
        .format("%-m/%-d/%Y")
        .to_string()
}

/// Groups digits in threes: 1234567 -> "1,234,567".
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn web_search_query(title: &str, author: &str) -> String {
    format!("\"{title}\" \"{author}\" book")
}

pub fn web_search_url(title: &str, author: &str) -> String {
    let query = web_search_query(title, author);
    match Url::parse_with_params(WEB_SEARCH_URL, &[("q", query.as_str())]) {
        Ok(url) => url.to_string(),
        Err(_) => WEB_SEARCH_URL.to_string(),
    }
}
