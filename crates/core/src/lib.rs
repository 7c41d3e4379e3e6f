//! Core domain types for Bookfinder.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Keys under which preferences are persisted.
pub mod keys {
    pub const SEARCH_HISTORY: &str = "searchHistory";
    pub const TOTAL_RECOMMENDATIONS: &str = "totalRecommendations";
    pub const THEME: &str = "theme";
}

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const MAX_HISTORY_LIMIT: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_url: String,
    pub history_limit: usize,
    pub suggestion_limit: Option<usize>,
    pub confirm_clear: bool,
    pub ephemeral: bool,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            suggestion_limit: None,
            confirm_clear: true,
            ephemeral: false,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn normalize(&mut self) {
        let url = self.api_url.trim().trim_end_matches('/');
        self.api_url = if url.is_empty() {
            DEFAULT_API_URL.to_string()
        } else {
            url.to_string()
        };
        self.history_limit = self.history_limit.clamp(1, MAX_HISTORY_LIMIT);
        self.suggestion_limit = self.suggestion_limit.filter(|limit| *limit > 0);

        let level = self.log_level.trim().to_ascii_lowercase();
        self.log_level = match level.as_str() {
            "off" | "error" | "warn" | "info" | "debug" | "trace" => level,
            _ => "info".to_string(),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }

    /// Theme the terminal advertises, dark when it says nothing.
    pub fn system_preference() -> Self {
        Self::from_colorfgbg(std::env::var("COLORFGBG").ok().as_deref())
    }

    /// Interprets an rxvt-style `fg;bg` pair. Background colors 7 and 9..=15 are light.
    pub fn from_colorfgbg(value: Option<&str>) -> Self {
        let bg = value
            .and_then(|v| v.rsplit(';').next())
            .and_then(|bg| bg.trim().parse::<u8>().ok());
        match bg {
            Some(7) | Some(9..=15) => Theme::Light,
            _ => Theme::Dark,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Theme {
    type Err = &'static str;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            _ => Err("unknown theme"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

impl ToastKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastKind::Success => "success",
            ToastKind::Error => "error",
            ToastKind::Info => "info",
            ToastKind::Warning => "warning",
        }
    }
}

/// A book as served by the recommendation API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    #[serde(default = "unknown", deserialize_with = "lenient_string")]
    pub author: String,
    #[serde(default = "unknown", deserialize_with = "lenient_string")]
    pub publisher: String,
    #[serde(default = "unknown", deserialize_with = "lenient_string")]
    pub year: String,
    #[serde(default)]
    pub image_url: String,
}

impl Book {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            author: unknown(),
            publisher: unknown(),
            year: unknown(),
            image_url: String::new(),
        }
    }
}

fn unknown() -> String {
    "Unknown".to_string()
}

/// Accepts strings, numbers and null; the catalog mixes all three for metadata.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Option::<Lenient>::deserialize(deserializer)? {
        Some(Lenient::Text(text)) => text,
        Some(Lenient::Int(n)) => n.to_string(),
        Some(Lenient::Float(n)) if n.fract() == 0.0 => format!("{n:.0}"),
        Some(Lenient::Float(n)) => n.to_string(),
        None => unknown(),
    })
}

/// A previously selected title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub id: i64,
}

/// Durable string key/value storage for preferences.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
}

/// Process-lifetime store; nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.values.remove(key);
        Ok(())
    }
}
