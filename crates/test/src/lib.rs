//! Test helpers and fixtures.

use std::path::PathBuf;
use std::time::Duration;

use bookfinder_api::ApiClient;
use bookfinder_application::{ApiEvent, AppContext, Command, Now};
use bookfinder_core::{Book, MemoryStore, Settings};

#[cfg(test)]
mod scenarios;

pub fn make_book(title: &str, author: &str) -> Book {
    Book {
        title: title.to_string(),
        author: author.to_string(),
        publisher: "Ace".to_string(),
        year: "1965".to_string(),
        image_url: String::new(),
    }
}

pub fn make_settings(history_limit: usize) -> Settings {
    Settings {
        history_limit,
        ephemeral: true,
        ..Settings::default()
    }
}

pub fn make_ctx(settings: Settings) -> AppContext {
    AppContext::new(settings, Box::new(MemoryStore::new()))
}

/// `now` shifted forward on both clocks.
pub fn later(now: Now, millis: u64) -> Now {
    Now {
        instant: now.instant + Duration::from_millis(millis),
        wall: now.wall + chrono::Duration::milliseconds(millis as i64),
    }
}

/// A fresh sqlite path under the temp dir, unique per process and tag.
pub fn temp_db_path(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "bookfinder-test-{}-{tag}",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    let _ = std::fs::create_dir_all(&dir);
    dir.join("prefs.db")
}

/// Performs a command against a live client and returns the resulting event.
///
/// Mirrors what the terminal runtime does, without threads, so scenarios can
/// drive the full request cycle step by step.
pub async fn perform(api: &ApiClient, command: Command) -> Option<ApiEvent> {
    let event = match command {
        Command::LoadCatalog => ApiEvent::CatalogLoaded(api.catalog().await),
        Command::LoadPopular => ApiEvent::PopularLoaded(api.popular().await),
        Command::FetchSuggestions { seq, query } => ApiEvent::SuggestionsLoaded {
            seq,
            result: api.search(&query).await,
        },
        Command::FetchRecommendations { seq, title } => ApiEvent::RecommendationsLoaded {
            seq,
            result: api.recommend(&title).await,
        },
        Command::FetchDetails { seq, title } => ApiEvent::DetailsLoaded {
            seq,
            result: api.book_details(&title).await,
        },
        Command::OpenUrl(_) => return None,
    };
    Some(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_settings() {
        let settings = make_settings(12);
        assert_eq!(settings.history_limit, 12);
        assert!(settings.ephemeral);
    }

    #[test]
    fn later_moves_both_clocks() {
        let now = Now::current();
        let next = later(now, 1_500);
        assert_eq!(next.instant - now.instant, Duration::from_millis(1_500));
        assert_eq!((next.wall - now.wall).num_milliseconds(), 1_500);
    }
}
