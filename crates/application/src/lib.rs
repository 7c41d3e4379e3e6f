//! Application orchestration layer for Bookfinder.
//!
//! `AppContext` owns all session state. User intents are methods that mutate
//! it and return the [`Command`]s the runtime must perform; completed requests
//! come back as [`ApiEvent`]s through [`AppContext::apply`]. Nothing here does
//! I/O besides the synchronous preference writes.

use std::time::Instant;

use bookfinder_api::{Catalog, Recommendation};
use bookfinder_core::{Book, PreferenceStore, Settings, Theme, ToastKind};
use chrono::{DateTime, Utc};

mod format;
mod history;
mod preferences;
mod search;
mod toast;

pub use format::{format_count, format_relative, web_search_query, web_search_url};
pub use history::HistoryCache;
pub use preferences::Preferences;
pub use search::{Debouncer, MIN_QUERY_CHARS, SEARCH_DEBOUNCE, SearchBox, SuggestionList};
pub use toast::{TOAST_TTL, Toast, Toasts};

pub const RECOMMENDATIONS_LOADED: &str = "Recommendations loaded successfully!";
pub const RECOMMENDATIONS_FAILED: &str = "Failed to get recommendations";
pub const CATALOG_FAILED: &str = "Error loading data. Please refresh the page.";
pub const POPULAR_FAILED: &str = "Error loading popular books";
pub const DETAILS_FAILED: &str = "Could not load book details";

/// Wall clock and monotonic clock sampled together.
#[derive(Debug, Clone, Copy)]
pub struct Now {
    pub instant: Instant,
    pub wall: DateTime<Utc>,
}

impl Now {
    pub fn current() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }
}

/// Side effects requested by the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    LoadCatalog,
    LoadPopular,
    FetchSuggestions { seq: u64, query: String },
    FetchRecommendations { seq: u64, title: String },
    FetchDetails { seq: u64, title: String },
    OpenUrl(String),
}

/// Completed requests, tagged with the sequence number they were issued under.
#[derive(Debug)]
pub enum ApiEvent {
    CatalogLoaded(bookfinder_api::Result<Catalog>),
    PopularLoaded(bookfinder_api::Result<Vec<Book>>),
    SuggestionsLoaded {
        seq: u64,
        result: bookfinder_api::Result<Vec<Book>>,
    },
    RecommendationsLoaded {
        seq: u64,
        result: bookfinder_api::Result<Recommendation>,
    },
    DetailsLoaded {
        seq: u64,
        result: bookfinder_api::Result<Book>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Search,
    Grid,
}

pub struct AppContext {
    pub settings: Settings,
    prefs: Preferences,
    pub theme: Theme,
    pub total_recommendations: u64,
    pub catalog_total: Option<u64>,
    pub history: HistoryCache,
    pub history_open: bool,
    pub history_cursor: usize,
    pub confirm_clear_open: bool,
    pub search: SearchBox,
    pub focus: Focus,
    pub popular: Vec<Book>,
    pub popular_visible: bool,
    pub selected_book: Option<Book>,
    pub recommendations: Vec<Book>,
    pub grid_cursor: usize,
    /// Bumped whenever the grid receives a new list of books.
    pub grid_generation: u64,
    pub loading: bool,
    pub modal: Option<Book>,
    pub toasts: Toasts,
    recommend_seq: u64,
    details_seq: u64,
}

impl AppContext {
    pub fn new(mut settings: Settings, store: Box<dyn PreferenceStore>) -> Self {
        settings.normalize();
        let prefs = Preferences::new(store);
        let theme = prefs.load_theme().unwrap_or_else(Theme::system_preference);
        let total_recommendations = prefs.load_recommendation_count();
        let history = HistoryCache::new(prefs.load_history(), settings.history_limit);

        Self {
            settings,
            prefs,
            theme,
            total_recommendations,
            catalog_total: None,
            history,
            history_open: false,
            history_cursor: 0,
            confirm_clear_open: false,
            search: SearchBox::default(),
            focus: Focus::Search,
            popular: Vec::new(),
            popular_visible: true,
            selected_book: None,
            recommendations: Vec::new(),
            grid_cursor: 0,
            grid_generation: 0,
            loading: false,
            modal: None,
            toasts: Toasts::default(),
            recommend_seq: 0,
            details_seq: 0,
        }
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn start(&mut self) -> Vec<Command> {
        vec![Command::LoadCatalog]
    }

    /// Books currently shown in the grid.
    pub fn grid_books(&self) -> &[Book] {
        if self.popular_visible {
            &self.popular
        } else {
            &self.recommendations
        }
    }

    pub fn grid_selected(&self) -> Option<&Book> {
        self.grid_books().get(self.grid_cursor)
    }

    pub fn move_grid_cursor(&mut self, delta: isize) {
        let len = self.grid_books().len();
        if len == 0 {
            self.grid_cursor = 0;
            return;
        }
        let next = self.grid_cursor as isize + delta;
        self.grid_cursor = next.clamp(0, len as isize - 1) as usize;
    }

    fn reset_grid(&mut self) {
        self.grid_cursor = 0;
        self.grid_generation += 1;
    }

    /// Advances timers: fires a due suggestion request and expires toasts.
    pub fn tick(&mut self, now: Now) -> Vec<Command> {
        self.toasts.prune(now.instant);
        match self.search.debouncer.poll(now.instant) {
            Some((seq, query)) => {
                log::debug!("suggestions for {query:?} (seq {seq})");
                vec![Command::FetchSuggestions { seq, query }]
            }
            None => Vec::new(),
        }
    }

    // Search field

    pub fn on_search_input(&mut self, query: String, now: Now) {
        if query.chars().count() < MIN_QUERY_CHARS {
            self.search.debouncer.cancel();
            self.search.hide();
        } else {
            self.search.debouncer.schedule(query.clone(), now.instant);
        }
        self.search.query = query;
    }

    pub fn push_query_char(&mut self, ch: char, now: Now) {
        let mut query = self.search.query.clone();
        query.push(ch);
        self.on_search_input(query, now);
    }

    pub fn pop_query_char(&mut self, now: Now) {
        let mut query = self.search.query.clone();
        query.pop();
        self.on_search_input(query, now);
    }

    pub fn focus_search(&mut self) {
        self.focus = Focus::Search;
        if self.search.query.chars().count() >= MIN_QUERY_CHARS {
            self.search.visible = true;
        }
    }

    pub fn focus_grid(&mut self) {
        self.focus = Focus::Grid;
        self.search.hide();
    }

    pub fn dismiss_suggestions(&mut self) {
        self.search.hide();
    }

    pub fn highlight_next_suggestion(&mut self) {
        if let Some(list) = self.search.suggestions.as_mut() {
            list.highlight_next();
        }
    }

    pub fn highlight_prev_suggestion(&mut self) {
        if let Some(list) = self.search.suggestions.as_mut() {
            list.highlight_prev();
        }
    }

    /// Enter on the search field: selects the highlighted suggestion, if any.
    pub fn commit_highlighted(&mut self, now: Now) -> Vec<Command> {
        if !self.search.shows_suggestions() {
            return Vec::new();
        }
        let title = self
            .search
            .suggestions
            .as_ref()
            .and_then(|list| list.highlighted_book())
            .map(|book| book.title.clone());
        match title {
            Some(title) => self.select_book(&title, now),
            None => Vec::new(),
        }
    }

    pub fn select_suggestion(&mut self, index: usize, now: Now) -> Vec<Command> {
        let title = self
            .search
            .suggestions
            .as_ref()
            .and_then(|list| list.items().get(index))
            .map(|book| book.title.clone());
        match title {
            Some(title) => self.select_book(&title, now),
            None => Vec::new(),
        }
    }

    // Recommendations

    /// Commits `title`: records it in history and asks for recommendations.
    pub fn select_book(&mut self, title: &str, now: Now) -> Vec<Command> {
        self.search.hide();
        self.search.debouncer.cancel();
        self.search.query = title.to_string();
        self.add_to_history(title, now);
        vec![self.request_recommendations(title)]
    }

    pub fn request_recommendations(&mut self, title: &str) -> Command {
        self.recommend_seq += 1;
        self.loading = true;
        self.popular_visible = false;
        log::info!("recommendations for {title:?} (seq {})", self.recommend_seq);
        Command::FetchRecommendations {
            seq: self.recommend_seq,
            title: title.to_string(),
        }
    }

    pub fn go_home(&mut self) -> Vec<Command> {
        self.search.query.clear();
        self.search.debouncer.cancel();
        self.search.hide();
        self.selected_book = None;
        self.recommendations.clear();
        self.loading = false;
        // Anything still in flight belongs to the page we are leaving.
        self.recommend_seq += 1;
        self.popular_visible = true;
        self.focus = Focus::Search;
        self.reset_grid();
        vec![Command::LoadPopular]
    }

    // Detail view

    pub fn open_details(&mut self, book: Book) {
        self.search.hide();
        self.modal = Some(book);
    }

    pub fn open_grid_details(&mut self) {
        if let Some(book) = self.grid_selected().cloned() {
            self.open_details(book);
        }
    }

    pub fn close_details(&mut self) {
        self.modal = None;
    }

    pub fn recommend_from_details(&mut self) -> Vec<Command> {
        match self.modal.take() {
            Some(book) => vec![self.request_recommendations(&book.title)],
            None => Vec::new(),
        }
    }

    pub fn web_search_from_details(&mut self, now: Now) -> Vec<Command> {
        let Some(book) = self.modal.as_ref() else {
            return Vec::new();
        };
        let url = web_search_url(&book.title, &book.author);
        let message = format!("Searching for \"{}\" on Google", book.title);
        self.toasts.push(ToastKind::Info, message, now.instant);
        vec![Command::OpenUrl(url)]
    }

    // History

    fn add_to_history(&mut self, title: &str, now: Now) {
        self.history.add(title, now.wall);
        self.prefs.save_history(self.history.entries());
        self.history_cursor = 0;
    }

    pub fn toggle_history(&mut self) {
        if self.history_open {
            self.close_history();
        } else {
            self.history_open = true;
            self.history_cursor = self
                .history_cursor
                .min(self.history.len().saturating_sub(1));
        }
    }

    pub fn close_history(&mut self) {
        self.history_open = false;
        self.confirm_clear_open = false;
    }

    pub fn move_history_cursor(&mut self, delta: isize) {
        let len = self.history.len();
        if len == 0 {
            self.history_cursor = 0;
            return;
        }
        let next = self.history_cursor as isize + delta;
        self.history_cursor = next.clamp(0, len as isize - 1) as usize;
    }

    pub fn select_history(&mut self, index: usize, now: Now) -> Vec<Command> {
        let Some(title) = self.history.get(index).map(|e| e.title.clone()) else {
            return Vec::new();
        };
        let commands = self.select_book(&title, now);
        self.close_history();
        commands
    }

    pub fn remove_history(&mut self, id: i64) {
        if self.history.remove(id) {
            self.prefs.save_history(self.history.entries());
        }
        self.history_cursor = self
            .history_cursor
            .min(self.history.len().saturating_sub(1));
    }

    pub fn remove_history_at_cursor(&mut self) {
        if let Some(id) = self.history.get(self.history_cursor).map(|e| e.id) {
            self.remove_history(id);
        }
    }

    /// Asks for confirmation first when configured to.
    pub fn request_clear_history(&mut self, now: Now) {
        if self.settings.confirm_clear {
            self.confirm_clear_open = true;
        } else {
            self.clear_history(now);
        }
    }

    pub fn confirm_clear_history(&mut self, now: Now) {
        if self.confirm_clear_open {
            self.confirm_clear_open = false;
            self.clear_history(now);
        }
    }

    pub fn cancel_clear_history(&mut self) {
        self.confirm_clear_open = false;
    }

    fn clear_history(&mut self, now: Now) {
        self.history.clear();
        self.history_cursor = 0;
        self.prefs.save_history(self.history.entries());
        self.toasts
            .push(ToastKind::Info, "Search history cleared", now.instant);
    }

    pub fn show_history_details(&mut self, index: usize) -> Vec<Command> {
        let Some(title) = self.history.get(index).map(|e| e.title.clone()) else {
            return Vec::new();
        };
        self.details_seq += 1;
        vec![Command::FetchDetails {
            seq: self.details_seq,
            title,
        }]
    }

    // Theme and global keys

    pub fn toggle_theme(&mut self, now: Now) {
        self.theme = self.theme.toggled();
        self.prefs.save_theme(self.theme);
        let message = if self.theme.is_dark() {
            "Dark mode enabled"
        } else {
            "Light mode enabled"
        };
        self.toasts.push(ToastKind::Info, message, now.instant);
    }

    /// Escape closes every overlay at once.
    pub fn escape(&mut self) {
        self.close_details();
        self.close_history();
        self.search.hide();
    }

    pub fn dismiss_toast(&mut self) {
        self.toasts.dismiss_latest();
    }

    // Responses

    pub fn apply(&mut self, event: ApiEvent, now: Now) -> Vec<Command> {
        match event {
            ApiEvent::CatalogLoaded(Ok(catalog)) => {
                self.catalog_total = Some(catalog.total());
                vec![Command::LoadPopular]
            }
            ApiEvent::CatalogLoaded(Err(err)) => {
                log::error!("loading catalog: {err}");
                self.toasts.push_sticky(ToastKind::Error, CATALOG_FAILED);
                Vec::new()
            }
            ApiEvent::PopularLoaded(Ok(books)) => {
                self.popular = books;
                if self.popular_visible {
                    self.reset_grid();
                }
                Vec::new()
            }
            ApiEvent::PopularLoaded(Err(err)) => {
                log::error!("loading popular books: {err}");
                self.toasts
                    .push(ToastKind::Error, POPULAR_FAILED, now.instant);
                Vec::new()
            }
            ApiEvent::SuggestionsLoaded { seq, result } => {
                if !self.search.debouncer.is_current(seq) {
                    log::debug!("dropping stale suggestions (seq {seq})");
                    return Vec::new();
                }
                match result {
                    Ok(books) => {
                        self.search.suggestions =
                            Some(SuggestionList::new(books, self.settings.suggestion_limit));
                        self.search.visible = self.focus == Focus::Search && self.modal.is_none();
                    }
                    Err(err) => log::error!("search error: {err}"),
                }
                Vec::new()
            }
            ApiEvent::RecommendationsLoaded { seq, result } => {
                if seq != self.recommend_seq {
                    log::debug!(
                        "dropping stale recommendations (seq {seq}, latest {})",
                        self.recommend_seq
                    );
                    return Vec::new();
                }
                match result {
                    Ok(rec) => {
                        self.selected_book = Some(rec.input_book);
                        self.recommendations = rec.recommendations;
                        self.popular_visible = false;
                        self.reset_grid();
                        self.total_recommendations += 1;
                        self.prefs
                            .save_recommendation_count(self.total_recommendations);
                        self.toasts
                            .push(ToastKind::Success, RECOMMENDATIONS_LOADED, now.instant);
                    }
                    Err(err) => {
                        log::error!("recommendation error: {err}");
                        self.toasts.push(
                            ToastKind::Error,
                            err.user_message(RECOMMENDATIONS_FAILED),
                            now.instant,
                        );
                        self.popular_visible = true;
                        self.reset_grid();
                    }
                }
                self.loading = false;
                Vec::new()
            }
            ApiEvent::DetailsLoaded { seq, result } => {
                if seq != self.details_seq {
                    return Vec::new();
                }
                match result {
                    Ok(book) => {
                        self.close_history();
                        self.open_details(book);
                    }
                    Err(err) => {
                        log::error!("book details error: {err}");
                        self.toasts.push(
                            ToastKind::Error,
                            err.user_message(DETAILS_FAILED),
                            now.instant,
                        );
                    }
                }
                Vec::new()
            }
        }
    }
}
