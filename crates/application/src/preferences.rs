//! Typed access to persisted preferences.
//!
//! Reads fall back to defaults on malformed data. Writes are best effort: a
//! failing store is logged and otherwise ignored, the in-memory state stays
//! authoritative for the session.

use bookfinder_core::{HistoryEntry, PreferenceStore, Theme, keys};

pub struct Preferences {
    store: Box<dyn PreferenceStore>,
}

impl Preferences {
    pub fn new(store: Box<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn PreferenceStore {
        self.store.as_ref()
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("read {key} failed: {err:#}");
                None
            }
        }
    }

    fn write(&mut self, key: &str, value: &str) {
        if let Err(err) = self.store.set(key, value) {
            log::warn!("write {key} failed: {err:#}");
        }
    }

    pub fn load_history(&self) -> Vec<HistoryEntry> {
        let Some(raw) = self.read(keys::SEARCH_HISTORY) else {
            return Vec::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            log::warn!("discarding unreadable {}: {err}", keys::SEARCH_HISTORY);
            Vec::new()
        })
    }

    pub fn save_history(&mut self, entries: &[HistoryEntry]) {
        match serde_json::to_string(entries) {
            Ok(json) => self.write(keys::SEARCH_HISTORY, &json),
            Err(err) => log::warn!("serialize history failed: {err}"),
        }
    }

    pub fn load_theme(&self) -> Option<Theme> {
        self.read(keys::THEME)?.parse().ok()
    }

    pub fn save_theme(&mut self, theme: Theme) {
        self.write(keys::THEME, theme.as_str());
    }

    pub fn load_recommendation_count(&self) -> u64 {
        self.read(keys::TOTAL_RECOMMENDATIONS)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn save_recommendation_count(&mut self, count: u64) {
        self.write(keys::TOTAL_RECOMMENDATIONS, &count.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookfinder_core::MemoryStore;

    struct BrokenStore;

    impl PreferenceStore for BrokenStore {
        fn get(&self, _key: &str) -> anyhow::Result<Option<String>> {
            anyhow::bail!("storage disabled")
        }

        fn set(&mut self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("quota exceeded")
        }

        fn remove(&mut self, _key: &str) -> anyhow::Result<()> {
            anyhow::bail!("storage disabled")
        }
    }

    #[test]
    fn defaults_when_empty() {
        let prefs = Preferences::new(Box::new(MemoryStore::new()));
        assert!(prefs.load_history().is_empty());
        assert_eq!(prefs.load_theme(), None);
        assert_eq!(prefs.load_recommendation_count(), 0);
    }

    #[test]
    fn malformed_values_fall_back() -> anyhow::Result<()> {
        let mut store = MemoryStore::new();
        store.set(keys::SEARCH_HISTORY, "{not json")?;
        store.set(keys::THEME, "sepia")?;
        store.set(keys::TOTAL_RECOMMENDATIONS, "lots")?;

        let prefs = Preferences::new(Box::new(store));
        assert!(prefs.load_history().is_empty());
        assert_eq!(prefs.load_theme(), None);
        assert_eq!(prefs.load_recommendation_count(), 0);
        Ok(())
    }

    #[test]
    fn values_roundtrip_as_strings() -> anyhow::Result<()> {
        let mut prefs = Preferences::new(Box::new(MemoryStore::new()));
        prefs.save_theme(Theme::Light);
        prefs.save_recommendation_count(12);

        assert_eq!(prefs.store().get(keys::THEME)?.as_deref(), Some("light"));
        assert_eq!(
            prefs.store().get(keys::TOTAL_RECOMMENDATIONS)?.as_deref(),
            Some("12")
        );
        assert_eq!(prefs.load_theme(), Some(Theme::Light));
        assert_eq!(prefs.load_recommendation_count(), 12);
        Ok(())
    }

    #[test]
    fn failing_store_is_not_fatal() {
        let mut prefs = Preferences::new(Box::new(BrokenStore));
        prefs.save_theme(Theme::Dark);
        prefs.save_history(&[]);
        assert_eq!(prefs.load_theme(), None);
        assert!(prefs.load_history().is_empty());
    }
}
