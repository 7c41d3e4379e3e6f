//! Sqlite-backed preference persistence.

use std::path::Path;

use anyhow::Context as _;
use bookfinder_core::PreferenceStore;
use rusqlite::{Connection, OptionalExtension as _};

#[derive(Debug)]
pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let conn = Connection::open(path.as_ref())
            .with_context(|| format!("open sqlite db at {}", path.as_ref().display()))?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        let storage = Self { conn };
        storage.migrate()?;
        Ok(storage)
    }

    fn migrate(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL DEFAULT (unixepoch())
            );
            "#,
            )
            .context("create preferences table")?;
        Ok(())
    }

    #[cfg(test)]
    fn keys(&self) -> anyhow::Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM preferences ORDER BY key")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<String>, _>>()?)
    }
}

impl PreferenceStore for Storage {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read preference {key}"))?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
            INSERT INTO preferences (key, value, updated_at) VALUES (?, ?, unixepoch())
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
                (key, value),
            )
            .with_context(|| format!("write preference {key}"))?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM preferences WHERE key = ?", [key])
            .with_context(|| format!("delete preference {key}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookfinder_core::keys;

    #[test]
    fn preference_roundtrip() -> anyhow::Result<()> {
        let mut storage = Storage::open_in_memory()?;
        assert_eq!(storage.get(keys::THEME)?, None);

        storage.set(keys::THEME, "dark")?;
        assert_eq!(storage.get(keys::THEME)?.as_deref(), Some("dark"));

        storage.set(keys::THEME, "light")?;
        assert_eq!(storage.get(keys::THEME)?.as_deref(), Some("light"));
        Ok(())
    }

    #[test]
    fn remove_deletes_only_that_key() -> anyhow::Result<()> {
        let mut storage = Storage::open_in_memory()?;
        storage.set(keys::TOTAL_RECOMMENDATIONS, "3")?;
        storage.set(keys::SEARCH_HISTORY, "[]")?;

        storage.remove(keys::TOTAL_RECOMMENDATIONS)?;
        assert_eq!(storage.get(keys::TOTAL_RECOMMENDATIONS)?, None);
        assert_eq!(storage.keys()?, vec![keys::SEARCH_HISTORY.to_string()]);

        storage.remove("missing")?;
        Ok(())
    }

    #[test]
    fn reopen_keeps_values() -> anyhow::Result<()> {
        let dir = std::env::temp_dir().join(format!(
            "bookfinder-storage-test-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir)?;
        let path = dir.join("prefs.db");
        let _ = std::fs::remove_file(&path);

        {
            let mut storage = Storage::open(&path)?;
            storage.set(keys::THEME, "light")?;
        }
        let storage = Storage::open(&path)?;
        assert_eq!(storage.get(keys::THEME)?.as_deref(), Some("light"));

        drop(storage);
        let _ = std::fs::remove_dir_all(&dir);
        Ok(())
    }
}
