use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::{Context as AnyhowContext, Result};
use rusqlite::{Connection, OptionalExtension, params};

use crate::paths::data_dir;

/// One stored provider credential, token redacted.
#[derive(Debug, Clone)]
pub struct TokenEntry {
    pub provider: String,
    pub updated_at: i64,
}

/// SQLite-backed key-value store for provider API tokens.
///
/// Consumed only by the settings surface; dispatch never reads it.
#[derive(Clone)]
pub struct TokenStore {
    db_path: PathBuf,
}

impl TokenStore {
    pub fn open(custom_root: Option<PathBuf>) -> Result<Self> {
        let base = custom_root.unwrap_or_else(data_dir);
        if !base.exists() {
            fs::create_dir_all(&base)
                .with_context(|| format!("Failed to create data directory {}", base.display()))?;
        }
        let db_path = base.join("tokens.sqlite3");
        let store = Self { db_path };
        store.init_schema()?;
        Ok(store)
    }

    pub fn set(&self, provider: &str, token: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO tokens (provider, token, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(provider)
            DO UPDATE SET token=excluded.token, updated_at=excluded.updated_at
            "#,
            params![provider, token, timestamp()],
        )
        .context("Failed to store token")?;
        Ok(())
    }

    pub fn get(&self, provider: &str) -> Result<Option<String>> {
        let conn = self.connect()?;
        conn.query_row(
            "SELECT token FROM tokens WHERE provider = ?1",
            params![provider],
            |row| row.get(0),
        )
        .optional()
        .context("Failed to read token")
    }

    /// Removes a provider's token; absent providers are fine.
    pub fn remove(&self, provider: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute("DELETE FROM tokens WHERE provider = ?1", params![provider])
            .context("Failed to remove token")?;
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<TokenEntry>> {
        let conn = self.connect()?;
        let mut stmt = conn
            .prepare("SELECT provider, updated_at FROM tokens ORDER BY provider")
            .context("Failed to prepare token listing")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(TokenEntry {
                    provider: row.get(0)?,
                    updated_at: row.get(1)?,
                })
            })
            .context("Failed to list tokens")?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.context("Failed to read token row")?);
        }
        Ok(entries)
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open token db {}", self.db_path.display()))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS tokens (
                provider TEXT PRIMARY KEY,
                token TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
            [],
        )
        .context("Failed to initialize token schema")?;
        Ok(())
    }
}

fn timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn set_get_roundtrip_and_overwrite() {
        let temp = tempdir().unwrap();
        let store = TokenStore::open(Some(temp.path().to_path_buf())).unwrap();

        assert_eq!(store.get("openai").unwrap(), None);
        store.set("openai", "sk-first").unwrap();
        assert_eq!(store.get("openai").unwrap().as_deref(), Some("sk-first"));
        store.set("openai", "sk-second").unwrap();
        assert_eq!(store.get("openai").unwrap().as_deref(), Some("sk-second"));
    }

    #[test]
    fn remove_clears_token_and_tolerates_absence() {
        let temp = tempdir().unwrap();
        let store = TokenStore::open(Some(temp.path().to_path_buf())).unwrap();

        store.set("claude", "sk-ant").unwrap();
        store.remove("claude").unwrap();
        assert_eq!(store.get("claude").unwrap(), None);
        store.remove("claude").unwrap();
    }

    #[test]
    fn list_returns_providers_sorted_without_tokens() {
        let temp = tempdir().unwrap();
        let store = TokenStore::open(Some(temp.path().to_path_buf())).unwrap();

        store.set("openai", "a").unwrap();
        store.set("gemini", "b").unwrap();

        let entries = store.list().unwrap();
        let providers: Vec<&str> = entries.iter().map(|e| e.provider.as_str()).collect();
        assert_eq!(providers, vec!["gemini", "openai"]);
    }
}
