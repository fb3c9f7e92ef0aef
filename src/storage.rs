use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;

/// Synchronous string key/value storage, the local-storage analogue.
pub trait Storage {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&mut self, key: &str) -> Result<()>;
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).context("Failed to create storage directory")?;
        }
        let conn = Connection::open(path).context("Failed to open storage database")?;
        Self::with_connection(conn)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT
            );",
            [],
        )
        .context("Failed to create kv_store table")?;
        Ok(Self { conn })
    }
}

impl Storage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let res: Result<String, rusqlite::Error> = self.conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        );

        match res {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_round_trips_items() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(storage.get_item("form-data").unwrap(), None);

        storage.set_item("form-data", "[]").unwrap();
        storage.set_item("form-data", "[1]").unwrap();
        assert_eq!(storage.get_item("form-data").unwrap().as_deref(), Some("[1]"));

        storage.remove_item("form-data").unwrap();
        assert_eq!(storage.get_item("form-data").unwrap(), None);
    }

    #[test]
    fn remove_item_leaves_other_keys() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        storage.set_item("form-data", "[]").unwrap();
        storage.set_item("other", "keep").unwrap();

        storage.remove_item("form-data").unwrap();
        assert_eq!(storage.get_item("other").unwrap().as_deref(), Some("keep"));
    }

    #[test]
    fn sqlite_file_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.db");

        let mut storage = SqliteStorage::open(&path).unwrap();
        storage.set_item("form-data", "[]").unwrap();
        drop(storage);

        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(storage.get_item("form-data").unwrap().as_deref(), Some("[]"));
    }
}
