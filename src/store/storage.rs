//! Asset storage trait and SQLite implementation.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

/// A single stored asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAsset {
  /// Canonical path+query key
  pub key: String,
  /// The resource body, opaque
  pub payload: Vec<u8>,
  /// MIME-type hint; empty when the origin did not send one
  pub content_type: String,
}

/// Trait for asset storage backends.
pub trait AssetStorage: Send + Sync {
  /// Upsert an asset under its canonical key (last writer wins).
  fn put(&self, key: &str, payload: &[u8], content_type: &str) -> Result<()>;

  /// Look up an asset. A missing key is `Ok(None)`, not an error.
  fn get(&self, key: &str) -> Result<Option<CachedAsset>>;
}

/// In-memory storage for hosts without a durable data directory and for tests.
#[derive(Default)]
pub struct MemoryStorage {
  assets: Mutex<HashMap<String, CachedAsset>>,
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

impl AssetStorage for MemoryStorage {
  fn put(&self, key: &str, payload: &[u8], content_type: &str) -> Result<()> {
    let mut assets = self
      .assets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    assets.insert(
      key.to_string(),
      CachedAsset {
        key: key.to_string(),
        payload: payload.to_vec(),
        content_type: content_type.to_string(),
      },
    );
    Ok(())
  }

  fn get(&self, key: &str) -> Result<Option<CachedAsset>> {
    let assets = self
      .assets
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(assets.get(key).cloned())
  }
}

/// SQLite-based asset storage.
///
/// Holds only the database path; every operation opens its own connection,
/// so no handle is ever held across an await point and parallel request
/// handlers never contend on a shared connection.
pub struct SqliteStorage {
  path: PathBuf,
}

/// Bump when the table shape changes. A mismatched store is rebuilt from
/// scratch rather than migrated row by row.
const SCHEMA_VERSION: i64 = 1;

/// How long a connection waits on a locked database before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Schema for the asset store.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS assets (
    key TEXT PRIMARY KEY,
    payload BLOB NOT NULL,
    content_type TEXT NOT NULL DEFAULT '',
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteStorage {
  /// Open storage at the default location, creating it on first use.
  pub fn open() -> Result<Self> {
    Self::at(Self::default_path()?)
  }

  /// Open storage at an explicit path.
  pub fn at(path: PathBuf) -> Result<Self> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create store directory: {}", e))?;
    }

    let storage = Self { path };

    // First connect creates the schema; later opens are no-ops
    storage.connect()?;

    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("outpost").join("assets.db"))
  }

  /// Open a connection for one logical operation.
  ///
  /// Idempotent and safe to call concurrently: schema creation is guarded
  /// by `user_version`, and the busy timeout rides out a competing writer.
  fn connect(&self) -> Result<Connection> {
    let conn = Connection::open(&self.path)
      .map_err(|e| eyre!("Failed to open store at {}: {}", self.path.display(), e))?;

    conn
      .busy_timeout(BUSY_TIMEOUT)
      .map_err(|e| eyre!("Failed to set busy timeout: {}", e))?;

    let version: i64 = conn
      .query_row("PRAGMA user_version", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to read store version: {}", e))?;

    if version != SCHEMA_VERSION {
      // A version bump is the only supported schema change: drop and recreate
      conn
        .execute_batch("DROP TABLE IF EXISTS assets")
        .map_err(|e| eyre!("Failed to clear outdated store: {}", e))?;
      conn
        .execute_batch(SCHEMA)
        .map_err(|e| eyre!("Failed to create store schema: {}", e))?;
      conn
        .pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(|e| eyre!("Failed to stamp store version: {}", e))?;
    }

    Ok(conn)
  }
}

impl AssetStorage for SqliteStorage {
  fn put(&self, key: &str, payload: &[u8], content_type: &str) -> Result<()> {
    let conn = self.connect()?;

    conn
      .execute(
        "INSERT OR REPLACE INTO assets (key, payload, content_type, stored_at)
         VALUES (?, ?, ?, datetime('now'))",
        params![key, payload, content_type],
      )
      .map_err(|e| eyre!("Failed to store asset: {}", e))?;

    Ok(())
  }

  fn get(&self, key: &str) -> Result<Option<CachedAsset>> {
    let conn = self.connect()?;

    let mut stmt = conn
      .prepare("SELECT payload, content_type FROM assets WHERE key = ?")
      .map_err(|e| eyre!("Failed to prepare lookup: {}", e))?;

    let row = stmt
      .query_row(params![key], |row| {
        Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?))
      })
      .optional()
      .map_err(|e| eyre!("Failed to read asset: {}", e))?;

    Ok(row.map(|(payload, content_type)| CachedAsset {
      key: key.to_string(),
      payload,
      content_type,
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn temp_storage() -> (tempfile::TempDir, SqliteStorage) {
    let dir = tempfile::tempdir().unwrap();
    let storage = SqliteStorage::at(dir.path().join("assets.db")).unwrap();
    (dir, storage)
  }

  #[test]
  fn test_put_then_get_round_trip() {
    let (_dir, storage) = temp_storage();

    storage.put("/index.html", b"<html></html>", "text/html").unwrap();

    let asset = storage.get("/index.html").unwrap().unwrap();
    assert_eq!(asset.key, "/index.html");
    assert_eq!(asset.payload, b"<html></html>");
    assert_eq!(asset.content_type, "text/html");
  }

  #[test]
  fn test_missing_key_is_none_not_error() {
    let (_dir, storage) = temp_storage();
    assert!(storage.get("/nope").unwrap().is_none());
  }

  #[test]
  fn test_put_overwrites_in_place() {
    let (_dir, storage) = temp_storage();

    storage.put("/app.js", b"v1", "text/javascript").unwrap();
    storage.put("/app.js", b"v2", "text/javascript").unwrap();

    let asset = storage.get("/app.js").unwrap().unwrap();
    assert_eq!(asset.payload, b"v2");
  }

  #[test]
  fn test_empty_content_type_is_preserved() {
    let (_dir, storage) = temp_storage();

    storage.put("/blob", b"data", "").unwrap();

    assert_eq!(storage.get("/blob").unwrap().unwrap().content_type, "");
  }

  #[test]
  fn test_reopen_keeps_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.db");

    let storage = SqliteStorage::at(path.clone()).unwrap();
    storage.put("/logo.svg", b"<svg/>", "image/svg+xml").unwrap();
    drop(storage);

    let reopened = SqliteStorage::at(path).unwrap();
    assert!(reopened.get("/logo.svg").unwrap().is_some());
  }

  #[test]
  fn test_version_bump_rebuilds_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("assets.db");

    let storage = SqliteStorage::at(path.clone()).unwrap();
    storage.put("/stale", b"old", "").unwrap();
    drop(storage);

    // Simulate a store written by a different schema version
    let conn = Connection::open(&path).unwrap();
    conn.pragma_update(None, "user_version", 99).unwrap();
    drop(conn);

    let rebuilt = SqliteStorage::at(path).unwrap();
    assert!(rebuilt.get("/stale").unwrap().is_none());
  }

  #[test]
  fn test_memory_storage_round_trip() {
    let storage = MemoryStorage::new();

    storage.put("/a", b"x", "text/plain").unwrap();

    let asset = storage.get("/a").unwrap().unwrap();
    assert_eq!(asset.payload, b"x");
    assert!(storage.get("/b").unwrap().is_none());
  }
}
