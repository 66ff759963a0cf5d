//! Link storage.
//!
//! `LinkStore` is the seam between the dispatcher and persistence. The
//! production implementation is SQLite via rusqlite with the connection
//! behind a mutex; the workload is low-traffic point queries, so a single
//! shared connection is enough.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

/// A saved link record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Store-assigned unique id
    pub id: i64,
    /// User-chosen name
    pub name: String,
    /// Absolute URL; unique store-wide
    pub url: String,
    /// Owning user (Telegram user id)
    pub user_id: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Store failure taxonomy.
///
/// Only the duplicate-url conflict is distinguished; everything else
/// collapses to `Internal` and surfaces as a generic per-action message.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("url already saved")]
    DuplicateUrl,

    #[error("store error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        // The url column carries the only UNIQUE constraint in the schema,
        // so any constraint violation is a duplicate save.
        if let rusqlite::Error::SqliteFailure(code, _) = &err {
            if code.code == rusqlite::ErrorCode::ConstraintViolation {
                return Self::DuplicateUrl;
            }
        }
        Self::Internal(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD over link records.
///
/// Visibility is scoped by owning user only where the operation says so:
/// `find_by_user` filters, `find_by_id` does not.
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Insert a new link and return it with its assigned id.
    async fn create(&self, name: &str, url: &str, user_id: i64) -> StoreResult<Link>;

    /// Point lookup by id, irrespective of owner.
    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Link>>;

    /// One page of the user's links in insertion order.
    async fn find_by_user(&self, user_id: i64, offset: i64, limit: i64) -> StoreResult<Vec<Link>>;

    /// Delete by id. Deleting a missing id is not an error.
    async fn delete_by_id(&self, id: i64) -> StoreResult<()>;
}

/// SQLite-backed link store.
#[derive(Clone)]
pub struct SqliteLinkStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLinkStore {
    /// Open (or create) the database at the given path.
    pub fn new(db_path: &Path) -> StoreResult<Self> {
        Self::init(Connection::open(db_path)?)
    }

    /// In-memory database, used by tests.
    pub fn in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(
            r"
            CREATE TABLE IF NOT EXISTS links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                url TEXT NOT NULL UNIQUE,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_links_user ON links(user_id);
            ",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Internal(e.to_string()))
    }
}

fn row_to_link(row: &rusqlite::Row<'_>) -> rusqlite::Result<Link> {
    let created_at: String = row.get(4)?;
    Ok(Link {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        user_id: row.get(3)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[async_trait]
impl LinkStore for SqliteLinkStore {
    async fn create(&self, name: &str, url: &str, user_id: i64) -> StoreResult<Link> {
        let now = Utc::now();
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO links (name, url, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, url, user_id, now.to_rfc3339()],
        )?;

        Ok(Link {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            url: url.to_string(),
            user_id,
            created_at: now,
        })
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<Option<Link>> {
        let conn = self.lock()?;
        let link = conn
            .query_row(
                "SELECT id, name, url, user_id, created_at FROM links WHERE id = ?1",
                params![id],
                row_to_link,
            )
            .optional()?;
        Ok(link)
    }

    async fn find_by_user(&self, user_id: i64, offset: i64, limit: i64) -> StoreResult<Vec<Link>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, url, user_id, created_at FROM links
             WHERE user_id = ?1 ORDER BY id LIMIT ?2 OFFSET ?3",
        )?;

        let links = stmt
            .query_map(params![user_id, limit, offset], row_to_link)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(links)
    }

    async fn delete_by_id(&self, id: i64) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM links WHERE id = ?1", params![id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = SqliteLinkStore::in_memory().unwrap();
        let first = store.create("a", "https://a.example", 1).await.unwrap();
        let second = store.create("b", "https://b.example", 1).await.unwrap();
        assert_eq!(second.id, first.id + 1);
    }

    #[tokio::test]
    async fn duplicate_url_is_distinguished() {
        let store = SqliteLinkStore::in_memory().unwrap();
        store.create("a", "https://a.example", 1).await.unwrap();

        // Same url, different name and user: still a duplicate.
        let err = store.create("b", "https://a.example", 2).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateUrl));

        let links = store.find_by_user(1, 0, 10).await.unwrap();
        assert_eq!(links.len(), 1);
    }

    #[tokio::test]
    async fn find_by_id_ignores_owner() {
        let store = SqliteLinkStore::in_memory().unwrap();
        let link = store.create("a", "https://a.example", 1).await.unwrap();

        let found = store.find_by_id(link.id).await.unwrap().unwrap();
        assert_eq!(found.url, "https://a.example");
        assert_eq!(found.user_id, 1);

        assert!(store.find_by_id(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_user_pages_in_insertion_order() {
        let store = SqliteLinkStore::in_memory().unwrap();
        for i in 0..7 {
            store
                .create(&format!("link{i}"), &format!("https://example.com/{i}"), 1)
                .await
                .unwrap();
        }
        store.create("other", "https://other.example", 2).await.unwrap();

        let page1 = store.find_by_user(1, 0, 5).await.unwrap();
        assert_eq!(page1.len(), 5);
        assert_eq!(page1[0].name, "link0");
        assert_eq!(page1[4].name, "link4");

        let page2 = store.find_by_user(1, 5, 5).await.unwrap();
        assert_eq!(page2.len(), 2);
        assert_eq!(page2[0].name, "link5");

        let page3 = store.find_by_user(1, 10, 5).await.unwrap();
        assert!(page3.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let store = SqliteLinkStore::in_memory().unwrap();
        let link = store.create("a", "https://a.example", 1).await.unwrap();

        store.delete_by_id(link.id).await.unwrap();
        assert!(store.find_by_id(link.id).await.unwrap().is_none());

        // Deleting a missing id is a no-op.
        store.delete_by_id(link.id).await.unwrap();
    }

    #[tokio::test]
    async fn created_at_round_trips_through_text() {
        let store = SqliteLinkStore::in_memory().unwrap();
        let created = store.create("a", "https://a.example", 1).await.unwrap();
        let fetched = store.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.created_at.timestamp(), created.created_at.timestamp());
    }

    #[tokio::test]
    async fn opens_a_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.db");
        let store = SqliteLinkStore::new(&path).unwrap();
        store.create("a", "https://a.example", 1).await.unwrap();

        // Reopen and verify persistence.
        drop(store);
        let store = SqliteLinkStore::new(&path).unwrap();
        let links = store.find_by_user(1, 0, 5).await.unwrap();
        assert_eq!(links.len(), 1);
    }
}
