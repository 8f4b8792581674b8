//! SQLite-backed entity store.
//!
//! The platform treats its database like a document store: every collection
//! is keyed by an [`EntityId`], references between collections are plain id
//! columns without foreign keys, and a reference may outlive its target. The
//! view layer (`crate::views`) is responsible for tolerating those dangling
//! references when it assembles read models.
//!
//! One connection is shared behind a mutex. Reads go through
//! [`Store::with_conn`]; anything that checks state and then writes goes
//! through [`Store::with_tx`], which opens an IMMEDIATE transaction so the
//! check and the write cannot interleave with another writer.

pub mod comments;
pub mod pairs;
pub mod playlists;
pub mod tweets;
pub mod users;
pub mod videos;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior, params};

use crate::error::ApiResult;
use crate::ids::EntityId;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Collections addressable by id. Table names never come from callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Videos,
    Comments,
    Tweets,
    Playlists,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Videos => "videos",
            Self::Comments => "comments",
            Self::Tweets => "tweets",
            Self::Playlists => "playlists",
        }
    }
}

#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Opens (and if necessary creates) the database file and ensures the
    /// schema exists. WAL mode keeps readers from blocking the writer.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory {}", parent.display()))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("opening database {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("enabling WAL mode")?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .context("setting synchronous mode")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)
            .context("setting busy timeout")?;
        let mut conn = conn;
        ensure_tables(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Connection) -> ApiResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Runs `f` inside an IMMEDIATE transaction, committing only when it
    /// returns `Ok`. Dropping the transaction on the error path rolls back.
    pub fn with_tx<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> ApiResult<T>,
    {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Runs the schema DDL in one transaction so a failure leaves the file untouched.
fn ensure_tables(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            avatar TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            duration REAL NOT NULL DEFAULT 0,
            video_file TEXT NOT NULL,
            thumbnail TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            is_published INTEGER NOT NULL DEFAULT 0,
            views INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            video_id TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tweets (
            id TEXT PRIMARY KEY,
            content TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS playlists (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            videos_json TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY,
            channel_id TEXT NOT NULL,
            subscriber_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (channel_id, subscriber_id),
            CHECK (channel_id <> subscriber_id)
        );

        CREATE TABLE IF NOT EXISTS likes (
            id TEXT PRIMARY KEY,
            target_kind TEXT NOT NULL CHECK (target_kind IN ('video', 'comment', 'tweet')),
            target_id TEXT NOT NULL,
            liked_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (liked_by, target_kind, target_id)
        );

        CREATE INDEX IF NOT EXISTS idx_videos_owner ON videos(owner_id);
        CREATE INDEX IF NOT EXISTS idx_comments_video ON comments(video_id);
        CREATE INDEX IF NOT EXISTS idx_tweets_owner ON tweets(owner_id);
        CREATE INDEX IF NOT EXISTS idx_playlists_owner ON playlists(owner_id);
        CREATE INDEX IF NOT EXISTS idx_subscriptions_subscriber ON subscriptions(subscriber_id);
        "#,
    )?;

    tx.commit()?;
    Ok(())
}

pub fn exists(conn: &Connection, collection: Collection, id: &EntityId) -> rusqlite::Result<bool> {
    conn.query_row(
        &format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)",
            collection.table()
        ),
        params![id],
        |row| row.get(0),
    )
}

/// Deletes one document, reporting whether anything was removed.
pub fn delete(conn: &Connection, collection: Collection, id: &EntityId) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        &format!("DELETE FROM {} WHERE id = ?1", collection.table()),
        params![id],
    )?;
    Ok(removed > 0)
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Fixed-width RFC 3339 so lexical order in SQLite matches time order.
pub fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn timestamp_column(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
        })
}
