use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::ids::EntityId;

use super::{encode_timestamp, now, timestamp_column};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetRecord {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub content: String,
    pub owner: EntityId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn insert(conn: &Connection, owner: &EntityId, content: &str) -> rusqlite::Result<TweetRecord> {
    let stamp = now();
    let record = TweetRecord {
        id: EntityId::generate(),
        content: content.to_string(),
        owner: owner.clone(),
        created_at: stamp,
        updated_at: stamp,
    };
    conn.execute(
        "INSERT INTO tweets (id, content, owner_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)",
        params![record.id, record.content, record.owner, encode_timestamp(&stamp)],
    )?;
    Ok(record)
}

pub fn find(conn: &Connection, id: &EntityId) -> rusqlite::Result<Option<TweetRecord>> {
    conn.query_row(
        "SELECT id, content, owner_id, created_at, updated_at FROM tweets WHERE id = ?1",
        params![id],
        row_to_tweet,
    )
    .optional()
}

pub fn save(conn: &Connection, tweet: &mut TweetRecord) -> rusqlite::Result<()> {
    tweet.updated_at = now();
    conn.execute(
        "UPDATE tweets SET content = ?2, updated_at = ?3 WHERE id = ?1",
        params![tweet.id, tweet.content, encode_timestamp(&tweet.updated_at)],
    )?;
    Ok(())
}

fn row_to_tweet(row: &Row<'_>) -> rusqlite::Result<TweetRecord> {
    Ok(TweetRecord {
        id: row.get("id")?,
        content: row.get("content")?,
        owner: row.get("owner_id")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}
