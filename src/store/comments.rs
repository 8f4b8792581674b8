use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::ids::EntityId;

use super::{encode_timestamp, now, timestamp_column};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub content: String,
    pub video: EntityId,
    pub owner: EntityId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn insert(
    conn: &Connection,
    video: &EntityId,
    owner: &EntityId,
    content: &str,
) -> rusqlite::Result<CommentRecord> {
    let stamp = now();
    let record = CommentRecord {
        id: EntityId::generate(),
        content: content.to_string(),
        video: video.clone(),
        owner: owner.clone(),
        created_at: stamp,
        updated_at: stamp,
    };
    conn.execute(
        "INSERT INTO comments (id, content, video_id, owner_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![
            record.id,
            record.content,
            record.video,
            record.owner,
            encode_timestamp(&stamp),
        ],
    )?;
    Ok(record)
}

pub fn find(conn: &Connection, id: &EntityId) -> rusqlite::Result<Option<CommentRecord>> {
    conn.query_row(
        "SELECT id, content, video_id, owner_id, created_at, updated_at
         FROM comments WHERE id = ?1",
        params![id],
        row_to_comment,
    )
    .optional()
}

pub fn save(conn: &Connection, comment: &mut CommentRecord) -> rusqlite::Result<()> {
    comment.updated_at = now();
    conn.execute(
        "UPDATE comments SET content = ?2, updated_at = ?3 WHERE id = ?1",
        params![
            comment.id,
            comment.content,
            encode_timestamp(&comment.updated_at),
        ],
    )?;
    Ok(())
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<CommentRecord> {
    Ok(CommentRecord {
        id: row.get("id")?,
        content: row.get("content")?,
        video: row.get("video_id")?,
        owner: row.get("owner_id")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}
