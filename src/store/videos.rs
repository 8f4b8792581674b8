use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::ids::EntityId;

use super::{encode_timestamp, now, timestamp_column};

/// Row stored in the `videos` table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRecord {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub video_file: String,
    pub thumbnail: String,
    pub owner: EntityId,
    pub is_published: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub video_file: String,
    pub thumbnail: String,
    pub owner: EntityId,
}

/// Columns every lookup selects, in the shape `row_to_video` expects.
const VIDEO_COLUMNS: &str = "id, title, description, duration, video_file, thumbnail, \
                             owner_id, is_published, views, created_at, updated_at";

/// New videos start unpublished.
pub fn insert(conn: &Connection, video: &NewVideo) -> rusqlite::Result<EntityId> {
    let id = EntityId::generate();
    let stamp = encode_timestamp(&now());
    conn.execute(
        r#"
        INSERT INTO videos (
            id, title, description, duration, video_file, thumbnail,
            owner_id, is_published, views, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, ?8, ?8)
        "#,
        params![
            id,
            video.title,
            video.description,
            video.duration,
            video.video_file,
            video.thumbnail,
            video.owner,
            stamp,
        ],
    )?;
    Ok(id)
}

pub fn find(conn: &Connection, id: &EntityId) -> rusqlite::Result<Option<VideoRecord>> {
    conn.query_row(
        &format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?1"),
        params![id],
        row_to_video,
    )
    .optional()
}

/// Owner of a video, or `None` when the video is gone.
pub fn owner_of(conn: &Connection, id: &EntityId) -> rusqlite::Result<Option<EntityId>> {
    conn.query_row(
        "SELECT owner_id FROM videos WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .optional()
}

/// Persists the editable fields of `video` and bumps `updated_at` on it.
pub fn save(conn: &Connection, video: &mut VideoRecord) -> rusqlite::Result<()> {
    video.updated_at = now();
    conn.execute(
        r#"
        UPDATE videos
        SET title = ?2, description = ?3, thumbnail = ?4, is_published = ?5, updated_at = ?6
        WHERE id = ?1
        "#,
        params![
            video.id,
            video.title,
            video.description,
            video.thumbnail,
            video.is_published,
            encode_timestamp(&video.updated_at),
        ],
    )?;
    Ok(())
}

fn row_to_video(row: &Row<'_>) -> rusqlite::Result<VideoRecord> {
    Ok(VideoRecord {
        id: row.get("id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        duration: row.get("duration")?,
        video_file: row.get("video_file")?,
        thumbnail: row.get("thumbnail")?,
        owner: row.get("owner_id")?,
        is_published: row.get("is_published")?,
        views: row.get("views")?,
        created_at: timestamp_column(row, "created_at")?,
        updated_at: timestamp_column(row, "updated_at")?,
    })
}
