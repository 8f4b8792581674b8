//! Playlists keep their ordered video references as a JSON array column, the
//! same way list-valued fields are stored elsewhere in the schema.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::error::ApiResult;
use crate::ids::EntityId;

use super::{encode_timestamp, now, timestamp_column};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRecord {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub owner: EntityId,
    pub videos: Vec<EntityId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlaylistRecord {
    /// Appends `video` unless it is already listed. Returns whether it was added.
    pub fn add_video(&mut self, video: &EntityId) -> bool {
        if self.videos.contains(video) {
            return false;
        }
        self.videos.push(video.clone());
        true
    }

    /// Drops every occurrence of `video`. Returns whether anything was removed.
    pub fn remove_video(&mut self, video: &EntityId) -> bool {
        let before = self.videos.len();
        self.videos.retain(|id| id != video);
        self.videos.len() != before
    }
}

pub fn insert(
    conn: &Connection,
    owner: &EntityId,
    name: &str,
    description: &str,
) -> ApiResult<PlaylistRecord> {
    let stamp = now();
    let record = PlaylistRecord {
        id: EntityId::generate(),
        name: name.to_string(),
        description: description.to_string(),
        owner: owner.clone(),
        videos: Vec::new(),
        created_at: stamp,
        updated_at: stamp,
    };
    conn.execute(
        "INSERT INTO playlists (id, name, description, owner_id, videos_json, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, '[]', ?5, ?5)",
        params![
            record.id,
            record.name,
            record.description,
            record.owner,
            encode_timestamp(&stamp),
        ],
    )?;
    Ok(record)
}

pub fn find(conn: &Connection, id: &EntityId) -> ApiResult<Option<PlaylistRecord>> {
    let row = conn
        .query_row(
            "SELECT id, name, description, owner_id, videos_json, created_at, updated_at
             FROM playlists WHERE id = ?1",
            params![id],
            StoredPlaylist::from_row,
        )
        .optional()?;
    row.map(StoredPlaylist::decode).transpose()
}

/// Every playlist owned by `owner`, newest first.
pub fn list_by_owner(conn: &Connection, owner: &EntityId) -> ApiResult<Vec<PlaylistRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, owner_id, videos_json, created_at, updated_at
         FROM playlists WHERE owner_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let mut rows = stmt.query(params![owner])?;
    let mut playlists = Vec::new();
    while let Some(row) = rows.next()? {
        playlists.push(StoredPlaylist::from_row(row)?.decode()?);
    }
    Ok(playlists)
}

pub fn save(conn: &Connection, playlist: &mut PlaylistRecord) -> ApiResult<()> {
    let videos_json = serde_json::to_string(&playlist.videos)?;
    playlist.updated_at = now();
    conn.execute(
        "UPDATE playlists
         SET name = ?2, description = ?3, videos_json = ?4, updated_at = ?5
         WHERE id = ?1",
        params![
            playlist.id,
            playlist.name,
            playlist.description,
            videos_json,
            encode_timestamp(&playlist.updated_at),
        ],
    )?;
    Ok(())
}

/// Raw row before the JSON column is decoded; keeps `query_row` closures on
/// `rusqlite::Error` while decoding failures surface as `ApiError`.
struct StoredPlaylist {
    id: EntityId,
    name: String,
    description: String,
    owner: EntityId,
    videos_json: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StoredPlaylist {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            owner: row.get("owner_id")?,
            videos_json: row.get("videos_json")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }

    fn decode(self) -> ApiResult<PlaylistRecord> {
        let videos: Vec<EntityId> = serde_json::from_str(&self.videos_json)?;
        Ok(PlaylistRecord {
            id: self.id,
            name: self.name,
            description: self.description,
            owner: self.owner,
            videos,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
