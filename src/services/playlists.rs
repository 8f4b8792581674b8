//! User-curated playlists: an ordered, duplicate-free list of video ids.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::ids::EntityId;
use crate::security::Actor;
use crate::store::{Collection, Store, exists, playlists, timestamp_column};
use crate::views::{Pipeline, ProfileFields, Sort};

use super::videos::{VideoView, with_video_view};
use super::{optional_text, required_text};

/// Entry of a user's playlist listing. `video_count` is the stored list
/// length, deleted videos included.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistSummary {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub videos: Vec<EntityId>,
    pub video_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<playlists::PlaylistRecord> for PlaylistSummary {
    fn from(record: playlists::PlaylistRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description,
            video_count: record.videos.len(),
            videos: record.videos,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// A playlist with its owner's profile promoted to top-level fields and its
/// videos resolved. `video_count` counts only videos that still exist.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistView {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub playlist_username: Option<String>,
    pub playlist_full_name: Option<String>,
    pub playlist_avatar: Option<String>,
    pub playlist_videos: Vec<VideoView>,
    pub video_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Playlist row as assembled by the header pipeline, before its videos are
/// looked up.
struct PlaylistHeader {
    id: EntityId,
    name: String,
    description: String,
    videos_json: String,
    owner: ProfileFields,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PlaylistHeader {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            videos_json: row.get("videos_json")?,
            owner: ProfileFields::from_row(row, "owner")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }
}

pub fn create(
    store: &Store,
    actor: &Actor,
    name: Option<&str>,
    description: Option<&str>,
) -> ApiResult<playlists::PlaylistRecord> {
    let owner = actor.require()?;
    let message = "name and description both are required";
    let name = required_text(name, message)?;
    let description = required_text(description, message)?;
    store.with_conn(|conn| playlists::insert(conn, owner, &name, &description))
}

pub fn list_for_user(store: &Store, user: &EntityId) -> ApiResult<Vec<PlaylistSummary>> {
    store.with_conn(|conn| {
        if !exists(conn, Collection::Users, user)? {
            return Err(ApiError::not_found("user not found with this id"));
        }
        let playlists = playlists::list_by_owner(conn, user)?;
        Ok(playlists.into_iter().map(PlaylistSummary::from).collect())
    })
}

/// Assembles the playlist with its owner profile and resolved videos, newest
/// video first.
pub fn by_id(store: &Store, playlist_id: &EntityId) -> ApiResult<PlaylistView> {
    store.with_conn(|conn| {
        if !exists(conn, Collection::Playlists, playlist_id)? {
            return Err(ApiError::not_found("playlist not found"));
        }
        let header = Pipeline::from("playlists", "p")
            .project(&[
                "p.id AS id",
                "p.name AS name",
                "p.description AS description",
                "p.videos_json AS videos_json",
                "p.created_at AS created_at",
                "p.updated_at AS updated_at",
            ])
            .match_id("p.id", playlist_id)
            .lookup_profile("p.owner_id", "owner")
            .first(conn, PlaylistHeader::from_row)?
            .ok_or_else(|| ApiError::not_found("playlist is missing"))?;

        let video_ids: Vec<EntityId> = serde_json::from_str(&header.videos_json)?;
        let videos = with_video_view(Pipeline::from("videos", "v"))
            .match_any_id("v.id", &video_ids)
            .sort(Sort::newest_first("v.created_at"))
            .run(conn, VideoView::from_row)?;

        Ok(PlaylistView {
            id: header.id,
            name: header.name,
            description: header.description,
            playlist_username: header.owner.username,
            playlist_full_name: header.owner.full_name,
            playlist_avatar: header.owner.avatar,
            video_count: videos.len(),
            playlist_videos: videos,
            created_at: header.created_at,
            updated_at: header.updated_at,
        })
    })
}

/// Appends `video` to the playlist unless it is already there.
pub fn add_video(
    store: &Store,
    actor: &Actor,
    video: &EntityId,
    playlist_id: &EntityId,
) -> ApiResult<playlists::PlaylistRecord> {
    store.with_tx(|tx| {
        if !exists(tx, Collection::Videos, video)? {
            return Err(ApiError::not_found("video to be added does not exist"));
        }
        let mut playlist = playlists::find(tx, playlist_id)?
            .ok_or_else(|| ApiError::not_found("playlist not found"))?;
        actor.ensure_owns(&playlist.owner, "add videos to this playlist")?;
        if playlist.add_video(video) {
            playlists::save(tx, &mut playlist)?;
        }
        Ok(playlist)
    })
}

/// Drops every occurrence of `video`. The video itself need not exist.
pub fn remove_video(
    store: &Store,
    actor: &Actor,
    video: &EntityId,
    playlist_id: &EntityId,
) -> ApiResult<playlists::PlaylistRecord> {
    store.with_tx(|tx| {
        let mut playlist = playlists::find(tx, playlist_id)?
            .ok_or_else(|| ApiError::not_found("playlist not found"))?;
        actor.ensure_owns(&playlist.owner, "remove videos from this playlist")?;
        if playlist.remove_video(video) {
            playlists::save(tx, &mut playlist)?;
        }
        Ok(playlist)
    })
}

/// Renames or redescribes a playlist. Blank fields keep their old value but
/// at least one must be given.
pub fn update(
    store: &Store,
    actor: &Actor,
    playlist_id: &EntityId,
    name: Option<&str>,
    description: Option<&str>,
) -> ApiResult<playlists::PlaylistRecord> {
    store.with_tx(|tx| {
        let mut playlist = playlists::find(tx, playlist_id)?
            .ok_or_else(|| ApiError::not_found("playlist not found"))?;
        actor.ensure_owns(&playlist.owner, "update this playlist")?;
        let name = optional_text(name);
        let description = optional_text(description);
        if name.is_none() && description.is_none() {
            return Err(ApiError::invalid(
                "any one of the name and description must exist",
            ));
        }
        if let Some(name) = name {
            playlist.name = name;
        }
        if let Some(description) = description {
            playlist.description = description;
        }
        playlists::save(tx, &mut playlist)?;
        Ok(playlist)
    })
}

pub fn delete(store: &Store, actor: &Actor, playlist_id: &EntityId) -> ApiResult<()> {
    store.with_tx(|tx| {
        let playlist = playlists::find(tx, playlist_id)?
            .ok_or_else(|| ApiError::not_found("playlist not found or already deleted"))?;
        actor.ensure_owns(&playlist.owner, "delete this playlist")?;
        crate::store::delete(tx, Collection::Playlists, playlist_id)?;
        Ok(())
    })
}
