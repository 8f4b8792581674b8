//! Video catalogue: search, publishing and owner edits.
//!
//! Media objects live on a [`MediaHost`]. Uploads happen outside database
//! transactions; superseded objects are deleted only after the row change has
//! committed, and a failed deletion is logged rather than reported.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::ids::EntityId;
use crate::media::{MediaHost, UploadedMedia, delete_best_effort};
use crate::security::Actor;
use crate::store::{Collection, Store, timestamp_column, videos};
use crate::views::{Direction, OwnerProfile, Page, PageRequest, Pipeline, Sort};

use super::{optional_text, required_text};

/// Columns of the `v` alias that every video view projects.
const VIDEO_VIEW_COLUMNS: [&str; 10] = [
    "v.id AS id",
    "v.title AS title",
    "v.description AS description",
    "v.duration AS duration",
    "v.video_file AS video_file",
    "v.thumbnail AS thumbnail",
    "v.is_published AS is_published",
    "v.views AS views",
    "v.created_at AS created_at",
    "v.updated_at AS updated_at",
];

/// A video with its owner's public profile nested under `owner`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub video_file: String,
    pub thumbnail: String,
    pub owner: Option<OwnerProfile>,
    pub is_published: bool,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoView {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            duration: row.get("duration")?,
            video_file: row.get("video_file")?,
            thumbnail: row.get("thumbnail")?,
            owner: OwnerProfile::from_row(row, "owner")?,
            is_published: row.get("is_published")?,
            views: row.get("views")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }
}

/// Adds the video projection and owner lookup to a pipeline that has the
/// `videos` table available under the alias `v`.
pub(crate) fn with_video_view(pipeline: Pipeline) -> Pipeline {
    pipeline
        .project(&VIDEO_VIEW_COLUMNS)
        .lookup_profile("v.owner_id", "owner")
}

/// Sortable fields of the catalogue listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Duration,
    Views,
}

impl SortKey {
    /// Unknown or missing keys sort by creation time.
    pub fn from_token(token: Option<&str>) -> Self {
        match token.map(str::trim) {
            Some("updatedAt") => Self::UpdatedAt,
            Some("title") => Self::Title,
            Some("duration") => Self::Duration,
            Some("views") => Self::Views,
            _ => Self::CreatedAt,
        }
    }

    fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "v.created_at",
            Self::UpdatedAt => "v.updated_at",
            Self::Title => "v.title",
            Self::Duration => "v.duration",
            Self::Views => "v.views",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListVideos {
    pub page: PageRequest,
    pub query: Option<String>,
    pub sort_by: SortKey,
    pub direction: Direction,
    pub owner: Option<EntityId>,
}

/// Paginated catalogue. `query` matches title or description.
pub fn list(store: &Store, request: &ListVideos) -> ApiResult<Page<VideoView>> {
    let mut pipeline = with_video_view(Pipeline::from("videos", "v"))
        .match_contains_any(
            &["v.title", "v.description"],
            request.query.as_deref().unwrap_or_default(),
        )
        .sort(Sort {
            column: request.sort_by.column(),
            direction: request.direction,
        });
    if let Some(owner) = &request.owner {
        pipeline = pipeline.match_id("v.owner_id", owner);
    }
    store.with_conn(|conn| Ok(pipeline.paginate(conn, request.page, VideoView::from_row)?))
}

pub fn by_id(store: &Store, video_id: &EntityId) -> ApiResult<VideoView> {
    let pipeline = with_video_view(Pipeline::from("videos", "v")).match_id("v.id", video_id);
    store
        .with_conn(|conn| Ok(pipeline.first(conn, VideoView::from_row)?))?
        .ok_or_else(|| ApiError::not_found("video not found"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PublishVideo<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub video_file: Option<&'a Path>,
    pub thumbnail: Option<&'a Path>,
}

fn upload(host: &dyn MediaHost, local: &Path, what: &str) -> ApiResult<UploadedMedia> {
    host.upload(local).map_err(|err| {
        tracing::warn!(error = format!("{err:#}"), "{what} upload failed");
        ApiError::invalid(format!("{what} upload failed"))
    })
}

/// Uploads both files and stores a new, unpublished video owned by the actor.
pub fn publish(
    store: &Store,
    host: &dyn MediaHost,
    actor: &Actor,
    request: PublishVideo<'_>,
) -> ApiResult<videos::VideoRecord> {
    let owner = actor.require()?;
    let title = required_text(request.title, "all fields are required")?;
    let description = required_text(request.description, "all fields are required")?;
    let video_path = request
        .video_file
        .ok_or_else(|| ApiError::invalid("video file is required"))?;
    let thumbnail_path = request
        .thumbnail
        .ok_or_else(|| ApiError::invalid("thumbnail is required"))?;

    let video_file = upload(host, video_path, "video file")?;
    let thumbnail = match upload(host, thumbnail_path, "thumbnail") {
        Ok(thumbnail) => thumbnail,
        Err(err) => {
            delete_best_effort(host, &video_file.url);
            return Err(err);
        }
    };

    let new_video = videos::NewVideo {
        title,
        description,
        duration: video_file.duration.unwrap_or(0.0),
        video_file: video_file.url.clone(),
        thumbnail: thumbnail.url.clone(),
        owner: owner.clone(),
    };
    let stored = store.with_tx(|tx| {
        let id = videos::insert(tx, &new_video)?;
        videos::find(tx, &id)?
            .ok_or_else(|| ApiError::internal("video upload failed, please try again"))
    });
    if stored.is_err() {
        delete_best_effort(host, &thumbnail.url);
        delete_best_effort(host, &video_file.url);
    }
    stored
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VideoChanges<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub thumbnail: Option<&'a Path>,
}

impl VideoChanges<'_> {
    fn is_empty(&self) -> bool {
        optional_text(self.title).is_none()
            && optional_text(self.description).is_none()
            && self.thumbnail.is_none()
    }
}

/// Edits title, description or thumbnail. Blank text fields keep their old
/// value. A replaced thumbnail is removed from the media host once the new
/// one is on record.
pub fn update(
    store: &Store,
    host: &dyn MediaHost,
    actor: &Actor,
    video_id: &EntityId,
    changes: VideoChanges<'_>,
) -> ApiResult<videos::VideoRecord> {
    store.with_conn(|conn| {
        let video =
            videos::find(conn, video_id)?.ok_or_else(|| ApiError::not_found("video not found"))?;
        actor.ensure_owns(&video.owner, "update this video")?;
        if changes.is_empty() {
            return Err(ApiError::invalid(
                "any of the title, description and thumbnail is required to update",
            ));
        }
        Ok(())
    })?;

    let thumbnail = changes
        .thumbnail
        .map(|path| upload(host, path, "thumbnail"))
        .transpose()?;

    // Ownership is checked again: the upload ran outside any transaction.
    let saved = store.with_tx(|tx| {
        let mut video =
            videos::find(tx, video_id)?.ok_or_else(|| ApiError::not_found("video not found"))?;
        actor.ensure_owns(&video.owner, "update this video")?;
        let previous_thumbnail = video.thumbnail.clone();
        if let Some(title) = optional_text(changes.title) {
            video.title = title;
        }
        if let Some(description) = optional_text(changes.description) {
            video.description = description;
        }
        if let Some(thumbnail) = &thumbnail {
            video.thumbnail = thumbnail.url.clone();
        }
        videos::save(tx, &mut video)?;
        Ok((video, previous_thumbnail))
    });

    match saved {
        Ok((video, previous_thumbnail)) => {
            if thumbnail.is_some() && previous_thumbnail != video.thumbnail {
                delete_best_effort(host, &previous_thumbnail);
            }
            Ok(video)
        }
        Err(err) => {
            if let Some(thumbnail) = &thumbnail {
                delete_best_effort(host, &thumbnail.url);
            }
            Err(err)
        }
    }
}

/// Removes the video row, then both of its media objects (best effort).
pub fn delete(
    store: &Store,
    host: &dyn MediaHost,
    actor: &Actor,
    video_id: &EntityId,
) -> ApiResult<()> {
    let video = store.with_tx(|tx| {
        let video =
            videos::find(tx, video_id)?.ok_or_else(|| ApiError::not_found("video not found"))?;
        actor.ensure_owns(&video.owner, "delete this video")?;
        crate::store::delete(tx, Collection::Videos, video_id)?;
        Ok(video)
    })?;
    delete_best_effort(host, &video.thumbnail);
    delete_best_effort(host, &video.video_file);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PublishStatus {
    Published,
    Unpublished,
}

impl PublishStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::Unpublished => "unpublished",
        }
    }
}

pub fn toggle_publish(
    store: &Store,
    actor: &Actor,
    video_id: &EntityId,
) -> ApiResult<(videos::VideoRecord, PublishStatus)> {
    store.with_tx(|tx| {
        let mut video =
            videos::find(tx, video_id)?.ok_or_else(|| ApiError::not_found("video not found"))?;
        actor.ensure_owns(&video.owner, "change the publish status of this video")?;
        video.is_published = !video.is_published;
        videos::save(tx, &mut video)?;
        let status = if video.is_published {
            PublishStatus::Published
        } else {
            PublishStatus::Unpublished
        };
        Ok((video, status))
    })
}
