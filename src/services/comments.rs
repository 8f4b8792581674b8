//! Comments on videos.
//!
//! Editing is reserved to the comment's author. Deleting is also allowed to
//! the owner of the video the comment sits under, so channel owners can
//! moderate their comment sections.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::ids::EntityId;
use crate::security::Actor;
use crate::store::{Collection, Store, comments, exists, timestamp_column, videos};
use crate::views::{Page, PageRequest, Pipeline, ProfileFields, Sort};

use super::required_text;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub content: String,
    #[serde(flatten)]
    pub author: ProfileFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentView {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            content: row.get("content")?,
            author: ProfileFields::from_row(row, "author")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }
}

fn video_comments_pipeline(video: &EntityId) -> Pipeline {
    Pipeline::from("comments", "c")
        .project(&[
            "c.id AS id",
            "c.content AS content",
            "c.created_at AS created_at",
            "c.updated_at AS updated_at",
        ])
        .match_id("c.video_id", video)
        .lookup_profile("c.owner_id", "author")
        .sort(Sort::newest_first("c.created_at"))
}

/// Paginated comments under a video, newest first.
pub fn list_for_video(
    store: &Store,
    video: &EntityId,
    page: PageRequest,
) -> ApiResult<Page<CommentView>> {
    store.with_conn(|conn| {
        if !exists(conn, Collection::Videos, video)? {
            return Err(ApiError::not_found("video not found with this video id"));
        }
        Ok(video_comments_pipeline(video).paginate(conn, page, CommentView::from_row)?)
    })
}

pub fn add(
    store: &Store,
    actor: &Actor,
    video: &EntityId,
    content: Option<&str>,
) -> ApiResult<comments::CommentRecord> {
    let owner = actor.require()?;
    store.with_tx(|tx| {
        if !exists(tx, Collection::Videos, video)? {
            return Err(ApiError::not_found("video not found with this video id"));
        }
        let content = required_text(content, "comment content is missing and required")?;
        Ok(comments::insert(tx, video, owner, &content)?)
    })
}

pub fn update(
    store: &Store,
    actor: &Actor,
    comment_id: &EntityId,
    content: Option<&str>,
) -> ApiResult<comments::CommentRecord> {
    store.with_tx(|tx| {
        let mut comment = comments::find(tx, comment_id)?
            .ok_or_else(|| ApiError::not_found("comment not found with this id"))?;
        actor.ensure_owns(&comment.owner, "update this comment")?;
        comment.content = required_text(content, "comment must not be blank")?;
        comments::save(tx, &mut comment)?;
        Ok(comment)
    })
}

/// Deletes a comment when the actor wrote it or owns the video it is on.
pub fn delete(store: &Store, actor: &Actor, comment_id: &EntityId) -> ApiResult<()> {
    store.with_tx(|tx| {
        let comment = comments::find(tx, comment_id)?
            .ok_or_else(|| ApiError::not_found("comment not found"))?;
        let moderates = videos::owner_of(tx, &comment.video)?
            .is_some_and(|video_owner| actor.owns(&video_owner));
        if !actor.owns(&comment.owner) && !moderates {
            return Err(ApiError::forbidden(
                "user unauthorized to delete this comment",
            ));
        }
        crate::store::delete(tx, Collection::Comments, comment_id)?;
        Ok(())
    })
}
