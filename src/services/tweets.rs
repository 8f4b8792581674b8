//! Tweets: short text posts that only their author may edit or delete.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::ids::EntityId;
use crate::security::Actor;
use crate::store::{Collection, Store, exists, timestamp_column, tweets};
use crate::views::{Pipeline, ProfileFields, Sort};

use super::required_text;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetView {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub content: String,
    #[serde(flatten)]
    pub owner: ProfileFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TweetView {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            content: row.get("content")?,
            owner: ProfileFields::from_row(row, "owner")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }
}

pub fn create(store: &Store, actor: &Actor, content: Option<&str>) -> ApiResult<tweets::TweetRecord> {
    let owner = actor.require()?;
    let content = required_text(content, "can not add a blank tweet")?;
    store.with_conn(|conn| Ok(tweets::insert(conn, owner, &content)?))
}

/// All tweets by `user`, newest first, with the author's profile inlined.
pub fn list_for_user(store: &Store, user: &EntityId) -> ApiResult<Vec<TweetView>> {
    store.with_conn(|conn| {
        if !exists(conn, Collection::Users, user)? {
            return Err(ApiError::not_found("user with this id is not found"));
        }
        let pipeline = Pipeline::from("tweets", "t")
            .project(&[
                "t.id AS id",
                "t.content AS content",
                "t.created_at AS created_at",
                "t.updated_at AS updated_at",
            ])
            .match_id("t.owner_id", user)
            .lookup_profile("t.owner_id", "owner")
            .sort(Sort::newest_first("t.created_at"));
        Ok(pipeline.run(conn, TweetView::from_row)?)
    })
}

pub fn update(
    store: &Store,
    actor: &Actor,
    tweet_id: &EntityId,
    content: Option<&str>,
) -> ApiResult<tweets::TweetRecord> {
    store.with_tx(|tx| {
        let mut tweet =
            tweets::find(tx, tweet_id)?.ok_or_else(|| ApiError::not_found("tweet not found"))?;
        actor.ensure_owns(&tweet.owner, "update this tweet")?;
        tweet.content = required_text(content, "content must not be empty")?;
        tweets::save(tx, &mut tweet)?;
        Ok(tweet)
    })
}

pub fn delete(store: &Store, actor: &Actor, tweet_id: &EntityId) -> ApiResult<()> {
    store.with_tx(|tx| {
        let tweet =
            tweets::find(tx, tweet_id)?.ok_or_else(|| ApiError::not_found("tweet not found"))?;
        actor.ensure_owns(&tweet.owner, "delete this tweet")?;
        crate::store::delete(tx, Collection::Tweets, tweet_id)?;
        Ok(())
    })
}
