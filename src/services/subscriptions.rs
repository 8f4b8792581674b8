//! Channel subscriptions. A channel is simply a user; subscribing to it is a
//! toggle on the (channel, subscriber) pair.

use rusqlite::Row;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::ids::EntityId;
use crate::security::Actor;
use crate::store::{Collection, Store, exists, pairs};
use crate::views::{Pipeline, ProfileFields, Sort};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriptionState {
    pub subscribed: bool,
}

/// One side of a subscription, shown with its public profile.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfileView {
    #[serde(rename = "_id")]
    pub id: EntityId,
    #[serde(flatten)]
    pub profile: ProfileFields,
}

impl ChannelProfileView {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("user_id")?,
            profile: ProfileFields::from_row(row, "profile")?,
        })
    }
}

/// Subscribes the actor to `channel`, or unsubscribes if already subscribed.
pub fn toggle(store: &Store, actor: &Actor, channel: &EntityId) -> ApiResult<SubscriptionState> {
    if actor.owns(channel) {
        return Err(ApiError::invalid(
            "user can not subscribe/unsubscribe its own channel",
        ));
    }
    let subscriber = actor.require()?;
    store.with_tx(|tx| {
        if !exists(tx, Collection::Users, channel)? {
            return Err(ApiError::not_found("channel with this id does not exist"));
        }
        let subscribed = pairs::toggle_subscription(tx, subscriber, channel)?;
        Ok(SubscriptionState { subscribed })
    })
}

/// Users subscribed to `channel`, most recent subscription first.
pub fn subscribers(store: &Store, channel: &EntityId) -> ApiResult<Vec<ChannelProfileView>> {
    store.with_conn(|conn| {
        if !exists(conn, Collection::Users, channel)? {
            return Err(ApiError::not_found("channel not found with this channel id"));
        }
        let pipeline = Pipeline::from("subscriptions", "s")
            .project(&["s.subscriber_id AS user_id"])
            .match_id("s.channel_id", channel)
            .lookup_profile("s.subscriber_id", "profile")
            .sort(Sort::newest_first("s.created_at"));
        Ok(pipeline.run(conn, ChannelProfileView::from_row)?)
    })
}

/// Channels `subscriber` follows, most recent subscription first.
pub fn subscribed_channels(
    store: &Store,
    subscriber: &EntityId,
) -> ApiResult<Vec<ChannelProfileView>> {
    store.with_conn(|conn| {
        if !exists(conn, Collection::Users, subscriber)? {
            return Err(ApiError::not_found(
                "subscriber not found with this subscriber id",
            ));
        }
        let pipeline = Pipeline::from("subscriptions", "s")
            .project(&["s.channel_id AS user_id"])
            .match_id("s.subscriber_id", subscriber)
            .lookup_profile("s.channel_id", "profile")
            .sort(Sort::newest_first("s.created_at"));
        Ok(pipeline.run(conn, ChannelProfileView::from_row)?)
    })
}
