//! Toggle relationships: likes and subscriptions.
//!
//! The presence of a row is the state. Both tables carry a UNIQUE constraint
//! on the pair, and callers run [`toggle_like`] / [`toggle_subscription`]
//! inside `Store::with_tx`, so a burst of toggles from one actor can never
//! leave two rows for the same pair.

use rusqlite::{Connection, params};

use crate::ids::EntityId;

use super::{encode_timestamp, now};

/// What a like points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Video,
    Comment,
    Tweet,
}

impl LikeTarget {
    pub fn kind(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Comment => "comment",
            Self::Tweet => "tweet",
        }
    }
}

/// Removes the pair if present, inserts it otherwise. Returns `true` when the
/// pair exists afterwards.
pub fn toggle_like(
    conn: &Connection,
    liked_by: &EntityId,
    target: LikeTarget,
    target_id: &EntityId,
) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM likes WHERE liked_by = ?1 AND target_kind = ?2 AND target_id = ?3",
        params![liked_by, target.kind(), target_id],
    )?;
    if removed > 0 {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO likes (id, target_kind, target_id, liked_by, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            EntityId::generate(),
            target.kind(),
            target_id,
            liked_by,
            encode_timestamp(&now()),
        ],
    )?;
    Ok(true)
}

pub fn toggle_subscription(
    conn: &Connection,
    subscriber: &EntityId,
    channel: &EntityId,
) -> rusqlite::Result<bool> {
    let removed = conn.execute(
        "DELETE FROM subscriptions WHERE channel_id = ?1 AND subscriber_id = ?2",
        params![channel, subscriber],
    )?;
    if removed > 0 {
        return Ok(false);
    }
    conn.execute(
        "INSERT INTO subscriptions (id, channel_id, subscriber_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            EntityId::generate(),
            channel,
            subscriber,
            encode_timestamp(&now()),
        ],
    )?;
    Ok(true)
}

#[cfg(test)]
pub fn count_likes(
    conn: &Connection,
    liked_by: &EntityId,
    target: LikeTarget,
    target_id: &EntityId,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM likes WHERE liked_by = ?1 AND target_kind = ?2 AND target_id = ?3",
        params![liked_by, target.kind(), target_id],
        |row| row.get(0),
    )
}

#[cfg(test)]
pub fn count_subscriptions(
    conn: &Connection,
    subscriber: &EntityId,
    channel: &EntityId,
) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM subscriptions WHERE channel_id = ?1 AND subscriber_id = ?2",
        params![channel, subscriber],
        |row| row.get(0),
    )
}
