//! User profiles. Accounts are owned by the external auth service; this crate
//! only provisions the display profile other collections point at.

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::ids::EntityId;

use super::{Store, encode_timestamp, now};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(rename = "_id")]
    pub id: EntityId,
    pub username: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub fn insert(
    store: &Store,
    username: &str,
    full_name: &str,
    avatar: Option<&str>,
) -> ApiResult<UserRecord> {
    let username = username.trim().to_lowercase();
    let full_name = full_name.trim().to_string();
    if username.is_empty() || full_name.is_empty() {
        return Err(ApiError::invalid("username and full name are required"));
    }
    let record = UserRecord {
        id: EntityId::generate(),
        username,
        full_name,
        avatar: avatar.map(str::trim).filter(|a| !a.is_empty()).map(String::from),
        created_at: now(),
    };

    store.with_tx(|tx| {
        let taken: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
            params![record.username],
            |row| row.get(0),
        )?;
        if taken {
            return Err(ApiError::invalid(format!(
                "username {} is already taken",
                record.username
            )));
        }
        tx.execute(
            "INSERT INTO users (id, username, full_name, avatar, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.id,
                record.username,
                record.full_name,
                record.avatar,
                encode_timestamp(&record.created_at),
            ],
        )?;
        Ok(())
    })?;

    Ok(record)
}

#[cfg(test)]
pub fn find(store: &Store, id: &EntityId) -> ApiResult<Option<UserRecord>> {
    use rusqlite::OptionalExtension;

    store.with_conn(|conn| {
        Ok(conn
            .query_row(
                "SELECT id, username, full_name, avatar, created_at FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()?)
    })
}

#[cfg(test)]
/// Removes a profile. Content that points at it stays behind as a dangling
/// reference.
pub fn delete(store: &Store, id: &EntityId) -> ApiResult<bool> {
    store.with_conn(|conn| Ok(super::delete(conn, super::Collection::Users, id)?))
}

#[cfg(test)]
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get("id")?,
        username: row.get("username")?,
        full_name: row.get("full_name")?,
        avatar: row.get("avatar")?,
        created_at: super::timestamp_column(row, "created_at")?,
    })
}
