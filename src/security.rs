#![forbid(unsafe_code)]

//! Acting identity and ownership checks.
//!
//! Authentication happens upstream: the gateway in front of the backend
//! verifies the session and forwards the user id in the `X-User-Id` header.
//! This module only turns that header into an [`Actor`] and answers "may this
//! actor touch that document". A missing or malformed header produces an
//! anonymous actor, which owns nothing.

use std::convert::Infallible;

use anyhow::{Result, bail};
use axum::{extract::FromRequestParts, http::request::Parts};
use nix::unistd::Uid;

use crate::error::{ApiError, ApiResult};
use crate::ids::EntityId;

pub const ACTOR_HEADER: &str = "x-user-id";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Actor(Option<EntityId>);

impl Actor {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn user(id: EntityId) -> Self {
        Self(Some(id))
    }

    pub fn id(&self) -> Option<&EntityId> {
        self.0.as_ref()
    }

    /// The acting user id, for operations that create content in its name.
    pub fn require(&self) -> ApiResult<&EntityId> {
        self.0
            .as_ref()
            .ok_or_else(|| ApiError::forbidden("an authenticated user is required"))
    }

    /// True only when the actor is known and equals `owner`.
    pub fn owns(&self, owner: &EntityId) -> bool {
        self.0.as_ref() == Some(owner)
    }

    pub fn ensure_owns(&self, owner: &EntityId, action: &str) -> ApiResult<()> {
        if self.owns(owner) {
            Ok(())
        } else {
            Err(ApiError::forbidden(format!("user unauthorized to {action}")))
        }
    }
}

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<EntityId>().ok());
        Ok(Self(id))
    }
}

/// Fails fast when the server is started as root. The service is expected to
/// run under its own unprivileged account.
pub fn ensure_not_root(process: &str) -> Result<()> {
    if Uid::current().is_root() {
        bail!("{process} must not be run as root; use the dedicated service account");
    }
    Ok(())
}
