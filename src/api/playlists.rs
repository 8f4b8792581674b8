use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::security::Actor;
use crate::services::playlists;

use super::{ApiJson, ApiPath, AppState, empty, keyed, parse_id, run_blocking};

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistBody {
    name: Option<String>,
    description: Option<String>,
}

pub(crate) async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(body): ApiJson<PlaylistBody>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let playlist = run_blocking(&state, move |state| {
        playlists::create(
            &state.store,
            &actor,
            body.name.as_deref(),
            body.description.as_deref(),
        )
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("playlist", playlist),
        "new playlist has been created successfully",
    ))
}

pub(crate) async fn list_for_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let user_id = parse_id(&user_id, "user id")?;
    let list = run_blocking(&state, move |state| {
        playlists::list_for_user(&state.store, &user_id)
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("playlists", list),
        "user playlists has been fetched successfully",
    ))
}

pub(crate) async fn by_id(
    State(state): State<AppState>,
    ApiPath(playlist_id): ApiPath<String>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let playlist_id = parse_id(&playlist_id, "playlist id")?;
    let playlist = run_blocking(&state, move |state| {
        playlists::by_id(&state.store, &playlist_id)
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("playlist", playlist),
        "all the videos with their owner of playlist has been fetched successfully",
    ))
}

pub(crate) async fn add_video(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((video_id, playlist_id)): ApiPath<(String, String)>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let video_id = parse_id(&video_id, "video id")?;
    let playlist_id = parse_id(&playlist_id, "playlist id")?;
    let playlist = run_blocking(&state, move |state| {
        playlists::add_video(&state.store, &actor, &video_id, &playlist_id)
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("playlist", playlist),
        "video has been added to playlist successfully",
    ))
}

pub(crate) async fn remove_video(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath((video_id, playlist_id)): ApiPath<(String, String)>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let video_id = parse_id(&video_id, "video id")?;
    let playlist_id = parse_id(&playlist_id, "playlist id")?;
    let playlist = run_blocking(&state, move |state| {
        playlists::remove_video(&state.store, &actor, &video_id, &playlist_id)
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("playlist", playlist),
        "video has been removed from playlist successfully",
    ))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(playlist_id): ApiPath<String>,
    ApiJson(body): ApiJson<PlaylistBody>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let playlist_id = parse_id(&playlist_id, "playlist id")?;
    let playlist = run_blocking(&state, move |state| {
        playlists::update(
            &state.store,
            &actor,
            &playlist_id,
            body.name.as_deref(),
            body.description.as_deref(),
        )
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("playlist", playlist),
        "playlist has been updated successfully",
    ))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(playlist_id): ApiPath<String>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let playlist_id = parse_id(&playlist_id, "playlist id")?;
    run_blocking(&state, move |state| {
        playlists::delete(&state.store, &actor, &playlist_id)
    })
    .await?;
    Ok(ApiResponse::ok(empty(), "playlist has been deleted successfully"))
}
