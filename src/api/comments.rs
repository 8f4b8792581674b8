use axum::extract::State;
use serde::Deserialize;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::security::Actor;
use crate::services::comments;

use super::{ApiJson, ApiPath, ApiQuery, AppState, PageQuery, empty, keyed, parse_id, run_blocking};

#[derive(Debug, Deserialize)]
pub(crate) struct CommentBody {
    content: Option<String>,
}

pub(crate) async fn list_for_video(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> ApiResult<ApiResponse<impl serde::Serialize>> {
    let video_id = parse_id(&video_id, "video id")?;
    let page = query.resolve(state.max_limit);
    let comments = run_blocking(&state, move |state| {
        comments::list_for_video(&state.store, &video_id, page)
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("comments", comments),
        "paginated video comments has been fetched successfully",
    ))
}

pub(crate) async fn add(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(video_id): ApiPath<String>,
    ApiJson(body): ApiJson<CommentBody>,
) -> ApiResult<ApiResponse<impl serde::Serialize>> {
    let video_id = parse_id(&video_id, "video id")?;
    let comment = run_blocking(&state, move |state| {
        comments::add(&state.store, &actor, &video_id, body.content.as_deref())
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("comment", comment),
        "new comment has been added successfully",
    ))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(comment_id): ApiPath<String>,
    ApiJson(body): ApiJson<CommentBody>,
) -> ApiResult<ApiResponse<impl serde::Serialize>> {
    let comment_id = parse_id(&comment_id, "comment id")?;
    let comment = run_blocking(&state, move |state| {
        comments::update(&state.store, &actor, &comment_id, body.content.as_deref())
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("comment", comment),
        "comment updated successfully",
    ))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(comment_id): ApiPath<String>,
) -> ApiResult<ApiResponse<impl serde::Serialize>> {
    let comment_id = parse_id(&comment_id, "comment id")?;
    run_blocking(&state, move |state| {
        comments::delete(&state.store, &actor, &comment_id)
    })
    .await?;
    Ok(ApiResponse::ok(empty(), "comment deleted successfully"))
}
