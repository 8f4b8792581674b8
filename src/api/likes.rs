use axum::extract::State;
use serde::Serialize;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::security::Actor;
use crate::services::likes::{self, LikeOutcome};
use crate::store::pairs::LikeTarget;

use super::{ApiPath, AppState, keyed, parse_id, run_blocking};

async fn toggle(
    state: AppState,
    actor: Actor,
    target: LikeTarget,
    raw_id: String,
) -> ApiResult<ApiResponse<LikeOutcome>> {
    let target_id = parse_id(&raw_id, &format!("{} id", target.kind()))?;
    let outcome = run_blocking(&state, move |state| {
        likes::toggle(&state.store, &actor, target, &target_id)
    })
    .await?;
    let message = format!(
        "{} has been {} successfully",
        target.kind(),
        outcome.status.label()
    );
    Ok(ApiResponse::ok(outcome, message))
}

pub(crate) async fn toggle_video(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(video_id): ApiPath<String>,
) -> ApiResult<ApiResponse<LikeOutcome>> {
    toggle(state, actor, LikeTarget::Video, video_id).await
}

pub(crate) async fn toggle_comment(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(comment_id): ApiPath<String>,
) -> ApiResult<ApiResponse<LikeOutcome>> {
    toggle(state, actor, LikeTarget::Comment, comment_id).await
}

pub(crate) async fn toggle_tweet(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(tweet_id): ApiPath<String>,
) -> ApiResult<ApiResponse<LikeOutcome>> {
    toggle(state, actor, LikeTarget::Tweet, tweet_id).await
}

pub(crate) async fn liked_videos(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let videos = run_blocking(&state, move |state| likes::liked_videos(&state.store, &actor)).await?;
    Ok(ApiResponse::ok(
        keyed("likedVideos", videos),
        "liked video details has been fetched successfully",
    ))
}
