use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::security::Actor;
use crate::services::tweets;

use super::{ApiJson, ApiPath, AppState, empty, keyed, parse_id, run_blocking};

#[derive(Debug, Deserialize)]
pub(crate) struct TweetBody {
    content: Option<String>,
}

pub(crate) async fn create(
    State(state): State<AppState>,
    actor: Actor,
    ApiJson(body): ApiJson<TweetBody>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let tweet = run_blocking(&state, move |state| {
        tweets::create(&state.store, &actor, body.content.as_deref())
    })
    .await?;
    Ok(ApiResponse::ok(keyed("tweet", tweet), "tweet added successfully"))
}

pub(crate) async fn list_for_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<String>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let user_id = parse_id(&user_id, "user id")?;
    let tweets = run_blocking(&state, move |state| {
        tweets::list_for_user(&state.store, &user_id)
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("tweets", tweets),
        "user tweets has been fetched successfully",
    ))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(tweet_id): ApiPath<String>,
    ApiJson(body): ApiJson<TweetBody>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let tweet_id = parse_id(&tweet_id, "tweet id")?;
    let tweet = run_blocking(&state, move |state| {
        tweets::update(&state.store, &actor, &tweet_id, body.content.as_deref())
    })
    .await?;
    Ok(ApiResponse::ok(keyed("tweet", tweet), "tweet updated successfully"))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(tweet_id): ApiPath<String>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let tweet_id = parse_id(&tweet_id, "tweet id")?;
    run_blocking(&state, move |state| {
        tweets::delete(&state.store, &actor, &tweet_id)
    })
    .await?;
    Ok(ApiResponse::ok(empty(), "tweet deleted successfully"))
}
