use axum::extract::State;
use serde::Serialize;

use crate::error::ApiResult;
use crate::response::ApiResponse;
use crate::security::Actor;
use crate::services::subscriptions::{self, SubscriptionState};

use super::{ApiPath, AppState, keyed, parse_id, run_blocking};

pub(crate) async fn toggle(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(channel_id): ApiPath<String>,
) -> ApiResult<ApiResponse<SubscriptionState>> {
    let channel_id = parse_id(&channel_id, "channel id")?;
    let outcome = run_blocking(&state, move |state| {
        subscriptions::toggle(&state.store, &actor, &channel_id)
    })
    .await?;
    let verb = if outcome.subscribed {
        "subscribed"
    } else {
        "unsubscribed"
    };
    Ok(ApiResponse::ok(
        outcome,
        format!("channel has been {verb} successfully"),
    ))
}

pub(crate) async fn subscribers(
    State(state): State<AppState>,
    ApiPath(channel_id): ApiPath<String>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let channel_id = parse_id(&channel_id, "channel id")?;
    let list = run_blocking(&state, move |state| {
        subscriptions::subscribers(&state.store, &channel_id)
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("subscriber", list),
        "all subscriber details of the given channel are fetched successfully",
    ))
}

pub(crate) async fn subscribed_channels(
    State(state): State<AppState>,
    ApiPath(subscriber_id): ApiPath<String>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let subscriber_id = parse_id(&subscriber_id, "subscriber id")?;
    let list = run_blocking(&state, move |state| {
        subscriptions::subscribed_channels(&state.store, &subscriber_id)
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("subscribedTo", list),
        "all channel details subscribed by the subscriber are fetched successfully",
    ))
}
