use axum::extract::State;
use serde::{Deserialize, Serialize};
use tempfile::TempPath;

use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::security::Actor;
use crate::services::videos::{
    self, ListVideos, PublishStatus, PublishVideo, SortKey, VideoChanges,
};
use crate::store::videos::VideoRecord;
use crate::views::Direction;

use super::{
    ApiMultipart, ApiPath, ApiQuery, AppState, PageQuery, empty, keyed, parse_id, run_blocking,
    stage_upload, text_field,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListQuery {
    #[serde(flatten)]
    page: PageQuery,
    query: Option<String>,
    sort_by: Option<String>,
    sort_type: Option<String>,
    user_id: Option<String>,
}

/// Fields of the publish and update forms. Staged files are removed when
/// the form is dropped.
#[derive(Default)]
struct VideoForm {
    title: Option<String>,
    description: Option<String>,
    video_file: Option<TempPath>,
    thumbnail: Option<TempPath>,
}

impl VideoForm {
    async fn read(ApiMultipart(mut multipart): ApiMultipart) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| ApiError::invalid(err.body_text()))?
        {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("title") => form.title = Some(text_field(field).await?),
                Some("description") => form.description = Some(text_field(field).await?),
                Some("videoFile") => form.video_file = stage_upload(field).await?,
                Some("thumbnail") => form.thumbnail = stage_upload(field).await?,
                _ => {}
            }
        }
        Ok(form)
    }
}

pub(crate) async fn list(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let owner = match query.user_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(parse_id(raw, "user id")?),
    };
    let request = ListVideos {
        page: query.page.resolve(state.max_limit),
        query: query.query,
        sort_by: SortKey::from_token(query.sort_by.as_deref()),
        direction: Direction::from_token(query.sort_type.as_deref()),
        owner,
    };
    let page = run_blocking(&state, move |state| videos::list(&state.store, &request)).await?;
    Ok(ApiResponse::ok(
        keyed("videos", page),
        "sorted filtered videos with pagination has been fetched successfully",
    ))
}

pub(crate) async fn publish(
    State(state): State<AppState>,
    actor: Actor,
    multipart: ApiMultipart,
) -> ApiResult<ApiResponse<VideoRecord>> {
    let form = VideoForm::read(multipart).await?;
    let video = run_blocking(&state, move |state| {
        let request = PublishVideo {
            title: form.title.as_deref(),
            description: form.description.as_deref(),
            video_file: form.video_file.as_deref(),
            thumbnail: form.thumbnail.as_deref(),
        };
        videos::publish(&state.store, state.media.as_ref(), &actor, request)
    })
    .await?;
    Ok(ApiResponse::ok(video, "video uploaded successfully"))
}

pub(crate) async fn by_id(
    State(state): State<AppState>,
    ApiPath(video_id): ApiPath<String>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let video_id = parse_id(&video_id, "video id")?;
    let video = run_blocking(&state, move |state| videos::by_id(&state.store, &video_id)).await?;
    Ok(ApiResponse::ok(
        keyed("fullVideo", video),
        "video with owner details fetched successfully",
    ))
}

pub(crate) async fn update(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(video_id): ApiPath<String>,
    multipart: ApiMultipart,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let video_id = parse_id(&video_id, "video id")?;
    let form = VideoForm::read(multipart).await?;
    let video = run_blocking(&state, move |state| {
        let changes = VideoChanges {
            title: form.title.as_deref(),
            description: form.description.as_deref(),
            thumbnail: form.thumbnail.as_deref(),
        };
        videos::update(&state.store, state.media.as_ref(), &actor, &video_id, changes)
    })
    .await?;
    Ok(ApiResponse::ok(
        keyed("newVideo", video),
        "video updated successfully",
    ))
}

pub(crate) async fn delete(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(video_id): ApiPath<String>,
) -> ApiResult<ApiResponse<impl Serialize>> {
    let video_id = parse_id(&video_id, "video id")?;
    run_blocking(&state, move |state| {
        videos::delete(&state.store, state.media.as_ref(), &actor, &video_id)
    })
    .await?;
    Ok(ApiResponse::ok(empty(), "video deleted successfully"))
}

#[derive(Debug, Serialize)]
pub(crate) struct PublishToggle {
    video: VideoRecord,
    status: PublishStatus,
}

pub(crate) async fn toggle_publish(
    State(state): State<AppState>,
    actor: Actor,
    ApiPath(video_id): ApiPath<String>,
) -> ApiResult<ApiResponse<PublishToggle>> {
    let video_id = parse_id(&video_id, "video id")?;
    let (video, status) = run_blocking(&state, move |state| {
        videos::toggle_publish(&state.store, &actor, &video_id)
    })
    .await?;
    let message = format!("video has been {} successfully", status.label());
    Ok(ApiResponse::ok(PublishToggle { video, status }, message))
}
