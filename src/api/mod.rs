//! HTTP surface.
//!
//! Handlers parse the request into typed values, run the matching service
//! function on the blocking pool, and wrap the result in [`ApiResponse`].
//! Every failure leaves through [`ApiError`]'s `IntoResponse`, including
//! extractor rejections, which the `Api*` wrappers below convert to
//! `InvalidInput`.

mod comments;
mod likes;
mod playlists;
mod subscriptions;
mod tweets;
mod videos;

use std::collections::BTreeMap;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{
        DefaultBodyLimit, FromRequest, FromRequestParts, Multipart, Path, Query, Request, State,
        multipart::Field,
    },
    http::{header, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::{Serialize, de::DeserializeOwned};
use tempfile::TempPath;
use tokio::{fs::File, io::AsyncWriteExt, task};
use tokio_util::io::ReaderStream;

use crate::error::{ApiError, ApiResult};
use crate::ids::EntityId;
use crate::media::{LocalMediaHost, MediaHost};
use crate::response::ApiResponse;
use crate::store::Store;
use crate::views::PageRequest;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub media: Arc<dyn MediaHost>,
    /// Set when objects are kept on local disk and served by this process.
    pub local_media: Option<Arc<LocalMediaHost>>,
    pub max_limit: u32,
    pub max_upload_bytes: usize,
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    let api = Router::new()
        .route(
            "/comments/{video_id}",
            get(comments::list_for_video).post(comments::add),
        )
        .route(
            "/comments/c/{comment_id}",
            patch(comments::update).delete(comments::delete),
        )
        .route("/likes/toggle/v/{video_id}", post(likes::toggle_video))
        .route("/likes/toggle/c/{comment_id}", post(likes::toggle_comment))
        .route("/likes/toggle/t/{tweet_id}", post(likes::toggle_tweet))
        .route("/likes/videos", get(likes::liked_videos))
        .route(
            "/subscriptions/c/{channel_id}",
            get(subscriptions::subscribers).post(subscriptions::toggle),
        )
        .route(
            "/subscriptions/u/{subscriber_id}",
            get(subscriptions::subscribed_channels),
        )
        .route("/tweets", post(tweets::create))
        .route("/tweets/user/{user_id}", get(tweets::list_for_user))
        .route(
            "/tweets/{tweet_id}",
            patch(tweets::update).delete(tweets::delete),
        )
        .route("/playlist", post(playlists::create))
        .route("/playlist/user/{user_id}", get(playlists::list_for_user))
        .route(
            "/playlist/{playlist_id}",
            get(playlists::by_id)
                .patch(playlists::update)
                .delete(playlists::delete),
        )
        .route(
            "/playlist/add/{video_id}/{playlist_id}",
            patch(playlists::add_video),
        )
        .route(
            "/playlist/remove/{video_id}/{playlist_id}",
            patch(playlists::remove_video),
        )
        .route("/videos", get(videos::list).post(videos::publish))
        .route(
            "/videos/{video_id}",
            get(videos::by_id)
                .patch(videos::update)
                .delete(videos::delete),
        )
        .route(
            "/videos/toggle/publish/{video_id}",
            patch(videos::toggle_publish),
        )
        .route("/media/{object}", get(serve_media))
        .route("/healthz", get(healthz));

    Router::new()
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Runs `work` on the blocking pool; the store and media host are both
/// synchronous.
pub(crate) async fn run_blocking<T, F>(state: &AppState, work: F) -> ApiResult<T>
where
    F: FnOnce(&AppState) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    task::spawn_blocking(move || work(&state))
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "blocking task failed");
            ApiError::internal("task join error")
        })?
}

/// `{key: value}`, the shape most endpoints wrap their payload in.
pub(crate) fn keyed<T: Serialize>(key: &'static str, value: T) -> BTreeMap<&'static str, T> {
    BTreeMap::from([(key, value)])
}

/// Empty `{}` payload for operations that return nothing.
pub(crate) fn empty() -> BTreeMap<&'static str, ()> {
    BTreeMap::new()
}

pub(crate) fn parse_id(raw: &str, what: &str) -> ApiResult<EntityId> {
    EntityId::require(Some(raw), what)
}

/// `axum::Json` with rejections reported as `InvalidInput`.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::invalid(rejection.body_text())),
        }
    }
}

/// `axum::Query` with rejections reported as `InvalidInput`.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::invalid(rejection.body_text())),
        }
    }
}

/// `axum::Path` with rejections reported as `InvalidInput`.
pub struct ApiPath<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::invalid(rejection.body_text())),
        }
    }
}

/// `axum::extract::Multipart` with rejections reported as `InvalidInput`.
pub struct ApiMultipart(pub Multipart);

impl<S> FromRequest<S> for ApiMultipart
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        Multipart::from_request(req, state)
            .await
            .map(Self)
            .map_err(|rejection| ApiError::invalid(rejection.body_text()))
    }
}

/// Raw `page`/`limit` query values; coerced by [`PageRequest::from_raw`].
#[derive(Debug, Default, serde::Deserialize)]
pub(crate) struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn resolve(&self, max_limit: u32) -> PageRequest {
        PageRequest::from_raw(self.page.as_deref(), self.limit.as_deref(), max_limit)
    }
}

/// Extension of an uploaded file name, if it is plain alphanumeric.
fn upload_suffix(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| FsPath::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Streams a multipart file field into a temporary file. Returns `None` when
/// the field is empty. The file is removed when the returned path is dropped.
pub(crate) async fn stage_upload(mut field: Field<'_>) -> ApiResult<Option<TempPath>> {
    let suffix = upload_suffix(field.file_name());
    let staged = tempfile::Builder::new()
        .prefix("vidshare-upload-")
        .suffix(&suffix)
        .tempfile()
        .map_err(|err| {
            tracing::error!(error = %err, "staging upload failed");
            ApiError::internal("could not stage upload")
        })?;
    let (file, path) = staged.into_parts();
    let mut file = File::from_std(file);

    let mut written = 0usize;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|err| ApiError::invalid(err.body_text()))?
    {
        file.write_all(&chunk).await.map_err(|err| {
            tracing::error!(error = %err, "writing staged upload failed");
            ApiError::internal("could not stage upload")
        })?;
        written += chunk.len();
    }
    file.flush().await.map_err(|err| {
        tracing::error!(error = %err, "flushing staged upload failed");
        ApiError::internal("could not stage upload")
    })?;

    Ok((written > 0).then_some(path))
}

/// Reads a multipart text field.
pub(crate) async fn text_field(field: Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map_err(|err| ApiError::invalid(err.body_text()))
}

async fn serve_media(
    State(state): State<AppState>,
    ApiPath(object): ApiPath<String>,
) -> ApiResult<Response> {
    let host = state
        .local_media
        .as_ref()
        .ok_or_else(|| ApiError::not_found("media is not served by this host"))?;
    let path = host
        .object_path(&object)
        .ok_or_else(|| ApiError::not_found("media object not found"))?;
    let file = File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("media object not found"))?;

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    if let Ok(value) = mime.to_string().parse() {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}

async fn healthz(
    State(state): State<AppState>,
) -> ApiResult<ApiResponse<BTreeMap<&'static str, &'static str>>> {
    run_blocking(&state, |state| {
        state
            .store
            .with_conn(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
    })
    .await?;
    Ok(ApiResponse::ok(keyed("status", "ok"), "service is healthy"))
}
