use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;
use vidshare::api::{AppState, build_router};
use vidshare::ids::EntityId;
use vidshare::media::{LocalMediaHost, MediaHost};
use vidshare::security::ACTOR_HEADER;
use vidshare::store::videos::{self, NewVideo};
use vidshare::store::{Store, users};

const BOUNDARY: &str = "vidshare-test-boundary";

struct Harness {
    app: Router,
    store: Arc<Store>,
    _media_root: TempDir,
}

fn harness() -> Harness {
    let media_root = tempfile::tempdir().expect("media root");
    let store = Arc::new(Store::open_in_memory().expect("store"));
    let local = Arc::new(
        LocalMediaHost::new(media_root.path(), "/api/v1/media").expect("local media host"),
    );
    let state = AppState {
        store: store.clone(),
        media: local.clone() as Arc<dyn MediaHost>,
        local_media: Some(local),
        max_limit: 100,
        max_upload_bytes: 1024 * 1024,
    };
    Harness {
        app: build_router(state),
        store,
        _media_root: media_root,
    }
}

fn add_user(store: &Store, username: &str) -> String {
    users::insert(store, username, &format!("{username} full"), None)
        .expect("insert user")
        .id
        .to_string()
}

fn seed_video(store: &Store, owner: &str, title: &str) -> String {
    let owner: EntityId = owner.parse().expect("owner id");
    store
        .with_conn(|conn| {
            Ok(videos::insert(
                conn,
                &NewVideo {
                    title: title.to_string(),
                    description: format!("{title} description"),
                    duration: 12.0,
                    video_file: format!("https://media.test/{title}.mp4"),
                    thumbnail: format!("https://media.test/{title}.png"),
                    owner,
                },
            )?)
        })
        .expect("insert video")
        .to_string()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    let payload: Value = serde_json::from_slice(&body).expect("json body");
    (status, payload)
}

fn json_request(method: &str, uri: &str, actor: Option<&str>, payload: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    builder
        .body(Body::from(payload.to_string()))
        .expect("request")
}

fn empty_request(method: &str, uri: &str, actor: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(actor) = actor {
        builder = builder.header(ACTOR_HEADER, actor);
    }
    builder.body(Body::empty()).expect("request")
}

fn multipart_body(texts: &[(&str, &str)], files: &[(&str, &str, &str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in texts {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, file_name, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(method: &str, uri: &str, actor: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(ACTOR_HEADER, actor)
        .body(Body::from(body))
        .expect("request")
}

fn assert_error_envelope(payload: &Value, status: StatusCode) {
    assert_eq!(payload["statusCode"], status.as_u16());
    assert_eq!(payload["success"], false);
    assert!(payload["message"].as_str().is_some_and(|m| !m.is_empty()));
    assert_eq!(payload["errors"], json!([]));
}

#[tokio::test]
async fn healthz_reports_ok_envelope() {
    let h = harness();
    let (status, payload) = send(&h.app, empty_request("GET", "/api/v1/healthz", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["statusCode"], 200);
    assert_eq!(payload["success"], true);
    assert_eq!(payload["data"]["status"], "ok");
}

#[tokio::test]
async fn tweet_lifecycle_enforces_ownership() {
    let h = harness();
    let alice = add_user(&h.store, "alice");
    let bob = add_user(&h.store, "bob");

    let (status, payload) = send(
        &h.app,
        json_request("POST", "/api/v1/tweets", Some(&alice), json!({"content": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["success"], true);
    assert_eq!(payload["data"]["tweet"]["content"], "hello");
    assert_eq!(payload["data"]["tweet"]["owner"], alice.as_str());
    let tweet_id = payload["data"]["tweet"]["_id"]
        .as_str()
        .expect("tweet id")
        .to_string();

    let uri = format!("/api/v1/tweets/{tweet_id}");
    let (status, payload) = send(
        &h.app,
        json_request("PATCH", &uri, Some(&bob), json!({"content": "hijacked"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_error_envelope(&payload, StatusCode::FORBIDDEN);

    let (status, payload) = send(
        &h.app,
        json_request("PATCH", &uri, Some(&alice), json!({"content": "edited"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["data"]["tweet"]["content"], "edited");

    let (status, payload) = send(
        &h.app,
        empty_request("GET", &format!("/api/v1/tweets/user/{alice}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tweets = payload["data"]["tweets"].as_array().expect("tweets");
    assert_eq!(tweets.len(), 1);
    assert_eq!(tweets[0]["username"], "alice");

    let (status, payload) = send(&h.app, empty_request("DELETE", &uri, Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["data"], json!({}));

    let (status, payload) = send(
        &h.app,
        json_request("PATCH", &uri, Some(&alice), json!({"content": "again"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_envelope(&payload, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn anonymous_writes_are_forbidden() {
    let h = harness();
    let (status, payload) = send(
        &h.app,
        json_request("POST", "/api/v1/tweets", None, json!({"content": "hello"})),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_error_envelope(&payload, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_json_and_ids_are_bad_requests() {
    let h = harness();
    let alice = add_user(&h.store, "alice");

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/tweets")
        .header("content-type", "application/json")
        .header(ACTOR_HEADER, &alice)
        .body(Body::from("{not json"))
        .expect("request");
    let (status, payload) = send(&h.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&payload, StatusCode::BAD_REQUEST);

    let (status, payload) = send(
        &h.app,
        empty_request("GET", "/api/v1/videos/not-an-id", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&payload, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subscribing_to_self_is_rejected() {
    let h = harness();
    let alice = add_user(&h.store, "alice");
    let bob = add_user(&h.store, "bob");

    let (status, payload) = send(
        &h.app,
        empty_request("POST", &format!("/api/v1/subscriptions/c/{alice}"), Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&payload, StatusCode::BAD_REQUEST);

    let (status, payload) = send(
        &h.app,
        empty_request("POST", &format!("/api/v1/subscriptions/c/{bob}"), Some(&alice)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["data"]["subscribed"], true);

    let (status, payload) = send(
        &h.app,
        empty_request("GET", &format!("/api/v1/subscriptions/c/{bob}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let subscribers = payload["data"]["subscriber"].as_array().expect("subscribers");
    assert_eq!(subscribers.len(), 1);
    assert_eq!(subscribers[0]["username"], "alice");
}

#[tokio::test]
async fn comments_are_paginated_newest_first() {
    let h = harness();
    let alice = add_user(&h.store, "alice");
    let video = seed_video(&h.store, &alice, "intro");
    let uri = format!("/api/v1/comments/{video}");

    for content in ["first", "second", "third"] {
        let (status, _) = send(
            &h.app,
            json_request("POST", &uri, Some(&alice), json!({ "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, payload) = send(
        &h.app,
        empty_request("GET", &format!("{uri}?page=2&limit=2"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let page = &payload["data"]["comments"];
    assert_eq!(page["totalDocs"], 3);
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["page"], 2);
    assert_eq!(page["hasPrevPage"], true);
    assert_eq!(page["hasNextPage"], false);
    assert_eq!(page["docs"].as_array().map(Vec::len), Some(1));
    assert_eq!(page["docs"][0]["content"], "first");
}

#[tokio::test]
async fn liking_twice_unlikes() {
    let h = harness();
    let alice = add_user(&h.store, "alice");
    let video = seed_video(&h.store, &alice, "intro");
    let uri = format!("/api/v1/likes/toggle/v/{video}");

    let (status, payload) = send(&h.app, empty_request("POST", &uri, Some(&alice))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["data"]["status"], "Liked");

    let (_, payload) = send(
        &h.app,
        empty_request("GET", "/api/v1/likes/videos", Some(&alice)),
    )
    .await;
    let liked = payload["data"]["likedVideos"].as_array().expect("liked");
    assert_eq!(liked.len(), 1);
    assert_eq!(liked[0]["title"], "intro");

    let (_, payload) = send(&h.app, empty_request("POST", &uri, Some(&alice))).await;
    assert_eq!(payload["data"]["status"], "Unliked");
}

#[tokio::test]
async fn published_video_is_served_from_the_media_route() {
    let h = harness();
    let alice = add_user(&h.store, "alice");

    let body = multipart_body(
        &[("title", "Intro"), ("description", "first upload")],
        &[
            ("videoFile", "clip.mp4", "video/mp4", b"video frames"),
            ("thumbnail", "clip.png", "image/png", b"thumbnail bytes"),
        ],
    );
    let (status, payload) = send(
        &h.app,
        multipart_request("POST", "/api/v1/videos", &alice, body),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let video = &payload["data"];
    assert_eq!(video["title"], "Intro");
    assert_eq!(video["owner"], alice.as_str());
    assert_eq!(video["isPublished"], false);
    let video_url = video["videoFile"].as_str().expect("video url").to_string();
    assert!(video_url.starts_with("/api/v1/media/"));
    assert!(video_url.ends_with(".mp4"));

    let response = h
        .app
        .clone()
        .oneshot(empty_request("GET", &video_url, None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().expect("mime"),
        "video/mp4"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("media body");
    assert_eq!(&bytes[..], b"video frames");

    let video_id = video["_id"].as_str().expect("video id");
    let (status, payload) = send(
        &h.app,
        empty_request("GET", &format!("/api/v1/videos/{video_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(payload["data"]["fullVideo"]["owner"]["username"], "alice");
}

#[tokio::test]
async fn publishing_without_a_video_file_is_rejected() {
    let h = harness();
    let alice = add_user(&h.store, "alice");
    let body = multipart_body(
        &[("title", "Intro"), ("description", "no file")],
        &[("thumbnail", "clip.png", "image/png", b"thumbnail bytes")],
    );
    let (status, payload) = send(
        &h.app,
        multipart_request("POST", "/api/v1/videos", &alice, body),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_error_envelope(&payload, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_playlist_is_not_found() {
    let h = harness();
    let missing = EntityId::generate();
    let (status, payload) = send(
        &h.app,
        empty_request("GET", &format!("/api/v1/playlist/{missing}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_error_envelope(&payload, StatusCode::NOT_FOUND);
}
