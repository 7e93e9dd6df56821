use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::ServiceExt;

use gym_journal_bot::bot::JournalBot;
use gym_journal_bot::config::Config;
use gym_journal_bot::daemon::{build_router, AppState};

async fn make_app(dir: &tempfile::TempDir) -> Router {
    let db_path = dir.path().join("daemon.db").to_string_lossy().to_string();
    let config = Config::convention_defaults(&db_path);
    let bot = JournalBot::from_config(&config).await.unwrap();
    build_router(AppState {
        bot: Arc::new(bot),
        token: "token".to_string(),
    })
}

fn event_request(auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/events")
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok_without_auth() {
    let dir = tempdir().unwrap();
    let app = make_app(&dir).await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"]
        .as_str()
        .unwrap()
        .starts_with(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn events_require_the_token() {
    let dir = tempdir().unwrap();
    let app = make_app(&dir).await;
    let start = json!({"user": {"id": 1, "full_name": "Ann"}, "kind": "message", "text": "/start"});

    let response = app
        .clone()
        .oneshot(event_request(None, start.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(event_request(Some("Bearer wrong"), start.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/events")
                .header("content-type", "application/json")
                .header("x-api-key", "token")
                .body(Body::from(start.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn events_drive_the_wizard_over_http() {
    let dir = tempdir().unwrap();
    let app = make_app(&dir).await;
    let auth = Some("Bearer token");

    let steps = [
        json!({"user": {"id": 5, "full_name": "Ann"}, "kind": "message", "text": "/start"}),
        json!({"user": {"id": 5}, "kind": "message", "text": "/add_plan"}),
        json!({"user": {"id": 5}, "kind": "message", "text": "Leg Day"}),
    ];
    let mut last = Value::Null;
    for step in steps {
        let response = app
            .clone()
            .oneshot(event_request(auth, step))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        last = json_body(response).await;
    }

    let replies = last["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[1]["markup"]["type"], "inline");
    assert_eq!(
        replies[1]["markup"]["keyboard"]["rows"][0][0]["payload"],
        "day_Пн"
    );

    let response = app
        .clone()
        .oneshot(event_request(
            auth,
            json!({"user": {"id": 5}, "kind": "callback", "data": "day_Пн"}),
        ))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["replies"][0]["edit"], true);

    let response = app
        .oneshot(event_request(
            auth,
            json!({"user": {"id": 5}, "kind": "callback", "data": "nothing_here"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["replies"], json!([]));
}
