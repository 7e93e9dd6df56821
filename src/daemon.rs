use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

use crate::bot::JournalBot;
use crate::config::Config;
use crate::dispatch::Incoming;
use crate::error::{GymJournalError, Result};
use crate::presentation::Reply;

#[derive(Clone)]
pub struct AppState {
    pub bot: Arc<JournalBot>,
    pub token: String,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, Deserialize)]
pub struct EventsResponse {
    pub replies: Vec<Reply>,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(handle_event))
        .with_state(state)
}

pub fn version() -> String {
    format!(
        "{}+{}",
        env!("CARGO_PKG_VERSION"),
        env!("GYM_JOURNAL_GIT_SHA")
    )
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: version(),
    })
}

async fn handle_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(event): Json<Incoming>,
) -> Response {
    if let Err(err) = authorize(&headers, &state.token) {
        return err.into_response();
    }

    match state.bot.handle(&event).await {
        Ok(replies) => (StatusCode::OK, Json(EventsResponse { replies })).into_response(),
        Err(err) => {
            tracing::error!(user = event.user.id, error = %err, "Event handling failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn authorize(
    headers: &HeaderMap,
    token: &str,
) -> std::result::Result<(), (StatusCode, Json<ErrorResponse>)> {
    let expected_token = token.trim();
    if expected_token.is_empty() {
        return Err(unauthorized());
    }

    let header = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let api_key = headers
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let bearer = header.strip_prefix("Bearer ").unwrap_or("").trim();
    let api_key = api_key.trim();

    if bearer == expected_token || api_key == expected_token {
        Ok(())
    } else {
        Err(unauthorized())
    }
}

fn unauthorized() -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: "Unauthorized".to_string(),
        }),
    )
}

pub async fn run(host: &str, port: u16, config: &Config, token: &str) -> Result<()> {
    run_with_shutdown(host, port, config, token, futures::future::pending::<()>()).await
}

pub async fn run_with_shutdown<F>(
    host: &str,
    port: u16,
    config: &Config,
    token: &str,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if token.trim().is_empty() {
        return Err(GymJournalError::Config(
            "daemon token is empty; every request would be rejected".to_string(),
        ));
    }

    let bot = Arc::new(JournalBot::from_config(config).await?);
    let state = AppState {
        bot,
        token: token.to_string(),
    };
    let app = build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GymJournalError::Runtime(e.to_string()))?;
    tracing::info!(addr = %addr, version = %version(), "Gym journal daemon listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| GymJournalError::Runtime(e.to_string()))?;

    tracing::info!("Gym journal daemon stopped");
    Ok(())
}
