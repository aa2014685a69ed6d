//! HTTP route handlers: start, display, stop, and a small JSON API.

use axum::Router;
use axum::extract::State;
use axum::http::header::HeaderName;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Json, Redirect, Response};
use axum::routing::{get, post};
use tracing::{debug, warn};

use actionbuf::core::ActionStatus;
use actionbuf::worker::spawn_action;

use crate::model;
use crate::render;
use crate::state::AppState;

const REFRESH: HeaderName = HeaderName::from_static("refresh");

/// Build the page router. `display_url` is where progress is rendered.
pub fn page_router(display_url: &str) -> Router<AppState> {
    Router::new()
        .route("/", get(start_action))
        .route(display_url, get(display))
        .route("/stop", post(stop_action))
}

/// Build the API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
}

/// GET / - start the demo action and send the client to the display page.
async fn start_action(State(state): State<AppState>) -> Html<String> {
    let spawned = spawn_action(
        &state.coordinator,
        state.config.refresh_secs,
        state.config.action_timeout(),
        model::hello_world,
    );
    debug!(generation = %spawned.generation, "started action");
    Html(render::redirect_page(&state.config.display_url))
}

/// GET {display_url} - count a poll and render the current frame.
async fn display(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let frame = state.coordinator.poll_frame();
    let page = state
        .pages
        .render_display(&frame, &state.config)
        .map_err(|err| {
            let message = format!("{err:#}");
            warn!(error = %message, "render display page failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let mut response = Html(page).into_response();
    if let Some(value) = render::refresh_header(&frame.view, &state.config.display_url) {
        let value = HeaderValue::from_str(&value).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        response.headers_mut().insert(REFRESH, value);
    }
    Ok(response)
}

/// POST /stop - stop the running action, keeping its output.
async fn stop_action(State(state): State<AppState>) -> Redirect {
    if let Some(generation) = state.coordinator.abort() {
        debug!(%generation, "stopped action");
    }
    Redirect::to(&state.config.display_url)
}

async fn health() -> &'static str {
    "ok"
}

/// GET /api/status - current action status without counting a poll.
async fn status(State(state): State<AppState>) -> Json<ActionStatus> {
    Json(state.coordinator.status())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actionbuf::io::config::ActionConfig;
    use actionbuf::test_support::wait_until_idle;
    use axum::body::to_bytes;

    use super::*;

    fn test_state() -> AppState {
        AppState::new(ActionConfig::default()).expect("state")
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        String::from_utf8(bytes.to_vec()).expect("utf8 body")
    }

    #[tokio::test]
    async fn display_when_idle_has_no_refresh() {
        let state = test_state();
        let response = display(State(state)).await.expect("display");

        assert!(response.headers().get(REFRESH).is_none());
        let body = body_text(response).await;
        assert!(body.contains("Stopped"));
        assert!(!body.contains("http-equiv"));
    }

    #[tokio::test(start_paused = true)]
    async fn start_then_display_shows_progress_until_done() {
        let state = test_state();
        let Html(redirect) = start_action(State(state.clone())).await;
        assert!(redirect.contains("URL=/display"));

        tokio::time::sleep(Duration::from_millis(10)).await;
        let response = display(State(state.clone())).await.expect("display");
        assert_eq!(
            response.headers().get(REFRESH).map(HeaderValue::as_bytes),
            Some(b"1; url=/display".as_slice())
        );
        let body = body_text(response).await;
        assert!(body.contains("Running"));
        assert!(body.contains("Hello world."));
        assert!(body.contains("poll 1"));

        assert!(wait_until_idle(&state.coordinator, Duration::from_secs(30)).await);
        let response = display(State(state)).await.expect("display");
        assert!(response.headers().get(REFRESH).is_none());
        let body = body_text(response).await;
        assert!(body.contains("Stopped"));
        assert!(body.contains("Done."));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_output() {
        let state = test_state();
        start_action(State(state.clone())).await;
        tokio::time::sleep(model::STEP * 2 + Duration::from_millis(10)).await;
        assert!(state.coordinator.snapshot().contains("Count 1"));

        start_action(State(state.clone())).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        let body = body_text(display(State(state.clone())).await.expect("display")).await;
        assert!(body.contains("Hello world."));
        assert!(!body.contains("Count 1"));
        assert!(body.contains("poll 1"));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_keeps_output_and_ends_polling() {
        let state = test_state();
        start_action(State(state.clone())).await;
        tokio::time::sleep(model::STEP + Duration::from_millis(10)).await;

        stop_action(State(state.clone())).await;
        assert!(wait_until_idle(&state.coordinator, Duration::from_secs(1)).await);

        let response = display(State(state.clone())).await.expect("display");
        assert!(response.headers().get(REFRESH).is_none());
        let body = body_text(response).await;
        assert!(body.contains("Count 0"));
        assert!(!body.contains("Done."));
    }

    #[tokio::test]
    async fn status_does_not_count_polls() {
        let state = test_state();
        let (generation, _) = state.coordinator.begin(2);
        state.coordinator.poll();

        let Json(first) = status(State(state.clone())).await;
        let Json(second) = status(State(state)).await;
        assert_eq!(first.generation, generation);
        assert_eq!(first.poll_count, 1);
        assert_eq!(second.poll_count, 1);
        assert!(first.running);
    }

    #[tokio::test]
    async fn status_serializes_for_api_clients() {
        let state = test_state();
        let (generation, _) = state.coordinator.begin(3);
        state.coordinator.poll();

        let response = status(State(state.clone())).await.into_response();
        let json: serde_json::Value =
            serde_json::from_str(&body_text(response).await).expect("status json");
        assert_eq!(json["generation"], generation.get());
        assert_eq!(json["running"], true);
        assert_eq!(json["poll_count"], 1);
        assert_eq!(json["refresh_interval_secs"], 3);

        state.coordinator.abort();
        let response = status(State(state)).await.into_response();
        let json: serde_json::Value =
            serde_json::from_str(&body_text(response).await).expect("status json");
        assert_eq!(json["running"], false);
        assert_eq!(json["poll_count"], 0);
    }

    #[tokio::test]
    async fn health_is_ok() {
        assert_eq!(health().await, "ok");
    }
}
