//! HTTP endpoints.
//!
//! The chat gateway posts events to `/events` with its bearer token;
//! moderators use the routes under `/moderation`, which sit behind Basic auth.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{
    gateway_auth_middleware, moderator_auth_middleware, AuthConfig, GatewayAuth,
};
use crate::error::ContestError;
use crate::export::{render_csv, EXPORT_FILENAME};
use crate::handlers::{handle_command, handle_event};
use crate::protocol::{ContestEvent, ModeratorCommand, Reply};
use crate::state::AppState;
use crate::types::Submission;

/// Error body returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub msg: String,
}

/// Wrapper turning contest errors into HTTP responses
pub struct ApiError(ContestError);

impl From<ContestError> for ApiError {
    fn from(e: ContestError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ContestError::Validation(_) => StatusCode::BAD_REQUEST,
            ContestError::NotFound(_) => StatusCode::NOT_FOUND,
            ContestError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ContestError::Transport(_) => StatusCode::BAD_GATEWAY,
        };
        let body = ErrorBody {
            code: self.0.code().to_string(),
            msg: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the application router
pub fn router(
    state: Arc<AppState>,
    auth_config: Arc<AuthConfig>,
    gateway: Arc<GatewayAuth>,
) -> Router {
    let event_routes = Router::new()
        .route("/events", post(post_event))
        .layer(middleware::from_fn_with_state(
            gateway,
            gateway_auth_middleware,
        ));

    let moderation_routes = Router::new()
        .route("/moderation/commands", post(post_command))
        .route("/moderation/submissions", get(list_submissions))
        .route("/moderation/submissions.csv", get(download_csv))
        .route("/moderation/submissions/{user_id}", get(get_submission))
        .layer(middleware::from_fn_with_state(
            auth_config,
            moderator_auth_middleware,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(event_routes)
        .merge(moderation_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// POST /events
async fn post_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<ContestEvent>,
) -> Json<Option<Reply>> {
    Json(handle_event(event, &state).await)
}

/// POST /moderation/commands
async fn post_command(
    State(state): State<Arc<AppState>>,
    Json(command): Json<ModeratorCommand>,
) -> Json<Option<Reply>> {
    Json(handle_command(command, &state).await)
}

/// GET /moderation/submissions
async fn list_submissions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Submission>>, ApiError> {
    Ok(Json(state.export_all().await?))
}

/// GET /moderation/submissions/{user_id}
async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Submission>, ApiError> {
    Ok(Json(state.get_submission(&user_id).await?))
}

/// GET /moderation/submissions.csv
async fn download_csv(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let submissions = state.export_all().await?;
    let csv = match render_csv(
        &submissions,
        state.config.message_link_base.as_deref(),
        &state.config.submission_channel_id,
    ) {
        Ok(csv) => csv,
        Err(e) => {
            tracing::error!("Failed to render CSV: {}", e);
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, "CSV export failed").into_response());
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILENAME),
            ),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContestConfig;
    use crate::store::MemoryStore;
    use crate::transport::MemoryTransport;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    const GATEWAY_TOKEN: &str = "gateway-token";

    fn app(auth: AuthConfig) -> (Router, Arc<AppState>) {
        let state = Arc::new(AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryTransport::new()),
            ContestConfig::default(),
        ));
        let gateway = GatewayAuth {
            token: Some(GATEWAY_TOKEN.to_string()),
        };
        (
            router(state.clone(), Arc::new(auth), Arc::new(gateway)),
            state,
        )
    }

    fn event_request(event: &serde_json::Value, token: Option<&str>) -> Request<Body> {
        let mut builder =
            Request::post("/events").header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(event.to_string())).unwrap()
    }

    fn locked() -> AuthConfig {
        AuthConfig {
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
        }
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app(locked());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_moderation_requires_credentials() {
        let (app, _) = app(locked());
        let response = app
            .oneshot(
                Request::get("/moderation/submissions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[tokio::test]
    async fn test_moderation_accepts_credentials() {
        let (app, _) = app(locked());
        let response = app
            .oneshot(
                Request::get("/moderation/submissions")
                    // admin:secret
                    .header(header::AUTHORIZATION, "Basic YWRtaW46c2VjcmV0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"[]");
    }

    #[tokio::test]
    async fn test_missing_submission_is_404() {
        let (app, _) = app(AuthConfig {
            username: None,
            password: None,
        });
        let response = app
            .oneshot(
                Request::get("/moderation/submissions/nobody")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_event_route_dispatches() {
        let (app, state) = app(locked());
        state.set_submissions_open(true).await.unwrap();

        let event = serde_json::json!({
            "t": "submission_command",
            "user_id": "u1",
            "display_name": "Alice",
            "channel_id": "submissions",
            "url": "http://x/1"
        });
        let response = app
            .oneshot(event_request(&event, Some(GATEWAY_TOKEN)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.store.get_by_user("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_event_route_rejects_forged_events() {
        let (app, state) = app(locked());
        state.set_submissions_open(true).await.unwrap();
        let pending = state
            .begin_submission("victim", "Victim", "http://x/1")
            .await
            .unwrap();
        state.confirm_submission(pending, "m1").await.unwrap();

        let forged = serde_json::json!({
            "t": "message_deleted",
            "message_id": "m1",
            "channel_id": "submissions"
        });
        for token in [None, Some("wrong-token")] {
            let response = app
                .clone()
                .oneshot(event_request(&forged, token))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        }

        assert!(state.store.get_by_user("victim").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_csv_download_headers() {
        let (app, _) = app(AuthConfig {
            username: None,
            password: None,
        });
        let response = app
            .oneshot(
                Request::get("/moderation/submissions.csv")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
    }
}
