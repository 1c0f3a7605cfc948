//! Health probe and operator reset.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::protocol::HealthResponse;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use crate::server::error::{ApiError, ApiResult};
use crate::server::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// `GET /api/health`: 200 while `Healthy` or `Degraded`, 503 otherwise.
pub async fn health(State(state): State<AppState>) -> Response {
    let status = state.health.get().await;
    let code = StatusCode::from_u16(status.http_status()).unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
    let body = HealthResponse {
        status: status.as_str().into(),
    };
    (code, Json(body)).into_response()
}

/// `POST /api/admin/health/reset`: return health to `Healthy`.
pub async fn reset(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<HealthResponse>> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(ApiError::not_found("the requested resource does not exist"));
    };

    let provided = headers
        .get(ADMIN_TOKEN_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if !bool::from(expected.as_bytes().ct_eq(provided)) {
        warn!("health reset rejected");
        return Err(ApiError::unauthorized("invalid admin token"));
    }

    state.health.reset().await;
    info!("health reset by operator");
    Ok(Json(HealthResponse {
        status: state.health.get().await.as_str().into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::HealthStatus;
    use axum::{body::Body, http::Request, routing::{get, post}, Router};
    use tower::ServiceExt;

    fn router(state: AppState) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/reset", post(reset))
            .with_state(state)
    }

    fn reset_req(token: Option<&str>) -> Request<Body> {
        let mut b = Request::builder().method("POST").uri("/reset");
        if let Some(t) = token {
            b = b.header(ADMIN_TOKEN_HEADER, t);
        }
        b.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reflects_escalator() {
        let state = AppState::for_tests();
        let app = router(state.clone());

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

        state.health.raise(HealthStatus::Degraded).await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        assert_eq!(app.clone().oneshot(req).await.unwrap().status(), StatusCode::OK);

        state.health.raise(HealthStatus::Critical).await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn reset_requires_matching_token() {
        let state = AppState::for_tests();
        state.health.raise(HealthStatus::Down).await;
        let app = router(state.clone());

        let resp = app.clone().oneshot(reset_req(None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let resp = app.clone().oneshot(reset_req(Some("wrong"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.health.get().await, HealthStatus::Down);

        let resp = app.oneshot(reset_req(Some("test-admin-token"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.health.get().await, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn reset_disabled_without_admin_token() {
        let state = AppState {
            admin_token: None,
            ..AppState::for_tests()
        };
        let resp = router(state).oneshot(reset_req(Some("anything"))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
