//! Axum request handlers for all service endpoints.
//!
//! Failures observed here feed the health escalator according to one policy:
//! a cryptographic failure (field cipher, token signing, password hashing) is
//! `Critical`; an unexpected store failure is `Degraded`.

pub mod auth;
pub mod health;
pub mod profile;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use common::protocol::ErrorResponse;
use tracing::error;

use super::error::ApiError;
use crate::health::{HealthEscalator, HealthStatus};
use crate::store::StoreError;

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Raise health to `Critical` and answer with a generic 500.
///
/// `what` names the operation; the error itself is logged but never returned.
pub(crate) async fn crypto_failure(
    health: &HealthEscalator,
    what: &'static str,
    err: &(dyn std::error::Error + Send + Sync),
) -> ApiError {
    error!(operation = what, error = %err, "cryptographic operation failed");
    health.raise(HealthStatus::Critical).await;
    ApiError::internal()
}

/// Map a store error to a response, raising health to `Degraded` on backend
/// failures.
pub(crate) async fn store_failure(
    health: &HealthEscalator,
    err: StoreError,
    not_found: &str,
    conflict: &str,
) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::not_found(not_found),
        StoreError::AlreadyExists => ApiError::conflict(conflict),
        StoreError::Database(detail) => {
            error!(error = %detail, "store operation failed");
            health.raise(HealthStatus::Degraded).await;
            ApiError::internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn fallback_is_json_404() {
        let app: Router = Router::new()
            .route("/known", get(|| async { "ok" }))
            .fallback(not_found);
        let req = Request::builder().uri("/unknown").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn database_errors_degrade_health() {
        let health = HealthEscalator::new();
        let err = store_failure(&health, StoreError::Database("boom".into()), "x", "y").await;
        assert!(matches!(err, ApiError::Service(common::ServiceError::Internal(_))));
        assert_eq!(health.get().await, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn not_found_and_conflict_leave_health_alone() {
        let health = HealthEscalator::new();
        store_failure(&health, StoreError::NotFound, "x", "y").await;
        store_failure(&health, StoreError::AlreadyExists, "x", "y").await;
        assert_eq!(health.get().await, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn crypto_failures_are_critical() {
        let health = HealthEscalator::new();
        let cause = crate::crypto::cipher::CipherError::AuthenticationFailed;
        crypto_failure(&health, "decrypt", &cause).await;
        assert_eq!(health.get().await, HealthStatus::Critical);
    }
}
