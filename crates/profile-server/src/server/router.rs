//! Axum router construction.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};

use super::{handlers, middleware, middleware::RateLimit, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// Layers, outermost first: tracing, timeout, CORS, rate limit, compression.
pub fn build(state: AppState, rate_limit: RateLimit, cors: CorsLayer) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/admin/health/reset", post(handlers::health::reset))
        .route(
            "/restricted/profile",
            get(handlers::profile::get_profile)
                .post(handlers::profile::create_profile)
                .put(handlers::profile::update_profile)
                .delete(handlers::profile::delete_profile),
        );

    Router::new()
        .nest("/api", api)
        .fallback(handlers::not_found)
        .layer(CompressionLayer::new())
        .layer(from_fn_with_state(rate_limit, middleware::rate_limit))
        .layer(cors)
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroU32;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use axum_test::TestServer;
    use common::protocol::{ErrorResponse, HealthResponse, LoginResponse, ProfileResponse};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::health::HealthStatus;

    fn app(state: AppState) -> Router {
        let limit = RateLimit::new(NonZeroU32::new(100).unwrap(), NonZeroU32::new(100).unwrap());
        let cors = middleware::cors(&["http://localhost:5173".into()]).unwrap();
        build(state, limit, cors)
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app(AppState::for_tests()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn health_route_exists() {
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let resp = app(AppState::for_tests()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn cors_preflight_allows_configured_origin() {
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/login")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let resp = app(AppState::for_tests()).oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn rate_limit_returns_429() {
        let one = NonZeroU32::new(1).unwrap();
        let cors = middleware::cors(&["http://localhost:5173".into()]).unwrap();
        let app = build(AppState::for_tests(), RateLimit::new(one, one), cors);

        let req = || {
            Request::builder()
                .uri("/api/health")
                .header("x-real-ip", "203.0.113.9")
                .body(Body::empty())
                .unwrap()
        };
        assert_eq!(app.clone().oneshot(req()).await.unwrap().status(), StatusCode::OK);
        let resp = app.oneshot(req()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    async fn second_request_status(trust_proxy_headers: bool) -> StatusCode {
        let one = NonZeroU32::new(1).unwrap();
        let cors = middleware::cors(&["http://localhost:5173".into()]).unwrap();
        let limit = RateLimit::new(one, one).with_proxy_headers(trust_proxy_headers);
        let app = build(AppState::for_tests(), limit, cors);

        let req = |ip: &str| {
            Request::builder()
                .uri("/api/health")
                .header("x-real-ip", ip)
                .body(Body::empty())
                .unwrap()
        };
        assert_eq!(
            app.clone().oneshot(req("203.0.113.1")).await.unwrap().status(),
            StatusCode::OK
        );
        app.oneshot(req("203.0.113.2")).await.unwrap().status()
    }

    #[tokio::test]
    async fn spoofed_real_ip_does_not_reset_quota() {
        assert_eq!(second_request_status(false).await, StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn trusted_real_ip_keys_the_quota() {
        assert_eq!(second_request_status(true).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn full_account_and_profile_flow() {
        let state = AppState::for_tests();
        let server = TestServer::new(app(state.clone())).unwrap();

        server
            .post("/api/register")
            .json(&json!({"email": "asha@example.com", "username": "asha", "password": "longenough"}))
            .await
            .assert_status(StatusCode::CREATED);

        let token = server
            .post("/api/login")
            .json(&json!({"email": "asha@example.com", "password": "longenough"}))
            .await
            .json::<LoginResponse>()
            .token;
        let auth = header::HeaderValue::from_str(&format!("Bearer {token}")).unwrap();

        server
            .post("/api/restricted/profile")
            .add_header(header::AUTHORIZATION, auth.clone())
            .json(&json!({
                "full_name": "Asha Rao",
                "date_of_birth": "1990-04-12",
                "aadhaar_number": "498765432102",
                "phone_number": "+91-98765-43210",
                "address": "12 MG Road, Bengaluru"
            }))
            .await
            .assert_status(StatusCode::CREATED);

        let got = server
            .get("/api/restricted/profile")
            .add_header(header::AUTHORIZATION, auth)
            .await
            .json::<ProfileResponse>();
        assert_eq!(got.aadhaar_number, "498765432102");

        let stored = state.repo.profiles.by_user_id(got.user_id).await.unwrap();
        assert_ne!(stored.aadhaar_number, "498765432102");
    }

    #[tokio::test]
    async fn critical_health_then_operator_reset() {
        let state = AppState::for_tests();
        state.health.raise(HealthStatus::Critical).await;
        let server = TestServer::new(app(state)).unwrap();

        let resp = server.get("/api/health").await;
        resp.assert_status(StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(resp.json::<HealthResponse>().status, "critical");

        let resp = server.post("/api/admin/health/reset").await;
        resp.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(resp.json::<ErrorResponse>().code, "unauthorized");

        server
            .post("/api/admin/health/reset")
            .add_header(
                header::HeaderName::from_static("x-admin-token"),
                header::HeaderValue::from_static("test-admin-token"),
            )
            .await
            .assert_status_ok();
        server.get("/api/health").await.assert_status_ok();
    }
}
