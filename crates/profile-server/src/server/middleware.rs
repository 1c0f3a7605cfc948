//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, CORS, per-client rate
//! limiting, and response compression.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use common::ServiceError;
use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use super::error::ApiError;
use crate::config::Config;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-client-IP token bucket shared by every request.
#[derive(Clone)]
pub struct RateLimit {
    limiter: Arc<DefaultKeyedRateLimiter<IpAddr>>,
    trust_proxy_headers: bool,
}

impl RateLimit {
    pub fn new(per_second: NonZeroU32, burst: NonZeroU32) -> Self {
        let quota = Quota::per_second(per_second).allow_burst(burst);
        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            trust_proxy_headers: false,
        }
    }

    /// Key clients by `X-Real-IP` / `X-Forwarded-For` instead of the socket
    /// peer. Only safe behind a proxy that overwrites both headers.
    pub fn with_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    /// # Errors
    ///
    /// Returns an error if the configured rate or burst is zero.
    pub fn from_config(config: &Config) -> Result<Self> {
        let per_second =
            NonZeroU32::new(config.rate_limit_per_second).context("RATE_LIMIT_PER_SECOND must be > 0")?;
        let burst = NonZeroU32::new(config.rate_limit_burst).context("RATE_LIMIT_BURST must be > 0")?;
        Ok(Self::new(per_second, burst).with_proxy_headers(config.trust_proxy_headers))
    }

    /// Take one token for `ip`; `false` once its bucket is empty.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.limiter.check_key(&ip).is_ok()
    }

    /// Drop state for clients whose buckets have fully refilled.
    pub fn prune(&self) {
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
    }

    pub fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

impl std::fmt::Debug for RateLimit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimit")
            .field("tracked_clients", &self.tracked_clients())
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .finish()
    }
}

/// Reject requests from clients that exhausted their quota with 429.
pub async fn rate_limit(State(limit): State<RateLimit>, req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip = client_ip(req.headers(), peer, limit.trust_proxy_headers);

    if !limit.check(ip) {
        debug!(client_ip = %ip, "rate limit exceeded");
        return ApiError::Service(ServiceError::TooManyRequests).into_response();
    }
    next.run(req).await
}

/// Caller address. With `trust_headers`: `X-Real-IP`, then the first
/// `X-Forwarded-For` hop, then the socket peer. Without it, only the peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_headers: bool) -> IpAddr {
    let unspecified = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
    if !trust_headers {
        return peer.unwrap_or(unspecified);
    }
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok())
    };
    header_ip("x-real-ip")
        .or_else(|| header_ip("x-forwarded-for"))
        .or(peer)
        .unwrap_or(unspecified)
}

/// Periodically prune idle limiter state until `shutdown` fires.
pub async fn prune_task(limit: RateLimit, every: Duration, shutdown: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately.
    ticker.tick().await;
    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                limit.prune();
                debug!(tracked_clients = limit.tracked_clients(), "rate limiter pruned");
            }
        }
    }
    debug!("rate limiter pruning stopped");
}

/// CORS policy for the configured browser origins.
///
/// # Errors
///
/// Returns an error if an origin is `*` (credentials are allowed, so the
/// wildcard is not permitted) or is not a valid header value.
pub fn cors(origins: &[String]) -> Result<CorsLayer> {
    if origins.iter().any(|o| o == "*") {
        anyhow::bail!("CORS origin `*` cannot be combined with credentials; list origins explicitly");
    }
    let origins = origins
        .iter()
        .map(|o| HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin: {o}")))
        .collect::<Result<Vec<_>>>()?;
    if origins.is_empty() {
        warn!("no CORS origins configured; cross-origin requests will be rejected");
    }

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
        ])
        .allow_credentials(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    fn nz(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[test]
    fn burst_then_reject_per_client() {
        let limit = RateLimit::new(nz(1), nz(3));
        let a = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));
        let b = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2));
        assert!((0..3).all(|_| limit.check(a)));
        assert!(!limit.check(a));
        assert!(limit.check(b));
        assert_eq!(limit.tracked_clients(), 2);
    }

    #[test]
    fn real_ip_wins_over_forwarded_for() {
        let h = headers(&[("x-real-ip", "203.0.113.7"), ("x-forwarded-for", "198.51.100.1")]);
        assert_eq!(client_ip(&h, None, true), "203.0.113.7".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn first_forwarded_hop_is_used() {
        let h = headers(&[("x-forwarded-for", "198.51.100.1, 10.0.0.1")]);
        assert_eq!(client_ip(&h, None, true), "198.51.100.1".parse::<IpAddr>().unwrap());
    }

    #[test]
    fn falls_back_to_peer_then_unspecified() {
        let peer = IpAddr::V6(Ipv6Addr::LOCALHOST);
        let junk = headers(&[("x-real-ip", "not-an-ip")]);
        assert_eq!(client_ip(&junk, Some(peer), true), peer);
        assert_eq!(
            client_ip(&HeaderMap::new(), None, true),
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        );
    }

    #[test]
    fn untrusted_headers_are_ignored() {
        let peer = IpAddr::V4(Ipv4Addr::new(192, 0, 2, 10));
        let h = headers(&[("x-real-ip", "203.0.113.7"), ("x-forwarded-for", "198.51.100.1")]);
        assert_eq!(client_ip(&h, Some(peer), false), peer);
        assert_eq!(client_ip(&h, None, false), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn cors_rejects_bad_origin() {
        assert!(cors(&["http://localhost:5173".into()]).is_ok());
        assert!(cors(&["bad\norigin".into()]).is_err());
    }

    #[test]
    fn cors_rejects_wildcard_origin() {
        let err = cors(&["http://a.test".into(), "*".into()]).unwrap_err();
        assert!(err.to_string().contains("credentials"));
    }

    #[tokio::test]
    async fn prune_task_stops_on_cancel() {
        let token = CancellationToken::new();
        let handle = tokio::spawn(prune_task(
            RateLimit::new(nz(1), nz(1)),
            Duration::from_millis(10),
            token.clone(),
        ));
        token.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
