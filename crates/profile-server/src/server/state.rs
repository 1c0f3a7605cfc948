//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::crypto::FieldCipher;
use crate::health::HealthEscalator;
use crate::store::Repository;

/// Application state shared across all request handlers.
///
/// Every field is `Arc`-backed, so Axum clones the state per request without
/// copying key material.
#[derive(Clone, Debug)]
pub struct AppState {
    pub repo: Repository,
    /// The one cipher built at startup.
    pub cipher: Arc<FieldCipher>,
    pub tokens: Arc<TokenIssuer>,
    pub health: HealthEscalator,
    /// Enables `POST /api/admin/health/reset` when set.
    pub admin_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        repo: Repository,
        cipher: FieldCipher,
        tokens: TokenIssuer,
        health: HealthEscalator,
        admin_token: Option<String>,
    ) -> Self {
        Self {
            repo,
            cipher: Arc::new(cipher),
            tokens: Arc::new(tokens),
            health,
            admin_token: admin_token.map(Arc::from),
        }
    }

    /// In-memory state with fixed test secrets.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self::for_tests_with(Repository::in_memory())
    }

    #[cfg(test)]
    pub fn for_tests_with(repo: Repository) -> Self {
        let cipher = FieldCipher::new("0123456789abcdef0123456789abcdef")
            .unwrap_or_else(|e| panic!("test key: {e}"));
        Self::new(
            repo,
            cipher,
            TokenIssuer::new("test-jwt-secret", std::time::Duration::from_secs(3600)),
            HealthEscalator::new(),
            Some("test-admin-token".into()),
        )
    }
}
