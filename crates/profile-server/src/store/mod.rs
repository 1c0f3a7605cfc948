//! Persistence for users and profiles.
//!
//! # Responsibilities
//!
//! - Define the [`UserStore`] and [`ProfileStore`] seams used by the handlers.
//! - Provide a Postgres backend ([`postgres`]) and an in-memory backend
//!   ([`memory`]) with the same uniqueness and foreign-key semantics.
//!
//! # Module invariants
//!
//! - **No crypto dependencies.** The store persists whatever string it is given
//!   for `aadhaar_number`; handlers encrypt before writing and decrypt after
//!   reading, so only ciphertext ever reaches a backend.

pub mod memory;
pub mod models;
pub mod postgres;

pub use models::{NewUser, Profile, ProfileFields, User};

use std::sync::Arc;

use axum::async_trait;
use thiserror::Error;

/// Errors produced by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched, or a referenced row does not exist.
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint would be violated.
    #[error("record already exists")]
    AlreadyExists,

    /// The backend failed for any other reason.
    #[error("database error: {0}")]
    Database(String),
}

/// User account persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user.
    ///
    /// Fails with [`StoreError::AlreadyExists`] on a duplicate email or username.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn by_email(&self, email: &str) -> Result<User, StoreError>;
}

/// Profile persistence, one profile per user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn by_user_id(&self, user_id: i64) -> Result<Profile, StoreError>;

    /// Insert a profile.
    ///
    /// [`StoreError::NotFound`] if the user does not exist,
    /// [`StoreError::AlreadyExists`] if the user already has a profile or the
    /// phone number is taken.
    async fn create(&self, fields: ProfileFields) -> Result<Profile, StoreError>;

    /// Replace the profile of `fields.user_id`.
    ///
    /// [`StoreError::NotFound`] if the user has no profile,
    /// [`StoreError::AlreadyExists`] if the phone number is taken.
    async fn update(&self, fields: ProfileFields) -> Result<Profile, StoreError>;

    async fn delete(&self, user_id: i64) -> Result<(), StoreError>;
}

/// The set of stores handed to request handlers.
#[derive(Clone)]
pub struct Repository {
    pub users: Arc<dyn UserStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

impl Repository {
    /// Repository backed by a Postgres pool.
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let store = Arc::new(postgres::PgStore::new(pool));
        Self {
            users: store.clone(),
            profiles: store,
        }
    }

    /// Repository backed by process memory.
    pub fn in_memory() -> Self {
        let store = Arc::new(memory::MemoryStore::new());
        Self {
            users: store.clone(),
            profiles: store,
        }
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Repository")
    }
}
