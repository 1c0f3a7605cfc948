//! [`MemoryStore`]: in-process backend for development and tests.

use std::collections::BTreeMap;

use axum::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{NewUser, Profile, ProfileFields, ProfileStore, StoreError, User, UserStore};

#[derive(Default)]
struct State {
    next_user_id: i64,
    next_profile_id: i64,
    users: BTreeMap<i64, User>,
    /// Keyed by `user_id`.
    profiles: BTreeMap<i64, Profile>,
}

/// Both stores over a single lock, so profile writes can check the user
/// foreign key atomically.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl State {
    fn phone_taken(&self, phone: &str, by_other_than: i64) -> bool {
        self.profiles
            .values()
            .any(|p| p.phone_number == phone && p.user_id != by_other_than)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(StoreError::AlreadyExists);
        }
        state.next_user_id += 1;
        let now = Utc::now();
        let row = User {
            id: state.next_user_id,
            email: user.email,
            username: user.username,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn by_email(&self, email: &str) -> Result<User, StoreError> {
        self.state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn by_user_id(&self, user_id: i64) -> Result<Profile, StoreError> {
        self.state
            .read()
            .await
            .profiles
            .get(&user_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, fields: ProfileFields) -> Result<Profile, StoreError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&fields.user_id) {
            return Err(StoreError::NotFound);
        }
        if state.profiles.contains_key(&fields.user_id)
            || state.phone_taken(&fields.phone_number, fields.user_id)
        {
            return Err(StoreError::AlreadyExists);
        }
        state.next_profile_id += 1;
        let now = Utc::now();
        let row = Profile {
            id: state.next_profile_id,
            user_id: fields.user_id,
            full_name: fields.full_name,
            date_of_birth: fields.date_of_birth,
            aadhaar_number: fields.aadhaar_number,
            phone_number: fields.phone_number,
            address: fields.address,
            created_at: now,
            updated_at: now,
        };
        state.profiles.insert(row.user_id, row.clone());
        Ok(row)
    }

    async fn update(&self, fields: ProfileFields) -> Result<Profile, StoreError> {
        let mut state = self.state.write().await;
        if !state.profiles.contains_key(&fields.user_id) {
            return Err(StoreError::NotFound);
        }
        if state.phone_taken(&fields.phone_number, fields.user_id) {
            return Err(StoreError::AlreadyExists);
        }
        let row = state
            .profiles
            .get_mut(&fields.user_id)
            .ok_or(StoreError::NotFound)?;
        row.full_name = fields.full_name;
        row.date_of_birth = fields.date_of_birth;
        row.aadhaar_number = fields.aadhaar_number;
        row.phone_number = fields.phone_number;
        row.address = fields.address;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete(&self, user_id: i64) -> Result<(), StoreError> {
        self.state
            .write()
            .await
            .profiles
            .remove(&user_id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
