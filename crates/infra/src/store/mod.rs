//! User and advertisement persistence.
//!
//! Two backends implement the same repository traits:
//! - [`InMemoryStore`] for tests and local development
//! - [`PostgresStore`] backed by a `sqlx` connection pool
//!
//! Both also implement [`UserDirectory`], which is how the auth core looks up
//! subjects.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use classifieds_auth::{DirectoryError, DirectoryUser, Role, UserDirectory};
use classifieds_core::{AdvertisementId, UserId};

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for DirectoryError {
    fn from(value: StoreError) -> Self {
        DirectoryError::Unavailable(value.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_verifier: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for DirectoryUser {
    fn from(value: UserRecord) -> Self {
        DirectoryUser {
            subject_id: value.id,
            username: value.username,
            password_verifier: value.password_verifier,
            role: value.role,
            active: value.active,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_verifier: String,
    pub role: Role,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_verifier: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advertisement {
    pub id: AdvertisementId,
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    /// Ownership fact consumed by the authorization policy.
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAdvertisement {
    pub title: String,
    pub description: Option<String>,
    pub price: f64,
    pub author_id: UserId,
}

#[derive(Debug, Clone, Default)]
pub struct AdvertisementChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

/// Search criteria. Text filters are case-insensitive substring matches, price
/// bounds are inclusive. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct AdvertisementFilter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl AdvertisementFilter {
    pub fn matches(&self, ad: &Advertisement) -> bool {
        fn contains_ci(haystack: &str, needle: &str) -> bool {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }

        if let Some(title) = &self.title {
            if !contains_ci(&ad.title, title) {
                return false;
            }
        }
        if let Some(description) = &self.description {
            match &ad.description {
                Some(d) if contains_ci(d, description) => {}
                _ => return false,
            }
        }
        if let Some(min) = self.min_price {
            if ad.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if ad.price > max {
                return false;
            }
        }
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Repositories
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the username is taken.
    async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord>;

    async fn get_user(&self, id: &UserId) -> StoreResult<Option<UserRecord>>;

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>>;

    async fn update_user(&self, id: &UserId, changes: UserChanges) -> StoreResult<UserRecord>;

    async fn set_user_active(&self, id: &UserId, active: bool) -> StoreResult<UserRecord>;

    /// Removes the user and every advertisement they authored.
    async fn delete_user(&self, id: &UserId) -> StoreResult<()>;
}

#[async_trait]
pub trait AdvertisementRepository: Send + Sync {
    async fn create_advertisement(&self, new: NewAdvertisement) -> StoreResult<Advertisement>;

    async fn get_advertisement(&self, id: &AdvertisementId) -> StoreResult<Option<Advertisement>>;

    /// The `(resource_id, owner_subject_id)` ownership fact.
    async fn advertisement_owner(&self, id: &AdvertisementId) -> StoreResult<Option<UserId>> {
        Ok(self.get_advertisement(id).await?.map(|ad| ad.author_id))
    }

    async fn update_advertisement(
        &self,
        id: &AdvertisementId,
        changes: AdvertisementChanges,
    ) -> StoreResult<Advertisement>;

    async fn delete_advertisement(&self, id: &AdvertisementId) -> StoreResult<()>;

    async fn search_advertisements(
        &self,
        filter: &AdvertisementFilter,
    ) -> StoreResult<Vec<Advertisement>>;
}

/// Everything the HTTP layer needs from storage.
pub trait Store: UserRepository + AdvertisementRepository + UserDirectory {}

impl<T> Store for T where T: UserRepository + AdvertisementRepository + UserDirectory {}

/// Shared `UserDirectory` behaviour for any user repository.
pub(crate) async fn directory_lookup_by_id<R>(
    repo: &R,
    id: &UserId,
) -> Result<Option<DirectoryUser>, DirectoryError>
where
    R: UserRepository + ?Sized,
{
    Ok(repo.get_user(id).await?.map(DirectoryUser::from))
}

pub(crate) async fn directory_lookup_by_username<R>(
    repo: &R,
    username: &str,
) -> Result<Option<DirectoryUser>, DirectoryError>
where
    R: UserRepository + ?Sized,
{
    Ok(repo
        .get_user_by_username(username)
        .await?
        .map(DirectoryUser::from))
}
