//! Identity resolution: verified claims → live actor.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use classifieds_core::UserId;

use crate::{Actor, AuthError, Claims, Role};

/// The slice of a user record the auth core needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub subject_id: UserId,
    pub username: String,
    pub password_verifier: String,
    pub role: Role,
    pub active: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("user directory unavailable: {0}")]
    Unavailable(String),
}

impl From<DirectoryError> for AuthError {
    fn from(value: DirectoryError) -> Self {
        match value {
            DirectoryError::Unavailable(msg) => AuthError::Directory(msg),
        }
    }
}

/// User lookup collaborator, implemented by the persistence layer.
///
/// Lookups may suspend; callers must not hold locks across them.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<DirectoryUser>, DirectoryError>;

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError>;
}

#[async_trait]
impl<D> UserDirectory for Arc<D>
where
    D: UserDirectory + ?Sized,
{
    async fn find_by_id(&self, id: &UserId) -> Result<Option<DirectoryUser>, DirectoryError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError> {
        (**self).find_by_username(username).await
    }
}

/// Maps a token's subject to a live user.
#[derive(Debug, Clone)]
pub struct IdentityResolver<D> {
    directory: D,
}

impl<D> IdentityResolver<D>
where
    D: UserDirectory,
{
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Resolve verified claims into an [`Actor`].
    ///
    /// Each failure is reported distinctly: missing subject, malformed subject,
    /// unknown subject, inactive user.
    pub async fn resolve(&self, claims: &Claims) -> Result<Actor, AuthError> {
        let raw = claims
            .sub
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(AuthError::MissingSubject)?;

        // Only the canonical hyphenated lowercase form is accepted; uuid's
        // parser would also take braced, urn, simple and uppercase forms.
        let subject_id: UserId = raw.parse().map_err(|_| AuthError::MalformedSubject)?;
        if subject_id.to_string() != raw {
            return Err(AuthError::MalformedSubject);
        }

        let user = self
            .directory
            .find_by_id(&subject_id)
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        if !user.active {
            return Err(AuthError::Inactive);
        }

        Ok(Actor::new(user.subject_id, user.role))
    }
}
