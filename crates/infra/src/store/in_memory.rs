use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use classifieds_auth::{DirectoryError, DirectoryUser, UserDirectory};
use classifieds_core::{AdvertisementId, UserId};

use super::{
    Advertisement, AdvertisementChanges, AdvertisementFilter, AdvertisementRepository,
    NewAdvertisement, NewUser, StoreError, StoreResult, UserChanges, UserRecord, UserRepository,
};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, UserRecord>,
    advertisements: HashMap<AdvertisementId, Advertisement>,
}

/// In-memory store for tests/dev.
///
/// One lock guards both tables so user deletion and its advertisement cascade
/// are atomic. No lock is held across an `.await`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, State>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, State>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))
    }
}

fn username_taken(state: &State, username: &str, except: Option<&UserId>) -> bool {
    state
        .users
        .values()
        .any(|u| u.username == username && Some(&u.id) != except)
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, new: NewUser) -> StoreResult<UserRecord> {
        let mut state = self.write()?;
        if username_taken(&state, &new.username, None) {
            return Err(StoreError::Conflict(format!(
                "username '{}' already exists",
                new.username
            )));
        }

        let record = UserRecord {
            id: UserId::new(),
            username: new.username,
            email: new.email,
            password_verifier: new.password_verifier,
            role: new.role,
            active: true,
            created_at: Utc::now(),
        };
        state.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_user(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_user(&self, id: &UserId, changes: UserChanges) -> StoreResult<UserRecord> {
        let mut state = self.write()?;
        if let Some(username) = &changes.username {
            if username_taken(&state, username, Some(id)) {
                return Err(StoreError::Conflict(format!(
                    "username '{username}' already exists"
                )));
            }
        }

        let user = state.users.get_mut(id).ok_or(StoreError::NotFound)?;
        if let Some(username) = changes.username {
            user.username = username;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(verifier) = changes.password_verifier {
            user.password_verifier = verifier;
        }
        Ok(user.clone())
    }

    async fn set_user_active(&self, id: &UserId, active: bool) -> StoreResult<UserRecord> {
        let mut state = self.write()?;
        let user = state.users.get_mut(id).ok_or(StoreError::NotFound)?;
        user.active = active;
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &UserId) -> StoreResult<()> {
        let mut state = self.write()?;
        state.users.remove(id).ok_or(StoreError::NotFound)?;
        state.advertisements.retain(|_, ad| ad.author_id != *id);
        Ok(())
    }
}

#[async_trait]
impl AdvertisementRepository for InMemoryStore {
    async fn create_advertisement(&self, new: NewAdvertisement) -> StoreResult<Advertisement> {
        let mut state = self.write()?;
        if !state.users.contains_key(&new.author_id) {
            return Err(StoreError::Conflict("author does not exist".to_string()));
        }

        let ad = Advertisement {
            id: AdvertisementId::new(),
            title: new.title,
            description: new.description,
            price: new.price,
            author_id: new.author_id,
            created_at: Utc::now(),
        };
        state.advertisements.insert(ad.id, ad.clone());
        Ok(ad)
    }

    async fn get_advertisement(&self, id: &AdvertisementId) -> StoreResult<Option<Advertisement>> {
        Ok(self.read()?.advertisements.get(id).cloned())
    }

    async fn update_advertisement(
        &self,
        id: &AdvertisementId,
        changes: AdvertisementChanges,
    ) -> StoreResult<Advertisement> {
        let mut state = self.write()?;
        let ad = state.advertisements.get_mut(id).ok_or(StoreError::NotFound)?;
        if let Some(title) = changes.title {
            ad.title = title;
        }
        if let Some(description) = changes.description {
            ad.description = Some(description);
        }
        if let Some(price) = changes.price {
            ad.price = price;
        }
        Ok(ad.clone())
    }

    async fn delete_advertisement(&self, id: &AdvertisementId) -> StoreResult<()> {
        self.write()?
            .advertisements
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn search_advertisements(
        &self,
        filter: &AdvertisementFilter,
    ) -> StoreResult<Vec<Advertisement>> {
        let mut found: Vec<Advertisement> = self
            .read()?
            .advertisements
            .values()
            .filter(|ad| filter.matches(ad))
            .cloned()
            .collect();

        // Newest first; UUIDv7 ids break timestamp ties in creation order.
        found.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        Ok(found)
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<DirectoryUser>, DirectoryError> {
        super::directory_lookup_by_id(self, id).await
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError> {
        super::directory_lookup_by_username(self, username).await
    }
}
