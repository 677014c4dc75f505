//! Persisted identity of the logged-in user
//!
//! Stores the user as JSON under the `user` key of any storage adapter.

use park_core::models::User;
use park_core::traits::StorageAdapter;
use park_core::AppResult;
use std::sync::Arc;
use tracing::{debug, error};

use crate::keys::USER_KEY;

/// Identity store on top of a storage adapter
#[derive(Clone)]
pub struct IdentityStore {
    storage: Arc<dyn StorageAdapter>,
}

impl IdentityStore {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Persist the logged-in user
    pub async fn set_user(&self, user: &User) -> AppResult<()> {
        let json = serde_json::to_string(user)?;
        self.storage.set(USER_KEY, &json).await?;
        debug!("Stored identity for user {}", user.id);
        Ok(())
    }

    /// Load the persisted user, if any
    pub async fn get_user(&self) -> AppResult<Option<User>> {
        match self.storage.get(USER_KEY).await? {
            Some(json) => {
                let user = serde_json::from_str::<User>(&json).map_err(|e| {
                    error!("Failed to deserialize stored identity: {}", e);
                    e
                })?;
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    /// Forget the persisted user
    pub async fn delete_user(&self) -> AppResult<bool> {
        self.storage.delete(USER_KEY).await
    }
}
