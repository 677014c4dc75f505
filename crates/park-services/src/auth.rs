//! Auth session service
//!
//! Holds the logged-in user in memory and keeps it persisted through the
//! identity store so it survives restarts.

use park_cache::IdentityStore;
use park_core::models::{Role, User};
use park_core::{AppError, AppResult};
use parking_lot::RwLock;
use tracing::{info, instrument, warn};

pub struct AuthService {
    identity: IdentityStore,
    current: RwLock<Option<User>>,
}

impl AuthService {
    pub fn new(identity: IdentityStore) -> Self {
        Self {
            identity,
            current: RwLock::new(None),
        }
    }

    /// Persist and hold the user
    #[instrument(skip(self, user), fields(user_id = %user.id, role = %user.role))]
    pub async fn login(&self, user: User) -> AppResult<()> {
        self.identity.set_user(&user).await?;
        info!("User {} logged in as {}", user.email, user.role);
        *self.current.write() = Some(user);
        Ok(())
    }

    /// Forget the user, both in memory and in storage
    #[instrument(skip(self))]
    pub async fn logout(&self) -> AppResult<()> {
        self.identity.delete_user().await?;
        if let Some(user) = self.current.write().take() {
            info!("User {} logged out", user.email);
        }
        Ok(())
    }

    /// Load the persisted user, if any
    ///
    /// An unreadable stored identity is discarded and treated as logged out.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> AppResult<Option<User>> {
        let user = match self.identity.get_user().await {
            Ok(user) => user,
            Err(AppError::Serialization(e)) => {
                warn!("Discarding unreadable stored identity: {}", e);
                self.identity.delete_user().await?;
                None
            }
            Err(e) => return Err(e),
        };

        match &user {
            Some(user) => info!("Restored session for {} ({})", user.email, user.role),
            None => info!("No stored identity"),
        }

        *self.current.write() = user.clone();
        Ok(user)
    }

    pub fn current_user(&self) -> Option<User> {
        self.current.read().clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.current.read().as_ref().map(|user| user.role)
    }

    pub fn is_logged_in(&self) -> bool {
        self.current.read().is_some()
    }
}
