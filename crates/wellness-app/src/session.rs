// Signed-in session: token, cached user and the remembered login email.
//
// Memory is the source of truth while the app runs; every change is written
// through to the local store so the next launch resumes the session.

use anyhow::{Context, Result};
use tracing::{info, warn};

use wellness_core::models::{ProfileUpdate, Role, User};
use wellness_core::store::LocalStore;

pub struct SessionContext {
    store: LocalStore,
    token: Option<String>,
    user: Option<User>,
}

impl SessionContext {
    /// Restore whatever session the store holds. A token without a user (or
    /// the reverse) is treated as no session and cleared.
    pub fn init(store: LocalStore) -> Result<Self> {
        let token = store.token().context("failed to read stored token")?;
        let user = store.user().context("failed to read stored user")?;

        let (token, user) = match (token, user) {
            (Some(token), Some(user)) => {
                info!("Restored session for {} ({:?})", user.email, user.role);
                (Some(token), Some(user))
            }
            (None, None) => (None, None),
            _ => {
                warn!("Stored session is incomplete; clearing it");
                store.clear_session()?;
                (None, None)
            }
        };

        Ok(SessionContext { store, token, user })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn login(&mut self, token: String, user: User) -> Result<()> {
        self.store
            .save_session(&token, &user)
            .context("failed to persist session")?;
        info!("Signed in as {} ({:?})", user.email, user.role);
        self.token = Some(token);
        self.user = Some(user);
        Ok(())
    }

    /// Drop the session. In-memory state is cleared even if the store write
    /// fails, so a broken store can never keep a user signed in.
    pub fn logout(&mut self) -> Result<()> {
        if let Some(user) = self.user.take() {
            info!("Signed out {}", user.email);
        }
        self.token = None;
        self.store
            .clear_session()
            .context("failed to clear stored session")
    }

    /// Merge the editable profile fields into the cached user.
    pub fn update_profile(&mut self, update: ProfileUpdate) -> Result<&User> {
        let user = self
            .user
            .as_mut()
            .context("cannot update profile without a signed-in user")?;
        user.apply_profile(update);
        self.store
            .save_user(user)
            .context("failed to persist profile")?;
        Ok(user)
    }

    pub fn remembered_email(&self) -> Option<String> {
        match self.store.remembered_email() {
            Ok(email) => email,
            Err(e) => {
                warn!("Failed to read remembered email: {:#}", e);
                None
            }
        }
    }

    pub fn set_remembered_email(&self, email: Option<&str>) -> Result<()> {
        self.store
            .set_remembered_email(email)
            .context("failed to persist remembered email")
    }
}
