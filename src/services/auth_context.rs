use std::sync::{Arc, RwLock};

use secrecy::SecretString;

use crate::error::{MatchNightError, MatchNightResult};
use crate::models::user::{LoginRequest, RegisterRequest, User};
use crate::services::api_client::MatchNightApi;

/// Who is using the application. Populated once on startup by asking the
/// service "who am I", replaced on login/register and cleared on logout.
pub struct AuthContext {
    api: Arc<dyn MatchNightApi>,
    current_user: RwLock<Option<User>>,
}

impl AuthContext {
    pub fn new(api: Arc<dyn MatchNightApi>) -> Self {
        Self {
            api,
            current_user: RwLock::new(None),
        }
    }

    /// Restore an existing session. Any failure simply leaves the context anonymous.
    #[tracing::instrument(name = "Check authentication", skip(self))]
    pub async fn init(&self) -> Option<User> {
        match self.api.current_user().await {
            Ok(user) => {
                tracing::info!("Session found for {}", user.name);
                self.set_user(Some(user.clone()));
                Some(user)
            }
            Err(e) => {
                tracing::info!("Not authenticated: {}", e);
                self.set_user(None);
                None
            }
        }
    }

    pub fn current_user(&self) -> Option<User> {
        match self.current_user.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// The current user, or `Unauthorized` for anonymous callers
    pub fn require_user(&self) -> MatchNightResult<User> {
        self.current_user()
            .ok_or_else(|| MatchNightError::Unauthorized("log in first".to_string()))
    }

    #[tracing::instrument(name = "Login", skip(self, password))]
    pub async fn login(&self, username: &str, password: SecretString) -> MatchNightResult<User> {
        let request = LoginRequest {
            username: username.to_string(),
            password,
        };
        let user = self.api.login(&request).await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    #[tracing::instrument(name = "Quick login", skip(self, password))]
    pub async fn quick_login(&self, username: &str, password: SecretString) -> MatchNightResult<User> {
        let request = LoginRequest {
            username: username.to_string(),
            password,
        };
        let user = self.api.quick_login(&request).await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    #[tracing::instrument(name = "Register", skip(self, password))]
    pub async fn register(
        &self,
        name: &str,
        password: SecretString,
        email: Option<String>,
    ) -> MatchNightResult<User> {
        if name.trim().is_empty() {
            return Err(MatchNightError::Validation("name cannot be empty".to_string()));
        }
        let request = RegisterRequest {
            name: name.trim().to_string(),
            email: email.filter(|e| !e.trim().is_empty()),
            password,
        };
        let user = self.api.register(&request).await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    /// Ends the session. The local user is cleared even when the remote call fails.
    pub async fn logout(&self) {
        if let Err(e) = self.api.logout().await {
            tracing::error!("Logout error: {}", e);
        }
        self.set_user(None);
    }

    pub async fn list_users(&self) -> MatchNightResult<Vec<User>> {
        Ok(self.api.list_users().await?)
    }

    fn set_user(&self, user: Option<User>) {
        match self.current_user.write() {
            Ok(mut guard) => *guard = user,
            Err(poisoned) => *poisoned.into_inner() = user,
        }
    }
}
