//! Identity management
//!
//! The [`IdentityAdapter`] wraps an external [`IdentityProvider`] and keeps
//! the signed-in [`User`] for the session. Providers report failures as raw
//! codes; the adapter classifies them through
//! [`AuthErrorKind`](crate::error::AuthErrorKind) before anything else
//! sees them.
//!
//! Providers:
//! - `firebase`: Firebase Authentication REST API
//! - `local`: accounts stored in the local SQLite database
//! - `memory`: in-process accounts (tests, throwaway sessions)

pub mod firebase;
pub mod local;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{AppError, AppResult, AuthErrorKind};
use crate::models::User;

pub use firebase::FirebaseAuth;
pub use local::LocalIdentity;
pub use memory::MemoryIdentity;

/// Failure reported by an identity provider, before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider rejected the request with an error code
    Code(String),
    /// The provider could not be reached
    Network(String),
    /// Anything else (bad response, local I/O)
    Other(String),
}

impl ProviderError {
    fn classify(self) -> AppError {
        match self {
            ProviderError::Code(code) => AppError::from_auth_code(&code),
            ProviderError::Network(msg) => AppError::Network(msg),
            ProviderError::Other(msg) => {
                warn!(error = %msg, "identity provider failure");
                AppError::Auth(AuthErrorKind::Unknown)
            }
        }
    }
}

/// External identity provider boundary
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, ProviderError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<User, ProviderError>;

    /// End the provider session
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// The session the provider kept from an earlier run, if any
    async fn restore(&self) -> Result<Option<User>, ProviderError>;
}

/// Supplies bearer tokens for authenticated backend calls
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn id_token(&self) -> AppResult<String>;
}

/// Result of signing out
///
/// Local state is always cleared; a provider failure is reported here
/// rather than discarded.
#[derive(Debug)]
pub struct SignOutOutcome {
    /// The user that was signed in, if any
    pub user: Option<User>,
    /// Error from the provider's sign-out, if it failed
    pub remote_error: Option<AppError>,
}

/// Session-holding wrapper around an identity provider
pub struct IdentityAdapter {
    provider: Arc<dyn IdentityProvider>,
    current: Option<User>,
}

impl IdentityAdapter {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            current: None,
        }
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    /// Pick up a session the provider persisted earlier
    pub async fn restore(&mut self) -> AppResult<Option<User>> {
        let user = self.provider.restore().await.map_err(ProviderError::classify)?;
        if let Some(ref u) = user {
            info!(uid = %u.uid, "restored session");
        }
        self.current = user.clone();
        Ok(user)
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> AppResult<User> {
        let email = validate_credentials(email, password)?;
        let user = self
            .provider
            .sign_in(email, password)
            .await
            .map_err(ProviderError::classify)?;

        info!(uid = %user.uid, "signed in");
        self.current = Some(user.clone());
        Ok(user)
    }

    pub async fn sign_up(&mut self, email: &str, password: &str) -> AppResult<User> {
        let email = validate_credentials(email, password)?;
        let user = self
            .provider
            .sign_up(email, password)
            .await
            .map_err(ProviderError::classify)?;

        info!(uid = %user.uid, "account created");
        self.current = Some(user.clone());
        Ok(user)
    }

    pub async fn sign_out(&mut self) -> SignOutOutcome {
        let user = self.current.take();
        let remote_error = match self.provider.sign_out().await {
            Ok(()) => None,
            Err(e) => {
                let err = e.classify();
                warn!(error = %err, "provider sign-out failed; local session cleared anyway");
                Some(err)
            }
        };

        SignOutOutcome { user, remote_error }
    }
}

/// Reject blank credentials before calling the provider
pub(crate) fn validate_credentials<'a>(email: &'a str, password: &str) -> AppResult<&'a str> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("email is required".to_string()));
    }
    if password.is_empty() {
        return Err(AppError::Validation("password is required".to_string()));
    }
    Ok(email)
}
