//! In-memory identity provider
//!
//! Accounts live only as long as the process. Reports the same error codes
//! as the Firebase REST API so classification behaves identically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{IdentityProvider, ProviderError};
use crate::models::User;

struct Account {
    uid: String,
    password: String,
    disabled: bool,
}

#[derive(Default)]
pub struct MemoryIdentity {
    accounts: Mutex<HashMap<String, Account>>,
    session: Mutex<Option<User>>,
    sign_out_failure: Mutex<Option<ProviderError>>,
    calls: AtomicUsize,
}

impl MemoryIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an account up front
    pub fn with_account(self, email: &str, password: &str) -> Self {
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.insert(
                email.to_lowercase(),
                Account {
                    uid: Uuid::new_v4().simple().to_string(),
                    password: password.to_string(),
                    disabled: false,
                },
            );
        }
        self
    }

    /// Disable an account so sign-in is refused
    pub fn disable(&self, email: &str) {
        if let Ok(mut accounts) = self.accounts.lock() {
            if let Some(account) = accounts.get_mut(&email.to_lowercase()) {
                account.disabled = true;
            }
        }
    }

    /// Make the next sign-out fail with the given error
    pub fn fail_sign_out(&self, error: ProviderError) {
        if let Ok(mut failure) = self.sign_out_failure.lock() {
            *failure = Some(error);
        }
    }

    /// Number of sign-in / sign-up requests received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn start_session(&self, user: User) -> Result<User, ProviderError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| ProviderError::Other("session lock poisoned".into()))?;
        *session = Some(user.clone());
        Ok(user)
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = email.to_lowercase();

        let user = {
            let accounts = self
                .accounts
                .lock()
                .map_err(|_| ProviderError::Other("accounts lock poisoned".into()))?;
            let account = accounts
                .get(&key)
                .ok_or_else(|| ProviderError::Code("EMAIL_NOT_FOUND".into()))?;
            if account.disabled {
                return Err(ProviderError::Code("USER_DISABLED".into()));
            }
            if account.password != password {
                return Err(ProviderError::Code("INVALID_PASSWORD".into()));
            }
            User::new(account.uid.clone()).with_email(key)
        };

        self.start_session(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<User, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = email.to_lowercase();
        if !key.contains('@') {
            return Err(ProviderError::Code("INVALID_EMAIL".into()));
        }
        if password.len() < 6 {
            return Err(ProviderError::Code(
                "WEAK_PASSWORD : Password should be at least 6 characters".into(),
            ));
        }

        let user = {
            let mut accounts = self
                .accounts
                .lock()
                .map_err(|_| ProviderError::Other("accounts lock poisoned".into()))?;
            if accounts.contains_key(&key) {
                return Err(ProviderError::Code("EMAIL_EXISTS".into()));
            }
            let uid = Uuid::new_v4().simple().to_string();
            accounts.insert(
                key.clone(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                    disabled: false,
                },
            );
            User::new(uid).with_email(key)
        };

        self.start_session(user)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        if let Ok(mut session) = self.session.lock() {
            *session = None;
        }
        let failure = self
            .sign_out_failure
            .lock()
            .ok()
            .and_then(|mut failure| failure.take());
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn restore(&self) -> Result<Option<User>, ProviderError> {
        self.session
            .lock()
            .map(|session| session.clone())
            .map_err(|_| ProviderError::Other("session lock poisoned".into()))
    }
}
