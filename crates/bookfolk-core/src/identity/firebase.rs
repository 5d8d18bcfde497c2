//! Firebase Authentication provider
//!
//! Uses the Identity Toolkit REST API for email/password accounts and the
//! Secure Token API to refresh ID tokens. The session (user record plus
//! tokens) is cached in `session.json` so it survives between commands.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{IdentityProvider, ProviderError, TokenSource};
use crate::error::{AppError, AppResult};
use crate::models::User;
use crate::storage::SessionFile;

pub const IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com/v1";
pub const TOKEN_URL: &str = "https://securetoken.googleapis.com/v1";

/// Refresh this long before the token actually expires
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Cached provider session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FirebaseSession {
    pub user: User,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl FirebaseSession {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) <= now
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    profile_picture: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

pub struct FirebaseAuth {
    client: Client,
    api_key: String,
    identity_url: String,
    token_url: String,
    session_file: SessionFile<FirebaseSession>,
    session: Mutex<Option<FirebaseSession>>,
}

impl FirebaseAuth {
    pub fn new(client: Client, api_key: impl Into<String>, session_file: SessionFile<FirebaseSession>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            identity_url: IDENTITY_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            session_file,
            session: Mutex::new(None),
        }
    }

    /// Point at different endpoints (e.g. the auth emulator)
    pub fn with_endpoints(mut self, identity_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        self.identity_url = identity_url.into();
        self.token_url = token_url.into();
        self
    }

    fn account_url(&self, method: &str) -> String {
        format!("{}/accounts:{}?key={}", self.identity_url, method, self.api_key)
    }

    async fn password_call(&self, method: &str, email: &str, password: &str) -> Result<User, ProviderError> {
        let response = self
            .client
            .post(self.account_url(method))
            .json(&PasswordRequest {
                email,
                password,
                return_secure_token: true,
            })
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_code(&body));
        }

        let body: PasswordResponse = response.json().await.map_err(transport_error)?;
        let session = FirebaseSession {
            user: User {
                uid: body.local_id,
                email: body.email,
                display_name: body.display_name.filter(|n| !n.is_empty()),
                photo_url: body.profile_picture,
            },
            expires_at: expiry(&body.expires_in),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
        };

        self.store(session).await
    }

    async fn store(&self, session: FirebaseSession) -> Result<User, ProviderError> {
        self.session_file
            .save(&session)
            .map_err(|e| ProviderError::Other(e.to_string()))?;
        let user = session.user.clone();
        *self.session.lock().await = Some(session);
        Ok(user)
    }

    async fn refresh(&self, session: &FirebaseSession) -> Result<FirebaseSession, ProviderError> {
        debug!(uid = %session.user.uid, "refreshing id token");
        let response = self
            .client
            .post(format!("{}/token?key={}", self.token_url, self.api_key))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", session.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_code(&body));
        }

        let body: RefreshResponse = response.json().await.map_err(transport_error)?;
        Ok(FirebaseSession {
            user: session.user.clone(),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry(&body.expires_in),
        })
    }
}

/// Absolute expiry from the `expiresIn` seconds string
fn expiry(expires_in: &str) -> DateTime<Utc> {
    let secs = expires_in.trim().parse::<i64>().unwrap_or(3600);
    Utc::now() + Duration::seconds(secs)
}

/// Pull the error code out of an Identity Toolkit error body
fn error_code(body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ProviderError::Code(envelope.error.message),
        Err(_) => ProviderError::Other(format!("unexpected response: {}", body)),
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        ProviderError::Network(err.to_string())
    } else {
        ProviderError::Other(err.to_string())
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, ProviderError> {
        self.password_call("signInWithPassword", email, password).await
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<User, ProviderError> {
        self.password_call("signUp", email, password).await
    }

    /// Drops the cached tokens
    ///
    /// The REST API has no client-side revoke; refresh tokens stay valid
    /// server-side until they expire or the password changes.
    async fn sign_out(&self) -> Result<(), ProviderError> {
        *self.session.lock().await = None;
        self.session_file
            .clear()
            .map_err(|e| ProviderError::Other(e.to_string()))
    }

    async fn restore(&self) -> Result<Option<User>, ProviderError> {
        let stored = self
            .session_file
            .load()
            .map_err(|e| ProviderError::Other(e.to_string()))?;
        let user = stored.as_ref().map(|s| s.user.clone());
        *self.session.lock().await = stored;
        Ok(user)
    }
}

#[async_trait]
impl TokenSource for FirebaseAuth {
    async fn id_token(&self) -> AppResult<String> {
        let mut guard = self.session.lock().await;
        let session = guard.as_ref().ok_or(AppError::Unauthenticated)?;

        if !session.needs_refresh(Utc::now()) {
            return Ok(session.id_token.clone());
        }

        let refreshed = self.refresh(session).await.map_err(|e| match e {
            ProviderError::Code(code) => AppError::from_auth_code(&code),
            ProviderError::Network(msg) => AppError::Network(msg),
            ProviderError::Other(msg) => AppError::Storage(msg),
        })?;
        self.session_file.save(&refreshed)?;
        let token = refreshed.id_token.clone();
        *guard = Some(refreshed);
        Ok(token)
    }
}
