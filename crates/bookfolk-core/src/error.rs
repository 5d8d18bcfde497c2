//! Application error kinds
//!
//! Every adapter maps its backend's failures into [`AppError`] at the
//! boundary. Identity provider codes are classified through a fixed table
//! into [`AuthErrorKind`]; raw provider strings never leave the adapter.

use thiserror::Error;

use crate::storage::StorageError;

/// Classified identity provider failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidCredential,
    UserNotFound,
    WrongPassword,
    TooManyAttempts,
    UserDisabled,
    InvalidEmail,
    NetworkFailure,
    EmailInUse,
    WeakPassword,
    Unknown,
}

/// Provider code table
///
/// Covers both the SDK style codes (`auth/...`) and the REST API codes.
const AUTH_CODES: &[(&str, AuthErrorKind)] = &[
    ("auth/invalid-credential", AuthErrorKind::InvalidCredential),
    ("INVALID_LOGIN_CREDENTIALS", AuthErrorKind::InvalidCredential),
    ("auth/user-not-found", AuthErrorKind::UserNotFound),
    ("EMAIL_NOT_FOUND", AuthErrorKind::UserNotFound),
    ("auth/wrong-password", AuthErrorKind::WrongPassword),
    ("INVALID_PASSWORD", AuthErrorKind::WrongPassword),
    ("auth/too-many-requests", AuthErrorKind::TooManyAttempts),
    ("TOO_MANY_ATTEMPTS_TRY_LATER", AuthErrorKind::TooManyAttempts),
    ("auth/user-disabled", AuthErrorKind::UserDisabled),
    ("USER_DISABLED", AuthErrorKind::UserDisabled),
    ("auth/invalid-email", AuthErrorKind::InvalidEmail),
    ("INVALID_EMAIL", AuthErrorKind::InvalidEmail),
    ("auth/network-request-failed", AuthErrorKind::NetworkFailure),
    ("auth/email-already-in-use", AuthErrorKind::EmailInUse),
    ("EMAIL_EXISTS", AuthErrorKind::EmailInUse),
    ("auth/weak-password", AuthErrorKind::WeakPassword),
    ("WEAK_PASSWORD", AuthErrorKind::WeakPassword),
];

impl AuthErrorKind {
    /// Classify a provider error code
    ///
    /// REST codes may carry a detail suffix (`"WEAK_PASSWORD : Password
    /// should be at least 6 characters"`); only the leading code is matched.
    pub fn from_code(code: &str) -> Self {
        let code = code.split(" : ").next().unwrap_or("").trim();
        AUTH_CODES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, kind)| *kind)
            .unwrap_or(AuthErrorKind::Unknown)
    }

    /// Message suitable for showing to the user
    pub fn message(&self) -> &'static str {
        match self {
            AuthErrorKind::InvalidCredential => "Invalid email or password.",
            AuthErrorKind::UserNotFound => "No account exists for this email.",
            AuthErrorKind::WrongPassword => "Wrong password.",
            AuthErrorKind::TooManyAttempts => "Too many attempts. Please try again later.",
            AuthErrorKind::UserDisabled => "This account has been disabled.",
            AuthErrorKind::InvalidEmail => "The email address is not valid.",
            AuthErrorKind::NetworkFailure => "Network error. Check your connection.",
            AuthErrorKind::EmailInUse => "An account already exists for this email.",
            AuthErrorKind::WeakPassword => "The password is too weak.",
            AuthErrorKind::Unknown => "Sign-in failed.",
        }
    }
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Errors surfaced by bookfolk operations
#[derive(Error, Debug)]
pub enum AppError {
    /// No active session for an operation that needs one
    #[error("Not signed in. Run `bookfolk login` first.")]
    Unauthenticated,

    /// The targeted record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected before any backend call
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Classified identity provider failure
    #[error("{0}")]
    Auth(AuthErrorKind),

    /// Remote document store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Connectivity problem; worth retrying
    #[error("Network error: {0}")]
    Network(String),

    /// Local backend failure
    #[error(transparent)]
    Local(#[from] StorageError),

    /// A document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Build the error for a provider code
    ///
    /// Network failures reported by the provider surface as
    /// [`AppError::Network`] so callers can suggest a retry.
    pub fn from_auth_code(code: &str) -> Self {
        match AuthErrorKind::from_code(code) {
            AuthErrorKind::NetworkFailure => {
                AppError::Network(AuthErrorKind::NetworkFailure.message().to_string())
            }
            kind => AppError::Auth(kind),
        }
    }

    /// Whether retrying the same action could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Network(_) | AppError::Auth(AuthErrorKind::TooManyAttempts)
        )
    }

    /// Message for display, with a recovery hint where one applies
    pub fn user_message(&self) -> String {
        match self {
            AppError::Local(err) => match err.recovery_suggestion() {
                Some(hint) => format!("{}\n{}", err, hint),
                None => err.to_string(),
            },
            AppError::Network(msg) => format!("Network error: {} (try again)", msg),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            AppError::Network(err.to_string())
        } else if err.is_decode() {
            AppError::Storage(format!("unexpected response: {}", err))
        } else {
            AppError::Storage(err.to_string())
        }
    }
}

/// Result type for bookfolk operations
pub type AppResult<T> = Result<T, AppError>;
