//! Local identity provider
//!
//! Offline accounts stored in the local database with bcrypt password
//! hashes. The signed-in user is kept in `session.json` so later commands
//! can pick it up.

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use super::{IdentityProvider, ProviderError};
use crate::models::User;
use crate::storage::{LocalDatabase, SessionFile, StorageError};

const MIN_PASSWORD_LEN: usize = 6;

pub struct LocalIdentity {
    db: LocalDatabase,
    session: SessionFile<User>,
    cost: u32,
}

struct AccountRow {
    uid: String,
    display_name: Option<String>,
    password_hash: String,
    disabled: bool,
}

impl From<StorageError> for ProviderError {
    fn from(err: StorageError) -> Self {
        ProviderError::Other(err.to_string())
    }
}

impl LocalIdentity {
    pub fn new(db: LocalDatabase, session: SessionFile<User>) -> Self {
        Self {
            db,
            session,
            cost: bcrypt::DEFAULT_COST,
        }
    }

    /// Override the bcrypt cost (tests use the minimum)
    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    fn find(&self, email: &str) -> Result<Option<AccountRow>, ProviderError> {
        let row = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT uid, display_name, password_hash, disabled FROM accounts WHERE email = ?1",
                [email],
                |row| {
                    Ok(AccountRow {
                        uid: row.get(0)?,
                        display_name: row.get(1)?,
                        password_hash: row.get(2)?,
                        disabled: row.get::<_, i64>(3)? != 0,
                    })
                },
            )
            .optional()
        })?;
        Ok(row)
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<User, ProviderError> {
        let email = email.to_lowercase();
        let account = self
            .find(&email)?
            .ok_or_else(|| ProviderError::Code("EMAIL_NOT_FOUND".into()))?;

        if account.disabled {
            return Err(ProviderError::Code("USER_DISABLED".into()));
        }
        let valid = bcrypt::verify(password, &account.password_hash)
            .map_err(|e| ProviderError::Other(StorageError::from(e).to_string()))?;
        if !valid {
            return Err(ProviderError::Code("INVALID_PASSWORD".into()));
        }

        let mut user = User::new(account.uid).with_email(email);
        user.display_name = account.display_name;
        self.session.save(&user)?;
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<User, ProviderError> {
        let email = email.to_lowercase();
        if !email.contains('@') {
            return Err(ProviderError::Code("INVALID_EMAIL".into()));
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(ProviderError::Code(format!(
                "WEAK_PASSWORD : Password should be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.find(&email)?.is_some() {
            return Err(ProviderError::Code("EMAIL_EXISTS".into()));
        }

        let hash = bcrypt::hash(password, self.cost)
            .map_err(|e| ProviderError::Other(StorageError::from(e).to_string()))?;
        let uid = Uuid::new_v4().simple().to_string();
        let now = Utc::now().timestamp_millis();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO accounts (uid, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![uid, email, hash, now],
            )
        })?;

        let user = User::new(uid).with_email(email);
        self.session.save(&user)?;
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.session.clear()?;
        Ok(())
    }

    async fn restore(&self) -> Result<Option<User>, ProviderError> {
        Ok(self.session.load()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn identity(temp_dir: &TempDir) -> LocalIdentity {
        LocalIdentity::new(
            LocalDatabase::open_in_memory().unwrap(),
            SessionFile::new(temp_dir.path().join("session.json")),
        )
        .with_cost(4)
    }

    #[tokio::test]
    async fn test_sign_up_and_sign_in() {
        let temp_dir = TempDir::new().unwrap();
        let identity = identity(&temp_dir);

        let created = identity.sign_up("Reader@Example.com", "secret1").await.unwrap();
        assert_eq!(created.email.as_deref(), Some("reader@example.com"));

        identity.sign_out().await.unwrap();
        assert!(identity.restore().await.unwrap().is_none());

        let signed_in = identity.sign_in("reader@example.com", "secret1").await.unwrap();
        assert_eq!(signed_in.uid, created.uid);
        assert_eq!(identity.restore().await.unwrap(), Some(signed_in));
    }

    #[tokio::test]
    async fn test_error_codes() {
        let temp_dir = TempDir::new().unwrap();
        let identity = identity(&temp_dir);

        assert_eq!(
            identity.sign_in("ghost@example.com", "x").await,
            Err(ProviderError::Code("EMAIL_NOT_FOUND".into()))
        );

        identity.sign_up("reader@example.com", "secret1").await.unwrap();
        assert_eq!(
            identity.sign_in("reader@example.com", "nope").await,
            Err(ProviderError::Code("INVALID_PASSWORD".into()))
        );
        assert_eq!(
            identity.sign_up("reader@example.com", "secret1").await,
            Err(ProviderError::Code("EMAIL_EXISTS".into()))
        );
    }

    #[tokio::test]
    async fn test_disabled_account_cannot_sign_in() {
        let temp_dir = TempDir::new().unwrap();
        let db = LocalDatabase::open_in_memory().unwrap();
        let identity =
            LocalIdentity::new(db.clone(), SessionFile::new(temp_dir.path().join("session.json")))
                .with_cost(4);
        identity.sign_up("reader@example.com", "secret1").await.unwrap();
        identity.sign_out().await.unwrap();

        db.with_conn(|conn| {
            conn.execute(
                "UPDATE accounts SET disabled = 1 WHERE email = ?1",
                ["reader@example.com"],
            )
        })
        .unwrap();

        assert_eq!(
            identity.sign_in("reader@example.com", "secret1").await,
            Err(ProviderError::Code("USER_DISABLED".into()))
        );
        assert!(identity.restore().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_survives_new_provider() {
        let temp_dir = TempDir::new().unwrap();
        let session_path = temp_dir.path().join("session.json");
        let db = LocalDatabase::open_in_memory().unwrap();

        let first = LocalIdentity::new(db.clone(), SessionFile::new(&session_path)).with_cost(4);
        let user = first.sign_up("reader@example.com", "secret1").await.unwrap();

        let second = LocalIdentity::new(db, SessionFile::new(&session_path));
        assert_eq!(second.restore().await.unwrap(), Some(user));
    }
}
