//! Application context
//!
//! [`App`] owns the identity adapter, the book repository and the
//! [`AppState`]. Each operation starts a request, calls the backend and
//! applies the result to the state through its request token. Input that
//! fails validation is rejected before a request starts.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use reqwest::Client;
use tracing::{debug, info};

use crate::config::{Backend, Config};
use crate::error::{AppError, AppResult};
use crate::identity::{
    validate_credentials, FirebaseAuth, IdentityAdapter, IdentityProvider, LocalIdentity,
    MemoryIdentity, SignOutOutcome,
};
use crate::models::{Book, BookUpdate, NewBook, Quote, User};
use crate::repository::{BookRepository, DocumentStore};
use crate::state::{AppState, RequestKind, RequestToken};
use crate::storage::{FirestoreStore, LocalDatabase, LocalStore, MemoryStore, SessionFile};

pub struct App {
    identity: IdentityAdapter,
    books: BookRepository,
    state: AppState,
}

impl App {
    pub fn new(provider: Arc<dyn IdentityProvider>, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            identity: IdentityAdapter::new(provider),
            books: BookRepository::new(store),
            state: AppState::new(),
        }
    }

    /// Nothing persisted; accounts and books vanish with the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryIdentity::new()), Arc::new(MemoryStore::new()))
    }

    /// Wire up the backend named in the configuration
    pub fn from_config(config: &Config) -> AppResult<Self> {
        debug!(backend = %config.backend, "opening backend");
        match config.backend {
            Backend::Local => {
                let db = LocalDatabase::open(config)?;
                let identity = LocalIdentity::new(db.clone(), SessionFile::new(config.session_path()));
                Ok(Self::new(Arc::new(identity), Arc::new(LocalStore::new(db))))
            }
            Backend::Firestore => {
                let api_key = config.api_key.as_deref().ok_or_else(|| {
                    AppError::Validation("api_key is required for the firestore backend".into())
                })?;
                let project_id = config.project_id.as_deref().ok_or_else(|| {
                    AppError::Validation("project_id is required for the firestore backend".into())
                })?;

                let client = Client::builder()
                    .timeout(Duration::from_secs(config.request_timeout_secs))
                    .build()?;
                let auth = Arc::new(FirebaseAuth::new(
                    client.clone(),
                    api_key,
                    SessionFile::new(config.session_path()),
                ));
                let store = FirestoreStore::new(client, project_id, auth.clone());
                Ok(Self::new(auth, Arc::new(store)))
            }
            Backend::Memory => Ok(Self::in_memory()),
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn current_user(&self) -> Option<&User> {
        self.identity.current_user()
    }

    pub fn books(&self) -> &[Book] {
        self.state.books()
    }

    /// Apply a backend result through its token
    fn settle<T>(
        &mut self,
        token: RequestToken,
        result: AppResult<T>,
        apply: impl FnOnce(&mut AppState, &T),
    ) -> AppResult<T> {
        match result {
            Ok(value) => {
                self.state.complete(token, |s| apply(s, &value));
                Ok(value)
            }
            Err(e) => {
                self.state.fail(token, &e);
                Err(e)
            }
        }
    }

    /// Pick up a session kept from an earlier run
    pub async fn restore(&mut self) -> AppResult<Option<User>> {
        let token = self.state.begin(RequestKind::Auth);
        let result = self.identity.restore().await;
        self.settle(token, result, |s, user| s.set_user(user.clone()))
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> AppResult<User> {
        validate_credentials(email, password)?;
        let token = self.state.begin(RequestKind::Auth);
        let result = self.identity.sign_in(email, password).await;
        self.settle(token, result, |s, user| s.set_user(Some(user.clone())))
    }

    pub async fn sign_up(&mut self, email: &str, password: &str) -> AppResult<User> {
        validate_credentials(email, password)?;
        let token = self.state.begin(RequestKind::Auth);
        let result = self.identity.sign_up(email, password).await;
        self.settle(token, result, |s, user| s.set_user(Some(user.clone())))
    }

    /// Sign out and drop everything loaded for the user
    ///
    /// Local state is cleared even when the provider call fails; that
    /// failure is recorded on the auth status and returned in the outcome.
    pub async fn sign_out(&mut self) -> SignOutOutcome {
        let token = self.state.begin(RequestKind::Auth);
        self.state.invalidate(RequestKind::Books);

        let outcome = self.identity.sign_out().await;
        self.state.complete(token, AppState::clear_session);
        if let Some(ref err) = outcome.remote_error {
            self.state.fail(token, err);
        }
        outcome
    }

    /// Replace the loaded books with the stored collection
    pub async fn fetch_books(&mut self) -> AppResult<&[Book]> {
        let token = self.state.begin(RequestKind::Books);
        let result = self.books.list(self.identity.current_user()).await;
        self.settle(token, result, |s, books| s.replace_books(books.clone()))?;
        Ok(self.state.books())
    }

    pub async fn add_book(&mut self, new: NewBook) -> AppResult<Book> {
        new.validate()?;
        let token = self.state.begin(RequestKind::Books);
        let result = self.books.create(self.identity.current_user(), new).await;
        self.settle(token, result, |s, book| s.push_book(book.clone()))
    }

    /// Merge fields into a stored book and the loaded copy
    pub async fn update_book(&mut self, id: &str, update: BookUpdate) -> AppResult<()> {
        update.validate()?;
        let token = self.state.begin(RequestKind::Books);
        let result = self
            .books
            .update(self.identity.current_user(), id, &update)
            .await;
        self.settle(token, result, |s, _| s.merge_book(id, &update))
    }

    /// Loaded copy of a book, falling back to the store
    async fn find_book(&self, id: &str) -> AppResult<Book> {
        if let Some(book) = self.state.book(id) {
            return Ok(book.clone());
        }
        self.books
            .get(self.identity.current_user(), id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("book {}", id)))
    }

    /// Flip the favorite flag; returns the new value
    pub async fn toggle_favorite(&mut self, id: &str) -> AppResult<bool> {
        let favorite = !self.find_book(id).await?.is_favorite();
        self.update_book(id, BookUpdate::favorite(favorite)).await?;
        Ok(favorite)
    }

    /// Mark a book finished (dated today unless given) or back to reading
    pub async fn set_completed(&mut self, id: &str, done: bool, date: Option<String>) -> AppResult<()> {
        let date = match (done, date) {
            (true, None) => Some(Local::now().date_naive().format("%Y-%m-%d").to_string()),
            (_, date) => date,
        };
        self.update_book(id, BookUpdate::completion(done, date)).await
    }

    /// Append a new quote to a book's quote list
    pub async fn add_quote(
        &mut self,
        book_id: &str,
        text: &str,
        page: Option<u32>,
        notes: Option<String>,
    ) -> AppResult<Quote> {
        let quote = Quote::new(text, page, notes)?;
        let book = self.find_book(book_id).await?;

        let mut quotes = book.quotes().to_vec();
        quotes.push(quote.clone());
        self.update_book(book_id, BookUpdate::quotes(quotes)).await?;

        debug!(book_id, quote_id = %quote.id, "added quote");
        Ok(quote)
    }

    pub async fn remove_quote(&mut self, book_id: &str, quote_id: &str) -> AppResult<()> {
        let book = self.find_book(book_id).await?;
        let quotes = book.quotes();
        if !quotes.iter().any(|q| q.id == quote_id) {
            return Err(AppError::NotFound(format!("quote {}", quote_id)));
        }

        let remaining = quotes.iter().filter(|q| q.id != quote_id).cloned().collect();
        self.update_book(book_id, BookUpdate::quotes(remaining)).await
    }

    /// Remove a book; removing a missing book succeeds
    pub async fn delete_book(&mut self, id: &str) -> AppResult<()> {
        let token = self.state.begin(RequestKind::Books);
        let result = self.books.delete(self.identity.current_user(), id).await;
        self.settle(token, result, |s, _| s.remove_book(id))?;
        info!(book_id = id, "deleted book");
        Ok(())
    }

    /// Store a cover image URL found for a book
    pub async fn backfill_cover(&mut self, id: &str, cover_url: &str) -> AppResult<()> {
        let cover_url = cover_url.trim();
        if cover_url.is_empty() {
            return Err(AppError::Validation("cover url is empty".to_string()));
        }
        self.update_book(id, BookUpdate::cover(cover_url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ProviderError;
    use crate::state::RequestStatus;
    use chrono::Utc;
    use tempfile::TempDir;

    struct Fixture {
        app: App,
        identity: Arc<MemoryIdentity>,
        store: Arc<MemoryStore>,
    }

    async fn signed_in() -> Fixture {
        let identity = Arc::new(MemoryIdentity::new().with_account("reader@example.com", "secret1"));
        let store = Arc::new(MemoryStore::new());
        let mut app = App::new(identity.clone(), store.clone());
        app.sign_in("reader@example.com", "secret1").await.unwrap();
        Fixture { app, identity, store }
    }

    #[tokio::test]
    async fn test_sign_in_updates_state() {
        let Fixture { app, .. } = signed_in().await;
        assert_eq!(app.state().status(RequestKind::Auth), RequestStatus::Succeeded);
        assert_eq!(app.state().user(), app.current_user());
        assert!(app.current_user().is_some());
    }

    #[tokio::test]
    async fn test_invalid_credentials_do_not_touch_status() {
        let mut app = App::in_memory();
        assert!(matches!(
            app.sign_in("  ", "pw").await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(app.state().status(RequestKind::Auth), RequestStatus::Idle);
    }

    #[tokio::test]
    async fn test_failed_sign_in_records_error() {
        let mut app = App::in_memory();
        assert!(app.sign_in("ghost@example.com", "pw").await.is_err());
        assert_eq!(app.state().status(RequestKind::Auth), RequestStatus::Failed);
        assert!(app.state().error(RequestKind::Auth).is_some());
        assert!(app.current_user().is_none());
    }

    #[tokio::test]
    async fn test_add_then_fetch() {
        let Fixture { mut app, store, .. } = signed_in().await;

        let book = app
            .add_book(NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();
        assert_eq!(app.books().len(), 1);

        let fetched = app.fetch_books().await.unwrap();
        assert_eq!(fetched, &[book]);

        // Another user sharing the store sees nothing
        let identity = Arc::new(MemoryIdentity::new());
        let mut other = App::new(identity, store);
        assert!(matches!(other.fetch_books().await, Err(AppError::Unauthenticated)));
        other.sign_up("other@example.com", "secret2").await.unwrap();
        assert!(other.fetch_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_book_requires_sign_in() {
        let mut app = App::in_memory();
        assert!(matches!(
            app.add_book(NewBook::new("Dune", "Frank Herbert", 412)).await,
            Err(AppError::Unauthenticated)
        ));
        assert_eq!(app.state().status(RequestKind::Books), RequestStatus::Failed);
    }

    #[tokio::test]
    async fn test_invalid_book_is_rejected_before_dispatch() {
        let Fixture { mut app, .. } = signed_in().await;
        assert!(matches!(
            app.add_book(NewBook::new("", "Someone", 1)).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(app.state().status(RequestKind::Books), RequestStatus::Idle);
    }

    #[tokio::test]
    async fn test_toggle_favorite_changes_only_that_field() {
        let Fixture { mut app, .. } = signed_in().await;
        let book = app
            .add_book(NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();

        assert!(app.toggle_favorite(&book.id).await.unwrap());
        app.fetch_books().await.unwrap();
        let stored = &app.books()[0];
        assert!(stored.is_favorite());
        assert_eq!(
            Book {
                is_favorite: book.is_favorite,
                ..stored.clone()
            },
            book
        );

        assert!(!app.toggle_favorite(&book.id).await.unwrap());
        assert!(!app.books()[0].is_favorite());
    }

    #[tokio::test]
    async fn test_add_first_quote() {
        let Fixture { mut app, .. } = signed_in().await;
        let book = app
            .add_book(NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();
        assert!(book.quotes.is_none());

        let before = Utc::now();
        let quote = app
            .add_quote(&book.id, "Fear is the mind-killer.", Some(8), None)
            .await
            .unwrap();

        app.fetch_books().await.unwrap();
        let quotes = app.books()[0].quotes();
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].text, "Fear is the mind-killer.");
        assert_eq!(quotes[0].id, quote.id);
        assert!(quotes[0].created_at().unwrap() >= before - chrono::Duration::milliseconds(1));

        app.remove_quote(&book.id, &quote.id).await.unwrap();
        assert!(app.books()[0].quotes().is_empty());
        assert!(matches!(
            app.remove_quote(&book.id, &quote.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_quote_is_rejected() {
        let Fixture { mut app, .. } = signed_in().await;
        let book = app
            .add_book(NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();
        assert!(matches!(
            app.add_quote(&book.id, "   ", None, None).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_set_completed_and_cover() {
        let Fixture { mut app, .. } = signed_in().await;
        let book = app
            .add_book(NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();

        app.set_completed(&book.id, true, Some("2024-03-05".into()))
            .await
            .unwrap();
        app.backfill_cover(&book.id, "https://covers.example/dune.jpg")
            .await
            .unwrap();

        app.fetch_books().await.unwrap();
        let stored = &app.books()[0];
        assert!(stored.is_completed);
        assert_eq!(stored.date_read.as_deref(), Some("2024-03-05"));
        assert_eq!(stored.cover_url.as_deref(), Some("https://covers.example/dune.jpg"));

        app.set_completed(&book.id, false, None).await.unwrap();
        app.fetch_books().await.unwrap();
        assert!(!app.books()[0].is_completed);
        assert!(app.books()[0].date_read.is_none());
    }

    #[tokio::test]
    async fn test_update_missing_book() {
        let Fixture { mut app, .. } = signed_in().await;
        assert!(matches!(
            app.toggle_favorite("missing").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            app.update_book("missing", BookUpdate::favorite(true)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let Fixture { mut app, .. } = signed_in().await;
        let book = app
            .add_book(NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();

        app.delete_book(&book.id).await.unwrap();
        assert!(app.books().is_empty());
        app.delete_book(&book.id).await.unwrap();
        assert!(app.fetch_books().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sign_out_clears_books_even_on_provider_failure() {
        let Fixture {
            mut app, identity, ..
        } = signed_in().await;
        app.add_book(NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();

        identity.fail_sign_out(ProviderError::Network("offline".into()));
        let outcome = app.sign_out().await;

        assert!(outcome.remote_error.is_some());
        assert!(app.current_user().is_none());
        assert!(app.state().user().is_none());
        assert!(app.books().is_empty());
        assert_eq!(app.state().status(RequestKind::Auth), RequestStatus::Failed);
        assert_eq!(app.state().status(RequestKind::Books), RequestStatus::Idle);
    }

    #[tokio::test]
    async fn test_local_backend_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            backend: Backend::Local,
            ..Config::default()
        };

        let mut app = App::from_config(&config).unwrap();
        app.sign_up("reader@example.com", "secret1").await.unwrap();
        app.add_book(NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();

        // A second process picks up the session and the book
        let mut again = App::from_config(&config).unwrap();
        let user = again.restore().await.unwrap();
        assert_eq!(user.as_ref(), app.current_user());
        assert_eq!(again.fetch_books().await.unwrap().len(), 1);
    }

    #[test]
    fn test_firestore_requires_credentials() {
        let config = Config {
            backend: Backend::Firestore,
            ..Config::default()
        };
        assert!(matches!(
            App::from_config(&config),
            Err(AppError::Validation(_))
        ));
    }
}
