//! Book repository
//!
//! Books live in the document store under the signed-in user's namespace:
//! `users/{uid}/books/{bookId}`. The store itself is a trait so the same
//! repository runs against Firestore, the local SQLite backend, or memory.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Book, BookUpdate, NewBook, User};

/// A stored document: a JSON object keyed by field name
pub type Document = serde_json::Map<String, Value>;

/// Document database boundary
///
/// Collections are slash-separated paths (`users/u1/books`). Documents are
/// addressed by collection and id.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a whole document, replacing any existing one
    async fn set(&self, collection: &str, id: &str, document: Document) -> AppResult<()>;

    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>>;

    /// All documents in a collection, in no particular order
    async fn list(&self, collection: &str) -> AppResult<Vec<Document>>;

    /// Merge top-level fields into an existing document
    ///
    /// Fails with [`AppError::NotFound`] if the document does not exist.
    async fn merge(&self, collection: &str, id: &str, fields: Document) -> AppResult<()>;

    /// Delete a document; deleting a missing document succeeds
    async fn delete(&self, collection: &str, id: &str) -> AppResult<()>;
}

/// Collection path holding a user's books
pub fn books_collection(user: &User) -> String {
    format!("users/{}/books", user.uid)
}

/// Serialize a value into a document
pub fn to_document<T: Serialize>(value: &T) -> AppResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Storage(format!(
            "expected an object document, got {}",
            other
        ))),
    }
}

/// Book operations scoped to the signed-in user
#[derive(Clone)]
pub struct BookRepository {
    store: Arc<dyn DocumentStore>,
}

impl BookRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Store a new book and return the stored record
    ///
    /// Generates the id and stamps the creation time.
    pub async fn create(&self, user: Option<&User>, new: NewBook) -> AppResult<Book> {
        new.validate()?;
        let user = user.ok_or(AppError::Unauthenticated)?;

        let id = Uuid::new_v4().simple().to_string();
        let date_added = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let book = Book::from_new(id, date_added, new);

        self.store
            .set(&books_collection(user), &book.id, to_document(&book)?)
            .await?;

        debug!(book_id = %book.id, "created book");
        Ok(book)
    }

    /// All books of the signed-in user, unordered
    ///
    /// Documents that don't decode as books are skipped.
    pub async fn list(&self, user: Option<&User>) -> AppResult<Vec<Book>> {
        let user = user.ok_or(AppError::Unauthenticated)?;
        let documents = self.store.list(&books_collection(user)).await?;

        let mut books = Vec::with_capacity(documents.len());
        for document in documents {
            let id = document
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("<missing id>")
                .to_string();
            match serde_json::from_value::<Book>(Value::Object(document)) {
                Ok(book) => books.push(book),
                Err(e) => warn!(book_id = %id, error = %e, "skipping undecodable book document"),
            }
        }
        Ok(books)
    }

    pub async fn get(&self, user: Option<&User>, id: &str) -> AppResult<Option<Book>> {
        let user = user.ok_or(AppError::Unauthenticated)?;
        match self.store.get(&books_collection(user), id).await? {
            Some(document) => Ok(Some(serde_json::from_value(Value::Object(document))?)),
            None => Ok(None),
        }
    }

    /// Merge the given fields into a stored book
    pub async fn update(&self, user: Option<&User>, id: &str, update: &BookUpdate) -> AppResult<()> {
        update.validate()?;
        let user = user.ok_or(AppError::Unauthenticated)?;
        self.store
            .merge(&books_collection(user), id, to_document(update)?)
            .await
    }

    /// Remove a book; removing a missing book succeeds
    pub async fn delete(&self, user: Option<&User>, id: &str) -> AppResult<()> {
        let user = user.ok_or(AppError::Unauthenticated)?;
        self.store.delete(&books_collection(user), id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Quote;
    use crate::storage::MemoryStore;

    fn repo() -> (BookRepository, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (BookRepository::new(store.clone()), store)
    }

    fn reader() -> User {
        User::new("reader-1").with_email("reader@example.com")
    }

    #[tokio::test]
    async fn test_create_requires_user() {
        let (repo, _) = repo();
        let result = repo.create(None, NewBook::new("Dune", "Frank Herbert", 412)).await;
        assert!(matches!(result, Err(AppError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_create_validates_before_writing() {
        let (repo, store) = repo();
        let user = reader();
        let result = repo.create(Some(&user), NewBook::new("", "Nobody", 1)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.list(&books_collection(&user)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_then_list_round_trip() {
        let (repo, _) = repo();
        let user = reader();
        let new = NewBook::new("Dune", "Frank Herbert", 412).completed_on("2024-03-05");

        let created = repo.create(Some(&user), new.clone()).await.unwrap();
        assert!(!created.id.is_empty());
        assert!(!created.date_added.is_empty());

        let books = repo.list(Some(&user)).await.unwrap();
        assert_eq!(books.len(), 1);
        let stored = &books[0];
        assert_eq!(
            *stored,
            Book::from_new(created.id.clone(), created.date_added.clone(), new)
        );
    }

    #[tokio::test]
    async fn test_namespaces_are_per_user() {
        let (repo, _) = repo();
        let alice = User::new("alice");
        let bob = User::new("bob");

        repo.create(Some(&alice), NewBook::new("Emma", "Jane Austen", 300))
            .await
            .unwrap();

        assert_eq!(repo.list(Some(&alice)).await.unwrap().len(), 1);
        assert!(repo.list(Some(&bob)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_favorite_flips_only_that_field() {
        let (repo, _) = repo();
        let user = reader();
        let created = repo
            .create(Some(&user), NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();

        repo.update(Some(&user), &created.id, &BookUpdate::favorite(true))
            .await
            .unwrap();

        let stored = repo.get(Some(&user), &created.id).await.unwrap().unwrap();
        let mut expected = created.clone();
        expected.is_favorite = Some(true);
        assert_eq!(stored, expected);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let (repo, _) = repo();
        let user = reader();
        let result = repo
            .update(Some(&user), "missing", &BookUpdate::favorite(true))
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_quotes_replaces_list() {
        let (repo, _) = repo();
        let user = reader();
        let created = repo
            .create(Some(&user), NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();

        let quote = Quote::new("Fear is the mind-killer.", Some(8), None).unwrap();
        repo.update(Some(&user), &created.id, &BookUpdate::quotes(vec![quote.clone()]))
            .await
            .unwrap();

        let stored = repo.get(Some(&user), &created.id).await.unwrap().unwrap();
        assert_eq!(stored.quotes(), &[quote]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (repo, _) = repo();
        let user = reader();
        let created = repo
            .create(Some(&user), NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();

        repo.delete(Some(&user), &created.id).await.unwrap();
        repo.delete(Some(&user), &created.id).await.unwrap();
        assert!(repo.list(Some(&user)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_bad_documents() {
        let (repo, store) = repo();
        let user = reader();
        repo.create(Some(&user), NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();

        let mut bad = Document::new();
        bad.insert("id".into(), Value::from("bad"));
        bad.insert("pages".into(), Value::from(-3));
        store
            .set(&books_collection(&user), "bad", bad)
            .await
            .unwrap();

        let books = repo.list(Some(&user)).await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Dune");
    }
}
