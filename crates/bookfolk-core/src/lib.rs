//! bookfolk core library
//!
//! Client-side core of bookfolk, a personal reading tracker: sign in,
//! keep a per-user collection of books with quotes and favorites, and
//! derive reading statistics from it.
//!
//! # Architecture
//!
//! - **Identity**: an adapter over an external identity provider
//! - **Repository**: book documents in a per-user namespace of a document store
//! - **Stats**: pure functions over a snapshot of books
//! - **State**: user, books and per-kind request status, fenced by token
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let mut app = App::from_config(&config)?;
//!
//! app.sign_in("reader@example.com", "secret").await?;
//! app.add_book(NewBook::new("Dune", "Frank Herbert", 412)).await?;
//!
//! let books = app.fetch_books().await?;
//! let pages = stats::total_pages_read(books);
//! ```
//!
//! # Modules
//!
//! - `app`: application context (main entry point)
//! - `models`: books, quotes and users
//! - `identity`: identity adapter and providers
//! - `repository`: document store boundary and book repository
//! - `storage`: Firestore, SQLite and in-memory backends
//! - `stats`: derived reading statistics
//! - `state`: request lifecycle and fencing
//! - `config`: application configuration

pub mod app;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod repository;
pub mod state;
pub mod stats;
pub mod storage;

pub use app::App;
pub use config::{Backend, Config};
pub use error::{AppError, AppResult, AuthErrorKind};
pub use identity::{IdentityAdapter, IdentityProvider, ProviderError, SignOutOutcome, TokenSource};
pub use models::{Book, BookUpdate, NewBook, Quote, QuoteEntry, User};
pub use repository::{BookRepository, Document, DocumentStore};
pub use state::{AppState, RequestKind, RequestStatus, RequestToken};
pub use stats::{MonthBucket, ReadingSummary};
pub use storage::StorageError;
