//! Storage backends
//!
//! Implementations of [`DocumentStore`](crate::repository::DocumentStore):
//!
//! - **Firestore**: the managed remote document database (REST API)
//! - **Local**: SQLite database in the data directory
//! - **Memory**: process-local map
//!
//! Also holds the session file helpers used by identity providers.

pub mod error;
pub mod firestore;
pub mod local;
pub mod memory;
pub mod persistence;
pub mod schema;

pub use error::{StorageError, StorageResult};
pub use firestore::FirestoreStore;
pub use local::{LocalDatabase, LocalStore};
pub use memory::MemoryStore;
pub use persistence::{atomic_write, SessionFile};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
