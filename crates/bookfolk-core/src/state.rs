//! Application state
//!
//! Holds the signed-in user, the loaded books and a request status per
//! kind. Every request gets a [`RequestToken`]; a completion is applied
//! only if its token is still the latest for that kind, so a slow response
//! can never overwrite a newer one.

use tracing::debug;

use crate::error::AppError;
use crate::models::{Book, BookUpdate, User};

/// Category of async request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Auth,
    Books,
}

/// Lifecycle of the latest request of a kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Succeeded,
    Failed,
}

/// Identifies one issued request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestToken {
    kind: RequestKind,
    seq: u64,
}

impl RequestToken {
    pub fn kind(&self) -> RequestKind {
        self.kind
    }
}

#[derive(Debug, Default)]
struct Tracker {
    status: RequestStatus,
    error: Option<String>,
    latest: u64,
}

/// Client-side state
#[derive(Debug, Default)]
pub struct AppState {
    user: Option<User>,
    books: Vec<Book>,
    auth: Tracker,
    books_req: Tracker,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn books(&self) -> &[Book] {
        &self.books
    }

    pub fn book(&self, id: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.id == id)
    }

    pub fn status(&self, kind: RequestKind) -> RequestStatus {
        self.tracker(kind).status
    }

    /// Message of the last failure, cleared when the next request starts
    pub fn error(&self, kind: RequestKind) -> Option<&str> {
        self.tracker(kind).error.as_deref()
    }

    fn tracker(&self, kind: RequestKind) -> &Tracker {
        match kind {
            RequestKind::Auth => &self.auth,
            RequestKind::Books => &self.books_req,
        }
    }

    fn tracker_mut(&mut self, kind: RequestKind) -> &mut Tracker {
        match kind {
            RequestKind::Auth => &mut self.auth,
            RequestKind::Books => &mut self.books_req,
        }
    }

    /// Start a request: status goes to loading and a new token is issued
    pub fn begin(&mut self, kind: RequestKind) -> RequestToken {
        let tracker = self.tracker_mut(kind);
        tracker.latest += 1;
        tracker.status = RequestStatus::Loading;
        tracker.error = None;
        RequestToken {
            kind,
            seq: tracker.latest,
        }
    }

    /// Whether `token` is the most recent request of its kind
    pub fn is_current(&self, token: RequestToken) -> bool {
        self.tracker(token.kind).latest == token.seq
    }

    /// Apply a successful result
    ///
    /// Returns false, leaving state untouched, if a newer request of the
    /// same kind has been issued since.
    pub fn complete(&mut self, token: RequestToken, apply: impl FnOnce(&mut Self)) -> bool {
        if !self.is_current(token) {
            debug!(kind = ?token.kind, seq = token.seq, "discarding stale response");
            return false;
        }
        apply(self);
        let tracker = self.tracker_mut(token.kind);
        tracker.status = RequestStatus::Succeeded;
        tracker.error = None;
        true
    }

    /// Record a failure; stale failures are discarded like stale results
    pub fn fail(&mut self, token: RequestToken, error: &AppError) -> bool {
        if !self.is_current(token) {
            debug!(kind = ?token.kind, seq = token.seq, error = %error, "discarding stale failure");
            return false;
        }
        let tracker = self.tracker_mut(token.kind);
        tracker.status = RequestStatus::Failed;
        tracker.error = Some(error.to_string());
        true
    }

    /// Orphan any in-flight request of `kind` and return it to idle
    pub(crate) fn invalidate(&mut self, kind: RequestKind) {
        let tracker = self.tracker_mut(kind);
        tracker.latest += 1;
        tracker.status = RequestStatus::Idle;
        tracker.error = None;
    }

    pub(crate) fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    /// Forget the user and everything loaded for them
    pub(crate) fn clear_session(&mut self) {
        self.user = None;
        self.books.clear();
    }

    pub(crate) fn replace_books(&mut self, books: Vec<Book>) {
        self.books = books;
    }

    pub(crate) fn push_book(&mut self, book: Book) {
        self.books.push(book);
    }

    pub(crate) fn merge_book(&mut self, id: &str, update: &BookUpdate) {
        if let Some(book) = self.books.iter_mut().find(|b| b.id == id) {
            book.apply_update(update);
        }
    }

    pub(crate) fn remove_book(&mut self, id: &str) {
        self.books.retain(|b| b.id != id);
    }
}
