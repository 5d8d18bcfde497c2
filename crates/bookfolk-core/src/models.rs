//! Data models for bookfolk
//!
//! Defines the core data structures: Book, Quote, and User.
//! Books are stored as documents using camelCase field names, so the
//! serde attributes here are the document format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A tracked book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    /// Unique identifier (document id)
    pub id: String,
    pub title: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// 1-5 stars
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub pages: u32,
    /// Completion date; written as an explicit null when unknown
    #[serde(default)]
    pub date_read: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    /// When the book was added (ISO date)
    #[serde(default)]
    pub date_added: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quotes: Option<Vec<Quote>>,
}

impl Book {
    /// Build a stored book from creation input
    pub fn from_new(id: impl Into<String>, date_added: impl Into<String>, new: NewBook) -> Self {
        Self {
            id: id.into(),
            title: new.title,
            author: new.author,
            isbn: new.isbn,
            published_year: new.published_year,
            genre: new.genre,
            rating: new.rating,
            notes: new.notes,
            is_completed: new.is_completed,
            pages: new.pages,
            date_read: new.date_read,
            start_date: new.start_date,
            end_date: new.end_date,
            date_added: date_added.into(),
            cover_url: new.cover_url,
            is_favorite: new.is_favorite,
            quotes: new.quotes,
        }
    }

    /// Whether the book is marked as a favorite (unset counts as false)
    pub fn is_favorite(&self) -> bool {
        self.is_favorite.unwrap_or(false)
    }

    /// Quotes recorded on this book
    pub fn quotes(&self) -> &[Quote] {
        self.quotes.as_deref().unwrap_or(&[])
    }

    /// Merge a partial update into this book
    ///
    /// Only fields present in the update are touched.
    pub fn apply_update(&mut self, update: &BookUpdate) {
        if let Some(ref title) = update.title {
            self.title = title.clone();
        }
        if let Some(ref author) = update.author {
            self.author = author.clone();
        }
        if let Some(pages) = update.pages {
            self.pages = pages;
        }
        if let Some(done) = update.is_completed {
            self.is_completed = done;
        }
        if let Some(ref date_read) = update.date_read {
            self.date_read = date_read.clone();
        }
        if let Some(ref start) = update.start_date {
            self.start_date = Some(start.clone());
        }
        if let Some(ref end) = update.end_date {
            self.end_date = Some(end.clone());
        }
        if let Some(ref cover) = update.cover_url {
            self.cover_url = Some(cover.clone());
        }
        if let Some(fav) = update.is_favorite {
            self.is_favorite = Some(fav);
        }
        if let Some(ref quotes) = update.quotes {
            self.quotes = Some(quotes.clone());
        }
        if let Some(ref genre) = update.genre {
            self.genre = Some(genre.clone());
        }
        if let Some(rating) = update.rating {
            self.rating = Some(rating);
        }
        if let Some(ref notes) = update.notes {
            self.notes = Some(notes.clone());
        }
    }
}

/// Input for creating a book (everything except id and date added)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewBook {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub date_read: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub is_favorite: Option<bool>,
    #[serde(default)]
    pub quotes: Option<Vec<Quote>>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub published_year: Option<i32>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewBook {
    pub fn new(title: impl Into<String>, author: impl Into<String>, pages: u32) -> Self {
        Self {
            title: title.into(),
            author: author.into(),
            pages,
            ..Default::default()
        }
    }

    /// Mark as completed on the given date
    pub fn completed_on(mut self, date: impl Into<String>) -> Self {
        let date = date.into();
        self.is_completed = true;
        self.end_date = Some(date.clone());
        self.date_read = Some(date);
        self
    }

    /// Check required fields before anything is sent to a backend
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("title is required".to_string()));
        }
        if self.author.trim().is_empty() {
            return Err(AppError::Validation("author is required".to_string()));
        }
        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(AppError::Validation(format!(
                    "rating must be between 1 and 5, got {}",
                    rating
                )));
            }
        }
        Ok(())
    }
}

/// Partial update for a stored book
///
/// `None` leaves a field untouched. `date_read` is doubly optional so an
/// update can clear it (`Some(None)` is written as null).
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_read: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotes: Option<Vec<Quote>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl BookUpdate {
    pub fn favorite(value: bool) -> Self {
        Self {
            is_favorite: Some(value),
            ..Default::default()
        }
    }

    pub fn quotes(quotes: Vec<Quote>) -> Self {
        Self {
            quotes: Some(quotes),
            ..Default::default()
        }
    }

    pub fn cover(url: impl Into<String>) -> Self {
        Self {
            cover_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Mark completed (with the read date) or back to reading (clearing it)
    pub fn completion(done: bool, date: Option<String>) -> Self {
        Self {
            is_completed: Some(done),
            end_date: if done { date.clone() } else { None },
            date_read: Some(if done { date } else { None }),
            ..Default::default()
        }
    }

    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.is_empty() {
            return Err(AppError::Validation("update has no fields".to_string()));
        }
        if matches!(self.title.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(AppError::Validation("title cannot be empty".to_string()));
        }
        if matches!(self.author.as_deref(), Some(a) if a.trim().is_empty()) {
            return Err(AppError::Validation("author cannot be empty".to_string()));
        }
        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(AppError::Validation(format!(
                    "rating must be between 1 and 5, got {}",
                    rating
                )));
            }
        }
        Ok(())
    }
}

/// A quote recorded from a book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Creation timestamp (RFC 3339)
    pub date_added: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Quote {
    /// Create a new quote with a fresh id and the current timestamp
    pub fn new(text: impl Into<String>, page: Option<u32>, notes: Option<String>) -> AppResult<Self> {
        let text = text.into().trim().to_string();
        if text.is_empty() {
            return Err(AppError::Validation("quote text is required".to_string()));
        }
        Ok(Self {
            id: Uuid::new_v4().simple().to_string(),
            text,
            page,
            date_added: Utc::now().to_rfc3339(),
            notes: notes
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        })
    }

    /// Parsed creation time, if the stored string is well-formed
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.date_added)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A quote together with the book it came from
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteEntry {
    #[serde(flatten)]
    pub quote: Quote,
    pub book_id: String,
    pub book_title: String,
    pub book_author: String,
}

/// The authenticated user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

impl User {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            photo_url: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Best name to show for this user
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }
}
