//! Command handlers

pub mod auth;
pub mod book;
pub mod config;
pub mod quote;
pub mod stats;

use anyhow::{bail, Result};
use chrono::Local;

use bookfolk_core::stats::parse_date;
use bookfolk_core::Book;

/// Today's local date as `YYYY-MM-DD`
pub fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Check a date given on the command line
pub fn check_date(value: &str) -> Result<String> {
    match parse_date(value) {
        Some(date) => Ok(date.format("%Y-%m-%d").to_string()),
        None => bail!("Invalid date '{}'. Use YYYY-MM-DD.", value),
    }
}

/// Resolve a book ID (full id or unique prefix) among loaded books
pub fn resolve_book_id(books: &[Book], id: &str) -> Result<String> {
    if books.iter().any(|b| b.id == id) {
        return Ok(id.to_string());
    }

    let matches: Vec<_> = books.iter().filter(|b| b.id.starts_with(id)).collect();
    match matches.len() {
        0 => bail!("No book found matching: {}", id),
        1 => Ok(matches[0].id.clone()),
        _ => {
            eprintln!("Multiple books match '{}':", id);
            for book in &matches {
                eprintln!("  {} - {}", book.id, book.title);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
