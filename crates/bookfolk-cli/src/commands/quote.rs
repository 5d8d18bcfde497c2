//! Quote command handlers
//!
//! Quotes belong to a book and are stored as part of it.

use anyhow::{bail, Context, Result};

use bookfolk_core::{stats, App, Book};

use super::book::load_book;
use super::resolve_book_id;
use crate::editor::edit_text;
use crate::output::Output;

/// Add a quote to a book; opens the editor when no text is given
pub async fn add(
    app: &mut App,
    book_id: String,
    text: Option<String>,
    page: Option<u32>,
    notes: Option<String>,
    output: &Output,
) -> Result<()> {
    let book = load_book(app, &book_id).await?;

    let text = match text {
        Some(t) => t,
        None => {
            let initial = format!(
                "# Quote from: {} by {}\n# Lines starting with # are ignored.\n\n",
                book.title, book.author
            );
            edit_text(&initial).context("Failed to edit quote")?
        }
    };
    if text.trim().is_empty() {
        bail!("Quote text cannot be empty");
    }

    let quote = app
        .add_quote(&book.id, &text, page, notes)
        .await
        .context("Failed to add quote")?;

    output.success(&format!(
        "Added quote {} to {}",
        short(&quote.id),
        book.title
    ));
    Ok(())
}

/// List quotes from every book, or from one
pub async fn list(app: &mut App, book_id: Option<String>, output: &Output) -> Result<()> {
    let books = app.fetch_books().await.context("Failed to load books")?;

    let entries = match book_id {
        Some(ref id) => {
            let full_id = resolve_book_id(books, id)?;
            stats::all_quotes(books)
                .into_iter()
                .filter(|e| e.book_id == full_id)
                .collect()
        }
        None => stats::all_quotes(books),
    };

    output.print_quotes(&entries);
    Ok(())
}

/// Remove a quote (id or prefix) from a book
pub async fn remove(app: &mut App, book_id: String, quote_id: String, output: &Output) -> Result<()> {
    let book = load_book(app, &book_id).await?;
    let full_quote_id = resolve_quote_id(&book, &quote_id)?;

    app.remove_quote(&book.id, &full_quote_id)
        .await
        .context("Failed to remove quote")?;

    output.success(&format!("Removed quote {} from {}", short(&full_quote_id), book.title));
    Ok(())
}

fn resolve_quote_id(book: &Book, id: &str) -> Result<String> {
    let quotes = book.quotes();
    if quotes.iter().any(|q| q.id == id) {
        return Ok(id.to_string());
    }

    let matches: Vec<_> = quotes.iter().filter(|q| q.id.starts_with(id)).collect();
    match matches.len() {
        0 => bail!("No quote on '{}' matching: {}", book.title, id),
        1 => Ok(matches[0].id.clone()),
        _ => bail!("Ambiguous quote ID. Please provide more characters."),
    }
}

fn short(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookfolk_core::{NewBook, Quote};

    #[test]
    fn test_resolve_quote_id() {
        let mut book = Book::from_new("b1", "2024-01-01", NewBook::new("Dune", "Frank Herbert", 412));
        let first = Quote::new("Fear is the mind-killer.", Some(8), None).unwrap();
        let second = Quote::new("The spice must flow.", None, None).unwrap();
        book.quotes = Some(vec![first.clone(), second.clone()]);

        assert_eq!(resolve_quote_id(&book, &first.id).unwrap(), first.id);
        assert_eq!(resolve_quote_id(&book, &second.id[..10]).unwrap(), second.id);
        assert!(resolve_quote_id(&book, "not-there").is_err());
    }

    #[tokio::test]
    async fn test_add_and_remove_quote() {
        let mut app = App::in_memory();
        app.sign_up("reader@example.com", "secret1").await.unwrap();
        let book = app
            .add_book(NewBook::new("Dune", "Frank Herbert", 412))
            .await
            .unwrap();
        let output = Output::new(crate::output::OutputFormat::Quiet);

        add(
            &mut app,
            book.id[..6].to_string(),
            Some("Fear is the mind-killer.".into()),
            Some(8),
            None,
            &output,
        )
        .await
        .unwrap();

        let quote_id = app.books()[0].quotes()[0].id.clone();
        remove(&mut app, book.id.clone(), quote_id, &output)
            .await
            .unwrap();
        assert!(app.books()[0].quotes().is_empty());
    }
}
