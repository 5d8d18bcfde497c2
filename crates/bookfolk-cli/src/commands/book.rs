//! Book command handlers

use anyhow::{bail, Context, Result};
use clap::Args;

use bookfolk_core::stats::effective_date;
use bookfolk_core::{App, Book, NewBook};

use super::{check_date, resolve_book_id, today};
use crate::catalog::Catalog;
use crate::editor::{confirm, prompt_text, select};
use crate::output::Output;

/// Catalog results offered when adding by search
const SEARCH_RESULTS: usize = 4;

#[derive(Args, Debug, Default)]
pub struct AddArgs {
    /// Book title
    pub title: Option<String>,
    /// Author (comma-separated for several)
    #[arg(short, long)]
    pub author: Option<String>,
    /// Page count
    #[arg(short, long)]
    pub pages: Option<u32>,
    /// Look the book up in the catalog and prefill its details
    #[arg(short, long)]
    pub search: Option<String>,
    /// Which catalog result to use (1-based) instead of choosing interactively
    #[arg(long, requires = "search")]
    pub pick: Option<usize>,
    /// Already finished reading
    #[arg(long)]
    pub completed: bool,
    /// Date finished (YYYY-MM-DD, defaults to today)
    #[arg(long, requires = "completed")]
    pub date: Option<String>,
    /// Date started (YYYY-MM-DD, defaults to today)
    #[arg(long)]
    pub started: Option<String>,
    /// Mark as favorite
    #[arg(long)]
    pub favorite: bool,
    #[arg(long)]
    pub genre: Option<String>,
    /// Rating from 1 to 5
    #[arg(long)]
    pub rating: Option<u8>,
    #[arg(long)]
    pub isbn: Option<String>,
    /// Publication year
    #[arg(long)]
    pub year: Option<i32>,
    #[arg(long)]
    pub notes: Option<String>,
    /// Don't look up a cover image
    #[arg(long)]
    pub no_cover: bool,
}

#[derive(Args, Debug, Default, Clone, Copy)]
pub struct ListFilter {
    /// Only finished books
    #[arg(long, conflicts_with = "reading")]
    pub completed: bool,
    /// Only books still being read
    #[arg(long)]
    pub reading: bool,
    /// Only favorites
    #[arg(long)]
    pub favorites: bool,
}

impl ListFilter {
    fn matches(&self, book: &Book) -> bool {
        (!self.completed || book.is_completed)
            && (!self.reading || !book.is_completed)
            && (!self.favorites || book.is_favorite())
    }
}

/// Add a book, optionally starting from a catalog match
pub async fn add(app: &mut App, catalog: &Catalog, args: AddArgs, output: &Output) -> Result<()> {
    let mut new = match args.search {
        Some(ref query) => pick_from_catalog(catalog, query, args.pick, output).await?,
        None => NewBook::default(),
    };

    if let Some(title) = args.title {
        new.title = title;
    }
    if let Some(author) = args.author {
        new.author = author;
    }
    if let Some(pages) = args.pages {
        new.pages = pages;
    }
    if new.title.trim().is_empty() {
        new.title = prompt_text("Title:")?;
    }
    if new.author.trim().is_empty() {
        new.author = prompt_text("Author:")?;
    }

    new.start_date = Some(match args.started {
        Some(ref d) => check_date(d)?,
        None => today(),
    });
    if args.completed {
        let date = match args.date {
            Some(ref d) => check_date(d)?,
            None => today(),
        };
        new = new.completed_on(date);
    }
    if args.favorite {
        new.is_favorite = Some(true);
    }
    new.genre = args.genre.or(new.genre);
    new.rating = args.rating.or(new.rating);
    new.isbn = args.isbn.or(new.isbn);
    new.published_year = args.year.or(new.published_year);
    new.notes = args.notes.or(new.notes);

    let book = app.add_book(new).await.context("Failed to add book")?;

    if book.cover_url.is_none() && !args.no_cover {
        if let Some(url) = catalog.find_cover(&book.title, &book.author).await {
            if let Err(e) = app.backfill_cover(&book.id, &url).await {
                output.warn(&format!("Could not save cover: {}", e));
            }
        }
    }

    output.success(&format!("Added book: {}", book.id));
    output.print_book(app.state().book(&book.id).unwrap_or(&book));
    Ok(())
}

async fn pick_from_catalog(
    catalog: &Catalog,
    query: &str,
    pick: Option<usize>,
    output: &Output,
) -> Result<NewBook> {
    let results = catalog.search(query, SEARCH_RESULTS).await;
    if results.is_empty() {
        output.warn(&format!(
            "No catalog matches for '{}'; enter the details yourself.",
            query
        ));
        return Ok(NewBook::default());
    }

    let index = match pick {
        Some(n) if (1..=results.len()).contains(&n) => n - 1,
        Some(n) => bail!("--pick {} is out of range (1-{})", n, results.len()),
        None if results.len() == 1 => 0,
        None if output.should_prompt() => {
            let options = results
                .iter()
                .map(|hit| format!("{} | {}", hit.title, hit.author_line()))
                .collect();
            select("Which book?", options)?
        }
        None => {
            output.print_catalog(&results);
            bail!("Several catalog matches. Choose one with --pick N.");
        }
    };

    Ok(results[index].to_new_book())
}

/// List books, most recently read or added first
pub async fn list(app: &mut App, filter: ListFilter, output: &Output) -> Result<()> {
    let books = app.fetch_books().await.context("Failed to load books")?;

    let mut shown: Vec<Book> = books.iter().filter(|b| filter.matches(b)).cloned().collect();
    shown.sort_by(|a, b| effective_date(b).cmp(&effective_date(a)));

    output.print_books(&shown);
    Ok(())
}

/// Show a single book, optionally opening its cover image
pub async fn show(app: &mut App, id: String, open_cover: bool, output: &Output) -> Result<()> {
    let book = load_book(app, &id).await?;
    output.print_book(&book);

    if open_cover {
        match book.cover_url {
            Some(ref url) => open::that(url).with_context(|| format!("Failed to open {}", url))?,
            None => output.warn("This book has no cover image."),
        }
    }
    Ok(())
}

/// Mark a book finished, or back to reading with `undo`
pub async fn complete(
    app: &mut App,
    id: String,
    date: Option<String>,
    undo: bool,
    output: &Output,
) -> Result<()> {
    let book = load_book(app, &id).await?;
    let date = date.as_deref().map(check_date).transpose()?;

    app.set_completed(&book.id, !undo, date)
        .await
        .context("Failed to update book")?;

    if undo {
        output.success(&format!("Marked as reading: {}", book.title));
    } else {
        output.success(&format!("Marked as read: {}", book.title));
    }
    Ok(())
}

/// Toggle the favorite flag
pub async fn favorite(app: &mut App, id: String, output: &Output) -> Result<()> {
    let book = load_book(app, &id).await?;
    let now_favorite = app
        .toggle_favorite(&book.id)
        .await
        .context("Failed to update book")?;

    if now_favorite {
        output.success(&format!("Added to favorites: {}", book.title));
    } else {
        output.success(&format!("Removed from favorites: {}", book.title));
    }
    Ok(())
}

/// Delete a book
pub async fn delete(app: &mut App, id: String, output: &Output) -> Result<()> {
    let book = load_book(app, &id).await?;

    if output.should_prompt() {
        println!("Delete book: {} - {}", &book.id, book.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    app.delete_book(&book.id)
        .await
        .context("Failed to delete book")?;
    output.success(&format!("Deleted book: {}", book.id));
    Ok(())
}

/// Search the catalog without adding anything
pub async fn search(catalog: &Catalog, query: String, limit: usize, output: &Output) -> Result<()> {
    let results = catalog.search(&query, limit).await;
    output.print_catalog(&results);
    Ok(())
}

/// Look up covers for books that have none
pub async fn covers(app: &mut App, catalog: &Catalog, output: &Output) -> Result<()> {
    let missing: Vec<(String, String, String)> = app
        .fetch_books()
        .await
        .context("Failed to load books")?
        .iter()
        .filter(|b| b.cover_url.is_none())
        .map(|b| (b.id.clone(), b.title.clone(), b.author.clone()))
        .collect();

    if missing.is_empty() {
        output.message("Every book already has a cover.");
        return Ok(());
    }

    let mut found = 0;
    for (id, title, author) in &missing {
        let Some(url) = catalog.find_cover(title, author).await else {
            continue;
        };
        match app.backfill_cover(id, &url).await {
            Ok(()) => found += 1,
            Err(e) => output.warn(&format!("Could not save cover for '{}': {}", title, e)),
        }
    }

    output.success(&format!("Found covers for {} of {} book(s)", found, missing.len()));
    Ok(())
}

/// Fetch books and resolve an id or prefix to a loaded book
pub(crate) async fn load_book(app: &mut App, id: &str) -> Result<Book> {
    let books = app.fetch_books().await.context("Failed to load books")?;
    let full_id = resolve_book_id(books, id)?;
    app.state()
        .book(&full_id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Book not found: {}", id))
}
