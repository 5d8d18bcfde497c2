//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use bookfolk_core::{Book, MonthBucket, QuoteEntry, ReadingSummary, User};

use crate::catalog::CatalogBook;

/// Width of the longest chart bar
const CHART_WIDTH: usize = 30;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print a single book (with its quotes)
    pub fn print_book(&self, book: &Book) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:        {}", book.id);
                println!("Title:     {}", book.title);
                println!("Author:    {}", book.author);
                println!("Pages:     {}", book.pages);
                println!("Status:    {}", status_label(book));
                if let Some(ref start) = book.start_date {
                    println!("Started:   {}", start);
                }
                if book.is_favorite() {
                    println!("Favorite:  yes");
                }
                if let Some(ref genre) = book.genre {
                    println!("Genre:     {}", genre);
                }
                if let Some(rating) = book.rating {
                    println!("Rating:    {}", stars(rating));
                }
                if let Some(ref isbn) = book.isbn {
                    println!("ISBN:      {}", isbn);
                }
                if let Some(year) = book.published_year {
                    println!("Published: {}", year);
                }
                if let Some(ref cover) = book.cover_url {
                    println!("Cover:     {}", cover);
                }
                println!("Added:     {}", short_date(&book.date_added));
                if let Some(ref notes) = book.notes {
                    println!();
                    println!("{}", notes);
                }

                let quotes = book.quotes();
                if !quotes.is_empty() {
                    println!();
                    println!("── Quotes ({}) ──", quotes.len());
                    for quote in quotes {
                        let page = quote.page.map(|p| format!(" (p. {})", p)).unwrap_or_default();
                        println!("[{}] {}{}", short_id(&quote.id), truncate_line(&quote.text, 60), page);
                    }
                }
            }
            OutputFormat::Json => print_json(book),
            OutputFormat::Quiet => println!("{}", book.id),
        }
    }

    /// Print a list of books
    pub fn print_books(&self, books: &[Book]) {
        match self.format {
            OutputFormat::Human => {
                if books.is_empty() {
                    println!("No books found.");
                    return;
                }
                for book in books {
                    let favorite = if book.is_favorite() { " ★" } else { "" };
                    println!(
                        "{} | {}{} | {} | {}",
                        short_id(&book.id),
                        truncate(&book.title, 35),
                        favorite,
                        truncate(&book.author, 25),
                        status_label(book)
                    );
                }
                println!("\n{} book(s)", books.len());
            }
            OutputFormat::Json => print_json(&books),
            OutputFormat::Quiet => {
                for book in books {
                    println!("{}", book.id);
                }
            }
        }
    }

    /// Print quotes with the book each came from
    pub fn print_quotes(&self, quotes: &[QuoteEntry]) {
        match self.format {
            OutputFormat::Human => {
                if quotes.is_empty() {
                    println!("No quotes yet.");
                    return;
                }
                for entry in quotes {
                    println!("────────────────────────────────────────");
                    let page = entry
                        .quote
                        .page
                        .map(|p| format!(", p. {}", p))
                        .unwrap_or_default();
                    println!(
                        "ID: {}  {} by {}{}",
                        short_id(&entry.quote.id),
                        entry.book_title,
                        entry.book_author,
                        page
                    );
                    println!();
                    println!("{}", entry.quote.text);
                    if let Some(ref notes) = entry.quote.notes {
                        println!();
                        println!("  {}", notes);
                    }
                    println!();
                }
                println!("{} quote(s)", quotes.len());
            }
            OutputFormat::Json => print_json(&quotes),
            OutputFormat::Quiet => {
                for entry in quotes {
                    println!("{}", entry.quote.id);
                }
            }
        }
    }

    /// Print the overview numbers and this month's finished books
    pub fn print_summary(&self, summary: &ReadingSummary, this_month: &[&Book]) {
        match self.format {
            OutputFormat::Human => {
                println!("Reading Summary");
                println!("===============");
                println!();
                println!("Books:            {}", summary.total_books);
                println!("Completed:        {}", summary.completed_books);
                println!("Pages read:       {}", summary.total_pages_read);
                println!("Favorites:        {}", summary.favorites);
                println!("Quotes:           {}", summary.quotes);
                println!();
                println!("Finished in {}: {}", summary.month, summary.completed_this_month);
                for book in this_month {
                    println!("  {} - {}", book.title, book.author);
                }
            }
            OutputFormat::Json => print_json(&serde_json::json!({
                "summary": summary,
                "completedThisMonth": this_month,
            })),
            OutputFormat::Quiet => println!("{}", summary.completed_this_month),
        }
    }

    /// Print monthly chart buckets as horizontal bars
    pub fn print_chart(&self, heading: &str, buckets: &[MonthBucket]) {
        match self.format {
            OutputFormat::Human => {
                println!("{}", heading);
                println!();
                let max = buckets.iter().map(|b| b.count).max().unwrap_or(0);
                for bucket in buckets {
                    println!(
                        "{:<3} {:<width$} {:>3}  ({} pages)",
                        bucket.label.get(..3).unwrap_or(bucket.label),
                        bar(bucket.count, max),
                        bucket.count,
                        bucket.pages,
                        width = CHART_WIDTH
                    );
                }
            }
            OutputFormat::Json => print_json(&buckets),
            OutputFormat::Quiet => {
                for bucket in buckets {
                    println!("{}", bucket.count);
                }
            }
        }
    }

    /// Print the signed-in user, if any
    pub fn print_user(&self, user: Option<&User>) {
        match (self.format, user) {
            (OutputFormat::Human, Some(user)) => {
                println!("Signed in as {}", user.label());
                println!("User ID: {}", user.uid);
            }
            (OutputFormat::Human, None) => println!("Not signed in."),
            (OutputFormat::Json, user) => print_json(&serde_json::json!({ "user": user })),
            (OutputFormat::Quiet, Some(user)) => println!("{}", user.uid),
            (OutputFormat::Quiet, None) => {}
        }
    }

    /// Print catalog search results, numbered from 1
    pub fn print_catalog(&self, results: &[CatalogBook]) {
        match self.format {
            OutputFormat::Human => {
                if results.is_empty() {
                    println!("No matches in the catalog.");
                    return;
                }
                for (i, hit) in results.iter().enumerate() {
                    let pages = hit
                        .page_count
                        .map(|p| format!("{} pages", p))
                        .unwrap_or_else(|| "? pages".to_string());
                    println!(
                        "[{}] {} | {} | {}",
                        i + 1,
                        truncate(&hit.title, 40),
                        truncate(&hit.author_line(), 30),
                        pages
                    );
                }
            }
            OutputFormat::Json => print_json(&results),
            OutputFormat::Quiet => {
                for hit in results {
                    println!("{}", hit.title);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print a warning to stderr (suppressed in quiet mode)
    pub fn warn(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("⚠ {}", message);
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize output: {}", e),
    }
}

fn status_label(book: &Book) -> String {
    if !book.is_completed {
        return "reading".to_string();
    }
    match book.date_read.as_deref().filter(|d| !d.is_empty()) {
        Some(date) => format!("read {}", short_date(date)),
        None => "read".to_string(),
    }
}

/// Date part of a stored date or timestamp
fn short_date(value: &str) -> &str {
    value.get(..10).unwrap_or(value)
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    "█".repeat(count * CHART_WIDTH / max)
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookfolk_core::NewBook;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
        assert_eq!(truncate("çalıkuşu romanı", 8), "çalık...");
    }

    #[test]
    fn test_truncate_line() {
        assert_eq!(truncate_line("single line", 20), "single line");
        assert_eq!(truncate_line("line one\nline two", 20), "line one");
    }

    #[test]
    fn test_status_label() {
        let reading = Book::from_new("b1", "2024-01-01", NewBook::new("Dune", "Frank Herbert", 412));
        assert_eq!(status_label(&reading), "reading");

        let done = Book::from_new(
            "b2",
            "2024-01-01",
            NewBook::new("Dune", "Frank Herbert", 412).completed_on("2024-03-05T10:00:00.000Z"),
        );
        assert_eq!(status_label(&done), "read 2024-03-05");
    }

    #[test]
    fn test_bar_scales_to_max() {
        assert_eq!(bar(0, 0), "");
        assert_eq!(bar(2, 2).chars().count(), CHART_WIDTH);
        assert_eq!(bar(1, 2).chars().count(), CHART_WIDTH / 2);
    }

    #[test]
    fn test_chart_with_short_label() {
        let buckets = [
            MonthBucket {
                month: 0,
                label: "?",
                count: 1,
                pages: 10,
            },
            MonthBucket {
                month: 3,
                label: "March",
                count: 2,
                pages: 600,
            },
        ];
        Output::new(OutputFormat::Human).print_chart("Books read per month", &buckets);
    }

    #[test]
    fn test_short_helpers() {
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(stars(3), "★★★☆☆");
    }
}
